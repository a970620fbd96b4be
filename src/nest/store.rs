//! Nest lifecycle: inspect, build once, force a rebuild.
//!
//! Skipping is decided by the presence of a valid metadata record only. A
//! target whose catalog definition changed after it was built is not rebuilt
//! until `force_build` is requested for it.

use std::fs;
use std::io;
use std::path::Path;

use serde_yaml::Value;
use tracing::{debug, info, warn};

use crate::artifact::checksum::{checksum_path, write_checksum};
use crate::config::{check_target_name, BreederConfig, BreederLayout};
use crate::error::{BreederError, Result};
use crate::nest::{now_timestamp, Nest, NestState};
use crate::specie::Specie;

/// Populates and archives a nest workspace.
pub trait NestBuilder {
    /// Check host prerequisites before anything is removed.
    fn preflight(&self) -> Result<()> {
        Ok(())
    }

    /// Fill `workspace` with the root filesystem for `specie`.
    fn populate(&self, specie: &Specie, workspace: &Path) -> Result<()>;

    /// Archive `workspace` into `image`.
    fn archive(&self, workspace: &Path, image: &Path) -> Result<()>;
}

/// Result of [`NestStore::ensure_built`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnsureOutcome {
    AlreadyBuilt(Nest),
    BuiltNow(Nest),
}

impl EnsureOutcome {
    pub fn nest(&self) -> &Nest {
        match self {
            EnsureOutcome::AlreadyBuilt(nest) | EnsureOutcome::BuiltNow(nest) => nest,
        }
    }
}

/// Nest images and metadata under `BASEDIR/nests`.
#[derive(Debug, Clone)]
pub struct NestStore {
    layout: BreederLayout,
    keep_workspace: bool,
    checksum: bool,
}

impl NestStore {
    pub fn new(layout: BreederLayout, config: &BreederConfig) -> Self {
        Self {
            layout,
            keep_workspace: config.keep_workspace,
            checksum: config.checksum,
        }
    }

    pub fn layout(&self) -> &BreederLayout {
        &self.layout
    }

    /// Read the metadata for `target`. Never builds anything.
    pub fn inspect(&self, target: &str) -> NestState {
        NestState::read(target, &self.layout.nest_paths(target).metadata)
    }

    /// Build `specie` unless a valid nest record already exists.
    pub fn ensure_built<B: NestBuilder + ?Sized>(
        &self,
        specie: &Specie,
        builder: &B,
    ) -> Result<EnsureOutcome> {
        match self.inspect(specie.name()) {
            NestState::Present(nest) => {
                info!(
                    "Nest for the specie \"{}\" already exists and was built {}. Skipping.",
                    specie.name(),
                    nest.built()
                );
                Ok(EnsureOutcome::AlreadyBuilt(nest))
            }
            NestState::Invalid(e) => {
                warn!(
                    "Ignoring unreadable nest metadata for the specie \"{}\": {}",
                    specie.name(),
                    e
                );
                self.force_build(specie, builder).map(EnsureOutcome::BuiltNow)
            }
            NestState::Absent => self.force_build(specie, builder).map(EnsureOutcome::BuiltNow),
        }
    }

    /// Build every specie lacking a valid nest, in order.
    ///
    /// The first failure aborts the remaining targets.
    pub fn ensure_all_built<'a, B, I>(&self, species: I, builder: &B) -> Result<Vec<EnsureOutcome>>
    where
        B: NestBuilder + ?Sized,
        I: IntoIterator<Item = &'a Specie>,
    {
        species
            .into_iter()
            .map(|specie| self.ensure_built(specie, builder))
            .collect()
    }

    /// Rebuild the nest for `specie` from scratch and record it.
    pub fn force_build<B: NestBuilder + ?Sized>(&self, specie: &Specie, builder: &B) -> Result<Nest> {
        check_target_name(specie.name())?;
        let paths = self.layout.nest_paths(specie.name());

        info!(
            "Building the nest for the specie \"{}\" at \"{}\"",
            specie.name(),
            paths.workspace.display()
        );
        info!("Nest will be stored to \"{}\"", paths.image.display());

        builder.preflight()?;

        if paths.workspace.is_dir() {
            info!("Removing the old nest first...");
            remove_workspace(&paths.workspace)?;
        }
        // A failed build from here on must leave the target absent.
        for stale in [&paths.metadata, &paths.image, &checksum_path(&paths.image)] {
            remove_file_if_exists(stale)?;
        }

        builder.populate(specie, &paths.workspace)?;
        builder.archive(&paths.workspace, &paths.image)?;

        if self.checksum {
            let checksum = write_checksum(&paths.image)?;
            debug!("Wrote {}", checksum.display());
        }

        let nest = Nest::new(now_timestamp(), specie.clone());
        write_record(&paths.metadata, &nest)?;

        if !self.keep_workspace && paths.workspace.is_dir() {
            info!("Removing temporary files...");
            remove_workspace(&paths.workspace)?;
        }

        info!(
            "Finished building the nest for the specie \"{}\"",
            specie.name()
        );
        Ok(nest)
    }
}

fn remove_workspace(workspace: &Path) -> Result<()> {
    fs::remove_dir_all(workspace).map_err(|e| BreederError::io(workspace, e))
}

fn remove_file_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!("Removed {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(BreederError::io(path, e)),
    }
}

/// Write the metadata via a temporary file and rename.
fn write_record(metadata: &Path, nest: &Nest) -> Result<()> {
    let text = serde_yaml::to_string(&Value::Mapping(nest.to_record())).map_err(|source| {
        BreederError::Yaml {
            path: metadata.to_path_buf(),
            source,
        }
    })?;

    let mut tmp = metadata.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = Path::new(&tmp);

    fs::write(tmp, text).map_err(|e| BreederError::io(tmp, e))?;
    fs::rename(tmp, metadata).map_err(|e| BreederError::io(metadata, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use serde_yaml::Mapping;
    use tempfile::TempDir;
    use tracing_test::traced_test;

    #[derive(Default)]
    struct FakeBuilder {
        populated: RefCell<Vec<String>>,
        fail_on: Option<&'static str>,
        truncate_and_fail_archive: bool,
    }

    impl FakeBuilder {
        fn failing_on(target: &'static str) -> Self {
            Self {
                fail_on: Some(target),
                ..Self::default()
            }
        }

        fn populated(&self) -> Vec<String> {
            self.populated.borrow().clone()
        }
    }

    impl NestBuilder for FakeBuilder {
        fn populate(&self, specie: &Specie, workspace: &Path) -> Result<()> {
            self.populated.borrow_mut().push(specie.name().to_string());
            if self.fail_on == Some(specie.name()) {
                return Err(BreederError::ExternalProcess {
                    program: "fake-bootstrap".to_string(),
                    status: "exit status: 1".to_string(),
                    hint: None,
                });
            }
            let etc = workspace.join("etc");
            fs::create_dir_all(&etc).map_err(|e| BreederError::io(&etc, e))?;
            fs::write(etc.join("bootstrap-args"), specie.bootstrap_args().join(" "))
                .map_err(|e| BreederError::io(&etc, e))
        }

        fn archive(&self, workspace: &Path, image: &Path) -> Result<()> {
            if self.truncate_and_fail_archive {
                fs::write(image, "").map_err(|e| BreederError::io(image, e))?;
                return Err(BreederError::ExternalProcess {
                    program: "fake-archive".to_string(),
                    status: "exit status: 2".to_string(),
                    hint: None,
                });
            }
            let args = workspace.join("etc/bootstrap-args");
            let contents = fs::read(&args).map_err(|e| BreederError::io(&args, e))?;
            fs::write(image, contents).map_err(|e| BreederError::io(image, e))
        }
    }

    fn specie(name: &str, architecture: &str) -> Specie {
        let mut fields = Mapping::new();
        fields.insert("distribution".into(), "bookworm".into());
        fields.insert("architecture".into(), architecture.into());
        Specie::build(&Mapping::new(), &fields, name).unwrap()
    }

    fn store(temp: &TempDir) -> NestStore {
        store_with(temp, BreederConfig::default())
    }

    fn store_with(temp: &TempDir, config: BreederConfig) -> NestStore {
        let layout = BreederLayout::at(temp.path());
        fs::create_dir_all(layout.nests_dir()).unwrap();
        NestStore::new(layout, &config)
    }

    #[test]
    fn inspect_without_metadata_is_absent() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(store(&temp).inspect("t1"), NestState::Absent));
    }

    #[test]
    fn force_build_records_nest() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        let builder = FakeBuilder::default();
        let t1 = specie("t1", "amd64");

        let before = now_timestamp();
        store.force_build(&t1, &builder).unwrap();
        let after = now_timestamp();

        let state = store.inspect("t1");
        let nest = state.nest().expect("nest should be present");
        assert!(before <= nest.built_at() && nest.built_at() <= after);
        assert_eq!(nest.specie(), &t1);

        let paths = store.layout().nest_paths("t1");
        assert!(paths.image.is_file());
        assert!(!paths.workspace.exists());
        assert!(temp.path().join("nests/t1.cpio.gz.sha256").is_file());
    }

    #[test]
    fn force_build_replaces_old_workspace() {
        let temp = TempDir::new().unwrap();
        let config = BreederConfig {
            keep_workspace: true,
            checksum: false,
            ..BreederConfig::default()
        };
        let store = store_with(&temp, config);
        let paths = store.layout().nest_paths("t1");
        fs::create_dir_all(&paths.workspace).unwrap();
        fs::write(paths.workspace.join("stale"), "old").unwrap();

        store
            .force_build(&specie("t1", "amd64"), &FakeBuilder::default())
            .unwrap();

        assert!(!paths.workspace.join("stale").exists());
        assert!(paths.workspace.join("etc/bootstrap-args").is_file());
        assert!(!temp.path().join("nests/t1.cpio.gz.sha256").exists());
    }

    #[test]
    fn failed_rebuild_leaves_target_absent() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        let t1 = specie("t1", "amd64");
        store.force_build(&t1, &FakeBuilder::default()).unwrap();
        let paths = store.layout().nest_paths("t1");
        let sidecar = checksum_path(&paths.image);
        assert!(sidecar.is_file());

        let broken = FakeBuilder {
            truncate_and_fail_archive: true,
            ..FakeBuilder::default()
        };
        let err = store.force_build(&t1, &broken).unwrap_err();
        assert!(matches!(err, BreederError::ExternalProcess { .. }));

        assert!(matches!(store.inspect("t1"), NestState::Absent));
        assert!(!paths.metadata.exists());
        assert!(!sidecar.exists());

        let builder = FakeBuilder::default();
        let outcome = store.ensure_built(&t1, &builder).unwrap();
        assert!(matches!(outcome, EnsureOutcome::BuiltNow(_)));
        assert!(fs::metadata(&paths.image).unwrap().len() > 0);
    }

    #[test]
    fn empty_target_name_never_touches_other_nests() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        store
            .force_build(&specie("t1", "amd64"), &FakeBuilder::default())
            .unwrap();

        let builder = FakeBuilder::default();
        let err = store.force_build(&specie("", "amd64"), &builder).unwrap_err();

        assert!(matches!(err, BreederError::Config { .. }));
        assert!(builder.populated().is_empty());
        assert!(store.inspect("t1").nest().is_some());
    }

    #[test]
    fn rebuild_without_checksum_drops_old_sidecar() {
        let temp = TempDir::new().unwrap();
        let t1 = specie("t1", "amd64");
        store(&temp).force_build(&t1, &FakeBuilder::default()).unwrap();
        let sidecar = temp.path().join("nests/t1.cpio.gz.sha256");
        assert!(sidecar.is_file());

        let config = BreederConfig {
            checksum: false,
            ..BreederConfig::default()
        };
        store_with(&temp, config)
            .force_build(&t1, &FakeBuilder::default())
            .unwrap();

        assert!(!sidecar.exists());
        assert!(temp.path().join("nests/t1.yaml").is_file());
    }

    #[test]
    #[traced_test]
    fn ensure_built_skips_present_nest() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        let t1 = specie("t1", "amd64");
        store.force_build(&t1, &FakeBuilder::default()).unwrap();

        let builder = FakeBuilder::default();
        let outcome = store.ensure_built(&t1, &builder).unwrap();
        assert!(matches!(outcome, EnsureOutcome::AlreadyBuilt(_)));
        assert!(builder.populated().is_empty());
        assert!(logs_contain("already exists and was built"));
    }

    #[test]
    fn changed_definition_does_not_trigger_rebuild() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        store
            .force_build(&specie("t1", "amd64"), &FakeBuilder::default())
            .unwrap();

        let builder = FakeBuilder::default();
        let outcome = store.ensure_built(&specie("t1", "arm64"), &builder).unwrap();
        assert!(builder.populated().is_empty());
        assert_eq!(outcome.nest().specie().architecture(), "amd64");
    }

    #[test]
    fn invalid_metadata_is_rebuilt() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        let metadata = store.layout().nest_paths("t1").metadata;
        fs::write(&metadata, "built: not-a-date\n").unwrap();
        assert!(matches!(store.inspect("t1"), NestState::Invalid(_)));

        let builder = FakeBuilder::default();
        let outcome = store.ensure_built(&specie("t1", "amd64"), &builder).unwrap();
        assert!(matches!(outcome, EnsureOutcome::BuiltNow(_)));
        assert_eq!(builder.populated(), ["t1"]);
        assert!(store.inspect("t1").nest().is_some());
    }

    #[test]
    fn ensure_all_built_only_builds_missing() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        let t1 = specie("t1", "amd64");
        let t2 = specie("t2", "armhf");
        store.force_build(&t1, &FakeBuilder::default()).unwrap();
        let metadata = store.layout().nest_paths("t1").metadata;
        let recorded = fs::read_to_string(&metadata).unwrap();

        let builder = FakeBuilder::default();
        let outcomes = store.ensure_all_built([&t1, &t2], &builder).unwrap();

        assert_eq!(builder.populated(), ["t2"]);
        assert!(matches!(outcomes[0], EnsureOutcome::AlreadyBuilt(_)));
        assert!(matches!(outcomes[1], EnsureOutcome::BuiltNow(_)));
        assert_eq!(fs::read_to_string(&metadata).unwrap(), recorded);
    }

    #[test]
    fn ensure_all_built_stops_at_first_failure() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        let t1 = specie("t1", "amd64");
        let t2 = specie("t2", "armhf");

        let builder = FakeBuilder::failing_on("t1");
        let err = store.ensure_all_built([&t1, &t2], &builder).unwrap_err();

        assert!(matches!(err, BreederError::ExternalProcess { .. }));
        assert_eq!(builder.populated(), ["t1"]);
        assert!(matches!(store.inspect("t1"), NestState::Absent));
        assert!(matches!(store.inspect("t2"), NestState::Absent));
    }
}
