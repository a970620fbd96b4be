//! Base directory layout and `breeder.toml` settings.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::{BreederError, Result};

pub const DIRECTORY_GENOMES: &str = "genomes";
pub const DIRECTORY_NESTS: &str = "nests";
pub const SPECIES_FILE: &str = "species.yaml";
pub const CONFIG_FILE: &str = "breeder.toml";

const NEST_IMAGE_SUFFIX: &str = ".cpio.gz";
const NEST_METADATA_SUFFIX: &str = ".yaml";

/// Paths under BASEDIR.
#[derive(Debug, Clone)]
pub struct BreederLayout {
    base_dir: PathBuf,
    nests_dir: PathBuf,
    genomes_dir: PathBuf,
    species_file: PathBuf,
}

impl BreederLayout {
    /// Check the base directory, creating `nests/` if needed.
    ///
    /// The base directory is canonicalized because the archive pipeline runs
    /// from inside the nest workspace.
    pub fn open(base_dir: &Path) -> Result<Self> {
        if !base_dir.is_dir() {
            return Err(BreederError::missing("base directory", base_dir));
        }
        let base_dir = fs::canonicalize(base_dir).map_err(|e| BreederError::io(base_dir, e))?;
        let layout = Self::at(&base_dir);

        if !layout.nests_dir.is_dir() {
            debug!("Creating nests directory {}", layout.nests_dir.display());
            fs::create_dir_all(&layout.nests_dir)
                .map_err(|e| BreederError::io(&layout.nests_dir, e))?;
        }
        if !layout.species_file.is_file() {
            return Err(BreederError::missing("species file", &layout.species_file));
        }

        Ok(layout)
    }

    /// Layout rooted at `base_dir` without touching the filesystem.
    pub fn at(base_dir: &Path) -> Self {
        Self {
            base_dir: base_dir.to_path_buf(),
            nests_dir: base_dir.join(DIRECTORY_NESTS),
            genomes_dir: base_dir.join(DIRECTORY_GENOMES),
            species_file: base_dir.join(SPECIES_FILE),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn nests_dir(&self) -> &Path {
        &self.nests_dir
    }

    pub fn species_file(&self) -> &Path {
        &self.species_file
    }

    pub fn config_file(&self) -> PathBuf {
        self.base_dir.join(CONFIG_FILE)
    }

    /// Bare file names are looked up in `genomes/`; anything with a
    /// directory component is used as given.
    pub fn genome_path(&self, genome_file: &str) -> PathBuf {
        let path = Path::new(genome_file);
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => path.to_path_buf(),
            _ => self.genomes_dir.join(path),
        }
    }

    pub fn nest_paths(&self, target: &str) -> NestPaths {
        NestPaths {
            workspace: self.nests_dir.join(target),
            image: self.nests_dir.join(format!("{target}{NEST_IMAGE_SUFFIX}")),
            metadata: self.nests_dir.join(format!("{target}{NEST_METADATA_SUFFIX}")),
        }
    }
}

/// Reject target names that would not map to a single entry under `nests/`.
pub fn check_target_name(name: &str) -> Result<()> {
    let problem = if name.is_empty() {
        "must not be empty"
    } else if name == "." || name == ".." {
        "must not be a relative path component"
    } else if name.contains('/') || name.contains('\0') {
        "must not contain '/' or NUL"
    } else {
        return Ok(());
    };
    Err(BreederError::config(
        format!("specie name \"{name}\""),
        format!("name {problem}"),
    ))
}

/// Files backing one nest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NestPaths {
    /// Bootstrap target directory, removed after archiving.
    pub workspace: PathBuf,
    /// Archived filesystem tree.
    pub image: PathBuf,
    /// Build metadata record.
    pub metadata: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
struct BreederToml {
    #[serde(default)]
    nest: NestToml,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
struct NestToml {
    bootstrap: Option<String>,
    gzip_level: Option<u32>,
    keep_workspace: Option<bool>,
    checksum: Option<bool>,
}

/// Settings for building nests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreederConfig {
    /// Bootstrap tool invoked as `<bootstrap> <specie args> <workspace>`.
    pub bootstrap: String,
    pub gzip_level: u32,
    pub keep_workspace: bool,
    pub checksum: bool,
}

impl Default for BreederConfig {
    fn default() -> Self {
        Self {
            bootstrap: "qemu-debootstrap".to_string(),
            gzip_level: 9,
            keep_workspace: false,
            checksum: true,
        }
    }
}

impl BreederConfig {
    /// Load `breeder.toml` from the layout, falling back to defaults.
    pub fn load(layout: &BreederLayout) -> Result<Self> {
        let path = layout.config_file();
        if !path.is_file() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(&path).map_err(|e| BreederError::io(&path, e))?;
        Self::parse(&text).map_err(|e| match e {
            BreederError::Config { message, .. } => {
                BreederError::config(format!("config '{}'", path.display()), message)
            }
            other => other,
        })
    }

    pub fn parse(text: &str) -> Result<Self> {
        let parsed: BreederToml =
            toml::from_str(text).map_err(|e| BreederError::config("config", e.to_string()))?;
        let defaults = Self::default();
        let nest = parsed.nest;

        let bootstrap = nest.bootstrap.unwrap_or(defaults.bootstrap);
        if bootstrap.trim().is_empty() {
            return Err(BreederError::config(
                "config",
                "nest.bootstrap must not be empty",
            ));
        }
        let gzip_level = nest.gzip_level.unwrap_or(defaults.gzip_level);
        if !(1..=9).contains(&gzip_level) {
            return Err(BreederError::config(
                "config",
                format!("nest.gzip_level must be between 1 and 9, got {gzip_level}"),
            ));
        }

        Ok(Self {
            bootstrap,
            gzip_level,
            keep_workspace: nest.keep_workspace.unwrap_or(defaults.keep_workspace),
            checksum: nest.checksum.unwrap_or(defaults.checksum),
        })
    }
}
