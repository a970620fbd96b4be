//! Command orchestration over a base directory.
//!
//! ```text
//! species.yaml ──► Catalog ──► Specie (common overlay + package resolution)
//!                                 │
//!                                 ▼
//!                  NestStore ── NestBuilder (bootstrap + cpio)
//!                      │
//!                      └──► nests/<target>.yaml (skip vs. build on later runs)
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::bootstrap::DebootstrapBuilder;
use crate::catalog::Catalog;
use crate::config::{BreederConfig, BreederLayout};
use crate::error::{BreederError, Result};
use crate::genome::Genome;
use crate::nest::{EnsureOutcome, Nest, NestBuilder, NestState, NestStore};
use crate::specie::Specie;

/// Catalog, nest store and builder for one base directory.
pub struct Breeder<B = DebootstrapBuilder> {
    catalog: Catalog,
    nests: NestStore,
    builder: B,
}

impl Breeder<DebootstrapBuilder> {
    /// Open `base_dir` with its `breeder.toml` and the debootstrap builder.
    pub fn open(base_dir: &Path) -> Result<Self> {
        let layout = BreederLayout::open(base_dir)?;
        let config = BreederConfig::load(&layout)?;
        let builder = DebootstrapBuilder::new(&config);
        Self::with_builder(layout, &config, builder)
    }
}

impl<B: NestBuilder> Breeder<B> {
    pub fn with_builder(layout: BreederLayout, config: &BreederConfig, builder: B) -> Result<Self> {
        let catalog = Catalog::load(layout.species_file())?;
        Ok(Self {
            catalog,
            nests: NestStore::new(layout, config),
            builder,
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn nests(&self) -> &NestStore {
        &self.nests
    }

    /// Every specie with the state of its nest. Never builds anything.
    pub fn species(&self) -> Vec<SpecieStatus> {
        self.catalog
            .species()
            .iter()
            .map(|specie| SpecieStatus::new(specie, self.nests.inspect(specie.name())))
            .collect()
    }

    /// Rebuild the nest for `target` even if one exists.
    pub fn build_nest(&self, target: &str) -> Result<Nest> {
        let specie = self.catalog.get(target)?;
        self.nests.force_build(specie, &self.builder)
    }

    /// Build nests for every specie that lacks one, in catalog order.
    pub fn build_nests(&self) -> Result<Vec<EnsureOutcome>> {
        self.nests
            .ensure_all_built(self.catalog.species(), &self.builder)
    }

    /// Locate everything needed to hatch `genome_file` for `target`.
    ///
    /// Building the egg itself is not implemented; this stops once the genome
    /// is parsed and a built nest is found.
    pub fn hatch_an_egg(&self, target: &str, genome_file: &str) -> Result<Hatching> {
        let specie = self.catalog.get(target)?;

        let genome_path = self.nests.layout().genome_path(genome_file);
        if !genome_path.is_file() {
            return Err(BreederError::missing("genome file", genome_path));
        }
        let genome = Genome::load(&genome_path)?;

        info!("Chosen genome: {genome}");
        info!("Chosen specie: {specie}");

        let paths = self.nests.layout().nest_paths(target);
        let nest = match self.nests.inspect(target) {
            NestState::Present(nest) => nest,
            state => {
                let reason = state.unavailable_reason().unwrap_or_default();
                return Err(BreederError::missing(
                    format!("nest for the specie \"{target}\" ({reason})"),
                    paths.metadata,
                ));
            }
        };
        if !paths.image.is_file() {
            return Err(BreederError::missing("nest image", paths.image));
        }

        info!(
            "Using nest of specie \"{}\" built {} to hatch the egg for genome \"{}-{}\"",
            specie.name(),
            nest.built(),
            genome.name,
            genome.version
        );

        Ok(Hatching {
            genome,
            specie: specie.clone(),
            nest,
            image: paths.image,
        })
    }
}

/// One line group of the `species` listing.
#[derive(Debug, Clone, Serialize)]
pub struct SpecieStatus {
    pub specie: Specie,
    pub nest: NestStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum NestStatus {
    Built {
        built: String,
        /// The catalog entry no longer matches what was built.
        definition_changed: bool,
    },
    NotAvailable {
        reason: String,
    },
}

impl SpecieStatus {
    fn new(specie: &Specie, state: NestState) -> Self {
        let nest = match state {
            NestState::Present(nest) => NestStatus::Built {
                built: nest.built(),
                definition_changed: !nest.specie().same_definition(specie),
            },
            other => NestStatus::NotAvailable {
                reason: other.unavailable_reason().unwrap_or_default(),
            },
        };
        Self {
            specie: specie.clone(),
            nest,
        }
    }
}

impl fmt::Display for SpecieStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "specie: {}", self.specie)?;
        match &self.nest {
            NestStatus::Built {
                built,
                definition_changed: false,
            } => write!(f, "  nest: built {built}"),
            NestStatus::Built {
                built,
                definition_changed: true,
            } => write!(
                f,
                "  nest: built {built} (catalog definition changed since)"
            ),
            NestStatus::NotAvailable { reason } => write!(f, "  nest: not available ({reason})"),
        }
    }
}

/// Inputs for hatching one egg.
#[derive(Debug, Clone)]
pub struct Hatching {
    pub genome: Genome,
    pub specie: Specie,
    pub nest: Nest,
    pub image: PathBuf,
}
