//! The species catalog (`species.yaml`).
//!
//! ```yaml
//! common:
//!   distribution: bookworm
//!   packages:
//!     excluded: [nano]
//! bookworm-amd64:
//!   architecture: amd64
//! bookworm-armhf:
//!   architecture: armhf
//!   packages:
//!     included: [nano]
//! ```

use std::fs;
use std::path::Path;

use serde_yaml::{Mapping, Value};

use crate::config::check_target_name;
use crate::error::{BreederError, Result};
use crate::schema;
use crate::specie::Specie;

/// Reserved catalog key holding defaults shared by every specie.
pub const COMMON_SPECIE: &str = "common";

/// Resolved species in catalog order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    species: Vec<Specie>,
}

impl Catalog {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| BreederError::io(path, e))?;
        let value: Value = serde_yaml::from_str(&text).map_err(|source| BreederError::Yaml {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&value)
    }

    pub fn parse(value: &Value) -> Result<Self> {
        let Some(entries) = value.as_mapping() else {
            return Err(BreederError::config(
                "species file",
                "expected a mapping of species",
            ));
        };

        let empty = Mapping::new();
        let common = match entries.get(COMMON_SPECIE) {
            Some(common) => schema::as_mapping(common, "common specie")?.unwrap_or(&empty),
            None => &empty,
        };

        let mut species = Vec::with_capacity(entries.len());
        for (key, entry) in entries {
            let Some(name) = key.as_str() else {
                return Err(BreederError::config(
                    "species file",
                    "specie names must be strings",
                ));
            };
            if name == COMMON_SPECIE {
                continue;
            }
            check_target_name(name)?;
            let fields = schema::as_mapping(entry, &format!("specie \"{name}\""))?.unwrap_or(&empty);
            species.push(Specie::build(common, fields, name)?);
        }

        Ok(Self { species })
    }

    pub fn species(&self) -> &[Specie] {
        &self.species
    }

    pub fn get(&self, name: &str) -> Result<&Specie> {
        self.species
            .iter()
            .find(|specie| specie.name() == name)
            .ok_or_else(|| BreederError::UnknownTarget(name.to_string()))
    }

    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }
}
