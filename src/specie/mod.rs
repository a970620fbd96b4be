//! Target platforms ("species").
//!
//! A specie is resolved from ordered layers of catalog fields: usually the
//! catalog's `common` entry followed by the target's own entry. Later layers
//! override scalar fields, and package lists are folded through
//! [`packages::resolve`] so each layer's choices win over the ones below it.

pub mod packages;

use std::fmt;

use serde::Serialize;
use serde_yaml::Mapping;
use tracing::warn;

use crate::error::{BreederError, Result};
use crate::schema::{self, Field};

pub use packages::{resolve, PackageSet};

/// A fully resolved target platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Specie {
    name: String,
    distribution: String,
    architecture: String,
    packages: PackageSet,
}

impl Specie {
    /// Overlay `specie` fields onto `common` defaults.
    pub fn build(common: &Mapping, specie: &Mapping, name: &str) -> Result<Self> {
        Self::from_layers(name, &[common, specie])
    }

    /// Rebuild a specie from [`Specie::serialize`] output.
    pub fn from_record(name: &str, record: &Mapping) -> Result<Self> {
        Self::from_layers(name, &[record])
    }

    /// Resolve a specie from layers ordered lowest to highest precedence.
    pub fn from_layers(name: &str, layers: &[&Mapping]) -> Result<Self> {
        let context = format!("specie \"{name}\"");
        let packages_context = format!("{context} packages");

        // Scalars are type-checked only in the layer that ends up supplying them.
        let mut distribution_layer = None;
        let mut architecture_layer = None;
        let mut packages = PackageSet::default();

        for &layer in layers {
            if has_value(layer, Field::Distribution) {
                distribution_layer = Some(layer);
            }
            if has_value(layer, Field::Architecture) {
                architecture_layer = Some(layer);
            }

            let (included, excluded) =
                match schema::optional_mapping(layer, Field::Packages, &context)? {
                    Some(section) => (
                        schema::string_list(section, Field::Included, &packages_context)?,
                        schema::string_list(section, Field::Excluded, &packages_context)?,
                    ),
                    None => (Vec::new(), Vec::new()),
                };
            packages = resolve(
                packages.included(),
                packages.excluded(),
                included.as_slice(),
                excluded.as_slice(),
            );
        }

        let conflicts = packages.conflicts();
        if !conflicts.is_empty() {
            warn!(
                "Specie \"{}\" both includes and excludes: {}",
                name,
                conflicts.join(", ")
            );
        }

        let distribution = match distribution_layer {
            Some(layer) => schema::optional_str(layer, Field::Distribution, &context)?,
            None => None,
        };
        let architecture = match architecture_layer {
            Some(layer) => schema::optional_str(layer, Field::Architecture, &context)?,
            None => None,
        };

        Ok(Self {
            name: name.to_string(),
            distribution: required(distribution, Field::Distribution, &context)?,
            architecture: required(architecture, Field::Architecture, &context)?,
            packages,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn distribution(&self) -> &str {
        &self.distribution
    }

    pub fn architecture(&self) -> &str {
        &self.architecture
    }

    pub fn packages(&self) -> &PackageSet {
        &self.packages
    }

    /// True when both species would bootstrap the same filesystem.
    pub fn same_definition(&self, other: &Specie) -> bool {
        self.distribution == other.distribution
            && self.architecture == other.architecture
            && self.packages == other.packages
    }

    /// Plain mapping recorded in nest metadata. The name is not included.
    pub fn serialize(&self) -> Mapping {
        let mut mapping = Mapping::new();
        mapping.insert(
            Field::Distribution.key().into(),
            self.distribution.clone().into(),
        );
        mapping.insert(
            Field::Architecture.key().into(),
            self.architecture.clone().into(),
        );
        mapping.insert(
            Field::Packages.key().into(),
            self.packages.to_mapping().into(),
        );
        mapping
    }

    /// Arguments for the bootstrap tool, without the target directory.
    pub fn bootstrap_args(&self) -> Vec<String> {
        let [include, exclude] = self.packages.bootstrap_args();
        vec![
            format!("--arch={}", self.architecture),
            include,
            exclude,
            self.distribution.clone(),
        ]
    }
}

impl fmt::Display for Specie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.name)?;
        writeln!(f, "  distribution: {}", self.distribution)?;
        writeln!(f, "  architecture: {}", self.architecture)?;
        write!(f, "  packages:")?;
        for line in self.packages.to_string().lines() {
            write!(f, "\n    {line}")?;
        }
        Ok(())
    }
}

fn has_value(layer: &Mapping, field: Field) -> bool {
    layer.get(field.key()).is_some_and(|value| !value.is_null())
}

fn required(value: Option<String>, field: Field, context: &str) -> Result<String> {
    match value {
        Some(value) if !value.is_empty() => Ok(value),
        Some(_) => Err(BreederError::config(
            context,
            format!("'{}' must not be empty", field.key()),
        )),
        None => Err(BreederError::config(
            context,
            format!("missing '{}'", field.key()),
        )),
    }
}
