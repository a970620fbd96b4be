//! Package build descriptions ("genomes").
//!
//! Dependency lists are recorded as written; nothing here resolves or orders
//! them.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::Serialize;
use serde_yaml::{Mapping, Value};
use tracing::warn;

use crate::error::{BreederError, Result};
use crate::schema::{self, Field};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Dependencies {
    pub external: Vec<String>,
    pub internal: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Genome {
    pub name: String,
    pub version: String,
    pub dependencies: Dependencies,
}

impl Genome {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| BreederError::io(path, e))?;
        let value: Value = serde_yaml::from_str(&text).map_err(|source| BreederError::Yaml {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&value)
    }

    pub fn parse(value: &Value) -> Result<Self> {
        const CONTEXT: &str = "genome";

        let Some(fields) = schema::as_mapping(value, CONTEXT)? else {
            return Err(BreederError::config(CONTEXT, "expected a mapping"));
        };
        let name = schema::required_str(fields, Field::Name, CONTEXT)?;
        let version = schema::required_str(fields, Field::Version, CONTEXT)?;

        let context = format!("genome \"{name}\" dependencies");
        let dependencies = match fields.get(Field::Dependencies.key()) {
            Some(Value::Mapping(section)) => parse_dependencies(section, &context)?,
            Some(Value::Null) | None => Dependencies::default(),
            Some(_) => {
                warn!("Ignoring {context}: expected a mapping of external/internal lists");
                Dependencies::default()
            }
        };

        Ok(Self {
            name,
            version,
            dependencies,
        })
    }
}

fn parse_dependencies(section: &Mapping, context: &str) -> Result<Dependencies> {
    Ok(Dependencies {
        external: schema::string_list(section, Field::External, context)?,
        internal: schema::string_list(section, Field::Internal, context)?,
    })
}

impl fmt::Display for Genome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}-{}", self.name, self.version)?;
        writeln!(f, "  external: {}", self.dependencies.external.join(", "))?;
        write!(f, "  internal: {}", self.dependencies.internal.join(", "))
    }
}
