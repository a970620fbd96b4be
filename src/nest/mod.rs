//! Built environments ("nests") and their metadata records.
//!
//! A nest record is `{built: <timestamp>, specie: <serialized specie>}`. The
//! embedded specie is a snapshot of what was built; it is kept for auditing
//! and never used to decide whether a rebuild is needed.

pub mod store;

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde_yaml::{Mapping, Value};
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

use crate::error::{BreederError, Result};
use crate::schema::{self, Field};
use crate::specie::Specie;

pub use store::{EnsureOutcome, NestBuilder, NestStore};

/// A successfully built nest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nest {
    built_at: PrimitiveDateTime,
    specie: Specie,
}

impl Nest {
    pub fn new(built_at: PrimitiveDateTime, specie: Specie) -> Self {
        Self { built_at, specie }
    }

    pub fn built_at(&self) -> PrimitiveDateTime {
        self.built_at
    }

    /// `built_at` as recorded in the metadata file.
    pub fn built(&self) -> String {
        format_timestamp(self.built_at)
    }

    pub fn specie(&self) -> &Specie {
        &self.specie
    }

    /// Parse a metadata record belonging to `target`.
    pub fn parse(target: &str, value: &Value) -> Result<Self> {
        let context = format!("nest \"{target}\" metadata");
        let Some(record) = schema::as_mapping(value, &context)? else {
            return Err(BreederError::config(context, "expected a mapping"));
        };

        let built = schema::required_str(record, Field::Built, &context)?;
        let built_at = parse_timestamp(&built).ok_or_else(|| {
            BreederError::config(
                &context,
                format!("'built' is not a YYYY-MM-DDTHH:MM:SS timestamp: {built}"),
            )
        })?;
        let specie = schema::optional_mapping(record, Field::Specie, &context)?
            .ok_or_else(|| BreederError::config(&context, "missing 'specie'"))?;

        Ok(Self {
            built_at,
            specie: Specie::from_record(target, specie)?,
        })
    }

    pub fn to_record(&self) -> Mapping {
        let mut record = Mapping::new();
        record.insert(Field::Built.key().into(), self.built().into());
        record.insert(Field::Specie.key().into(), self.specie.serialize().into());
        record
    }
}

/// What the metadata for one target says.
#[derive(Debug)]
pub enum NestState {
    /// No metadata file.
    Absent,
    Present(Nest),
    /// A metadata file exists but could not be read or parsed.
    Invalid(BreederError),
}

impl NestState {
    pub(crate) fn read(target: &str, metadata: &Path) -> Self {
        let text = match fs::read_to_string(metadata) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return NestState::Absent,
            Err(e) => return NestState::Invalid(BreederError::io(metadata, e)),
        };
        let parsed = serde_yaml::from_str::<Value>(&text)
            .map_err(|source| BreederError::Yaml {
                path: metadata.to_path_buf(),
                source,
            })
            .and_then(|value| Nest::parse(target, &value));
        match parsed {
            Ok(nest) => NestState::Present(nest),
            Err(e) => NestState::Invalid(e),
        }
    }

    pub fn nest(&self) -> Option<&Nest> {
        match self {
            NestState::Present(nest) => Some(nest),
            NestState::Absent | NestState::Invalid(_) => None,
        }
    }

    pub fn into_nest(self) -> Option<Nest> {
        match self {
            NestState::Present(nest) => Some(nest),
            NestState::Absent | NestState::Invalid(_) => None,
        }
    }

    /// Why the nest cannot be used, if it cannot.
    pub fn unavailable_reason(&self) -> Option<String> {
        match self {
            NestState::Present(_) => None,
            NestState::Absent => Some("no metadata record".to_string()),
            NestState::Invalid(e) => Some(e.to_string()),
        }
    }
}

/// Current UTC time, truncated to whole seconds.
pub fn now_timestamp() -> PrimitiveDateTime {
    let now = OffsetDateTime::now_utc();
    let now = now.replace_nanosecond(0).unwrap_or(now);
    PrimitiveDateTime::new(now.date(), now.time())
}

pub fn format_timestamp(timestamp: PrimitiveDateTime) -> String {
    timestamp
        .format(format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second]"
        ))
        .unwrap_or_else(|_| timestamp.to_string())
}

pub fn parse_timestamp(raw: &str) -> Option<PrimitiveDateTime> {
    PrimitiveDateTime::parse(
        raw,
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    )
    .ok()
}
