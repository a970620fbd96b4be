//! Field schema shared by every YAML parser in the crate.
//!
//! The species catalog, genome files and nest metadata all go through
//! [`fetch`] and its typed wrappers, so key names and type checks live in one
//! place.

use serde_yaml::{Mapping, Value};

use crate::error::{BreederError, Result};

/// Expected YAML shape of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// A YAML string.
    String,
    /// Any YAML scalar (string, number or bool), stringified on read.
    Scalar,
    /// A sequence of strings.
    StringList,
    /// A nested mapping.
    Mapping,
}

/// Every key the breeder reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Distribution,
    Architecture,
    Packages,
    Included,
    Excluded,
    Name,
    Version,
    Dependencies,
    External,
    Internal,
    Built,
    Specie,
}

impl Field {
    pub const fn key(self) -> &'static str {
        match self {
            Field::Distribution => "distribution",
            Field::Architecture => "architecture",
            Field::Packages => "packages",
            Field::Included => "included",
            Field::Excluded => "excluded",
            Field::Name => "name",
            Field::Version => "version",
            Field::Dependencies => "dependencies",
            Field::External => "external",
            Field::Internal => "internal",
            Field::Built => "built",
            Field::Specie => "specie",
        }
    }

    pub const fn kind(self) -> FieldKind {
        match self {
            Field::Distribution | Field::Architecture | Field::Built => FieldKind::String,
            Field::Name | Field::Version => FieldKind::Scalar,
            Field::Included | Field::Excluded | Field::External | Field::Internal => {
                FieldKind::StringList
            }
            Field::Packages | Field::Dependencies | Field::Specie => FieldKind::Mapping,
        }
    }
}

/// View `value` as a mapping, treating `null` as an empty one.
pub fn as_mapping<'a>(value: &'a Value, context: &str) -> Result<Option<&'a Mapping>> {
    match value {
        Value::Null => Ok(None),
        Value::Mapping(mapping) => Ok(Some(mapping)),
        other => Err(BreederError::config(
            context,
            format!("expected a mapping, found {}", describe(other)),
        )),
    }
}

/// Look up `field` and check it against its declared kind.
///
/// Absent keys and explicit `null` values both yield `None`.
pub fn fetch<'a>(mapping: &'a Mapping, field: Field, context: &str) -> Result<Option<&'a Value>> {
    let Some(value) = mapping.get(field.key()) else {
        return Ok(None);
    };
    if value.is_null() {
        return Ok(None);
    }

    let matches = match field.kind() {
        FieldKind::String => value.is_string(),
        FieldKind::Scalar => value.is_string() || value.is_number() || value.is_bool(),
        FieldKind::StringList => value
            .as_sequence()
            .is_some_and(|items| items.iter().all(Value::is_string)),
        FieldKind::Mapping => value.is_mapping(),
    };
    if !matches {
        return Err(BreederError::config(
            context,
            format!(
                "'{}' must be {}, found {}",
                field.key(),
                expected(field.kind()),
                describe(value)
            ),
        ));
    }
    Ok(Some(value))
}

pub fn optional_str(mapping: &Mapping, field: Field, context: &str) -> Result<Option<String>> {
    Ok(fetch(mapping, field, context)?.map(scalar_to_string))
}

pub fn required_str(mapping: &Mapping, field: Field, context: &str) -> Result<String> {
    optional_str(mapping, field, context)?
        .ok_or_else(|| BreederError::config(context, format!("missing '{}'", field.key())))
}

/// String list lookup; absent lists are empty.
pub fn string_list(mapping: &Mapping, field: Field, context: &str) -> Result<Vec<String>> {
    let Some(value) = fetch(mapping, field, context)? else {
        return Ok(Vec::new());
    };
    Ok(value
        .as_sequence()
        .map(|items| items.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default())
}

pub fn optional_mapping<'a>(
    mapping: &'a Mapping,
    field: Field,
    context: &str,
) -> Result<Option<&'a Mapping>> {
    Ok(fetch(mapping, field, context)?.and_then(Value::as_mapping))
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

fn expected(kind: FieldKind) -> &'static str {
    match kind {
        FieldKind::String => "a string",
        FieldKind::Scalar => "a scalar",
        FieldKind::StringList => "a list of strings",
        FieldKind::Mapping => "a mapping",
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a bool",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a list",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}
