//! Package include/exclude resolution.
//!
//! A specie's own lists always win over the common ones: an entry the specie
//! includes is dropped from the common exclusions and vice versa, then both
//! sides are merged. Output is sorted and deduplicated so the bootstrap
//! arguments are reproducible.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;
use serde_yaml::{Mapping, Value};

use crate::schema::Field;

/// Final package selection handed to the bootstrap tool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PackageSet {
    included: Vec<String>,
    excluded: Vec<String>,
}

impl PackageSet {
    pub fn included(&self) -> &[String] {
        &self.included
    }

    pub fn excluded(&self) -> &[String] {
        &self.excluded
    }

    /// Entries present in both lists.
    ///
    /// Only possible when a single layer both includes and excludes the same
    /// package; the resolver passes such entries through unchanged.
    pub fn conflicts(&self) -> Vec<String> {
        let excluded: BTreeSet<&String> = self.excluded.iter().collect();
        self.included
            .iter()
            .filter(|entry| excluded.contains(entry))
            .cloned()
            .collect()
    }

    /// `--include=` / `--exclude=` arguments for the bootstrap tool.
    pub fn bootstrap_args(&self) -> [String; 2] {
        [
            format!("--include={}", self.included.join(",")),
            format!("--exclude={}", self.excluded.join(",")),
        ]
    }

    pub fn to_mapping(&self) -> Mapping {
        let mut mapping = Mapping::new();
        mapping.insert(Field::Included.key().into(), string_seq(&self.included));
        mapping.insert(Field::Excluded.key().into(), string_seq(&self.excluded));
        mapping
    }
}

impl fmt::Display for PackageSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "included: {}", self.included.join(", "))?;
        write!(f, "excluded: {}", self.excluded.join(", "))
    }
}

/// Merge common and specie-level package lists.
pub fn resolve<CI, CE, SI, SE>(
    common_included: &[CI],
    common_excluded: &[CE],
    specie_included: &[SI],
    specie_excluded: &[SE],
) -> PackageSet
where
    CI: AsRef<str>,
    CE: AsRef<str>,
    SI: AsRef<str>,
    SE: AsRef<str>,
{
    let specie_included: BTreeSet<&str> = specie_included.iter().map(AsRef::as_ref).collect();
    let specie_excluded: BTreeSet<&str> = specie_excluded.iter().map(AsRef::as_ref).collect();

    let included = common_included
        .iter()
        .map(AsRef::as_ref)
        .filter(|entry| !specie_excluded.contains(entry))
        .chain(specie_included.iter().copied())
        .map(str::to_string)
        .collect::<BTreeSet<_>>();
    let excluded = common_excluded
        .iter()
        .map(AsRef::as_ref)
        .filter(|entry| !specie_included.contains(entry))
        .chain(specie_excluded.iter().copied())
        .map(str::to_string)
        .collect::<BTreeSet<_>>();

    PackageSet {
        included: included.into_iter().collect(),
        excluded: excluded.into_iter().collect(),
    }
}

fn string_seq(items: &[String]) -> Value {
    Value::Sequence(items.iter().cloned().map(Value::String).collect())
}
