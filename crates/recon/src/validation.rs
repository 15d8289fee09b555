use std::collections::BTreeMap;

use serde::Serialize;

/// Canonical key for a field name: lower-case, with every run of spaces,
/// hyphens and underscores collapsed into a single `_`.
///
/// `"Strike Date"`, `"strike-date"` and `"strike__date"` all map to
/// `"strike_date"`.
pub fn field_key(name: &str) -> String {
    name.split(|c: char| c == ' ' || c == '-' || c == '_' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(|part| part.to_lowercase())
        .collect::<Vec<_>>()
        .join("_")
}

/// Business-rule verdicts for one allocation, computed upstream.
///
/// Lookups of a field with no verdict fail closed: a missing rule must never
/// read as a passing one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationVerdict {
    verdicts: BTreeMap<String, bool>,
}

impl ValidationVerdict {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a verdict. Names that normalize to the same key pass only if
    /// every one of them passes, whatever order they arrive in.
    pub fn insert(&mut self, field_name: &str, passed: bool) {
        self.verdicts
            .entry(field_key(field_name))
            .and_modify(|v| *v &= passed)
            .or_insert(passed);
    }

    pub fn passes(&self, field_name: &str) -> bool {
        self.verdicts
            .get(&field_key(field_name))
            .copied()
            .unwrap_or(false)
    }
}

impl<K: AsRef<str>> FromIterator<(K, bool)> for ValidationVerdict {
    fn from_iter<I: IntoIterator<Item = (K, bool)>>(iter: I) -> Self {
        let mut verdict = Self::new();
        for (field, passed) in iter {
            verdict.insert(field.as_ref(), passed);
        }
        verdict
    }
}
