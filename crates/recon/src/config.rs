use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::alias::AliasStore;
use crate::error::ReconError;
use crate::model::{AliasLevel, AliasOrigin, AliasRule};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReconConfig {
    pub name: String,
    #[serde(default)]
    pub classify: ClassifyConfig,
    #[serde(default)]
    pub aliases: Vec<AliasSeed>,
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClassifyConfig {
    /// Classify the files of a batch on the rayon pool.
    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

impl Default for ClassifyConfig {
    fn default() -> Self {
        Self {
            parallel: default_parallel(),
        }
    }
}

fn default_parallel() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Alias seeds
// ---------------------------------------------------------------------------

/// One `[[aliases]]` entry.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AliasSeed {
    pub source_name: String,
    pub target_name: String,
    pub on_field: Vec<String>,
    pub level: AliasLevel,
    #[serde(default)]
    pub origin: AliasOrigin,
}

impl AliasSeed {
    pub fn to_rule(&self) -> AliasRule {
        AliasRule {
            source_name: self.source_name.trim().to_string(),
            target_name: self.target_name.trim().to_string(),
            on_field: self.on_field.iter().cloned().collect::<BTreeSet<_>>(),
            level: self.level,
            origin: self.origin,
            used: false,
            count: 0,
        }
    }
}

impl From<&AliasRule> for AliasSeed {
    fn from(rule: &AliasRule) -> Self {
        Self {
            source_name: rule.source_name.clone(),
            target_name: rule.target_name.clone(),
            on_field: rule.on_field.iter().cloned().collect(),
            level: rule.level,
            origin: rule.origin,
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            classify: ClassifyConfig::default(),
            aliases: Vec::new(),
        }
    }

    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ReconError> {
        toml::to_string_pretty(self).map_err(|e| ReconError::ConfigParse(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.name.trim().is_empty() {
            return Err(ReconError::ConfigValidation("name must not be empty".into()));
        }

        for (i, seed) in self.aliases.iter().enumerate() {
            if seed.on_field.is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "aliases[{i}]: on_field must list at least one field"
                )));
            }
            if seed.on_field.iter().any(|f| f.trim().is_empty()) {
                return Err(ReconError::ConfigValidation(format!(
                    "aliases[{i}]: on_field contains an empty field name"
                )));
            }
        }

        // Seeding reports empty names and duplicate identity tuples.
        AliasStore::from_config(self).map(|_| ())
    }

    /// Replace the alias list with the store's current rules, in order.
    pub fn set_aliases(&mut self, store: &AliasStore) {
        self.aliases = store.rules().iter().map(AliasSeed::from).collect();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AliasMutation;

    const VALID: &str = r#"
name = "Desk A swaps"

[classify]
parallel = false

[[aliases]]
source_name = "LIBOR3M"
target_name = "SOFR"
on_field = ["index"]
level = "global"

[[aliases]]
source_name = "GS Trading"
target_name = "Goldman Sachs"
on_field = ["counterparty"]
level = "counterparty"
origin = "inferred"
"#;

    #[test]
    fn parse_valid() {
        let config = ReconConfig::from_toml(VALID).unwrap();
        assert_eq!(config.name, "Desk A swaps");
        assert!(!config.classify.parallel);
        assert_eq!(config.aliases.len(), 2);
        assert_eq!(config.aliases[0].origin, AliasOrigin::Provided);
        assert_eq!(config.aliases[1].level, AliasLevel::Counterparty);
        assert_eq!(config.aliases[1].origin, AliasOrigin::Inferred);
    }

    #[test]
    fn defaults_when_sections_missing() {
        let config = ReconConfig::from_toml("name = \"bare\"").unwrap();
        assert!(config.classify.parallel);
        assert!(config.aliases.is_empty());
    }

    #[test]
    fn reject_empty_on_field() {
        let input = r#"
name = "Bad"

[[aliases]]
source_name = "a"
target_name = "b"
on_field = []
level = "global"
"#;
        let err = ReconConfig::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("aliases[0]"));
    }

    #[test]
    fn reject_duplicate_seed() {
        let input = r#"
name = "Bad"

[[aliases]]
source_name = "LIBOR3M"
target_name = "SOFR"
on_field = ["index"]
level = "global"

[[aliases]]
source_name = "libor3m"
target_name = "sofr"
on_field = ["index"]
level = "global"
"#;
        let err = ReconConfig::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("aliases[1]"));
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn reject_unknown_level() {
        let input = r#"
name = "Bad"

[[aliases]]
source_name = "a"
target_name = "b"
on_field = ["index"]
level = "desk"
"#;
        assert!(matches!(
            ReconConfig::from_toml(input),
            Err(ReconError::ConfigParse(_))
        ));
    }

    #[test]
    fn write_back_round_trips_rules() {
        let mut config = ReconConfig::from_toml(VALID).unwrap();
        let mut store = AliasStore::from_config(&config).unwrap();
        store
            .add(&AliasMutation::new("£", "GBP", "swap ccy", AliasLevel::Global))
            .unwrap();
        config.set_aliases(&store);

        let reparsed = ReconConfig::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(reparsed.aliases.len(), 3);
        assert_eq!(reparsed.aliases[2].on_field, vec!["swap_ccy".to_string()]);
        assert!(!reparsed.classify.parallel);
    }
}
