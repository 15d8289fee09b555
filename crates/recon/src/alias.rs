//! Alias rules: storage, mutation and resolution.

use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockUpgradableReadGuard};

use crate::compare::{normalize, normalize_text};
use crate::config::ReconConfig;
use crate::error::ReconError;
use crate::model::{AliasLevel, AliasMutation, AliasOrigin, AliasRule, FieldValue};
use crate::validation::field_key;

/// Resolution order: more specific scope first.
const LEVEL_PRECEDENCE: [AliasLevel; 2] = [AliasLevel::Counterparty, AliasLevel::Global];

/// Identity of a rule for duplicate detection and removal.
#[derive(Debug, PartialEq, Eq)]
struct RuleIdentity {
    source: String,
    target: String,
    fields: BTreeSet<String>,
    level: AliasLevel,
}

impl RuleIdentity {
    fn of(rule: &AliasRule) -> Self {
        Self {
            source: normalize_text(&rule.source_name),
            target: normalize_text(&rule.target_name),
            fields: rule.on_field.clone(),
            level: rule.level,
        }
    }

    fn of_mutation(m: &AliasMutation) -> Self {
        Self {
            source: normalize_text(&m.source_name),
            target: normalize_text(&m.target_name),
            fields: BTreeSet::from([field_key(&m.on_field)]),
            level: m.level,
        }
    }
}

/// The ordered set of alias rules. Insertion order is significant: it breaks
/// ties between rules of the same level.
#[derive(Debug, Clone, Default)]
pub struct AliasStore {
    rules: Vec<AliasRule>,
}

impl AliasStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store from the `[[aliases]]` table of a config.
    pub fn from_config(config: &ReconConfig) -> Result<Self, ReconError> {
        let mut store = Self::new();
        for (i, seed) in config.aliases.iter().enumerate() {
            store
                .insert_rule(seed.to_rule())
                .map_err(|e| ReconError::ConfigValidation(format!("aliases[{i}]: {e}")))?;
        }
        Ok(store)
    }

    pub fn add(&mut self, mutation: &AliasMutation) -> Result<(), ReconError> {
        self.add_with_origin(mutation, AliasOrigin::Provided)
    }

    pub fn add_with_origin(
        &mut self,
        mutation: &AliasMutation,
        origin: AliasOrigin,
    ) -> Result<(), ReconError> {
        check_mutation(mutation)?;
        self.insert_rule(AliasRule {
            source_name: mutation.source_name.trim().to_string(),
            target_name: mutation.target_name.trim().to_string(),
            on_field: BTreeSet::from([mutation.on_field.clone()]),
            level: mutation.level,
            origin,
            used: false,
            count: 0,
        })
    }

    /// Insert a fully-formed rule. Field names are stored in key form and
    /// usage starts cleared.
    pub fn insert_rule(&mut self, mut rule: AliasRule) -> Result<(), ReconError> {
        rule.on_field = rule
            .on_field
            .iter()
            .map(|f| field_key(f))
            .filter(|f| !f.is_empty())
            .collect();
        if rule.source_name.trim().is_empty() {
            return Err(ReconError::malformed("alias", "source_name is empty"));
        }
        if rule.target_name.trim().is_empty() {
            return Err(ReconError::malformed("alias", "target_name is empty"));
        }
        if rule.on_field.is_empty() {
            return Err(ReconError::malformed("alias", "on_field is empty"));
        }

        let identity = RuleIdentity::of(&rule);
        if self.position(&identity).is_some() {
            return Err(ReconError::DuplicateRule {
                source_name: rule.source_name,
                target_name: rule.target_name,
                field: joined_fields(&identity.fields),
                level: rule.level,
            });
        }

        log::info!(
            "alias added: '{}' -> '{}' on [{}] ({})",
            rule.source_name,
            rule.target_name,
            joined_fields(&rule.on_field),
            rule.level
        );
        rule.used = false;
        rule.count = 0;
        self.rules.push(rule);
        Ok(())
    }

    /// Delete the rule matching the payload and hand it back.
    pub fn remove(&mut self, mutation: &AliasMutation) -> Result<AliasRule, ReconError> {
        check_mutation(mutation)?;
        let identity = RuleIdentity::of_mutation(mutation);
        let idx = self.position(&identity).ok_or_else(|| ReconError::RuleNotFound {
            source_name: mutation.source_name.clone(),
            target_name: mutation.target_name.clone(),
            field: mutation.on_field.clone(),
            level: mutation.level,
        })?;
        let removed = self.rules.remove(idx);
        log::info!(
            "alias removed: '{}' -> '{}' on [{}] ({})",
            removed.source_name,
            removed.target_name,
            joined_fields(&removed.on_field),
            removed.level
        );
        Ok(removed)
    }

    /// The rule that governs `value` on `field_name`, if any.
    ///
    /// Counterparty rules win over global ones; within a level the first
    /// added wins. An absent value never resolves.
    pub fn resolve(&self, field_name: &str, value: &FieldValue) -> Option<&AliasRule> {
        self.resolve_index(field_name, value).map(|i| &self.rules[i])
    }

    pub(crate) fn resolve_index(&self, field_name: &str, value: &FieldValue) -> Option<usize> {
        let key = field_key(field_name);
        let value = normalize(value)?;
        LEVEL_PRECEDENCE.iter().find_map(|level| {
            self.rules.iter().position(|r| {
                r.level == *level
                    && r.on_field.contains(&key)
                    && normalize_text(&r.source_name) == value
            })
        })
    }

    pub fn rules(&self) -> &[AliasRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Replace every rule's usage with the tally of one pass.
    pub(crate) fn publish_usage(&mut self, tally: &UsageTally) {
        for (i, rule) in self.rules.iter_mut().enumerate() {
            let hits = tally.hits(i);
            rule.used = hits > 0;
            rule.count = hits;
        }
    }

    fn position(&self, identity: &RuleIdentity) -> Option<usize> {
        self.rules.iter().position(|r| RuleIdentity::of(r) == *identity)
    }
}

fn check_mutation(m: &AliasMutation) -> Result<(), ReconError> {
    for (name, value) in [
        ("source_name", &m.source_name),
        ("target_name", &m.target_name),
        ("on_field", &m.on_field),
    ] {
        if value.trim().is_empty() {
            return Err(ReconError::malformed("alias mutation", format!("{name} is empty")));
        }
    }
    Ok(())
}

fn joined_fields(fields: &BTreeSet<String>) -> String {
    fields.iter().cloned().collect::<Vec<_>>().join(",")
}

// ---------------------------------------------------------------------------
// Usage accounting
// ---------------------------------------------------------------------------

/// Hits per rule index, accumulated over one pass and published at its end.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsageTally {
    hits: Vec<u32>,
}

impl UsageTally {
    pub fn for_store(store: &AliasStore) -> Self {
        Self {
            hits: vec![0; store.len()],
        }
    }

    pub fn hit(&mut self, rule_index: usize) {
        if rule_index >= self.hits.len() {
            self.hits.resize(rule_index + 1, 0);
        }
        self.hits[rule_index] += 1;
    }

    pub fn merge(&mut self, other: &UsageTally) {
        if other.hits.len() > self.hits.len() {
            self.hits.resize(other.hits.len(), 0);
        }
        for (mine, theirs) in self.hits.iter_mut().zip(&other.hits) {
            *mine += theirs;
        }
    }

    pub fn hits(&self, rule_index: usize) -> u32 {
        self.hits.get(rule_index).copied().unwrap_or(0)
    }
}

// ---------------------------------------------------------------------------
// Shared handle
// ---------------------------------------------------------------------------

/// Process-wide alias store handle.
///
/// Mutations take the write lock. A pass holds the upgradable read lock from
/// its first resolution until its usage is published, so passes serialize
/// against each other and never observe a half-applied mutation, while plain
/// readers (listing) proceed alongside.
#[derive(Debug, Clone, Default)]
pub struct SharedAliasStore {
    inner: Arc<RwLock<AliasStore>>,
}

impl SharedAliasStore {
    pub fn new(store: AliasStore) -> Self {
        Self {
            inner: Arc::new(RwLock::new(store)),
        }
    }

    pub fn add(&self, mutation: &AliasMutation) -> Result<(), ReconError> {
        self.inner.write().add(mutation)
    }

    pub fn remove(&self, mutation: &AliasMutation) -> Result<AliasRule, ReconError> {
        self.inner.write().remove(mutation)
    }

    pub fn rules(&self) -> Vec<AliasRule> {
        self.inner.read().rules().to_vec()
    }

    /// Run `evaluate` against the store, then publish its tally atomically.
    /// Returns the evaluation result and the rules as they stand after
    /// publishing.
    pub(crate) fn with_pass<R>(
        &self,
        evaluate: impl FnOnce(&AliasStore) -> (R, UsageTally),
    ) -> (R, Vec<AliasRule>) {
        let guard = self.inner.upgradable_read();
        let (result, tally) = evaluate(&*guard);
        let mut store = RwLockUpgradableReadGuard::upgrade(guard);
        store.publish_usage(&tally);
        (result, store.rules().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Scalar;

    fn val(s: &str) -> FieldValue {
        Some(Scalar::from(s))
    }

    fn libor() -> AliasMutation {
        AliasMutation::new("LIBOR3M", "SOFR", "index", AliasLevel::Global)
    }

    #[test]
    fn add_then_resolve() {
        let mut store = AliasStore::new();
        store.add(&libor()).unwrap();
        let rule = store.resolve("index", &val("libor3m ")).unwrap();
        assert_eq!(rule.target_name, "SOFR");
        assert!(store.resolve("benchmark", &val("LIBOR3M")).is_none());
        assert!(store.resolve("index", &None).is_none());
    }

    #[test]
    fn duplicate_add_rejected_without_mutation() {
        let mut store = AliasStore::new();
        store.add(&libor()).unwrap();
        let err = store.add(&libor()).unwrap_err();
        assert!(matches!(err, ReconError::DuplicateRule { .. }));
        assert_eq!(store.len(), 1);

        // Same rule under normalization is the same identity.
        let shouty = AliasMutation::new(" libor3m", "sofr", "Index", AliasLevel::Global);
        assert!(store.add(&shouty).is_err());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn same_tuple_at_other_level_is_distinct() {
        let mut store = AliasStore::new();
        store.add(&libor()).unwrap();
        let mut cp = libor();
        cp.level = AliasLevel::Counterparty;
        store.add(&cp).unwrap();
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn remove_missing_rule() {
        let mut store = AliasStore::new();
        let err = store.remove(&libor()).unwrap_err();
        assert!(matches!(err, ReconError::RuleNotFound { .. }));
    }

    #[test]
    fn remove_deletes_exact_rule() {
        let mut store = AliasStore::new();
        store.add(&libor()).unwrap();
        let removed = store.remove(&libor()).unwrap();
        assert_eq!(removed.source_name, "LIBOR3M");
        assert!(store.is_empty());
    }

    #[test]
    fn malformed_mutation_rejected_before_write() {
        let mut store = AliasStore::new();
        let bad = AliasMutation::new("  ", "SOFR", "index", AliasLevel::Global);
        assert!(matches!(store.add(&bad), Err(ReconError::MalformedInput { .. })));
        let bad_field = AliasMutation::new("LIBOR3M", "SOFR", "", AliasLevel::Global);
        assert!(matches!(store.add(&bad_field), Err(ReconError::MalformedInput { .. })));
        assert!(store.is_empty());
    }

    #[test]
    fn counterparty_beats_global() {
        let mut store = AliasStore::new();
        store
            .add(&AliasMutation::new("GS", "Goldman Sachs", "counterparty", AliasLevel::Global))
            .unwrap();
        store
            .add(&AliasMutation::new(
                "GS",
                "Goldman Sachs International",
                "counterparty",
                AliasLevel::Counterparty,
            ))
            .unwrap();
        let rule = store.resolve("counterparty", &val("GS")).unwrap();
        assert_eq!(rule.level, AliasLevel::Counterparty);
        assert_eq!(rule.target_name, "Goldman Sachs International");
    }

    #[test]
    fn first_added_wins_within_level() {
        let mut store = AliasStore::new();
        store
            .add(&AliasMutation::new("75bps", "0.0075", "spread", AliasLevel::Global))
            .unwrap();
        store
            .add(&AliasMutation::new("75BPS", "0.75", "spread", AliasLevel::Global))
            .unwrap();
        let rule = store.resolve("spread", &val("75bps")).unwrap();
        assert_eq!(rule.target_name, "0.0075");
    }

    #[test]
    fn multi_field_seed_rule() {
        let mut store = AliasStore::new();
        store
            .insert_rule(AliasRule {
                source_name: "£".into(),
                target_name: "GBP".into(),
                on_field: BTreeSet::from(["Swap Ccy".to_string(), "settlement-currency".to_string()]),
                level: AliasLevel::Global,
                origin: AliasOrigin::Inferred,
                used: true,
                count: 9,
            })
            .unwrap();
        let rule = &store.rules()[0];
        assert!(!rule.used);
        assert_eq!(rule.count, 0);
        assert!(store.resolve("swap_ccy", &val("£")).is_some());
        assert!(store.resolve("settlement currency", &val("£")).is_some());
    }

    #[test]
    fn publish_replaces_usage() {
        let mut store = AliasStore::new();
        store.add(&libor()).unwrap();
        let mut tally = UsageTally::for_store(&store);
        tally.hit(0);
        tally.hit(0);
        store.publish_usage(&tally);
        assert_eq!(store.rules()[0].count, 2);
        assert!(store.rules()[0].used);

        store.publish_usage(&UsageTally::for_store(&store));
        assert_eq!(store.rules()[0].count, 0);
        assert!(!store.rules()[0].used);
    }

    #[test]
    fn tally_merge_sums() {
        let mut a = UsageTally::default();
        a.hit(0);
        let mut b = UsageTally::default();
        b.hit(0);
        b.hit(2);
        a.merge(&b);
        assert_eq!(a.hits(0), 2);
        assert_eq!(a.hits(1), 0);
        assert_eq!(a.hits(2), 1);
    }

    #[test]
    fn shared_store_mutations_visible_to_readers() {
        let shared = SharedAliasStore::new(AliasStore::new());
        shared.add(&libor()).unwrap();
        assert_eq!(shared.rules().len(), 1);
        shared.remove(&libor()).unwrap();
        assert!(shared.rules().is_empty());
    }
}
