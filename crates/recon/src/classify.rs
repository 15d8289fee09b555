use crate::alias::AliasStore;
use crate::compare::equal;
use crate::model::{FieldClass, FieldPair};
use crate::validation::ValidationVerdict;

/// Class of one field plus the index of the rule that governed it, if any.
///
/// The index refers to the store the field was classified against; the rule
/// itself is attached once the pass has published usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldOutcome {
    pub class: FieldClass,
    pub alias: Option<usize>,
}

/// Classify one field pair. First matching rule wins:
///
/// 1. an alias resolves for the confirmation value → `Yellow`, even when the
///    raw values already agree;
/// 2. values are equal and the field's verdict passes → `Green`;
/// 3. otherwise → `Red`.
pub fn classify_field(
    pair: &FieldPair,
    validation: &ValidationVerdict,
    store: &AliasStore,
) -> FieldOutcome {
    if let Some(idx) = store.resolve_index(&pair.field_name, &pair.confirmation_value) {
        return FieldOutcome {
            class: FieldClass::Yellow,
            alias: Some(idx),
        };
    }

    let class = if equal(&pair.confirmation_value, &pair.booking_value)
        && validation.passes(&pair.field_name)
    {
        FieldClass::Green
    } else {
        FieldClass::Red
    };

    FieldOutcome { class, alias: None }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AliasLevel, AliasMutation, FieldValue, Scalar};

    fn s(v: &str) -> FieldValue {
        Some(Scalar::from(v))
    }

    fn passing(field: &str) -> ValidationVerdict {
        [(field, true)].into_iter().collect()
    }

    fn libor_store() -> AliasStore {
        let mut store = AliasStore::new();
        store
            .add(&AliasMutation::new("LIBOR3M", "SOFR", "index", AliasLevel::Global))
            .unwrap();
        store
    }

    #[test]
    fn numeric_forms_match_green() {
        let pair = FieldPair::new("units", s("100"), Some(Scalar::Number(100.0)));
        let out = classify_field(&pair, &passing("units"), &AliasStore::new());
        assert_eq!(out.class, FieldClass::Green);
        assert_eq!(out.alias, None);

        let pair = FieldPair::new("units", Some(Scalar::Number(100.0)), s("100.0"));
        let out = classify_field(&pair, &passing("units"), &AliasStore::new());
        assert_eq!(out.class, FieldClass::Green);
    }

    #[test]
    fn case_insensitive_match_green() {
        let pair = FieldPair::new("counterparty", s("ACME Corp"), s("ACME CORP"));
        let out = classify_field(&pair, &passing("counterparty"), &AliasStore::new());
        assert_eq!(out.class, FieldClass::Green);
    }

    #[test]
    fn equal_but_failing_validation_is_red() {
        let pair = FieldPair::new("direction", s("long"), s("long"));
        let verdict: ValidationVerdict = [("direction", false)].into_iter().collect();
        let out = classify_field(&pair, &verdict, &AliasStore::new());
        assert_eq!(out.class, FieldClass::Red);
    }

    #[test]
    fn missing_verdict_is_red() {
        let pair = FieldPair::new("lookback", s("5d"), s("5d"));
        let out = classify_field(&pair, &ValidationVerdict::new(), &AliasStore::new());
        assert_eq!(out.class, FieldClass::Red);
    }

    #[test]
    fn mismatch_is_red() {
        let pair = FieldPair::new("index", s("LIBOR3M"), s("SOFR"));
        let out = classify_field(&pair, &passing("index"), &AliasStore::new());
        assert_eq!(out.class, FieldClass::Red);
    }

    #[test]
    fn alias_is_yellow() {
        let pair = FieldPair::new("index", s("LIBOR3M"), s("SOFR"));
        let out = classify_field(&pair, &passing("index"), &libor_store());
        assert_eq!(out.class, FieldClass::Yellow);
        assert_eq!(out.alias, Some(0));
    }

    #[test]
    fn alias_wins_over_raw_match_and_failed_verdict() {
        let mut store = AliasStore::new();
        store
            .add(&AliasMutation::new("USD", "USD", "swap_ccy", AliasLevel::Global))
            .unwrap();
        let pair = FieldPair::new("swap ccy", s("usd"), s("USD"));
        let out = classify_field(&pair, &ValidationVerdict::new(), &store);
        assert_eq!(out.class, FieldClass::Yellow);
    }

    #[test]
    fn both_null_passing_is_green() {
        let pair = FieldPair::new("benchmark", None, None);
        let out = classify_field(&pair, &passing("benchmark"), &AliasStore::new());
        assert_eq!(out.class, FieldClass::Green);
    }

    #[test]
    fn null_against_value_is_red() {
        let pair = FieldPair::new("benchmark", None, s("SOFR"));
        let out = classify_field(&pair, &passing("benchmark"), &libor_store());
        assert_eq!(out.class, FieldClass::Red);
    }
}
