use crate::alias::{AliasStore, UsageTally};
use crate::classify::{classify_field, FieldOutcome};
use crate::model::{AliasRule, AllocationRecord, AllocationRequest, ClassCounts, FieldClassification};
use crate::validation::ValidationVerdict;

/// An allocation whose fields are classified but whose alias references are
/// still rule indices into the store of the running pass.
#[derive(Debug, Clone)]
pub struct PendingAllocation {
    fields: Vec<(String, FieldOutcome)>,
    validation: ValidationVerdict,
    verdicts_passed: usize,
}

/// Classify every field of one allocation, keeping input order.
pub fn classify_allocation(alloc: &AllocationRequest, store: &AliasStore) -> PendingAllocation {
    let mut verdicts_passed = 0;
    let fields = alloc
        .field_pairs
        .iter()
        .map(|pair| {
            if alloc.validation.passes(&pair.field_name) {
                verdicts_passed += 1;
            }
            let outcome = classify_field(pair, &alloc.validation, store);
            (pair.field_name.clone(), outcome)
        })
        .collect();

    PendingAllocation {
        fields,
        validation: alloc.validation.clone(),
        verdicts_passed,
    }
}

impl PendingAllocation {
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Fields whose validation verdict passed, whatever their class.
    pub fn verdicts_passed(&self) -> usize {
        self.verdicts_passed
    }

    /// Add this allocation's alias hits to a pass tally.
    pub fn tally(&self, tally: &mut UsageTally) {
        for idx in self.fields.iter().filter_map(|(_, outcome)| outcome.alias) {
            tally.hit(idx);
        }
    }

    /// Attach the published rules and produce the final record.
    pub fn finish(self, rules: &[AliasRule]) -> AllocationRecord {
        let fields = self
            .fields
            .into_iter()
            .map(|(field_name, outcome)| FieldClassification {
                field_name,
                class: outcome.class,
                applied_alias: outcome.alias.and_then(|i| rules.get(i).cloned()),
            })
            .collect();
        build_allocation(fields, self.validation)
    }
}

/// Group classified fields with the allocation's validation record.
pub fn build_allocation(
    fields: Vec<FieldClassification>,
    validation: ValidationVerdict,
) -> AllocationRecord {
    let mut counts = ClassCounts::default();
    for field in &fields {
        counts.record(field.class);
    }
    AllocationRecord {
        fields,
        validation,
        counts,
    }
}
