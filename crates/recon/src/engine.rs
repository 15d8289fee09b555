use rayon::prelude::*;

use crate::aggregate::{classify_allocation, PendingAllocation};
use crate::alias::{AliasStore, SharedAliasStore, UsageTally};
use crate::config::ReconConfig;
use crate::model::{AliasHit, AliasRule, FileOutcome, FileRequest, FileResult, PassMeta, PassOutput};
use crate::status::{overall_status, summarize_batch, summarize_file};

pub use crate::model::BatchItem;

#[derive(Debug, Clone)]
pub struct PassOptions {
    pub parallel: bool,
    pub config_name: Option<String>,
}

impl Default for PassOptions {
    fn default() -> Self {
        Self {
            parallel: true,
            config_name: None,
        }
    }
}

impl PassOptions {
    pub fn from_config(config: &ReconConfig) -> Self {
        Self {
            parallel: config.classify.parallel,
            config_name: Some(config.name.clone()),
        }
    }
}

/// Run a classification pass against a caller-owned store.
///
/// Usage on every rule is reset and recomputed from this batch alone.
pub fn run(store: &mut AliasStore, batch: &[BatchItem], options: &PassOptions) -> PassOutput {
    let (pending, tally) = evaluate(store, batch, options.parallel);
    store.publish_usage(&tally);
    assemble(pending, store.rules().to_vec(), options)
}

/// Run a pass over already-decoded requests.
pub fn run_files(store: &mut AliasStore, files: Vec<FileRequest>, options: &PassOptions) -> PassOutput {
    let batch: Vec<BatchItem> = files.into_iter().map(Ok).collect();
    run(store, &batch, options)
}

/// Run a classification pass against the shared store. Concurrent passes
/// serialize; alias mutations wait until this pass has published its usage.
pub fn run_shared(store: &SharedAliasStore, batch: &[BatchItem], options: &PassOptions) -> PassOutput {
    let (pending, rules) = store.with_pass(|s| evaluate(s, batch, options.parallel));
    assemble(pending, rules, options)
}

// ---------------------------------------------------------------------------
// Pass internals
// ---------------------------------------------------------------------------

struct PendingFile {
    filename: String,
    allocations: Vec<PendingAllocation>,
    tally: UsageTally,
    verdicts_passed: usize,
}

fn classify_file(request: &FileRequest, store: &AliasStore) -> PendingFile {
    let mut tally = UsageTally::for_store(store);
    let mut verdicts_passed = 0;
    let allocations: Vec<PendingAllocation> = request
        .allocations
        .iter()
        .map(|alloc| {
            let pending = classify_allocation(alloc, store);
            pending.tally(&mut tally);
            verdicts_passed += pending.verdicts_passed();
            pending
        })
        .collect();

    log::debug!(
        "classified '{}': {} allocation(s), {} field(s)",
        request.filename,
        allocations.len(),
        allocations.iter().map(|a| a.field_count()).sum::<usize>()
    );

    PendingFile {
        filename: request.filename.clone(),
        allocations,
        tally,
        verdicts_passed,
    }
}

/// A classified file still waiting for published usage, or a finished rejection.
type PendingOutcome = Result<PendingFile, FileOutcome>;

fn evaluate(
    store: &AliasStore,
    batch: &[BatchItem],
    parallel: bool,
) -> (Vec<PendingOutcome>, UsageTally) {
    let one = |item: &BatchItem| -> PendingOutcome {
        match item {
            Ok(request) => Ok(classify_file(request, store)),
            Err(rejected) => {
                log::warn!(
                    "rejected file '{}': {}",
                    rejected.filename.as_deref().unwrap_or("<unnamed>"),
                    rejected.error
                );
                Err(FileOutcome::Rejected {
                    filename: rejected.filename.clone(),
                    error: rejected.error.to_string(),
                })
            }
        }
    };

    let pending: Vec<PendingOutcome> = if parallel {
        batch.par_iter().map(one).collect()
    } else {
        batch.iter().map(one).collect()
    };

    let mut tally = UsageTally::for_store(store);
    for file in pending.iter().flatten() {
        tally.merge(&file.tally);
    }
    (pending, tally)
}

fn assemble(pending: Vec<PendingOutcome>, rules: Vec<AliasRule>, options: &PassOptions) -> PassOutput {
    let files: Vec<FileOutcome> = pending
        .into_iter()
        .map(|outcome| match outcome {
            Ok(file) => FileOutcome::Classified(finish_file(file, &rules)),
            Err(rejected) => rejected,
        })
        .collect();

    let summary = summarize_batch(&files);
    log::info!(
        "pass complete: {} file(s), {} green, {} yellow, {} red, {} unknown, {} rejected",
        summary.total_files,
        summary.green,
        summary.yellow,
        summary.red,
        summary.unknown,
        summary.rejected
    );

    PassOutput {
        meta: PassMeta {
            config_name: options.config_name.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        summary,
        files,
        aliases: rules,
    }
}

fn finish_file(file: PendingFile, rules: &[AliasRule]) -> FileResult {
    let aliases_used: Vec<AliasHit> = rules
        .iter()
        .enumerate()
        .filter_map(|(i, rule)| {
            let count = file.tally.hits(i);
            (count > 0).then(|| AliasHit {
                source_name: rule.source_name.clone(),
                target_name: rule.target_name.clone(),
                level: rule.level,
                count,
            })
        })
        .collect();

    let allocations: Vec<_> = file
        .allocations
        .into_iter()
        .map(|a| a.finish(rules))
        .collect();

    FileResult {
        filename: file.filename,
        overall_status: overall_status(&allocations),
        summary: summarize_file(&allocations, file.verdicts_passed, aliases_used),
        allocations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReconError;
    use crate::model::{
        AliasLevel, AliasMutation, AllocationRequest, FieldClass, FieldPair, FileStatus,
        RejectedFile, Scalar,
    };

    fn s(v: &str) -> Option<Scalar> {
        Some(Scalar::from(v))
    }

    fn index_file(name: &str) -> FileRequest {
        FileRequest {
            filename: name.into(),
            allocations: vec![AllocationRequest {
                field_pairs: vec![FieldPair::new("index", s("LIBOR3M"), s("SOFR"))],
                validation: [("index", true)].into_iter().collect(),
            }],
        }
    }

    fn libor() -> AliasMutation {
        AliasMutation::new("LIBOR3M", "SOFR", "index", AliasLevel::Global)
    }

    fn sequential() -> PassOptions {
        PassOptions {
            parallel: false,
            config_name: None,
        }
    }

    fn only_file(out: &PassOutput) -> &FileResult {
        out.files[0].as_classified().unwrap()
    }

    #[test]
    fn alias_pass_then_removal() {
        let mut store = AliasStore::new();
        store.add(&libor()).unwrap();

        let out = run_files(&mut store, vec![index_file("a.pdf")], &sequential());
        let field = &only_file(&out).allocations[0].fields[0];
        assert_eq!(field.class, FieldClass::Yellow);
        assert_eq!(field.applied_alias.as_ref().unwrap().count, 1);
        assert!(field.applied_alias.as_ref().unwrap().used);
        assert_eq!(only_file(&out).overall_status, FileStatus::Yellow);

        store.remove(&libor()).unwrap();
        let out = run_files(&mut store, vec![index_file("a.pdf")], &sequential());
        let field = &only_file(&out).allocations[0].fields[0];
        assert_eq!(field.class, FieldClass::Red);
        assert!(field.applied_alias.is_none());
    }

    #[test]
    fn usage_is_recomputed_not_accumulated() {
        let mut store = AliasStore::new();
        store.add(&libor()).unwrap();
        let files = || vec![index_file("a.pdf"), index_file("b.pdf")];

        run_files(&mut store, files(), &sequential());
        assert_eq!(store.rules()[0].count, 2);
        run_files(&mut store, files(), &sequential());
        assert_eq!(store.rules()[0].count, 2);

        run_files(&mut store, Vec::new(), &sequential());
        assert_eq!(store.rules()[0].count, 0);
        assert!(!store.rules()[0].used);
    }

    #[test]
    fn per_file_alias_hits() {
        let mut store = AliasStore::new();
        store.add(&libor()).unwrap();
        let out = run_files(&mut store, vec![index_file("a.pdf"), index_file("b.pdf")], &sequential());
        for file in out.files.iter().filter_map(FileOutcome::as_classified) {
            assert_eq!(file.summary.aliases_used.len(), 1);
            assert_eq!(file.summary.aliases_used[0].count, 1);
        }
        assert_eq!(out.aliases[0].count, 2);
    }

    #[test]
    fn rejected_file_does_not_block_others() {
        let mut store = AliasStore::new();
        store.add(&libor()).unwrap();
        let batch: Vec<BatchItem> = vec![
            Ok(index_file("a.pdf")),
            Err(ReconError::malformed("files[1]", "missing 'filename'").into()),
            Ok(index_file("c.pdf")),
        ];
        let out = run(&mut store, &batch, &PassOptions::default());
        assert_eq!(out.summary.total_files, 3);
        assert_eq!(out.summary.rejected, 1);
        assert_eq!(out.summary.yellow, 2);
        assert!(matches!(out.files[1], FileOutcome::Rejected { filename: None, .. }));
        assert_eq!(store.rules()[0].count, 2);
    }

    #[test]
    fn rejected_file_keeps_its_name() {
        let batch: Vec<BatchItem> = vec![Err(RejectedFile {
            filename: Some("broken.pdf".into()),
            error: ReconError::malformed("files[0]", "missing 'booking_value'"),
        })];
        let out = run(&mut AliasStore::new(), &batch, &sequential());
        match &out.files[0] {
            FileOutcome::Rejected { filename, error } => {
                assert_eq!(filename.as_deref(), Some("broken.pdf"));
                assert!(error.contains("booking_value"), "{error}");
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn parallel_matches_sequential() {
        let files: Vec<_> = (0..16).map(|i| index_file(&format!("f{i}.pdf"))).collect();
        let mut a = AliasStore::new();
        a.add(&libor()).unwrap();
        let mut b = a.clone();

        let seq = run_files(&mut a, files.clone(), &sequential());
        let par = run_files(&mut b, files, &PassOptions::default());
        assert_eq!(seq.files, par.files);
        assert_eq!(seq.aliases, par.aliases);
    }

    #[test]
    fn shared_pass_publishes_usage() {
        let shared = SharedAliasStore::new(AliasStore::new());
        shared.add(&libor()).unwrap();
        let batch = vec![Ok(index_file("a.pdf"))];
        let out = run_shared(&shared, &batch, &sequential());
        assert_eq!(out.aliases[0].count, 1);
        assert_eq!(shared.rules()[0].count, 1);
    }

    #[test]
    fn meta_carries_config_name() {
        let config = ReconConfig::new("desk");
        let out = run_files(&mut AliasStore::new(), Vec::new(), &PassOptions::from_config(&config));
        assert_eq!(out.meta.config_name.as_deref(), Some("desk"));
        assert_eq!(out.summary.total_files, 0);
    }
}
