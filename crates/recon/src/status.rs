use crate::model::{
    AliasHit, AllocationRecord, BatchSummary, ClassCounts, FieldClass, FileOutcome, FileStatus,
    FileSummary,
};

/// Roll every field of every allocation into one status. Worst case wins:
/// `red > yellow > green`; a file without fields is `unknown`.
pub fn overall_status(allocations: &[AllocationRecord]) -> FileStatus {
    let classes = allocations
        .iter()
        .flat_map(|a| a.fields.iter().map(|f| f.class));

    let mut status = FileStatus::Unknown;
    for class in classes {
        match class {
            FieldClass::Red => return FileStatus::Red,
            FieldClass::Yellow => status = FileStatus::Yellow,
            FieldClass::Green if status == FileStatus::Unknown => status = FileStatus::Green,
            FieldClass::Green => {}
        }
    }
    status
}

/// Summary statistics for one classified file.
pub fn summarize_file(
    allocations: &[AllocationRecord],
    verdicts_passed: usize,
    aliases_used: Vec<AliasHit>,
) -> FileSummary {
    let mut counts = ClassCounts::default();
    for alloc in allocations {
        counts.merge(&alloc.counts);
    }
    let fields = counts.total();
    let validation_pass_pct = if fields == 0 {
        None
    } else {
        Some(verdicts_passed as f64 * 100.0 / fields as f64)
    };

    FileSummary {
        allocations: allocations.len(),
        fields,
        counts,
        validation_pass_pct,
        aliases_used,
    }
}

/// Compute batch statistics from per-file outcomes.
pub fn summarize_batch(files: &[FileOutcome]) -> BatchSummary {
    let mut summary = BatchSummary {
        total_files: files.len(),
        ..BatchSummary::default()
    };

    for file in files {
        match file {
            FileOutcome::Classified(result) => match result.overall_status {
                FileStatus::Green => summary.green += 1,
                FileStatus::Yellow => summary.yellow += 1,
                FileStatus::Red => summary.red += 1,
                FileStatus::Unknown => summary.unknown += 1,
            },
            FileOutcome::Rejected { .. } => summary.rejected += 1,
        }
    }

    summary
}
