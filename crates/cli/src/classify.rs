//! `tconf classify`: one classification pass over a batch of files.

use std::path::PathBuf;

use tradeconf_recon::engine::{run, PassOptions};
use tradeconf_recon::model::{FileOutcome, PassOutput};
use tradeconf_recon::wire::decode_batch;
use tradeconf_recon::AliasStore;

use crate::exit_codes::{EXIT_MALFORMED, EXIT_REVIEW_REQUIRED};
use crate::{load_config, CliError};

pub fn cmd_classify(
    request_path: PathBuf,
    config_path: PathBuf,
    json_output: bool,
    output_file: Option<PathBuf>,
) -> Result<(), CliError> {
    let config = load_config(&config_path)?;
    let mut store = AliasStore::from_config(&config)?;

    let raw = std::fs::read_to_string(&request_path).map_err(|e| {
        CliError::runtime(format!("cannot read {}: {e}", request_path.display()))
    })?;
    let value: serde_json::Value = serde_json::from_str(&raw)
        .map_err(|e| {
            CliError::new(EXIT_MALFORMED, format!("request is not valid JSON: {e}"))
                .with_hint("expected {\"files\": [...]} or a bare array of file requests")
        })?;
    let batch = decode_batch(&value)?;
    log::debug!("decoded {} file request(s) from {}", batch.len(), request_path.display());

    let result = run(&mut store, &batch, &PassOptions::from_config(&config));

    let json_str = serde_json::to_string_pretty(&result)
        .map_err(|e| CliError::runtime(format!("JSON serialization error: {e}")))?;

    if let Some(ref path) = output_file {
        std::fs::write(path, &json_str)
            .map_err(|e| CliError::runtime(format!("cannot write output: {e}")))?;
        eprintln!("wrote {}", path.display());
    }

    if json_output {
        println!("{json_str}");
    }

    print_summary(&result);

    let s = &result.summary;
    if s.green == s.total_files {
        return Ok(());
    }
    Err(CliError::new(
        EXIT_REVIEW_REQUIRED,
        format!("{} of {} file(s) need review", s.total_files - s.green, s.total_files),
    ))
}

/// Human summary to stderr.
fn print_summary(result: &PassOutput) {
    for file in &result.files {
        match file {
            FileOutcome::Classified(f) => eprintln!(
                "  {:<8} {}  ({} green, {} yellow, {} red)",
                f.overall_status.to_string(),
                f.filename,
                f.summary.counts.green,
                f.summary.counts.yellow,
                f.summary.counts.red,
            ),
            FileOutcome::Rejected { filename, error } => eprintln!(
                "  {:<8} {}  ({})",
                "rejected",
                filename.as_deref().unwrap_or("<unnamed>"),
                error
            ),
        }
    }

    let s = &result.summary;
    eprintln!(
        "{} file(s): {} green, {} yellow, {} red, {} unknown, {} rejected",
        s.total_files, s.green, s.yellow, s.red, s.unknown, s.rejected
    );

    let used: Vec<_> = result.aliases.iter().filter(|a| a.used).collect();
    if !used.is_empty() {
        eprintln!("aliases applied:");
        for rule in used {
            eprintln!(
                "  {} -> {} ({}) x{}",
                rule.source_name, rule.target_name, rule.level, rule.count
            );
        }
    }
}
