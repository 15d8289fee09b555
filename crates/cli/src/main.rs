// tconf - trade-confirmation reconciliation CLI
// Classifies confirmation/booking field pairs and manages alias rules.

mod alias;
mod classify;
mod exit_codes;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tradeconf_recon::{ReconConfig, ReconError};

use exit_codes::{exit_code_for, EXIT_RUNTIME, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "tconf")]
#[command(about = "Reconcile trade confirmations against booking records (headless)")]
#[command(long_version = long_version())]
#[command(version)]
#[command(subcommand_required = false)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a batch of confirmation files against their booking values
    #[command(after_help = "\
Examples:
  tconf classify batch.json --config desk.recon.toml
  tconf classify batch.json --config desk.recon.toml --json
  tconf classify batch.json --config desk.recon.toml --output result.json")]
    Classify {
        /// Request JSON: {\"files\": [...]} or a bare array of file requests
        request: PathBuf,

        /// Path to the .recon.toml config holding the alias rules
        #[arg(long, short = 'c', env = "TCONF_CONFIG")]
        config: PathBuf,

        /// Output JSON to stdout instead of only the human summary
        #[arg(long)]
        json: bool,

        /// Write JSON output to file
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Add, remove or list alias rules in a config
    Alias {
        #[command(subcommand)]
        command: alias::AliasCommands,
    },

    /// Validate a config without classifying anything
    #[command(after_help = "\
Examples:
  tconf validate desk.recon.toml")]
    Validate {
        /// Path to the .recon.toml config file
        config: PathBuf,
    },
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("TCONF_COMMIT"), ")",
        "\nengine:  tradeconf-recon ", env!("CARGO_PKG_VERSION"),
        "\ntarget:  ", env!("TCONF_TARGET"),
    )
}

fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_env("TCONF_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    // Already initialized is fine (e.g. under a test harness).
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    let result = match cli.command {
        None => Err(CliError {
            code: EXIT_USAGE,
            message: "no command given".into(),
            hint: Some("run `tconf --help` for usage".into()),
        }),
        Some(Commands::Classify {
            request,
            config,
            json,
            output,
        }) => classify::cmd_classify(request, config, json, output),
        Some(Commands::Alias { command }) => alias::cmd_alias(command),
        Some(Commands::Validate { config }) => cmd_validate(config),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn usage(msg: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, msg)
    }

    pub fn runtime(msg: impl Into<String>) -> Self {
        Self::new(EXIT_RUNTIME, msg)
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<ReconError> for CliError {
    fn from(err: ReconError) -> Self {
        let hint = match &err {
            ReconError::DuplicateRule { .. } => {
                Some("list the current rules with `tconf alias list`".to_string())
            }
            ReconError::RuleNotFound { .. } => {
                Some("removal needs the exact source, target, field and level".to_string())
            }
            _ => None,
        };
        Self { code: exit_code_for(&err), message: err.to_string(), hint }
    }
}

/// Read and validate a config file.
pub fn load_config(path: &Path) -> Result<ReconConfig, CliError> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        CliError::from(ReconError::Io(format!("cannot read {}: {e}", path.display())))
    })?;
    Ok(ReconConfig::from_toml(&text)?)
}

/// Write a config back in place.
pub fn save_config(path: &Path, config: &ReconConfig) -> Result<(), CliError> {
    let text = config.to_toml()?;
    std::fs::write(path, text)
        .map_err(|e| CliError::runtime(format!("cannot write {}: {e}", path.display())))
}

// ============================================================================
// validate
// ============================================================================

fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = load_config(&config_path)?;
    eprintln!(
        "config ok: \"{}\" ({} alias rule(s), parallel={})",
        config.name,
        config.aliases.len(),
        config.classify.parallel
    );
    Ok(())
}
