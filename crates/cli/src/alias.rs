//! `tconf alias`: mutate and inspect the alias rules of a config.

use std::path::{Path, PathBuf};

use clap::{Args, Subcommand, ValueEnum};
use tradeconf_recon::model::{AliasLevel, AliasMutation, AliasOrigin};
use tradeconf_recon::wire::decode_alias_mutation;
use tradeconf_recon::AliasStore;

use crate::exit_codes::EXIT_MALFORMED;
use crate::{load_config, save_config, CliError};

#[derive(Subcommand)]
pub enum AliasCommands {
    /// Add an alias rule (fails if the exact rule already exists)
    #[command(after_help = "\
Examples:
  tconf alias add LIBOR3M SOFR index --config desk.recon.toml
  tconf alias add JPM 'JPMorgan Chase' counterparty --level counterparty -c desk.recon.toml
  tconf alias add --payload mutation.json -c desk.recon.toml")]
    Add {
        #[command(flatten)]
        rule: RuleArgs,

        /// Mark the rule as inferred rather than operator-provided
        #[arg(long)]
        inferred: bool,
    },

    /// Remove an alias rule (fails if no such rule exists)
    #[command(after_help = "\
Examples:
  tconf alias remove LIBOR3M SOFR index --config desk.recon.toml")]
    Remove {
        #[command(flatten)]
        rule: RuleArgs,
    },

    /// List alias rules in resolution order within each level
    List {
        /// Path to the .recon.toml config file
        #[arg(long, short = 'c', env = "TCONF_CONFIG")]
        config: PathBuf,

        /// Output JSON to stdout
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
pub struct RuleArgs {
    /// Value as it appears in the confirmation
    source: Option<String>,

    /// Booking-side value it stands for
    target: Option<String>,

    /// Field the rule applies to
    field: Option<String>,

    /// Scope of the rule
    #[arg(long, value_enum, default_value = "global")]
    level: LevelArg,

    /// Read the mutation from a JSON payload file instead of arguments
    #[arg(long, conflicts_with_all = ["source", "target", "field"])]
    payload: Option<PathBuf>,

    /// Path to the .recon.toml config file
    #[arg(long, short = 'c', env = "TCONF_CONFIG")]
    config: PathBuf,
}

#[derive(Clone, Copy, ValueEnum)]
enum LevelArg {
    Global,
    Counterparty,
}

impl From<LevelArg> for AliasLevel {
    fn from(level: LevelArg) -> Self {
        match level {
            LevelArg::Global => AliasLevel::Global,
            LevelArg::Counterparty => AliasLevel::Counterparty,
        }
    }
}

pub fn cmd_alias(cmd: AliasCommands) -> Result<(), CliError> {
    match cmd {
        AliasCommands::Add { rule, inferred } => cmd_alias_add(rule, inferred),
        AliasCommands::Remove { rule } => cmd_alias_remove(rule),
        AliasCommands::List { config, json } => cmd_alias_list(config, json),
    }
}

impl RuleArgs {
    fn mutation(&self) -> Result<AliasMutation, CliError> {
        if let Some(ref path) = self.payload {
            return read_payload(path);
        }
        match (&self.source, &self.target, &self.field) {
            (Some(source), Some(target), Some(field)) => Ok(AliasMutation::new(
                source.clone(),
                target.clone(),
                field.clone(),
                self.level.into(),
            )),
            _ => Err(CliError::usage("expected <SOURCE> <TARGET> <FIELD> or --payload")),
        }
    }
}

fn read_payload(path: &Path) -> Result<AliasMutation, CliError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| CliError::runtime(format!("cannot read {}: {e}", path.display())))?;
    let value: serde_json::Value = serde_json::from_str(&raw)
        .map_err(|e| CliError::new(EXIT_MALFORMED, format!("payload is not valid JSON: {e}")))?;
    Ok(decode_alias_mutation(&value)?)
}

fn cmd_alias_add(rule: RuleArgs, inferred: bool) -> Result<(), CliError> {
    let mutation = rule.mutation()?;
    let mut config = load_config(&rule.config)?;
    let mut store = AliasStore::from_config(&config)?;

    let origin = if inferred { AliasOrigin::Inferred } else { AliasOrigin::Provided };
    store.add_with_origin(&mutation, origin)?;
    log::debug!("{} now holds {} alias rule(s)", rule.config.display(), store.len());

    config.set_aliases(&store);
    save_config(&rule.config, &config)?;
    eprintln!(
        "added alias '{}' -> '{}' on '{}' ({})",
        mutation.source_name, mutation.target_name, mutation.on_field, mutation.level
    );
    Ok(())
}

fn cmd_alias_remove(rule: RuleArgs) -> Result<(), CliError> {
    let mutation = rule.mutation()?;
    let mut config = load_config(&rule.config)?;
    let mut store = AliasStore::from_config(&config)?;

    store.remove(&mutation)?;

    config.set_aliases(&store);
    save_config(&rule.config, &config)?;
    eprintln!(
        "removed alias '{}' -> '{}' on '{}' ({})",
        mutation.source_name, mutation.target_name, mutation.on_field, mutation.level
    );
    Ok(())
}

fn cmd_alias_list(config_path: PathBuf, json_output: bool) -> Result<(), CliError> {
    let config = load_config(&config_path)?;
    let store = AliasStore::from_config(&config)?;

    if json_output {
        let json_str = serde_json::to_string_pretty(store.rules())
            .map_err(|e| CliError::runtime(format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
        return Ok(());
    }

    if store.is_empty() {
        eprintln!("no alias rules in {}", config_path.display());
        return Ok(());
    }
    for rule in store.rules() {
        println!(
            "{:<13} {} -> {}  on [{}]",
            rule.level.to_string(),
            rule.source_name,
            rule.target_name,
            rule.on_field.iter().cloned().collect::<Vec<_>>().join(", "),
        );
    }
    Ok(())
}
