//! CLI Exit Code Registry
//!
//! Single source of truth for `tconf` exit codes. Scripts rely on them.
//!
//! | Code | Meaning                                              |
//! |------|------------------------------------------------------|
//! | 0    | Success (classify: every file green)                 |
//! | 1    | Review required (some file red, yellow or unknown)   |
//! | 2    | CLI usage error (bad args)                           |
//! | 3    | Malformed request or alias payload                   |
//! | 4    | Invalid config                                       |
//! | 5    | Runtime / IO error                                   |
//! | 6    | Alias add: rule already exists                       |
//! | 7    | Alias remove: rule not found                         |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into `exit_code_for` or the relevant command

use tradeconf_recon::ReconError;

/// Success - command completed; for `classify`, every file is green.
pub const EXIT_SUCCESS: u8 = 0;

/// At least one file needs review (red, yellow, unknown or rejected).
/// Like `diff(1)`, exit 1 means "not clean."
pub const EXIT_REVIEW_REQUIRED: u8 = 1;

/// Usage error - bad arguments. clap exits with this itself.
pub const EXIT_USAGE: u8 = 2;

/// Request JSON or alias payload is missing attributes or has the wrong shape.
pub const EXIT_MALFORMED: u8 = 3;

/// Config failed to parse or validate.
pub const EXIT_INVALID_CONFIG: u8 = 4;

/// Cannot read/write files, serialize output, etc.
pub const EXIT_RUNTIME: u8 = 5;

/// `alias add` of a rule whose tuple already exists.
pub const EXIT_ALIAS_DUPLICATE: u8 = 6;

/// `alias remove` of a rule that does not exist.
pub const EXIT_ALIAS_NOT_FOUND: u8 = 7;

/// Map an engine error to its exit code.
pub fn exit_code_for(err: &ReconError) -> u8 {
    match err {
        ReconError::DuplicateRule { .. } => EXIT_ALIAS_DUPLICATE,
        ReconError::RuleNotFound { .. } => EXIT_ALIAS_NOT_FOUND,
        ReconError::MalformedInput { .. } => EXIT_MALFORMED,
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => EXIT_INVALID_CONFIG,
        ReconError::Io(_) => EXIT_RUNTIME,
    }
}
