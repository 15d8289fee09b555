use std::fmt;

use crate::model::AliasLevel;

#[derive(Debug, Clone, PartialEq)]
pub enum ReconError {
    /// Add of a rule whose identity tuple already exists. Nothing was written.
    DuplicateRule {
        source_name: String,
        target_name: String,
        field: String,
        level: AliasLevel,
    },
    /// Remove of a rule that does not exist. Nothing was written.
    RuleNotFound {
        source_name: String,
        target_name: String,
        field: String,
        level: AliasLevel,
    },
    /// Request or payload missing a required attribute (or carrying one of the
    /// wrong shape). `context` locates the offending element.
    MalformedInput { context: String, reason: String },
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (empty alias field list, duplicate seed, etc.).
    ConfigValidation(String),
    /// IO error (file read, etc.).
    Io(String),
}

impl ReconError {
    pub fn malformed(context: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedInput {
            context: context.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateRule { source_name, target_name, field, level } => write!(
                f,
                "alias '{source_name}' -> '{target_name}' on '{field}' ({level}) already exists"
            ),
            Self::RuleNotFound { source_name, target_name, field, level } => write!(
                f,
                "alias '{source_name}' -> '{target_name}' on '{field}' ({level}) not found"
            ),
            Self::MalformedInput { context, reason } => {
                write!(f, "malformed input at {context}: {reason}")
            }
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}
