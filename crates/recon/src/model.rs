use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::ReconError;
use crate::validation::ValidationVerdict;

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

/// A single extracted or booked value. Absence is modelled as `None` on
/// [`FieldValue`], never as a variant here.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Number(f64),
    String(String),
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

pub type FieldValue = Option<Scalar>;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// One compared field of an allocation: the value read from the confirmation
/// document and the value held in the booking record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldPair {
    pub field_name: String,
    pub confirmation_value: FieldValue,
    pub booking_value: FieldValue,
}

impl FieldPair {
    pub fn new(
        field_name: impl Into<String>,
        confirmation_value: FieldValue,
        booking_value: FieldValue,
    ) -> Self {
        Self {
            field_name: field_name.into(),
            confirmation_value,
            booking_value,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AllocationRequest {
    pub field_pairs: Vec<FieldPair>,
    pub validation: ValidationVerdict,
}

/// Everything the core needs to classify one confirmation file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileRequest {
    pub filename: String,
    pub allocations: Vec<AllocationRequest>,
}

/// A file request that failed to decode. `filename` is kept whenever the
/// request carried a readable one, so callers know which file to fix.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedFile {
    pub filename: Option<String>,
    pub error: ReconError,
}

impl From<ReconError> for RejectedFile {
    fn from(error: ReconError) -> Self {
        Self {
            filename: None,
            error,
        }
    }
}

/// One batch entry: a decoded file request, or the reason it was rejected.
pub type BatchItem = Result<FileRequest, RejectedFile>;

// ---------------------------------------------------------------------------
// Aliases
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AliasLevel {
    Global,
    Counterparty,
}

impl AliasLevel {
    /// Case-insensitive parse of the wire form.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "global" => Some(Self::Global),
            "counterparty" => Some(Self::Counterparty),
            _ => None,
        }
    }
}

impl std::fmt::Display for AliasLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Global => write!(f, "global"),
            Self::Counterparty => write!(f, "counterparty"),
        }
    }
}

/// Where a rule came from. Informational only; resolution ignores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AliasOrigin {
    #[default]
    Provided,
    Inferred,
}

/// A substitution mapping a confirmation-side value to its booking-side
/// equivalent on a set of fields.
///
/// `used` and `count` describe the most recent classification pass only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AliasRule {
    pub source_name: String,
    pub target_name: String,
    pub on_field: BTreeSet<String>,
    pub level: AliasLevel,
    pub origin: AliasOrigin,
    pub used: bool,
    pub count: u32,
}

/// Payload shared by alias add and remove.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AliasMutation {
    pub source_name: String,
    pub target_name: String,
    pub on_field: String,
    pub level: AliasLevel,
}

impl AliasMutation {
    pub fn new(
        source_name: impl Into<String>,
        target_name: impl Into<String>,
        on_field: impl Into<String>,
        level: AliasLevel,
    ) -> Self {
        Self {
            source_name: source_name.into(),
            target_name: target_name.into(),
            on_field: on_field.into(),
            level,
        }
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldClass {
    Green,
    Yellow,
    Red,
}

impl std::fmt::Display for FieldClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Green => write!(f, "green"),
            Self::Yellow => write!(f, "yellow"),
            Self::Red => write!(f, "red"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Green,
    Yellow,
    Red,
    Unknown,
}

impl std::fmt::Display for FileStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Green => write!(f, "green"),
            Self::Yellow => write!(f, "yellow"),
            Self::Red => write!(f, "red"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldClassification {
    pub field_name: String,
    pub class: FieldClass,
    pub applied_alias: Option<AliasRule>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClassCounts {
    pub green: usize,
    pub yellow: usize,
    pub red: usize,
}

impl ClassCounts {
    pub fn record(&mut self, class: FieldClass) {
        match class {
            FieldClass::Green => self.green += 1,
            FieldClass::Yellow => self.yellow += 1,
            FieldClass::Red => self.red += 1,
        }
    }

    pub fn merge(&mut self, other: &ClassCounts) {
        self.green += other.green;
        self.yellow += other.yellow;
        self.red += other.red;
    }

    pub fn total(&self) -> usize {
        self.green + self.yellow + self.red
    }
}

/// One trade allocation after classification. Field order is the input order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllocationRecord {
    pub fields: Vec<FieldClassification>,
    pub validation: ValidationVerdict,
    pub counts: ClassCounts,
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

/// Per-file hit count for a rule that fired while classifying that file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AliasHit {
    pub source_name: String,
    pub target_name: String,
    pub level: AliasLevel,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileSummary {
    pub allocations: usize,
    pub fields: usize,
    pub counts: ClassCounts,
    /// Percentage of compared fields whose validation verdict passed.
    /// `None` when the file has no fields.
    pub validation_pass_pct: Option<f64>,
    pub aliases_used: Vec<AliasHit>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileResult {
    pub filename: String,
    pub overall_status: FileStatus,
    pub allocations: Vec<AllocationRecord>,
    pub summary: FileSummary,
}

/// Outcome of one file within a batch: either classified or rejected in place.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FileOutcome {
    Classified(FileResult),
    Rejected {
        #[serde(skip_serializing_if = "Option::is_none")]
        filename: Option<String>,
        error: String,
    },
}

impl FileOutcome {
    pub fn as_classified(&self) -> Option<&FileResult> {
        match self {
            Self::Classified(result) => Some(result),
            Self::Rejected { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total_files: usize,
    pub green: usize,
    pub yellow: usize,
    pub red: usize,
    pub unknown: usize,
    pub rejected: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PassMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_name: Option<String>,
    pub engine_version: String,
    pub run_at: String,
}

/// Everything one classification pass produces.
#[derive(Debug, Clone, Serialize)]
pub struct PassOutput {
    pub meta: PassMeta,
    pub summary: BatchSummary,
    pub files: Vec<FileOutcome>,
    /// The store's rules after the pass, usage included.
    pub aliases: Vec<AliasRule>,
}
