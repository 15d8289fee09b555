//! `tradeconf-recon`: trade-confirmation reconciliation engine.
//!
//! Pure engine crate: receives extracted/booked field pairs and validation
//! verdicts, resolves alias rules, and returns classified fields with
//! allocation and file level roll-ups. No CLI or file IO.

pub mod aggregate;
pub mod alias;
pub mod classify;
pub mod compare;
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod status;
pub mod validation;
pub mod wire;

pub use alias::{AliasStore, SharedAliasStore};
pub use config::ReconConfig;
pub use engine::{run, run_files, run_shared, PassOptions};
pub use error::ReconError;
pub use model::{
    AliasLevel, AliasMutation, AliasRule, FieldClass, FieldPair, FileRequest, FileResult,
    FileStatus, PassOutput, Scalar,
};
pub use validation::ValidationVerdict;
