use std::io;

use thiserror::Error;

/// Error type for normalization, provisioning, write, and query failures.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Input record cannot become a canonical paper. Loads skip and count
    /// these; they never abort a batch.
    #[error("invalid paper record: {reason}")]
    InvalidPaper { reason: String },
    /// The store kept rejecting writes after the full retry budget.
    #[error(
        "store rejected writes after {attempts} attempts: {unwritten} of {total} records unwritten"
    )]
    RetryExhausted {
        attempts: usize,
        unwritten: usize,
        total: usize,
    },
    /// The table exists but cannot be reconciled with the declared shape.
    #[error("table cannot be reconciled with the declared schema: {details}")]
    SchemaMismatch { details: String },
    /// The table (or one of its indexes) never became usable within the
    /// provisioning poll budget.
    #[error("table was not ready after {attempts} provisioning polls")]
    ProvisionTimeout { attempts: usize },
    /// A required query parameter was empty or missing.
    #[error("missing required parameter '{name}'")]
    MissingParameter { name: &'static str },
    /// Store-level failure (open, read, write, decode).
    #[error("table store failure: {0}")]
    Store(String),
    /// The input document is not one of the accepted JSON shapes.
    #[error("unreadable papers document: {0}")]
    Parse(String),
    /// Filesystem failure while reading input or opening a store.
    #[error(transparent)]
    Io(#[from] io::Error),
}
