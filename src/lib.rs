#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Shared constants used across keys, extraction, loading, and queries.
pub mod constants;
/// Fan-out expansion and the batched row writer.
pub mod fanout;
/// Deterministic keyword extraction.
pub mod keywords;
/// The load pass and its summary.
pub mod loader;
/// Raw input coercion and the canonical paper record.
pub mod paper;
/// Table provisioning and schema reconciliation.
pub mod provision;
/// Query engine for the fixed access patterns.
pub mod query;
/// Bounded retry/backoff policy.
pub mod retry;
/// Access patterns and key construction.
pub mod schema;
/// Physical table model, store client trait, and backends.
pub mod table;
/// Shared type aliases.
pub mod types;

mod errors;

pub use errors::IndexError;
pub use fanout::{FanoutWriter, expand};
pub use keywords::{extract_default, extract_keywords};
pub use loader::{LoadSummary, Loader};
pub use paper::{NormalizedPaper, Paper, RawPaper};
pub use provision::Provisioner;
pub use query::{PaperRecord, PaperSummary, QueryEngine, QueryParameters, QueryResponse};
pub use retry::RetryPolicy;
pub use schema::{AccessPattern, SecondaryIndex, TableSchema};
pub use table::{
    BatchOutcome, FileTable, MemoryTable, RecordKind, RowPayload, SortCondition, TableClient,
    TableDescription, TableQuery, TableRow, TableStatus,
};
