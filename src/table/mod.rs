//! Physical table model and the store client interface.
//!
//! Ownership model:
//! - [`TableRow`] is the unit of storage; its `(partition_key, sort_key)`
//!   pair is the natural key and writes are last-writer-wins upserts.
//! - [`TableClient`] is the only seam the rest of the crate talks to; it
//!   exposes exactly what the target store supports (partition-key
//!   equality plus sort-key range scans) and nothing more.
//! - [`MemoryTable`] and [`FileTable`] are the built-in backends.

/// File-backed table persistence.
pub mod file;
/// In-process reference table.
pub mod memory;

pub use file::FileTable;
pub use memory::MemoryTable;

use crate::errors::IndexError;
use crate::paper::Paper;
use crate::schema::{SecondaryIndex, TableSchema};
use crate::types::{
    AuthorName, Category, DateString, Keyword, PaperId, PartitionKey, SortKey, Timestamp,
};

/// Which fan-out rule produced a row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, bitcode::Encode, bitcode::Decode)]
pub enum RecordKind {
    /// The single detail row for a paper.
    Paper,
    /// One row per category the paper is filed under.
    Category,
    /// One row per author.
    Author,
    /// One row per extracted keyword.
    Keyword,
}

impl RecordKind {
    /// Stable label used in summaries and logs.
    pub fn label(&self) -> &'static str {
        match self {
            RecordKind::Paper => "paper",
            RecordKind::Category => "category",
            RecordKind::Author => "author",
            RecordKind::Keyword => "keyword",
        }
    }
}

/// Entity fields carried by a physical row.
///
/// Every row carries the five public projection fields; abstract text and
/// keywords ride only on detail-bearing rows (paper, category) since the
/// author/keyword partitions exist purely to list papers.
#[derive(Clone, Debug, PartialEq, bitcode::Encode, bitcode::Decode)]
pub struct RowPayload {
    /// Paper identifier.
    pub arxiv_id: PaperId,
    /// Paper title.
    pub title: String,
    /// Author names in canonical order.
    pub authors: Vec<AuthorName>,
    /// Category labels in canonical order.
    pub categories: Vec<Category>,
    /// ISO-8601 publication timestamp.
    pub published: Timestamp,
    /// Date portion of `published`.
    pub published_date: DateString,
    /// Abstract text; present only on detail-bearing rows.
    pub abstract_text: Option<String>,
    /// Extracted keywords; present only on detail-bearing rows.
    pub keywords: Option<Vec<Keyword>>,
}

impl RowPayload {
    /// Payload for detail-bearing rows (paper, category).
    pub fn detailed(paper: &Paper, keywords: &[Keyword]) -> Self {
        Self {
            abstract_text: Some(paper.abstract_text.clone()),
            keywords: Some(keywords.to_vec()),
            ..Self::base(paper)
        }
    }

    /// Payload restricted to the public projection fields.
    pub fn base(paper: &Paper) -> Self {
        Self {
            arxiv_id: paper.arxiv_id.clone(),
            title: paper.title.clone(),
            authors: paper.authors.clone(),
            categories: paper.categories.clone(),
            published: paper.published.clone(),
            published_date: paper.published_date.clone(),
            abstract_text: None,
            keywords: None,
        }
    }
}

/// Secondary-index key pair attached to a row.
#[derive(Clone, Debug, PartialEq, bitcode::Encode, bitcode::Decode)]
pub struct SecondaryKey {
    /// Index this row projects into.
    pub index: SecondaryIndex,
    /// Index partition key.
    pub partition_key: PartitionKey,
    /// Index sort key.
    pub sort_key: SortKey,
}

/// One physical row of the table.
#[derive(Clone, Debug, PartialEq, bitcode::Encode, bitcode::Decode)]
pub struct TableRow {
    /// Primary partition key.
    pub partition_key: PartitionKey,
    /// Primary sort key.
    pub sort_key: SortKey,
    /// Fan-out rule that produced the row.
    pub kind: RecordKind,
    /// Secondary-index projection, when the row participates in one.
    pub secondary: Option<SecondaryKey>,
    /// Entity payload.
    pub payload: RowPayload,
}

impl TableRow {
    /// The `(partition_key, sort_key)` pair that makes upserts idempotent.
    pub fn natural_key(&self) -> (PartitionKey, SortKey) {
        (self.partition_key.clone(), self.sort_key.clone())
    }
}

/// Sort-key condition of a partition query.
#[derive(Clone, Debug)]
pub enum SortCondition {
    /// Every row in the partition.
    All,
    /// Rows with sort key in `[lo, hi]`, inclusive on both ends.
    Between {
        /// Inclusive lower bound.
        lo: SortKey,
        /// Inclusive upper bound.
        hi: SortKey,
    },
}

/// Single-partition query request.
///
/// This is the only read shape the store supports; there is deliberately
/// no way to express a cross-partition scan.
#[derive(Clone, Debug)]
pub struct TableQuery {
    /// Secondary index to read from; `None` reads the primary keyspace.
    pub index: Option<SecondaryIndex>,
    /// Partition key (equality only).
    pub partition_key: PartitionKey,
    /// Sort-key condition.
    pub sort: SortCondition,
    /// Return rows newest-first (reverse sort-key order).
    pub descending: bool,
    /// Cap applied after ordering.
    pub limit: Option<usize>,
}

/// Outcome of one batch put.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Rows the store did not accept this round (capacity/throttling).
    /// Callers retry these; they are never silently dropped.
    pub unprocessed: Vec<TableRow>,
}

/// Lifecycle status of the table or one of its indexes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TableStatus {
    /// Still being created/backfilled; not yet queryable.
    Creating,
    /// Ready for reads and writes.
    Active,
}

/// Status of one secondary index.
#[derive(Clone, Debug)]
pub struct IndexDescription {
    /// Which declared index this is.
    pub index: SecondaryIndex,
    /// Current lifecycle status.
    pub status: TableStatus,
}

/// Snapshot of the table's current shape, as reported by the store.
#[derive(Clone, Debug)]
pub struct TableDescription {
    /// Table lifecycle status.
    pub status: TableStatus,
    /// Primary partition-key attribute name.
    pub partition_attr: String,
    /// Primary sort-key attribute name.
    pub sort_attr: String,
    /// Secondary indexes currently exposed.
    pub indexes: Vec<IndexDescription>,
}

impl TableDescription {
    /// Whether the table and every index declared by `schema` are active.
    pub fn satisfies(&self, schema: &TableSchema) -> bool {
        if self.status != TableStatus::Active {
            return false;
        }
        schema.indexes.iter().all(|declared| {
            self.indexes
                .iter()
                .any(|desc| desc.index == *declared && desc.status == TableStatus::Active)
        })
    }
}

/// Store client for one table.
///
/// Implementations are the explicit, passed-in handle to the physical
/// store: constructed at process start, shared by reference, no ambient
/// connection state.
pub trait TableClient: Send + Sync {
    /// Describe the table, or `None` when it does not exist yet.
    fn describe(&self) -> Result<Option<TableDescription>, IndexError>;
    /// Create the table with the full declared shape.
    fn create(&self, schema: &TableSchema) -> Result<(), IndexError>;
    /// Add secondary indexes to an existing table (additive only).
    fn add_indexes(&self, indexes: &[SecondaryIndex]) -> Result<(), IndexError>;
    /// Upsert a batch of rows by natural key. Rows the store cannot accept
    /// right now come back in [`BatchOutcome::unprocessed`].
    fn batch_put(&self, rows: Vec<TableRow>) -> Result<BatchOutcome, IndexError>;
    /// Execute one partition query.
    fn query(&self, request: &TableQuery) -> Result<Vec<TableRow>, IndexError>;
}
