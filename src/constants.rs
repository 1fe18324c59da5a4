/// Constants used by key construction and the physical row layout.
pub mod keys {
    /// Separator between key segments (for example `CATEGORY#cs.AI`).
    pub const KEY_DELIMITER: char = '#';
    /// Partition prefix for paper detail rows.
    pub const PAPER_PREFIX: &str = "PAPER";
    /// Partition prefix for per-category rows.
    pub const CATEGORY_PREFIX: &str = "CATEGORY";
    /// Partition prefix for per-author rows on the primary keyspace.
    pub const AUTHOR_META_PREFIX: &str = "META#AUTHOR";
    /// Partition prefix for per-keyword rows on the primary keyspace.
    pub const KEYWORD_META_PREFIX: &str = "META#KEYWORD";
    /// Partition prefix for author rows on the author index.
    pub const AUTHOR_INDEX_PREFIX: &str = "AUTHOR";
    /// Partition prefix for keyword rows on the keyword index.
    pub const KEYWORD_INDEX_PREFIX: &str = "KEYWORD";
    /// Sort-key prefix for paper detail rows.
    pub const DETAILS_PREFIX: &str = "DETAILS";
    /// Upper-bound sentinel for inclusive date-range scans.
    ///
    /// Must sort after every character permitted in an arXiv id, so that
    /// `{end}#{sentinel}` bounds every `{end}#{id}` composite. DEL (0x7F)
    /// is greater than any printable ASCII character.
    pub const RANGE_UPPER_SENTINEL: char = '\u{7f}';
}

/// Constants used by the physical table shape.
pub mod table {
    /// Primary partition-key attribute name.
    pub const ATTR_PK: &str = "PK";
    /// Primary sort-key attribute name.
    pub const ATTR_SK: &str = "SK";
    /// Secondary index serving the by-author pattern.
    pub const AUTHOR_INDEX: &str = "AuthorIndex";
    /// Secondary index serving the by-id pattern.
    pub const PAPER_ID_INDEX: &str = "PaperIdIndex";
    /// Secondary index serving the by-keyword pattern.
    pub const KEYWORD_INDEX: &str = "KeywordIndex";
}

/// Constants used by keyword extraction.
pub mod keywords {
    /// Default number of keywords kept per abstract.
    pub const DEFAULT_TOP_K: usize = 10;
    /// Minimum token length kept after lowercasing.
    pub const MIN_TOKEN_LEN: usize = 2;
    /// Tokens dropped before frequency ranking: generic English stopwords
    /// plus academic-writing boilerplate.
    pub const STOPWORDS: &[&str] = &[
        "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for",
        "of", "with", "by", "from", "up", "about", "into", "through",
        "during", "is", "are", "was", "were", "be", "been", "being", "have",
        "has", "had", "do", "does", "did", "will", "would", "could",
        "should", "may", "might", "can", "this", "that", "these", "those",
        "we", "our", "use", "using", "based", "approach", "method", "paper",
        "propose", "proposed", "show",
    ];
}

/// Constants used by the load pass and batch writing.
pub mod load {
    /// Maximum rows per write batch submitted to the store.
    pub const WRITE_BATCH_SIZE: usize = 25;
    /// Default number of entity-processing workers.
    pub const DEFAULT_WORKERS: usize = 4;
    /// Default number of concurrently in-flight write batches.
    pub const DEFAULT_WRITE_CONCURRENCY: usize = 2;
    /// Skip-reason tally key for records with no resolvable id.
    pub const SKIP_MISSING_ID: &str = "missing_id";
    /// Log message used when an input record is skipped.
    pub const SKIP_RECORD_MSG: &str = "skipping invalid paper record";
}

/// Constants used by retry/backoff policies.
pub mod retry {
    use std::time::Duration;

    /// Default attempt ceiling for batch writes and provisioning polls.
    pub const DEFAULT_MAX_ATTEMPTS: usize = 5;
    /// Default base delay before the first retry.
    pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(50);
    /// Default cap applied to the exponential backoff curve.
    pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(2);
}

/// Constants used by query execution.
pub mod query {
    /// Default result cap for the recent-in-category pattern.
    pub const DEFAULT_RECENT_LIMIT: usize = 20;
    /// Default result cap for the by-keyword pattern.
    pub const DEFAULT_KEYWORD_LIMIT: usize = 20;
}

/// Constants used by the file-backed table store.
pub mod file_table {
    /// Key for the versioned store metadata entry.
    pub const META_KEY: &[u8] = b"__meta__";
    /// Key for the bitcode-encoded manifest of natural keys.
    pub const MANIFEST_KEY: &[u8] = b"manifest";
    /// Prefix for per-row entries.
    pub const ROW_KEY_PREFIX: &[u8] = b"row:";
    /// Number of row keys fetched per `batch_read` call when loading.
    pub const ROW_READ_BATCH: usize = 256;
    /// Version tag for persisted row payloads and the manifest.
    pub const STORE_VERSION: u8 = 1;
    /// Default filename for a persisted table.
    pub const DEFAULT_STORE_FILENAME: &str = "paperdex_table.bin";
}
