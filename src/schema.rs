//! Declared access patterns and the key-construction functions behind them.
//!
//! Every partition/sort key in the table is produced here, by pure
//! functions of entity fields. The fan-out writer and the query engine
//! both call these, so write-time and read-time keys agree byte for byte.

use crate::constants::keys::{
    AUTHOR_INDEX_PREFIX, AUTHOR_META_PREFIX, CATEGORY_PREFIX, DETAILS_PREFIX, KEY_DELIMITER,
    KEYWORD_INDEX_PREFIX, KEYWORD_META_PREFIX, PAPER_PREFIX, RANGE_UPPER_SENTINEL,
};
use crate::constants::query::{DEFAULT_KEYWORD_LIMIT, DEFAULT_RECENT_LIMIT};
use crate::constants::table::{ATTR_PK, ATTR_SK, AUTHOR_INDEX, KEYWORD_INDEX, PAPER_ID_INDEX};
use crate::types::{DateString, PaperId, PartitionKey, SortKey};

/// Secondary index projections declared by the schema.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, bitcode::Encode, bitcode::Decode)]
pub enum SecondaryIndex {
    /// Serves the by-author pattern (`GSI1`).
    Author,
    /// Serves the by-id pattern (`GSI2`).
    PaperId,
    /// Serves the by-keyword pattern (`GSI3`).
    Keyword,
}

impl SecondaryIndex {
    /// All indexes the schema declares, in creation order.
    pub const ALL: [SecondaryIndex; 3] = [
        SecondaryIndex::Author,
        SecondaryIndex::PaperId,
        SecondaryIndex::Keyword,
    ];

    /// Index name as exposed by the store.
    pub fn name(&self) -> &'static str {
        match self {
            SecondaryIndex::Author => AUTHOR_INDEX,
            SecondaryIndex::PaperId => PAPER_ID_INDEX,
            SecondaryIndex::Keyword => KEYWORD_INDEX,
        }
    }

    /// Physical attribute pair `(partition, sort)` backing this index.
    pub fn key_attributes(&self) -> (&'static str, &'static str) {
        match self {
            SecondaryIndex::Author => ("GSI1PK", "GSI1SK"),
            SecondaryIndex::PaperId => ("GSI2PK", "GSI2SK"),
            SecondaryIndex::Keyword => ("GSI3PK", "GSI3SK"),
        }
    }
}

/// Declared physical table shape: primary key layout plus the secondary
/// indexes required by the access patterns.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableSchema {
    /// Primary partition-key attribute name.
    pub partition_attr: &'static str,
    /// Primary sort-key attribute name.
    pub sort_attr: &'static str,
    /// Secondary indexes the table must expose.
    pub indexes: Vec<SecondaryIndex>,
}

impl TableSchema {
    /// The one schema this crate declares.
    pub fn declared() -> Self {
        Self {
            partition_attr: ATTR_PK,
            sort_attr: ATTR_SK,
            indexes: SecondaryIndex::ALL.to_vec(),
        }
    }
}

/// The fixed access patterns the index serves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessPattern {
    /// Newest papers in one category.
    RecentInCategory,
    /// All papers by one author, oldest first.
    ByAuthor,
    /// One paper by id, full payload.
    ById,
    /// Category papers with `published_date` in an inclusive range.
    DateRangeInCategory,
    /// Newest papers mentioning one keyword.
    ByKeyword,
}

impl AccessPattern {
    /// Secondary index the pattern is served from, if any.
    pub fn index(&self) -> Option<SecondaryIndex> {
        match self {
            AccessPattern::RecentInCategory | AccessPattern::DateRangeInCategory => None,
            AccessPattern::ByAuthor => Some(SecondaryIndex::Author),
            AccessPattern::ById => Some(SecondaryIndex::PaperId),
            AccessPattern::ByKeyword => Some(SecondaryIndex::Keyword),
        }
    }

    /// Whether results are returned newest-first.
    pub fn descending(&self) -> bool {
        matches!(
            self,
            AccessPattern::RecentInCategory | AccessPattern::ByKeyword
        )
    }

    /// Result cap applied when the caller does not supply one.
    pub fn default_limit(&self) -> Option<usize> {
        match self {
            AccessPattern::RecentInCategory => Some(DEFAULT_RECENT_LIMIT),
            AccessPattern::ByKeyword => Some(DEFAULT_KEYWORD_LIMIT),
            AccessPattern::ById => Some(1),
            AccessPattern::ByAuthor | AccessPattern::DateRangeInCategory => None,
        }
    }
}

/// `CATEGORY#{category}`: primary partition for category rows.
pub fn category_partition(category: &str) -> PartitionKey {
    format!("{CATEGORY_PREFIX}{KEY_DELIMITER}{category}")
}

/// `PAPER#{arxiv_id}`: primary partition for the paper detail row and its
/// PaperIdIndex partition.
pub fn paper_partition(arxiv_id: &str) -> PartitionKey {
    format!("{PAPER_PREFIX}{KEY_DELIMITER}{arxiv_id}")
}

/// `META#AUTHOR#{author}`: primary partition for author rows.
pub fn author_meta_partition(author: &str) -> PartitionKey {
    format!("{AUTHOR_META_PREFIX}{KEY_DELIMITER}{author}")
}

/// `AUTHOR#{author}`: AuthorIndex partition for author rows.
pub fn author_index_partition(author: &str) -> PartitionKey {
    format!("{AUTHOR_INDEX_PREFIX}{KEY_DELIMITER}{author}")
}

/// `META#KEYWORD#{keyword}`: primary partition for keyword rows.
pub fn keyword_meta_partition(keyword: &str) -> PartitionKey {
    format!("{KEYWORD_META_PREFIX}{KEY_DELIMITER}{keyword}")
}

/// `KEYWORD#{keyword.to_lowercase()}`: KeywordIndex partition.
///
/// Lowercasing here (and only here) is what lets query-time keywords in
/// any case hit the rows written from extracted (already lowercase)
/// keywords.
pub fn keyword_index_partition(keyword: &str) -> PartitionKey {
    format!(
        "{KEYWORD_INDEX_PREFIX}{KEY_DELIMITER}{}",
        keyword.to_lowercase()
    )
}

/// `{date}#{arxiv_id}`: sort key for all dated rows. Lexicographic order
/// on this composite is publication-date order with id as tiebreak.
pub fn dated_sort_key(date: &DateString, arxiv_id: &PaperId) -> SortKey {
    format!("{date}{KEY_DELIMITER}{arxiv_id}")
}

/// `DETAILS#{date}`: sort key for the paper detail row.
pub fn details_sort_key(date: &DateString) -> SortKey {
    format!("{DETAILS_PREFIX}{KEY_DELIMITER}{date}")
}

/// Inclusive sort-key bounds for a `[start, end]` date-range scan.
///
/// The lower bound is `{start}#`, which sorts before every
/// `{start}#{id}`. The upper bound appends [`RANGE_UPPER_SENTINEL`] after
/// the delimiter so it sorts after every `{end}#{id}` composite, for any
/// id drawn from the printable-ASCII id alphabet.
pub fn date_range_bounds(start: &DateString, end: &DateString) -> (SortKey, SortKey) {
    (
        format!("{start}{KEY_DELIMITER}"),
        format!("{end}{KEY_DELIMITER}{RANGE_UPPER_SENTINEL}"),
    )
}
