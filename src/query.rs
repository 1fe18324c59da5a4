//! Read side: one operation per access pattern, each a single partition
//! query with a fixed projection.

use std::time::Instant;

use serde::Serialize;
use tracing::debug;

use crate::errors::IndexError;
use crate::schema::{
    AccessPattern, author_index_partition, category_partition, date_range_bounds,
    keyword_index_partition, paper_partition,
};
use crate::table::{SortCondition, TableClient, TableQuery, TableRow};
use crate::types::{AuthorName, Category, DateString, Keyword, PaperId, Timestamp};

/// Public projection of a paper: exactly these five fields, never the
/// internal key attributes or detail payload.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PaperSummary {
    /// Paper identifier.
    pub arxiv_id: PaperId,
    /// Paper title.
    pub title: String,
    /// Author names.
    pub authors: Vec<AuthorName>,
    /// ISO-8601 publication timestamp.
    pub published: Timestamp,
    /// Category labels.
    pub categories: Vec<Category>,
}

/// Full stored payload, returned only by the by-id pattern.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PaperRecord {
    /// Paper identifier.
    pub arxiv_id: PaperId,
    /// Paper title.
    pub title: String,
    /// Author names.
    pub authors: Vec<AuthorName>,
    /// Abstract text.
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    /// Category labels.
    pub categories: Vec<Category>,
    /// Extracted keywords.
    pub keywords: Vec<Keyword>,
    /// ISO-8601 publication timestamp.
    pub published: Timestamp,
    /// Date portion of `published`.
    pub published_date: DateString,
}

/// Echo of the bound parameters a query ran with.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "query_type", rename_all = "snake_case")]
pub enum QueryParameters {
    /// recent-in-category parameters.
    RecentInCategory {
        /// Category queried.
        category: Category,
        /// Effective result cap.
        limit: usize,
    },
    /// by-author parameters.
    PapersByAuthor {
        /// Author queried.
        author: AuthorName,
    },
    /// date-range-in-category parameters.
    DaterangeInCategory {
        /// Category queried.
        category: Category,
        /// Inclusive start date.
        start_date: DateString,
        /// Inclusive end date.
        end_date: DateString,
    },
    /// by-keyword parameters.
    PapersByKeyword {
        /// Keyword queried (as given by the caller).
        keyword: Keyword,
        /// Effective result cap.
        limit: usize,
    },
}

/// Result envelope for the list-shaped patterns.
#[derive(Clone, Debug, Serialize)]
pub struct QueryResponse {
    /// Parameters the query ran with.
    pub parameters: QueryParameters,
    /// Projected results in pattern order.
    pub results: Vec<PaperSummary>,
    /// Number of results.
    pub count: usize,
    /// Wall-clock execution time in milliseconds.
    pub execution_time_ms: u128,
}

/// Executes the fixed access patterns against a provisioned table.
///
/// Every operation derives its keys from the same pure constructors
/// fan-out used at write time, and issues exactly one
/// partition query. Ordering and limits are enforced here, not by
/// callers.
pub struct QueryEngine<'a> {
    client: &'a dyn TableClient,
}

impl<'a> QueryEngine<'a> {
    /// Engine over an explicitly provided store client.
    pub fn new(client: &'a dyn TableClient) -> Self {
        Self { client }
    }

    /// Newest papers in `category`, capped at `limit` (default 20).
    pub fn recent_in_category(
        &self,
        category: &str,
        limit: Option<usize>,
    ) -> Result<QueryResponse, IndexError> {
        let category = required(category, "category")?;
        let pattern = AccessPattern::RecentInCategory;
        let limit = effective_limit(pattern, limit).unwrap_or(usize::MAX);
        self.run(
            QueryParameters::RecentInCategory {
                category: category.to_string(),
                limit,
            },
            TableQuery {
                index: pattern.index(),
                partition_key: category_partition(category),
                sort: SortCondition::All,
                descending: pattern.descending(),
                limit: Some(limit),
            },
        )
    }

    /// All papers by `author`, oldest first.
    pub fn papers_by_author(&self, author: &str) -> Result<QueryResponse, IndexError> {
        let author = required(author, "author")?;
        let pattern = AccessPattern::ByAuthor;
        self.run(
            QueryParameters::PapersByAuthor {
                author: author.to_string(),
            },
            TableQuery {
                index: pattern.index(),
                partition_key: author_index_partition(author),
                sort: SortCondition::All,
                descending: pattern.descending(),
                limit: effective_limit(pattern, None),
            },
        )
    }

    /// The full stored record for `arxiv_id`, or `None` when absent.
    ///
    /// Not-found is a valid empty result, not an error.
    pub fn paper_by_id(&self, arxiv_id: &str) -> Result<Option<PaperRecord>, IndexError> {
        let arxiv_id = required(arxiv_id, "arxiv_id")?;
        let pattern = AccessPattern::ById;
        let started = Instant::now();
        let rows = self.client.query(&TableQuery {
            index: pattern.index(),
            partition_key: paper_partition(arxiv_id),
            sort: SortCondition::All,
            descending: pattern.descending(),
            limit: effective_limit(pattern, None),
        })?;
        debug!(
            arxiv_id,
            found = !rows.is_empty(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "paper_by_id"
        );
        Ok(rows.into_iter().next().map(full_record))
    }

    /// Papers in `category` with `published_date` in `[start_date, end_date]`,
    /// oldest first.
    pub fn papers_in_date_range(
        &self,
        category: &str,
        start_date: &str,
        end_date: &str,
    ) -> Result<QueryResponse, IndexError> {
        let category = required(category, "category")?;
        let start_date = required(start_date, "start_date")?;
        let end_date = required(end_date, "end_date")?;
        let pattern = AccessPattern::DateRangeInCategory;
        let (lo, hi) = date_range_bounds(&start_date.to_string(), &end_date.to_string());
        self.run(
            QueryParameters::DaterangeInCategory {
                category: category.to_string(),
                start_date: start_date.to_string(),
                end_date: end_date.to_string(),
            },
            TableQuery {
                index: pattern.index(),
                partition_key: category_partition(category),
                sort: SortCondition::Between { lo, hi },
                descending: pattern.descending(),
                limit: effective_limit(pattern, None),
            },
        )
    }

    /// Newest papers mentioning `keyword`, capped at `limit` (default 20).
    ///
    /// Matching is case-insensitive: the key constructor lowercases, the
    /// same way extraction did at write time.
    pub fn papers_by_keyword(
        &self,
        keyword: &str,
        limit: Option<usize>,
    ) -> Result<QueryResponse, IndexError> {
        let keyword = required(keyword, "keyword")?;
        let pattern = AccessPattern::ByKeyword;
        let limit = effective_limit(pattern, limit).unwrap_or(usize::MAX);
        self.run(
            QueryParameters::PapersByKeyword {
                keyword: keyword.to_string(),
                limit,
            },
            TableQuery {
                index: pattern.index(),
                partition_key: keyword_index_partition(keyword),
                sort: SortCondition::All,
                descending: pattern.descending(),
                limit: Some(limit),
            },
        )
    }

    fn run(
        &self,
        parameters: QueryParameters,
        request: TableQuery,
    ) -> Result<QueryResponse, IndexError> {
        let started = Instant::now();
        let rows = self.client.query(&request)?;
        let results: Vec<PaperSummary> = rows.into_iter().map(summarize).collect();
        let count = results.len();
        Ok(QueryResponse {
            parameters,
            count,
            results,
            execution_time_ms: started.elapsed().as_millis(),
        })
    }
}

/// Reject empty required parameters before touching the store.
fn required<'v>(value: &'v str, name: &'static str) -> Result<&'v str, IndexError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(IndexError::MissingParameter { name });
    }
    Ok(trimmed)
}

/// Caller limit, else the pattern's declared default.
fn effective_limit(pattern: AccessPattern, limit: Option<usize>) -> Option<usize> {
    limit.or_else(|| pattern.default_limit())
}

/// Project a row down to the five public fields.
fn summarize(row: TableRow) -> PaperSummary {
    let payload = row.payload;
    PaperSummary {
        arxiv_id: payload.arxiv_id,
        title: payload.title,
        authors: payload.authors,
        published: payload.published,
        categories: payload.categories,
    }
}

/// Lift a detail row into the full public record.
fn full_record(row: TableRow) -> PaperRecord {
    let payload = row.payload;
    PaperRecord {
        arxiv_id: payload.arxiv_id,
        title: payload.title,
        authors: payload.authors,
        abstract_text: payload.abstract_text.unwrap_or_default(),
        categories: payload.categories,
        keywords: payload.keywords.unwrap_or_default(),
        published: payload.published,
        published_date: payload.published_date,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::MemoryTable;

    #[test]
    fn empty_parameters_are_caller_errors() {
        let table = MemoryTable::provisioned();
        let engine = QueryEngine::new(&table);
        assert!(matches!(
            engine.recent_in_category("", None),
            Err(IndexError::MissingParameter { name: "category" })
        ));
        assert!(matches!(
            engine.papers_by_author("  "),
            Err(IndexError::MissingParameter { name: "author" })
        ));
        assert!(matches!(
            engine.papers_in_date_range("cs.AI", "", "2024-01-31"),
            Err(IndexError::MissingParameter { name: "start_date" })
        ));
        assert!(matches!(
            engine.paper_by_id(""),
            Err(IndexError::MissingParameter { name: "arxiv_id" })
        ));
        assert!(matches!(
            engine.papers_by_keyword("", None),
            Err(IndexError::MissingParameter { name: "keyword" })
        ));
    }

    #[test]
    fn absent_paper_is_none_not_an_error() {
        let table = MemoryTable::provisioned();
        let engine = QueryEngine::new(&table);
        assert!(engine.paper_by_id("nope").expect("query").is_none());
    }

    #[test]
    fn parameter_echo_serializes_with_query_type_tag() {
        let parameters = QueryParameters::RecentInCategory {
            category: "cs.AI".to_string(),
            limit: 20,
        };
        let json = serde_json::to_value(&parameters).expect("serialize");
        assert_eq!(json["query_type"], "recent_in_category");
        assert_eq!(json["category"], "cs.AI");
    }
}
