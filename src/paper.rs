//! Raw input coercion into canonical paper records.

use chrono::{NaiveDate, Utc};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::errors::IndexError;
use crate::types::{AuthorName, Category, DateString, PaperId, Timestamp};

/// Canonical paper record. Immutable once normalized; no field is ever
/// null, since absent inputs become empty strings/sequences.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Paper {
    /// Stable arXiv identifier (required, unique per corpus).
    pub arxiv_id: PaperId,
    /// Paper title.
    pub title: String,
    /// Ordered, deduplicated author names.
    pub authors: Vec<AuthorName>,
    /// Abstract text used for keyword extraction.
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    /// Ordered, deduplicated category labels.
    pub categories: Vec<Category>,
    /// ISO-8601 publication timestamp.
    pub published: Timestamp,
    /// Date portion of `published` (`YYYY-MM-DD`).
    pub published_date: DateString,
}

/// Normalization output: the canonical paper plus whether a publication
/// date had to be substituted.
#[derive(Clone, Debug)]
pub struct NormalizedPaper {
    /// Canonical record ready for fan-out.
    pub paper: Paper,
    /// True when `published`/`published_date` fell back to today.
    pub published_defaulted: bool,
}

/// One accepted raw input record.
///
/// Field aliases and the one-or-many list shapes cover every form seen in
/// real corpus dumps; anything else fails deserialization up front rather
/// than leaking an untyped map past this boundary.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawPaper {
    #[serde(default, alias = "id", alias = "arXivId")]
    arxiv_id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    authors: Option<OneOrMany>,
    #[serde(default, rename = "abstract", alias = "summary")]
    abstract_text: Option<String>,
    #[serde(default, alias = "category")]
    categories: Option<OneOrMany>,
    #[serde(default, alias = "published_at")]
    published: Option<String>,
}

/// A list field that may arrive as a delimited string or as a sequence.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl RawPaper {
    /// Coerce this record into a canonical [`Paper`].
    ///
    /// Fails with [`IndexError::InvalidPaper`] when no id can be resolved;
    /// every other missing field degrades to an empty value.
    pub fn normalize(self) -> Result<NormalizedPaper, IndexError> {
        let arxiv_id = self
            .arxiv_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| IndexError::InvalidPaper {
                reason: "no arxiv id under any accepted alias".to_string(),
            })?
            .to_string();

        let authors = coerce_list(self.authors, ListDelimiter::Comma);
        let categories = coerce_list(self.categories, ListDelimiter::Whitespace);

        let provided = self
            .published
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty());
        let (published, published_date, published_defaulted) = match provided {
            None => {
                let today = today_utc();
                (format!("{today}T00:00:00Z"), today, true)
            }
            Some(value) => match date_prefix(value) {
                Some(date) => (value.to_string(), date, false),
                None => (value.to_string(), today_utc(), true),
            },
        };

        Ok(NormalizedPaper {
            paper: Paper {
                arxiv_id,
                title: self.title.unwrap_or_default(),
                authors,
                abstract_text: self.abstract_text.unwrap_or_default(),
                categories,
                published,
                published_date,
            },
            published_defaulted,
        })
    }
}

/// Delimiter applied when a list field arrives as a single string.
enum ListDelimiter {
    Comma,
    Whitespace,
}

/// Trim, drop empties, and deduplicate preserving first-seen order.
fn coerce_list(value: Option<OneOrMany>, delimiter: ListDelimiter) -> Vec<String> {
    let items: Vec<String> = match value {
        None => Vec::new(),
        Some(OneOrMany::Many(items)) => items,
        Some(OneOrMany::One(joined)) => match delimiter {
            ListDelimiter::Comma => joined.split(',').map(str::to_string).collect(),
            ListDelimiter::Whitespace => {
                joined.split_whitespace().map(str::to_string).collect()
            }
        },
    };
    let mut seen: IndexSet<String> = IndexSet::with_capacity(items.len());
    for item in items {
        let trimmed = item.trim();
        if !trimmed.is_empty() {
            seen.insert(trimmed.to_string());
        }
    }
    seen.into_iter().collect()
}

/// Return the `YYYY-MM-DD` prefix of `value` when it parses as a date.
fn date_prefix(value: &str) -> Option<DateString> {
    let prefix: String = value.chars().take(10).collect();
    NaiveDate::parse_from_str(&prefix, "%Y-%m-%d").ok()?;
    Some(prefix)
}

/// Today's UTC date as `YYYY-MM-DD`.
fn today_utc() -> DateString {
    Utc::now().date_naive().format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(json: serde_json::Value) -> RawPaper {
        serde_json::from_value(json).expect("raw paper fixture")
    }

    #[test]
    fn resolves_id_from_any_alias() {
        let shapes = [
            serde_json::json!({ "arxiv_id": "2401.01234" }),
            serde_json::json!({ "id": "2401.01234" }),
            serde_json::json!({ "arXivId": "2401.01234" }),
        ];
        for shape in shapes {
            let normalized = raw(shape).normalize().expect("id alias");
            assert_eq!(normalized.paper.arxiv_id, "2401.01234");
        }
    }

    #[test]
    fn missing_or_blank_id_is_invalid() {
        let err = raw(serde_json::json!({ "title": "No id" }))
            .normalize()
            .unwrap_err();
        assert!(matches!(err, IndexError::InvalidPaper { .. }));

        let err = raw(serde_json::json!({ "arxiv_id": "  " }))
            .normalize()
            .unwrap_err();
        assert!(matches!(err, IndexError::InvalidPaper { .. }));
    }

    #[test]
    fn coerces_delimited_strings_and_sequences() {
        let normalized = raw(serde_json::json!({
            "id": "p1",
            "authors": "Ada Lovelace, Alan Turing , ,Ada Lovelace",
            "categories": "cs.AI cs.CL  cs.AI",
        }))
        .normalize()
        .expect("normalize");
        assert_eq!(normalized.paper.authors, vec!["Ada Lovelace", "Alan Turing"]);
        assert_eq!(normalized.paper.categories, vec!["cs.AI", "cs.CL"]);

        let normalized = raw(serde_json::json!({
            "id": "p2",
            "authors": [" Ada Lovelace ", "", "Grace Hopper"],
            "category": ["cs.AI", "cs.AI"],
        }))
        .normalize()
        .expect("normalize");
        assert_eq!(normalized.paper.authors, vec!["Ada Lovelace", "Grace Hopper"]);
        assert_eq!(normalized.paper.categories, vec!["cs.AI"]);
    }

    #[test]
    fn derives_date_from_timestamp_prefix() {
        let normalized = raw(serde_json::json!({
            "id": "p1",
            "published": "2024-01-05T12:30:00Z",
        }))
        .normalize()
        .expect("normalize");
        assert_eq!(normalized.paper.published_date, "2024-01-05");
        assert_eq!(normalized.paper.published, "2024-01-05T12:30:00Z");
        assert!(!normalized.published_defaulted);
    }

    #[test]
    fn bare_date_is_accepted_as_its_own_prefix() {
        let normalized = raw(serde_json::json!({ "id": "p1", "published": "2023-11-30" }))
            .normalize()
            .expect("normalize");
        assert_eq!(normalized.paper.published_date, "2023-11-30");
        assert!(!normalized.published_defaulted);
    }

    #[test]
    fn absent_or_malformed_published_defaults_to_today() {
        let absent = raw(serde_json::json!({ "id": "p1" }))
            .normalize()
            .expect("normalize");
        assert!(absent.published_defaulted);
        assert_eq!(
            absent.paper.published,
            format!("{}T00:00:00Z", absent.paper.published_date)
        );
        NaiveDate::parse_from_str(&absent.paper.published_date, "%Y-%m-%d")
            .expect("defaulted date parses");

        let malformed = raw(serde_json::json!({ "id": "p2", "published": "spring 2024" }))
            .normalize()
            .expect("normalize");
        assert!(malformed.published_defaulted);
        assert_eq!(malformed.paper.published, "spring 2024");
    }

    #[test]
    fn summary_alias_feeds_abstract_text() {
        let normalized = raw(serde_json::json!({
            "id": "p1",
            "summary": "We study robust learning.",
        }))
        .normalize()
        .expect("normalize");
        assert_eq!(normalized.paper.abstract_text, "We study robust learning.");
    }

    #[test]
    fn no_field_is_ever_null() {
        let normalized = raw(serde_json::json!({ "id": "p1" }))
            .normalize()
            .expect("normalize");
        let paper = normalized.paper;
        assert_eq!(paper.title, "");
        assert_eq!(paper.abstract_text, "");
        assert!(paper.authors.is_empty());
        assert!(paper.categories.is_empty());
        assert!(!paper.published.is_empty());
        assert!(!paper.published_date.is_empty());
    }
}
