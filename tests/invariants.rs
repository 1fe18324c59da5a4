//! Properties the index must hold regardless of corpus shape: idempotent
//! fan-out, write/read key agreement, ordering, range completeness, and
//! projection containment.

use paperdex::{Loader, MemoryTable, Provisioner, QueryEngine, RawPaper, RetryPolicy};
use std::time::Duration;

fn raw(json: serde_json::Value) -> RawPaper {
    serde_json::from_value(json).expect("raw paper fixture")
}

fn corpus() -> Vec<RawPaper> {
    vec![
        raw(serde_json::json!({
            "arxiv_id": "2401.00001",
            "title": "Robust graphs",
            "authors": ["Ada Lovelace", "Alan Turing"],
            "abstract": "Graph robustness robustness robustness via spectral methods",
            "categories": ["cs.AI", "cs.LG"],
            "published": "2024-01-05T00:00:00Z",
        })),
        raw(serde_json::json!({
            "arxiv_id": "2401.00002",
            "title": "Fast transformers",
            "authors": ["Ada Lovelace"],
            "abstract": "Transformers transformers attention kernels",
            "categories": ["cs.AI"],
            "published": "2024-01-07T00:00:00Z",
        })),
        raw(serde_json::json!({
            "arxiv_id": "2401.00003",
            "title": "Tied date paper",
            "authors": ["Grace Hopper"],
            "abstract": "Compilers and attention",
            "categories": ["cs.AI"],
            "published": "2024-01-07T00:00:00Z",
        })),
        raw(serde_json::json!({
            "arxiv_id": "2402.00004",
            "title": "Out of range",
            "authors": ["Grace Hopper"],
            "abstract": "Databases databases indexing",
            "categories": ["cs.DB"],
            "published": "2024-02-10T00:00:00Z",
        })),
    ]
}

fn fast_poll() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 10,
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(1),
    }
}

fn loaded_table() -> MemoryTable {
    let table = MemoryTable::empty();
    Provisioner::default()
        .with_poll_policy(fast_poll())
        .ensure(&table)
        .expect("provision");
    Loader::default()
        .load_records(corpus(), &table)
        .expect("load");
    table
}

#[test]
fn reloading_the_same_corpus_is_idempotent() {
    let table = loaded_table();
    let rows_after_first = table.row_count();

    let summary = Loader::default()
        .load_records(corpus(), &table)
        .expect("reload");
    assert_eq!(table.row_count(), rows_after_first);
    assert_eq!(summary.records_written, rows_after_first);

    // Queries see exactly one copy of each paper.
    let engine = QueryEngine::new(&table);
    let recent = engine.recent_in_category("cs.AI", None).expect("query");
    assert_eq!(recent.count, 3);
}

#[test]
fn write_time_and_query_time_keys_agree_for_every_pattern() {
    let table = loaded_table();
    let engine = QueryEngine::new(&table);

    let by_category = engine.recent_in_category("cs.AI", None).expect("recent");
    assert!(by_category.results.iter().any(|p| p.arxiv_id == "2401.00001"));

    let by_author = engine.papers_by_author("Ada Lovelace").expect("author");
    assert_eq!(by_author.count, 2);

    let by_id = engine.paper_by_id("2401.00002").expect("get");
    assert_eq!(by_id.expect("present").arxiv_id, "2401.00002");

    let in_range = engine
        .papers_in_date_range("cs.AI", "2024-01-01", "2024-01-31")
        .expect("range");
    assert_eq!(in_range.count, 3);

    // Extraction lowercased at write time; the key constructor lowercases
    // at read time, so any caller casing matches.
    let by_keyword = engine.papers_by_keyword("Transformers", None).expect("keyword");
    assert!(by_keyword.results.iter().any(|p| p.arxiv_id == "2401.00002"));
}

#[test]
fn recent_in_category_is_newest_first_with_id_tiebreak() {
    let table = loaded_table();
    let engine = QueryEngine::new(&table);
    let response = engine.recent_in_category("cs.AI", None).expect("query");

    let ids: Vec<&str> = response.results.iter().map(|p| p.arxiv_id.as_str()).collect();
    // 01-07 ties break by id, descending with the date.
    assert_eq!(ids, vec!["2401.00003", "2401.00002", "2401.00001"]);

    let capped = engine.recent_in_category("cs.AI", Some(2)).expect("query");
    assert_eq!(capped.count, 2);
    assert_eq!(capped.results.len(), 2);
}

#[test]
fn date_range_returns_exactly_the_inclusive_window() {
    let table = loaded_table();
    let engine = QueryEngine::new(&table);

    let response = engine
        .papers_in_date_range("cs.AI", "2024-01-05", "2024-01-07")
        .expect("range");
    let ids: Vec<&str> = response.results.iter().map(|p| p.arxiv_id.as_str()).collect();
    // Oldest first, both boundary dates included, other categories ignored.
    assert_eq!(ids, vec!["2401.00001", "2401.00002", "2401.00003"]);

    let before = engine
        .papers_in_date_range("cs.AI", "2023-01-01", "2024-01-04")
        .expect("range");
    assert_eq!(before.count, 0);
}

#[test]
fn date_range_keeps_ids_that_sort_above_lowercase_z() {
    // Regression for the fixed-literal upper bound: an id sorting past
    // "zzzzzzz" must still fall inside its own publication date.
    let table = MemoryTable::provisioned();
    Loader::default()
        .load_records(
            vec![raw(serde_json::json!({
                "arxiv_id": "zzzzzzzz-experimental",
                "title": "Edge of the keyspace",
                "categories": ["cs.AI"],
                "published": "2024-01-05T00:00:00Z",
            }))],
            &table,
        )
        .expect("load");
    let engine = QueryEngine::new(&table);
    let response = engine
        .papers_in_date_range("cs.AI", "2024-01-05", "2024-01-05")
        .expect("range");
    assert_eq!(response.count, 1);
    assert_eq!(response.results[0].arxiv_id, "zzzzzzzz-experimental");
}

#[test]
fn projection_exposes_exactly_the_five_public_fields() {
    let table = loaded_table();
    let engine = QueryEngine::new(&table);

    let response = engine.recent_in_category("cs.AI", None).expect("query");
    let value = serde_json::to_value(&response.results[0]).expect("serialize");
    let keys: Vec<&str> = value
        .as_object()
        .expect("object")
        .keys()
        .map(String::as_str)
        .collect();
    let mut sorted = keys.clone();
    sorted.sort_unstable();
    assert_eq!(
        sorted,
        vec!["arxiv_id", "authors", "categories", "published", "title"]
    );

    // The by-id pattern alone returns the detail payload.
    let record = engine
        .paper_by_id("2401.00001")
        .expect("get")
        .expect("present");
    assert!(record.abstract_text.contains("robustness"));
    assert!(record.keywords.contains(&"robustness".to_string()));
    assert_eq!(record.published_date, "2024-01-05");
}

#[test]
fn keyword_results_are_newest_first_and_capped() {
    let table = loaded_table();
    let engine = QueryEngine::new(&table);

    let response = engine.papers_by_keyword("attention", None).expect("keyword");
    let ids: Vec<&str> = response.results.iter().map(|p| p.arxiv_id.as_str()).collect();
    assert_eq!(ids, vec!["2401.00003", "2401.00002"]);

    let capped = engine.papers_by_keyword("attention", Some(1)).expect("keyword");
    assert_eq!(capped.results.len(), 1);
}

#[test]
fn author_results_are_oldest_first() {
    let table = loaded_table();
    let engine = QueryEngine::new(&table);
    let response = engine.papers_by_author("Grace Hopper").expect("author");
    let ids: Vec<&str> = response.results.iter().map(|p| p.arxiv_id.as_str()).collect();
    assert_eq!(ids, vec!["2401.00003", "2402.00004"]);
}
