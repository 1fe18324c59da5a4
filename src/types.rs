/// arXiv identifier for a paper (stable across loads).
/// Example: `2401.01234`
pub type PaperId = String;
/// Category label a paper is filed under.
/// Examples: `cs.AI`, `cs.CL`, `stat.ML`
pub type Category = String;
/// Author name exactly as it appears in the source record.
/// Example: `Ada Lovelace`
pub type AuthorName = String;
/// Lowercase keyword extracted from an abstract.
/// Examples: `transformer`, `zero-shot`
pub type Keyword = String;
/// ISO-8601 publication timestamp.
/// Example: `2024-01-05T00:00:00Z`
pub type Timestamp = String;
/// Calendar-date portion of a publication timestamp.
/// Example: `2024-01-05`
pub type DateString = String;
/// Physical partition key of a table row.
/// Examples: `CATEGORY#cs.AI`, `META#AUTHOR#Ada Lovelace`
pub type PartitionKey = String;
/// Physical sort key of a table row within its partition.
/// Examples: `2024-01-05#2401.01234`, `DETAILS#2024-01-05`
pub type SortKey = String;
/// Reason class used when tallying skipped input records.
/// Examples: `missing_id`, `unreadable_record`
pub type SkipReason = String;
