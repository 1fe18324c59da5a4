//! File-backed [`TableClient`] for local, persistent runs.
//!
//! Layout inside the datastore: a versioned meta entry describing the
//! provisioned shape, a manifest of natural keys, and one bitcode-encoded
//! row per entry key. Rows are loaded through batched reads at open and
//! written through on every accepted batch, so a reopened table answers
//! the same queries as the process that wrote it.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use simd_r_drive::storage_engine::DataStore;
use simd_r_drive::storage_engine::traits::{DataStoreReader, DataStoreWriter};
use tracing::debug;

use crate::constants::file_table::{
    DEFAULT_STORE_FILENAME, MANIFEST_KEY, META_KEY, ROW_KEY_PREFIX, ROW_READ_BATCH, STORE_VERSION,
};
use crate::errors::IndexError;
use crate::schema::{SecondaryIndex, TableSchema};
use crate::table::{
    BatchOutcome, MemoryTable, TableClient, TableDescription, TableQuery, TableRow,
};
use crate::types::{PartitionKey, SortKey};

#[derive(bitcode::Encode, bitcode::Decode)]
struct StoreMeta {
    version: u8,
    created: bool,
    indexes: Vec<SecondaryIndex>,
}

/// Persistent table backed by a [`DataStore`] file.
///
/// Query logic is delegated to the same keyspaces as [`MemoryTable`]; the
/// datastore holds the durable copy.
pub struct FileTable {
    store: DataStore,
    memory: MemoryTable,
}

impl std::fmt::Debug for FileTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileTable").finish_non_exhaustive()
    }
}

impl FileTable {
    /// Open (or create) a persisted table at `path`.
    ///
    /// A meta entry written by an incompatible version fails with
    /// [`IndexError::SchemaMismatch`] before any read or write.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, IndexError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let store = DataStore::open(path.as_path())
            .map_err(|err| IndexError::Store(format!("table store open failed: {err}")))?;

        let meta = match read_bytes(&store, META_KEY)? {
            None => None,
            Some(bytes) => Some(decode_meta(&bytes)?),
        };
        let table = match meta {
            None => Self {
                store,
                memory: MemoryTable::empty(),
            },
            Some(meta) if !meta.created => Self {
                store,
                memory: MemoryTable::empty(),
            },
            Some(meta) => {
                let memory = MemoryTable::provisioned_with(&meta.indexes);
                let table = Self { store, memory };
                let restored = table.load_rows()?;
                debug!(path = %path.display(), restored, "reopened file table");
                table
            }
        };
        Ok(table)
    }

    /// Default table file path inside `dir`.
    pub fn default_path_in_dir<P: AsRef<Path>>(dir: P) -> PathBuf {
        dir.as_ref().join(DEFAULT_STORE_FILENAME)
    }

    /// Read the manifest and restore every row into the in-memory keyspaces.
    fn load_rows(&self) -> Result<usize, IndexError> {
        let manifest = match read_bytes(&self.store, MANIFEST_KEY)? {
            None => return Ok(0),
            Some(bytes) => decode_manifest(&bytes)?,
        };
        let mut restored = 0;
        for chunk in manifest.chunks(ROW_READ_BATCH) {
            let keys: Vec<Vec<u8>> = chunk.iter().map(row_key).collect();
            let key_refs: Vec<&[u8]> = keys.iter().map(|key| key.as_slice()).collect();
            let entries = self
                .store
                .batch_read(&key_refs)
                .map_err(|err| IndexError::Store(format!("table store read failed: {err}")))?;
            let mut rows = Vec::with_capacity(chunk.len());
            for (natural, entry) in chunk.iter().zip(entries.into_iter()) {
                let entry = entry.ok_or_else(|| {
                    IndexError::Store(format!(
                        "manifest references missing row ({}, {})",
                        natural.0, natural.1
                    ))
                })?;
                let row: TableRow = bitcode::decode(entry.as_ref()).map_err(|err| {
                    IndexError::Store(format!("row decode failed: {err}"))
                })?;
                rows.push(row);
            }
            restored += rows.len();
            self.memory.batch_put(rows)?;
        }
        Ok(restored)
    }

    /// Persist the provisioned shape.
    fn write_meta(&self, created: bool, indexes: Vec<SecondaryIndex>) -> Result<(), IndexError> {
        let meta = StoreMeta {
            version: STORE_VERSION,
            created,
            indexes,
        };
        write_bytes(&self.store, META_KEY, &bitcode::encode(&meta))
    }

    /// Persist accepted rows plus the refreshed manifest in one batch.
    fn write_rows(&self, rows: &[TableRow]) -> Result<(), IndexError> {
        let mut entries: Vec<(Vec<u8>, Vec<u8>)> = Vec::with_capacity(rows.len() + 1);
        for row in rows {
            entries.push((row_key(&row.natural_key()), bitcode::encode(row)));
        }
        entries.push((MANIFEST_KEY.to_vec(), bitcode::encode(&self.memory.natural_keys())));
        let entry_refs: Vec<(&[u8], &[u8])> = entries
            .iter()
            .map(|(key, value)| (key.as_slice(), value.as_slice()))
            .collect();
        self.store
            .batch_write(&entry_refs)
            .map(|_| ())
            .map_err(|err| IndexError::Store(format!("table store write failed: {err}")))
    }

    /// Secondary indexes the in-memory table currently exposes.
    fn current_indexes(&self) -> Result<Vec<SecondaryIndex>, IndexError> {
        let description = self
            .memory
            .describe()?
            .ok_or_else(|| IndexError::Store("table does not exist".to_string()))?;
        Ok(description.indexes.iter().map(|desc| desc.index).collect())
    }
}

impl TableClient for FileTable {
    fn describe(&self) -> Result<Option<TableDescription>, IndexError> {
        self.memory.describe()
    }

    fn create(&self, schema: &TableSchema) -> Result<(), IndexError> {
        self.memory.create(schema)?;
        self.write_meta(true, schema.indexes.clone())
    }

    fn add_indexes(&self, indexes: &[SecondaryIndex]) -> Result<(), IndexError> {
        self.memory.add_indexes(indexes)?;
        self.write_meta(true, self.current_indexes()?)
    }

    fn batch_put(&self, rows: Vec<TableRow>) -> Result<BatchOutcome, IndexError> {
        let outcome = self.memory.batch_put(rows.clone())?;
        let rejected: HashSet<(PartitionKey, SortKey)> = outcome
            .unprocessed
            .iter()
            .map(TableRow::natural_key)
            .collect();
        let accepted: Vec<TableRow> = rows
            .into_iter()
            .filter(|row| !rejected.contains(&row.natural_key()))
            .collect();
        if !accepted.is_empty() {
            self.write_rows(&accepted)?;
        }
        Ok(outcome)
    }

    fn query(&self, request: &TableQuery) -> Result<Vec<TableRow>, IndexError> {
        self.memory.query(request)
    }
}

fn row_key(natural: &(PartitionKey, SortKey)) -> Vec<u8> {
    let encoded = bitcode::encode(natural);
    let mut key = Vec::with_capacity(ROW_KEY_PREFIX.len() + encoded.len());
    key.extend_from_slice(ROW_KEY_PREFIX);
    key.extend_from_slice(&encoded);
    key
}

fn read_bytes(store: &DataStore, key: &[u8]) -> Result<Option<Vec<u8>>, IndexError> {
    match store.read(key) {
        Ok(Some(entry)) => Ok(Some(entry.as_ref().to_vec())),
        Ok(None) => Ok(None),
        Err(err) => Err(IndexError::Store(format!("table store read failed: {err}"))),
    }
}

fn write_bytes(store: &DataStore, key: &[u8], bytes: &[u8]) -> Result<(), IndexError> {
    store
        .write(key, bytes)
        .map(|_| ())
        .map_err(|err| IndexError::Store(format!("table store write failed: {err}")))
}

fn decode_meta(bytes: &[u8]) -> Result<StoreMeta, IndexError> {
    let meta: StoreMeta = bitcode::decode(bytes).map_err(|err| IndexError::SchemaMismatch {
        details: format!("table meta decode failed: {err}"),
    })?;
    if meta.version != STORE_VERSION {
        return Err(IndexError::SchemaMismatch {
            details: format!(
                "table store version mismatch (expected {STORE_VERSION}, found {})",
                meta.version
            ),
        });
    }
    Ok(meta)
}

fn decode_manifest(bytes: &[u8]) -> Result<Vec<(PartitionKey, SortKey)>, IndexError> {
    bitcode::decode(bytes)
        .map_err(|err| IndexError::Store(format!("manifest decode failed: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{RecordKind, RowPayload, SortCondition};
    use tempfile::tempdir;

    fn sample_row(sk: &str) -> TableRow {
        TableRow {
            partition_key: "CATEGORY#cs.AI".to_string(),
            sort_key: sk.to_string(),
            kind: RecordKind::Category,
            secondary: None,
            payload: RowPayload {
                arxiv_id: "p1".to_string(),
                title: "T".to_string(),
                authors: vec!["Ada".to_string()],
                categories: vec!["cs.AI".to_string()],
                published: "2024-01-05T00:00:00Z".to_string(),
                published_date: "2024-01-05".to_string(),
                abstract_text: None,
                keywords: None,
            },
        }
    }

    #[test]
    fn rows_survive_reopen() {
        let dir = tempdir().expect("tempdir");
        let path = FileTable::default_path_in_dir(dir.path());

        {
            let table = FileTable::open(&path).expect("open");
            table.create(&TableSchema::declared()).expect("create");
            table
                .batch_put(vec![sample_row("2024-01-05#p1"), sample_row("2024-01-06#p2")])
                .expect("put");
        }

        let reopened = FileTable::open(&path).expect("reopen");
        let rows = reopened
            .query(&TableQuery {
                index: None,
                partition_key: "CATEGORY#cs.AI".to_string(),
                sort: SortCondition::All,
                descending: false,
                limit: None,
            })
            .expect("query");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].payload.arxiv_id, "p1");
    }

    #[test]
    fn unprovisioned_store_reopens_without_a_table() {
        let dir = tempdir().expect("tempdir");
        let path = FileTable::default_path_in_dir(dir.path());
        {
            let _table = FileTable::open(&path).expect("open");
        }
        let reopened = FileTable::open(&path).expect("reopen");
        assert!(reopened.describe().expect("describe").is_none());
    }

    #[test]
    fn version_mismatch_is_a_schema_error() {
        let dir = tempdir().expect("tempdir");
        let path = FileTable::default_path_in_dir(dir.path());
        {
            let table = FileTable::open(&path).expect("open");
            table.create(&TableSchema::declared()).expect("create");
        }
        {
            let store = DataStore::open(path.as_path()).expect("raw open");
            let bogus = StoreMeta {
                version: STORE_VERSION + 1,
                created: true,
                indexes: Vec::new(),
            };
            store.write(META_KEY, &bitcode::encode(&bogus)).expect("write");
        }
        let err = FileTable::open(&path).unwrap_err();
        assert!(matches!(err, IndexError::SchemaMismatch { .. }));
    }
}
