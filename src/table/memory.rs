//! In-process reference implementation of [`TableClient`].
//!
//! Keyspaces are `BTreeMap`s keyed by `(partition_key, sort_key)`, so a
//! partition query is a contiguous range scan, the same access shape the
//! real store provides. Test builders can start without a table, with a
//! subset of indexes, with delayed activation, or with injected capacity
//! faults.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use tracing::debug;

use crate::errors::IndexError;
use crate::schema::{SecondaryIndex, TableSchema};
use crate::table::{
    BatchOutcome, IndexDescription, SortCondition, TableClient, TableDescription, TableQuery,
    TableRow, TableStatus,
};
use crate::types::{PartitionKey, SortKey};

type NaturalKey = (PartitionKey, SortKey);

/// In-memory table with last-writer-wins upserts at the natural key.
pub struct MemoryTable {
    inner: Mutex<Inner>,
}

struct Inner {
    table: Option<TableState>,
    /// Describe calls each new table/index reports `Creating` for.
    activation_polls: usize,
    /// Row puts to reject before accepting writes again.
    faults_remaining: usize,
}

struct TableState {
    partition_attr: String,
    sort_attr: String,
    polls_until_active: usize,
    rows: BTreeMap<NaturalKey, TableRow>,
    indexes: HashMap<SecondaryIndex, IndexState>,
}

#[derive(Default)]
struct IndexState {
    polls_until_active: usize,
    /// Index key -> primary natural key (projection is always ALL).
    entries: BTreeMap<NaturalKey, NaturalKey>,
}

impl MemoryTable {
    /// A store with no table yet; the provisioner must create it.
    pub fn empty() -> Self {
        Self {
            inner: Mutex::new(Inner {
                table: None,
                activation_polls: 0,
                faults_remaining: 0,
            }),
        }
    }

    /// A store with the declared table and every index already active.
    pub fn provisioned() -> Self {
        Self::provisioned_with(&SecondaryIndex::ALL)
    }

    /// A store with the table active but only `indexes` present. Used to
    /// exercise additive index evolution.
    pub fn provisioned_with(indexes: &[SecondaryIndex]) -> Self {
        let schema = TableSchema::declared();
        let table = Self::empty();
        {
            let mut inner = table.lock();
            inner.table = Some(TableState::new(&schema, indexes, 0));
        }
        table
    }

    /// Report `Creating` for the first `polls` describe calls after each
    /// create/add-index operation.
    pub fn with_activation_polls(self, polls: usize) -> Self {
        self.lock().activation_polls = polls;
        self
    }

    /// Reject the next `count` row puts as capacity overruns.
    pub fn with_capacity_faults(self, count: usize) -> Self {
        self.lock().faults_remaining = count;
        self
    }

    /// Total number of stored rows.
    pub fn row_count(&self) -> usize {
        self.lock()
            .table
            .as_ref()
            .map(|state| state.rows.len())
            .unwrap_or(0)
    }

    /// Natural keys of all stored rows, in primary key order.
    pub(crate) fn natural_keys(&self) -> Vec<NaturalKey> {
        self.lock()
            .table
            .as_ref()
            .map(|state| state.rows.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("memory table poisoned")
    }
}

impl TableState {
    fn new(schema: &TableSchema, indexes: &[SecondaryIndex], activation_polls: usize) -> Self {
        Self {
            partition_attr: schema.partition_attr.to_string(),
            sort_attr: schema.sort_attr.to_string(),
            polls_until_active: activation_polls,
            rows: BTreeMap::new(),
            indexes: indexes
                .iter()
                .map(|index| {
                    (
                        *index,
                        IndexState {
                            polls_until_active: activation_polls,
                            entries: BTreeMap::new(),
                        },
                    )
                })
                .collect(),
        }
    }

    fn upsert(&mut self, row: TableRow) {
        let natural = row.natural_key();
        if let Some(prev) = self.rows.get(&natural) {
            if let Some(prev_secondary) = &prev.secondary {
                if let Some(index) = self.indexes.get_mut(&prev_secondary.index) {
                    index.entries.remove(&(
                        prev_secondary.partition_key.clone(),
                        prev_secondary.sort_key.clone(),
                    ));
                }
            }
        }
        if let Some(secondary) = &row.secondary {
            if let Some(index) = self.indexes.get_mut(&secondary.index) {
                index.entries.insert(
                    (secondary.partition_key.clone(), secondary.sort_key.clone()),
                    natural.clone(),
                );
            }
        }
        self.rows.insert(natural, row);
    }
}

impl TableClient for MemoryTable {
    fn describe(&self) -> Result<Option<TableDescription>, IndexError> {
        let mut inner = self.lock();
        let Some(state) = inner.table.as_mut() else {
            return Ok(None);
        };
        let status = poll_status(&mut state.polls_until_active);
        let indexes = state
            .indexes
            .iter_mut()
            .map(|(index, index_state)| IndexDescription {
                index: *index,
                status: poll_status(&mut index_state.polls_until_active),
            })
            .collect();
        Ok(Some(TableDescription {
            status,
            partition_attr: state.partition_attr.clone(),
            sort_attr: state.sort_attr.clone(),
            indexes,
        }))
    }

    fn create(&self, schema: &TableSchema) -> Result<(), IndexError> {
        let mut inner = self.lock();
        if inner.table.is_some() {
            return Err(IndexError::Store("table already exists".to_string()));
        }
        let activation_polls = inner.activation_polls;
        inner.table = Some(TableState::new(schema, &schema.indexes, activation_polls));
        debug!(indexes = schema.indexes.len(), "created table");
        Ok(())
    }

    fn add_indexes(&self, indexes: &[SecondaryIndex]) -> Result<(), IndexError> {
        let mut inner = self.lock();
        let activation_polls = inner.activation_polls;
        let state = inner
            .table
            .as_mut()
            .ok_or_else(|| IndexError::Store("table does not exist".to_string()))?;
        for index in indexes {
            if state.indexes.contains_key(index) {
                continue;
            }
            // Backfill from existing rows, as the store would.
            let mut entries = BTreeMap::new();
            for (natural, row) in &state.rows {
                if let Some(secondary) = &row.secondary {
                    if secondary.index == *index {
                        entries.insert(
                            (secondary.partition_key.clone(), secondary.sort_key.clone()),
                            natural.clone(),
                        );
                    }
                }
            }
            let backfilled = entries.len();
            state.indexes.insert(
                *index,
                IndexState {
                    polls_until_active: activation_polls,
                    entries,
                },
            );
            debug!(index = index.name(), backfilled, "added secondary index");
        }
        Ok(())
    }

    fn batch_put(&self, rows: Vec<TableRow>) -> Result<BatchOutcome, IndexError> {
        let mut inner = self.lock();
        ready_table(&mut inner)?;
        // Model partial batch acceptance: throttle row by row while fault
        // budget remains, accept the rest.
        let mut unprocessed = Vec::new();
        let mut accepted = Vec::new();
        for row in rows {
            if inner.faults_remaining > 0 {
                inner.faults_remaining -= 1;
                unprocessed.push(row);
            } else {
                accepted.push(row);
            }
        }
        let state = ready_table(&mut inner)?;
        for row in accepted {
            state.upsert(row);
        }
        Ok(BatchOutcome { unprocessed })
    }

    fn query(&self, request: &TableQuery) -> Result<Vec<TableRow>, IndexError> {
        let mut inner = self.lock();
        let state = ready_table(&mut inner)?;
        let mut rows = match request.index {
            None => scan(&state.rows, &request.partition_key, &request.sort),
            Some(index) => {
                let index_state = state.indexes.get(&index).ok_or_else(|| {
                    IndexError::Store(format!("unknown index '{}'", index.name()))
                })?;
                if index_state.polls_until_active > 0 {
                    return Err(IndexError::Store(format!(
                        "index '{}' is not ready",
                        index.name()
                    )));
                }
                scan(&index_state.entries, &request.partition_key, &request.sort)
                    .into_iter()
                    .filter_map(|natural| state.rows.get(&natural).cloned())
                    .collect()
            }
        };
        if request.descending {
            rows.reverse();
        }
        if let Some(limit) = request.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }
}

/// Report and advance a `Creating` countdown.
fn poll_status(polls_until_active: &mut usize) -> TableStatus {
    if *polls_until_active > 0 {
        *polls_until_active -= 1;
        TableStatus::Creating
    } else {
        TableStatus::Active
    }
}

fn ready_table(inner: &mut Inner) -> Result<&mut TableState, IndexError> {
    let state = inner
        .table
        .as_mut()
        .ok_or_else(|| IndexError::Store("table does not exist".to_string()))?;
    if state.polls_until_active > 0 {
        return Err(IndexError::Store("table is not ready".to_string()));
    }
    Ok(state)
}

/// Contiguous range scan of one partition, inclusive on both bounds.
fn scan<V: Clone>(
    map: &BTreeMap<NaturalKey, V>,
    partition_key: &str,
    sort: &SortCondition,
) -> Vec<V> {
    let from = match sort {
        SortCondition::All => String::new(),
        SortCondition::Between { lo, .. } => lo.clone(),
    };
    map.range((partition_key.to_string(), from)..)
        .take_while(|((partition, sort_key), _)| {
            if partition != partition_key {
                return false;
            }
            match sort {
                SortCondition::All => true,
                SortCondition::Between { hi, .. } => sort_key <= hi,
            }
        })
        .map(|(_, value)| value.clone())
        .collect()
}
