//! Table provisioning: create the declared shape or reconcile an existing
//! table with it before any fan-out write happens.

use std::thread;

use tracing::{debug, info};

use crate::errors::IndexError;
use crate::retry::RetryPolicy;
use crate::schema::{SecondaryIndex, TableSchema};
use crate::table::{TableClient, TableDescription};

/// Ensures the store exposes the primary key layout and every secondary
/// index the schema declares.
///
/// Reconciliation is additive only: missing indexes are created, existing
/// ones are never dropped or redefined, since that could destroy
/// already-loaded data. Safe to run repeatedly, and loaders must run it to
/// completion before writing so newly created indexes are queryable.
#[derive(Clone, Debug)]
pub struct Provisioner {
    schema: TableSchema,
    poll: RetryPolicy,
}

impl Default for Provisioner {
    fn default() -> Self {
        Self {
            schema: TableSchema::declared(),
            poll: RetryPolicy::default(),
        }
    }
}

impl Provisioner {
    /// Provision against a specific schema (tests shrink this).
    pub fn new(schema: TableSchema) -> Self {
        Self {
            schema,
            poll: RetryPolicy::default(),
        }
    }

    /// Polling policy used while waiting for the table to become usable.
    pub fn with_poll_policy(mut self, poll: RetryPolicy) -> Self {
        self.poll = poll;
        self
    }

    /// Create or reconcile the table, blocking until it is queryable.
    pub fn ensure(&self, client: &dyn TableClient) -> Result<(), IndexError> {
        match client.describe()? {
            None => {
                info!(indexes = self.schema.indexes.len(), "creating table");
                client.create(&self.schema)?;
            }
            Some(description) => {
                self.verify_key_layout(&description)?;
                let missing = self.missing_indexes(&description);
                if missing.is_empty() {
                    debug!("table already matches declared schema");
                } else {
                    info!(
                        missing = ?missing.iter().map(|i| i.name()).collect::<Vec<_>>(),
                        "adding missing secondary indexes"
                    );
                    client.add_indexes(&missing)?;
                }
            }
        }
        self.wait_until_ready(client)
    }

    /// Fatal mismatch check: an existing table whose primary key layout
    /// differs cannot be reconciled additively.
    fn verify_key_layout(&self, description: &TableDescription) -> Result<(), IndexError> {
        if description.partition_attr != self.schema.partition_attr
            || description.sort_attr != self.schema.sort_attr
        {
            return Err(IndexError::SchemaMismatch {
                details: format!(
                    "primary key is ({}, {}), declared ({}, {})",
                    description.partition_attr,
                    description.sort_attr,
                    self.schema.partition_attr,
                    self.schema.sort_attr
                ),
            });
        }
        Ok(())
    }

    fn missing_indexes(&self, description: &TableDescription) -> Vec<SecondaryIndex> {
        self.schema
            .indexes
            .iter()
            .copied()
            .filter(|declared| {
                !description
                    .indexes
                    .iter()
                    .any(|existing| existing.index == *declared)
            })
            .collect()
    }

    /// Poll describe until the table and all declared indexes are active,
    /// within the bounded poll budget.
    fn wait_until_ready(&self, client: &dyn TableClient) -> Result<(), IndexError> {
        let mut attempts = 0usize;
        loop {
            if let Some(description) = client.describe()? {
                if description.satisfies(&self.schema) {
                    debug!(polls = attempts + 1, "table ready");
                    return Ok(());
                }
            }
            attempts += 1;
            if !self.poll.allows(attempts) {
                return Err(IndexError::ProvisionTimeout { attempts });
            }
            thread::sleep(self.poll.delay_for(attempts - 1));
        }
    }
}
