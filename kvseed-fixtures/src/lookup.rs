//! The shared lookup table.
//!
//! One row per data table, keyed by the data table's name. Each column under
//! family `mapping` names a logical field and stores the `family:qualifier`
//! of the data-table column backing it.

use std::collections::BTreeMap;

use kvseed_core::{FixtureError, QualifiedColumn, SeedResult, TableDescriptor};
use kvseed_storage::StoreClient;

pub const LOOKUP_TABLE: &str = "pxflookup";

pub const LOOKUP_FAMILY: &str = "mapping";

/// Access to the lookup table through a store client.
pub struct LookupTable<'a> {
    store: &'a dyn StoreClient,
    table: String,
}

impl<'a> LookupTable<'a> {
    pub fn new(store: &'a dyn StoreClient) -> Self {
        Self::with_table(store, LOOKUP_TABLE)
    }

    pub fn with_table(store: &'a dyn StoreClient, table: impl Into<String>) -> Self {
        Self {
            store,
            table: table.into(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Create the lookup table if it is absent. Returns whether it was
    /// created.
    pub fn ensure_exists(&self) -> SeedResult<bool> {
        if self.store.table_exists(&self.table)? {
            return Ok(false);
        }
        self.store
            .create_table(&TableDescriptor::new(self.table.as_str(), [LOOKUP_FAMILY])?)?;
        tracing::info!(table = %self.table, "created lookup table");
        Ok(true)
    }

    /// Write one mapping cell per `(logical name, source column)`.
    pub fn write_mappings<'m, I>(&self, data_table: &str, mappings: I) -> SeedResult<usize>
    where
        I: IntoIterator<Item = (&'m str, &'m QualifiedColumn)>,
    {
        let mut written = 0;
        for (logical, source) in mappings {
            let column = QualifiedColumn::new(LOOKUP_FAMILY, logical)?;
            self.store.put(
                &self.table,
                data_table,
                &column,
                source.to_string().as_bytes(),
            )?;
            written += 1;
        }
        Ok(written)
    }

    /// Resolve the mappings for `data_table`.
    ///
    /// `None` when the lookup table is missing, lacks the `mapping` family,
    /// or has no row for `data_table`. Keys are lower-cased.
    pub fn mappings(&self, data_table: &str) -> SeedResult<Option<BTreeMap<String, QualifiedColumn>>> {
        let descriptor = match self.store.describe(&self.table)? {
            Some(d) => d,
            None => {
                tracing::debug!(table = %self.table, "lookup table does not exist");
                return Ok(None);
            }
        };
        if !descriptor.has_family(LOOKUP_FAMILY) {
            tracing::warn!(
                table = %self.table,
                family = LOOKUP_FAMILY,
                "lookup table has no mapping family"
            );
            return Ok(None);
        }

        let cells = self.store.row(&self.table, data_table)?;
        let mut mappings = BTreeMap::new();
        for (column, cell) in cells {
            if column.family() != LOOKUP_FAMILY {
                continue;
            }
            let value = cell.value_lossy();
            let source =
                QualifiedColumn::parse(&value).map_err(|_| FixtureError::MalformedMapping {
                    table: data_table.to_string(),
                    field: column.qualifier().to_string(),
                    value: value.clone(),
                })?;
            mappings.insert(column.qualifier().to_lowercase(), source);
        }

        if mappings.is_empty() {
            tracing::debug!(table = %self.table, data_table, "no mappings for table");
            return Ok(None);
        }
        Ok(Some(mappings))
    }

    /// Delete the mapping row for `data_table`. The lookup table itself is
    /// shared and never dropped.
    pub fn remove(&self, data_table: &str) -> SeedResult<bool> {
        if !self.store.table_exists(&self.table)? {
            return Ok(false);
        }
        self.store.delete_row(&self.table, data_table)
    }
}
