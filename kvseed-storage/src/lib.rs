//! kvseed Storage - Store Client Trait and Backends
//!
//! Defines the column-family key-value store the fixture is written into.
//! `MockStore` keeps everything in memory; `LmdbStore` persists to an LMDB
//! environment so a separate process can read the fixture back.

pub mod lmdb;

pub use lmdb::{LmdbStore, LmdbStoreError};

use std::collections::BTreeMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use kvseed_core::{
    validate_row_key, Cell, QualifiedColumn, RowCells, SeedConfig,
    SeedResult, StoreBackend, StoreError, TableDescriptor,
};

// ============================================================================
// STORE CLIENT TRAIT
// ============================================================================

/// Client for a column-family key-value store.
///
/// Semantics follow HBase: tables declare column families up front, a put
/// into an undeclared family fails, and writing an existing cell replaces it.
pub trait StoreClient: Send + Sync {
    // === Table Operations ===

    /// Create a table. Fails with `TableExists` if it is already present.
    fn create_table(&self, descriptor: &TableDescriptor) -> SeedResult<()>;

    /// Create a table with a single column family.
    fn create(&self, table: &str, family: &str) -> SeedResult<()> {
        self.create_table(&TableDescriptor::new(table, [family])?)
    }

    /// Get a table's schema, `None` if absent.
    fn describe(&self, table: &str) -> SeedResult<Option<TableDescriptor>>;

    fn table_exists(&self, table: &str) -> SeedResult<bool> {
        Ok(self.describe(table)?.is_some())
    }

    /// All table names, sorted.
    fn list_tables(&self) -> SeedResult<Vec<String>>;

    /// Remove a table and its cells. Returns `false` if it did not exist.
    fn drop_table(&self, table: &str) -> SeedResult<bool>;

    // === Cell Operations ===

    /// Write one cell.
    fn put(&self, table: &str, row: &str, column: &QualifiedColumn, value: &[u8])
        -> SeedResult<()>;

    /// Read one cell.
    fn get(&self, table: &str, row: &str, column: &QualifiedColumn) -> SeedResult<Option<Cell>>;

    /// All cells of a row; empty if the row does not exist.
    fn row(&self, table: &str, row: &str) -> SeedResult<BTreeMap<QualifiedColumn, Cell>>;

    /// Every row of a table in row-key order.
    fn scan(&self, table: &str) -> SeedResult<Vec<RowCells>>;

    /// Delete every cell of a row. Returns `false` if the row had no cells.
    fn delete_row(&self, table: &str, row: &str) -> SeedResult<bool>;
}

/// Open the store named by a seeder configuration.
pub fn open_store(config: &SeedConfig) -> SeedResult<Box<dyn StoreClient>> {
    match config.store.backend {
        StoreBackend::Memory => Ok(Box::new(MockStore::new())),
        StoreBackend::Lmdb => {
            let path = config.store.path.as_deref().ok_or(
                kvseed_core::ConfigError::MissingRequired { field: "store.path" },
            )?;
            let store = LmdbStore::open(path, config.store.max_size_mb, config.store.max_tables)?;
            Ok(Box::new(store))
        }
    }
}

/// Current time truncated to the millisecond, the precision cells keep.
pub(crate) fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

// ============================================================================
// MOCK STORE
// ============================================================================

#[derive(Debug)]
struct MockTable {
    descriptor: TableDescriptor,
    rows: BTreeMap<String, BTreeMap<QualifiedColumn, Cell>>,
}

/// In-memory store for tests and dry runs.
#[derive(Debug, Default)]
pub struct MockStore {
    tables: RwLock<BTreeMap<String, MockTable>>,
}

impl MockStore {
    /// Create an empty mock store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cells stored in a table, 0 if absent.
    pub fn cell_count(&self, table: &str) -> SeedResult<usize> {
        let tables = self.tables.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(tables
            .get(table)
            .map(|t| t.rows.values().map(BTreeMap::len).sum())
            .unwrap_or(0))
    }
}

fn not_found(table: &str) -> StoreError {
    StoreError::TableNotFound {
        table: table.to_string(),
    }
}

impl StoreClient for MockStore {
    fn create_table(&self, descriptor: &TableDescriptor) -> SeedResult<()> {
        let mut tables = self.tables.write().map_err(|_| StoreError::LockPoisoned)?;
        if tables.contains_key(&descriptor.name) {
            return Err(StoreError::TableExists {
                table: descriptor.name.clone(),
            }
            .into());
        }
        tables.insert(
            descriptor.name.clone(),
            MockTable {
                descriptor: descriptor.clone(),
                rows: BTreeMap::new(),
            },
        );
        tracing::debug!(table = %descriptor.name, families = ?descriptor.families, "created table");
        Ok(())
    }

    fn describe(&self, table: &str) -> SeedResult<Option<TableDescriptor>> {
        let tables = self.tables.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(tables.get(table).map(|t| t.descriptor.clone()))
    }

    fn list_tables(&self) -> SeedResult<Vec<String>> {
        let tables = self.tables.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(tables.keys().cloned().collect())
    }

    fn drop_table(&self, table: &str) -> SeedResult<bool> {
        let mut tables = self.tables.write().map_err(|_| StoreError::LockPoisoned)?;
        let dropped = tables.remove(table).is_some();
        if dropped {
            tracing::debug!(table, "dropped table");
        }
        Ok(dropped)
    }

    fn put(
        &self,
        table: &str,
        row: &str,
        column: &QualifiedColumn,
        value: &[u8],
    ) -> SeedResult<()> {
        validate_row_key(row)?;
        let mut tables = self.tables.write().map_err(|_| StoreError::LockPoisoned)?;
        let t = tables.get_mut(table).ok_or_else(|| not_found(table))?;
        t.descriptor.check_column(column)?;

        t.rows
            .entry(row.to_string())
            .or_default()
            .insert(column.clone(), Cell::new(value, now_millis()));
        Ok(())
    }

    fn get(&self, table: &str, row: &str, column: &QualifiedColumn) -> SeedResult<Option<Cell>> {
        let tables = self.tables.read().map_err(|_| StoreError::LockPoisoned)?;
        let t = tables.get(table).ok_or_else(|| not_found(table))?;
        Ok(t.rows.get(row).and_then(|cells| cells.get(column)).cloned())
    }

    fn row(&self, table: &str, row: &str) -> SeedResult<BTreeMap<QualifiedColumn, Cell>> {
        let tables = self.tables.read().map_err(|_| StoreError::LockPoisoned)?;
        let t = tables.get(table).ok_or_else(|| not_found(table))?;
        Ok(t.rows.get(row).cloned().unwrap_or_default())
    }

    fn scan(&self, table: &str) -> SeedResult<Vec<RowCells>> {
        let tables = self.tables.read().map_err(|_| StoreError::LockPoisoned)?;
        let t = tables.get(table).ok_or_else(|| not_found(table))?;
        Ok(t.rows
            .iter()
            .map(|(row, cells)| RowCells {
                row: row.clone(),
                cells: cells.clone(),
            })
            .collect())
    }

    fn delete_row(&self, table: &str, row: &str) -> SeedResult<bool> {
        let mut tables = self.tables.write().map_err(|_| StoreError::LockPoisoned)?;
        let t = tables.get_mut(table).ok_or_else(|| not_found(table))?;
        Ok(t.rows.remove(row).is_some())
    }
}
