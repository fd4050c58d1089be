//! LMDB-backed store.
//!
//! Uses the heed crate (Rust bindings for LMDB). The environment holds two
//! named databases:
//!
//! - `__catalog`: table name -> JSON `TableDescriptor`
//! - `__cells`: every cell of every table
//!
//! # Cell Format
//!
//! Key: `[table][0x00][row][0x00][family][0x00][qualifier]`. Table names, row
//! keys and qualifiers may not contain NUL, so keys sort by table, then row,
//! and a table's (or a row's) cells are contiguous.
//!
//! Value: `[timestamp millis: 8 bytes LE][value bytes]`.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use heed::types::{Bytes, Str};
use heed::{Database, Env, EnvOpenOptions, RoTxn};
use kvseed_core::{
    validate_row_key, Cell, QualifiedColumn, RowCells, SeedError, SeedResult, StoreError,
    TableDescriptor,
};

use crate::{now_millis, StoreClient};

const CATALOG_DB: &str = "__catalog";
const CELLS_DB: &str = "__cells";
const NAMED_DBS: u32 = 2;
const SEPARATOR: u8 = 0x00;

/// Error type for LMDB store operations.
#[derive(Debug, thiserror::Error)]
pub enum LmdbStoreError {
    /// Failed to open or create the LMDB environment.
    #[error("Failed to open LMDB environment: {0}")]
    EnvOpen(String),

    /// Failed to open a database within the environment.
    #[error("Failed to open database: {0}")]
    DbOpen(String),

    /// Transaction error.
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Descriptor (de)serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Stored bytes do not match the expected layout.
    #[error("Corrupt entry: {0}")]
    Corrupt(String),

    /// Creating a table would exceed the live-table cap.
    #[error("Table limit of {0} reached")]
    TableLimit(u32),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<LmdbStoreError> for SeedError {
    fn from(e: LmdbStoreError) -> Self {
        match e {
            LmdbStoreError::Corrupt(reason) => SeedError::Store(StoreError::Corrupt { reason }),
            other => SeedError::Store(StoreError::Backend {
                reason: other.to_string(),
            }),
        }
    }
}

fn txn_err(e: heed::Error) -> LmdbStoreError {
    LmdbStoreError::Transaction(e.to_string())
}

/// Store persisted in an LMDB environment directory.
pub struct LmdbStore {
    env: Env,
    catalog: Database<Str, Bytes>,
    cells: Database<Bytes, Bytes>,
    max_tables: u32,
}

impl LmdbStore {
    /// Open (or create) a store.
    ///
    /// # Arguments
    ///
    /// * `path` - Directory where LMDB files are kept; created if missing
    /// * `max_size_mb` - Map size of the environment in megabytes
    /// * `max_tables` - Upper bound on the number of live tables
    pub fn open<P: AsRef<Path>>(
        path: P,
        max_size_mb: usize,
        max_tables: u32,
    ) -> Result<Self, LmdbStoreError> {
        if max_tables == 0 {
            return Err(LmdbStoreError::EnvOpen("max_tables must be > 0".into()));
        }
        let map_size = max_size_mb
            .checked_mul(1024 * 1024)
            .filter(|size| *size > 0)
            .ok_or_else(|| {
                LmdbStoreError::EnvOpen(format!("invalid map size of {} MB", max_size_mb))
            })?;

        std::fs::create_dir_all(&path)?;

        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(NAMED_DBS)
                .open(path.as_ref())
        }
        .map_err(|e| LmdbStoreError::EnvOpen(e.to_string()))?;

        let mut wtxn = env.write_txn().map_err(txn_err)?;
        let catalog: Database<Str, Bytes> = env
            .create_database(&mut wtxn, Some(CATALOG_DB))
            .map_err(|e| LmdbStoreError::DbOpen(e.to_string()))?;
        let cells: Database<Bytes, Bytes> = env
            .create_database(&mut wtxn, Some(CELLS_DB))
            .map_err(|e| LmdbStoreError::DbOpen(e.to_string()))?;
        wtxn.commit().map_err(txn_err)?;

        tracing::debug!(path = %path.as_ref().display(), max_tables, "opened LMDB store");

        Ok(Self {
            env,
            catalog,
            cells,
            max_tables,
        })
    }

    fn descriptor_in(&self, txn: &RoTxn, table: &str) -> SeedResult<Option<TableDescriptor>> {
        match self.catalog.get(txn, table).map_err(txn_err)? {
            Some(bytes) => {
                let descriptor = serde_json::from_slice(bytes).map_err(|e| {
                    LmdbStoreError::Corrupt(format!("descriptor for {}: {}", table, e))
                })?;
                Ok(Some(descriptor))
            }
            None => Ok(None),
        }
    }

    /// Descriptor of an existing table, or `TableNotFound`.
    fn require_table_in(&self, txn: &RoTxn, table: &str) -> SeedResult<TableDescriptor> {
        self.descriptor_in(txn, table)?.ok_or_else(|| {
            StoreError::TableNotFound {
                table: table.to_string(),
            }
            .into()
        })
    }

    /// Every cell whose key starts with `prefix`, in key order.
    fn cells_with_prefix(
        &self,
        txn: &RoTxn,
        prefix: &[u8],
    ) -> SeedResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut found = Vec::new();
        for result in self.cells.iter(txn).map_err(txn_err)? {
            let (key, value) = result.map_err(txn_err)?;
            if key.starts_with(prefix) {
                found.push((key.to_vec(), value.to_vec()));
            } else if !found.is_empty() {
                // Prefixed keys are contiguous.
                break;
            }
        }
        Ok(found)
    }
}

fn table_prefix(table: &str) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(table.len() + 1);
    prefix.extend_from_slice(table.as_bytes());
    prefix.push(SEPARATOR);
    prefix
}

fn row_prefix(table: &str, row: &str) -> Vec<u8> {
    let mut prefix = table_prefix(table);
    prefix.extend_from_slice(row.as_bytes());
    prefix.push(SEPARATOR);
    prefix
}

fn encode_key(table: &str, row: &str, column: &QualifiedColumn) -> Vec<u8> {
    let mut key = row_prefix(table, row);
    key.extend_from_slice(column.family().as_bytes());
    key.push(SEPARATOR);
    key.extend_from_slice(column.qualifier().as_bytes());
    key
}

/// Row and column of a cell key, without its table.
fn decode_key(key: &[u8]) -> Result<(String, QualifiedColumn), LmdbStoreError> {
    let corrupt = || LmdbStoreError::Corrupt(format!("cell key {:?}", key));
    let mut parts = key.splitn(4, |b| *b == SEPARATOR);
    let _table = parts.next().ok_or_else(corrupt)?;
    let row = parts.next().ok_or_else(corrupt)?;
    let family = parts.next().ok_or_else(corrupt)?;
    let qualifier = parts.next().ok_or_else(corrupt)?;

    let row = std::str::from_utf8(row).map_err(|_| corrupt())?;
    let family = std::str::from_utf8(family).map_err(|_| corrupt())?;
    let qualifier = std::str::from_utf8(qualifier).map_err(|_| corrupt())?;
    let column = QualifiedColumn::new(family, qualifier).map_err(|_| corrupt())?;
    Ok((row.to_string(), column))
}

fn encode_value(value: &[u8], written_at: DateTime<Utc>) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(8 + value.len());
    bytes.extend_from_slice(&written_at.timestamp_millis().to_le_bytes());
    bytes.extend_from_slice(value);
    bytes
}

fn decode_value(bytes: &[u8]) -> Result<Cell, LmdbStoreError> {
    if bytes.len() < 8 {
        return Err(LmdbStoreError::Corrupt(format!(
            "cell value is {} bytes, shorter than its timestamp",
            bytes.len()
        )));
    }
    let timestamp_bytes: [u8; 8] = bytes[0..8]
        .try_into()
        .map_err(|_| LmdbStoreError::Corrupt("invalid timestamp".into()))?;
    let millis = i64::from_le_bytes(timestamp_bytes);
    let timestamp = DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| LmdbStoreError::Corrupt(format!("timestamp {} out of range", millis)))?;
    Ok(Cell::new(&bytes[8..], timestamp))
}

impl StoreClient for LmdbStore {
    fn create_table(&self, descriptor: &TableDescriptor) -> SeedResult<()> {
        let encoded = serde_json::to_vec(descriptor)
            .map_err(|e| LmdbStoreError::Serialization(e.to_string()))?;

        let mut wtxn = self.env.write_txn().map_err(txn_err)?;
        if self.descriptor_in(&wtxn, &descriptor.name)?.is_some() {
            return Err(StoreError::TableExists {
                table: descriptor.name.clone(),
            }
            .into());
        }
        let live = self.catalog.len(&wtxn).map_err(txn_err)?;
        if live >= u64::from(self.max_tables) {
            return Err(LmdbStoreError::TableLimit(self.max_tables).into());
        }

        self.catalog
            .put(&mut wtxn, &descriptor.name, &encoded)
            .map_err(txn_err)?;
        wtxn.commit().map_err(txn_err)?;

        tracing::debug!(table = %descriptor.name, families = ?descriptor.families, "created table");
        Ok(())
    }

    fn describe(&self, table: &str) -> SeedResult<Option<TableDescriptor>> {
        let rtxn = self.env.read_txn().map_err(txn_err)?;
        self.descriptor_in(&rtxn, table)
    }

    fn list_tables(&self) -> SeedResult<Vec<String>> {
        let rtxn = self.env.read_txn().map_err(txn_err)?;
        let mut names = Vec::new();
        for result in self.catalog.iter(&rtxn).map_err(txn_err)? {
            let (name, _) = result.map_err(txn_err)?;
            names.push(name.to_string());
        }
        Ok(names)
    }

    fn drop_table(&self, table: &str) -> SeedResult<bool> {
        let mut wtxn = self.env.write_txn().map_err(txn_err)?;
        if !self.catalog.delete(&mut wtxn, table).map_err(txn_err)? {
            return Ok(false);
        }
        let doomed = self.cells_with_prefix(&wtxn, &table_prefix(table))?;
        for (key, _) in &doomed {
            self.cells.delete(&mut wtxn, key).map_err(txn_err)?;
        }
        wtxn.commit().map_err(txn_err)?;

        tracing::debug!(table, cells = doomed.len(), "dropped table");
        Ok(true)
    }

    // Each put commits on its own so a failed seed leaves every earlier cell
    // readable.
    fn put(
        &self,
        table: &str,
        row: &str,
        column: &QualifiedColumn,
        value: &[u8],
    ) -> SeedResult<()> {
        validate_row_key(row)?;
        let key = encode_key(table, row, column);
        let bytes = encode_value(value, now_millis());

        let mut wtxn = self.env.write_txn().map_err(txn_err)?;
        self.require_table_in(&wtxn, table)?.check_column(column)?;
        self.cells.put(&mut wtxn, &key, &bytes).map_err(txn_err)?;
        wtxn.commit().map_err(txn_err)?;

        tracing::trace!(table, row, column = %column, "put");
        Ok(())
    }

    fn get(&self, table: &str, row: &str, column: &QualifiedColumn) -> SeedResult<Option<Cell>> {
        let rtxn = self.env.read_txn().map_err(txn_err)?;
        self.require_table_in(&rtxn, table)?;
        match self
            .cells
            .get(&rtxn, &encode_key(table, row, column))
            .map_err(txn_err)?
        {
            Some(bytes) => Ok(Some(decode_value(bytes)?)),
            None => Ok(None),
        }
    }

    fn row(&self, table: &str, row: &str) -> SeedResult<BTreeMap<QualifiedColumn, Cell>> {
        let rtxn = self.env.read_txn().map_err(txn_err)?;
        self.require_table_in(&rtxn, table)?;

        let mut cells = BTreeMap::new();
        for (key, value) in self.cells_with_prefix(&rtxn, &row_prefix(table, row))? {
            let (_, column) = decode_key(&key)?;
            cells.insert(column, decode_value(&value)?);
        }
        Ok(cells)
    }

    fn scan(&self, table: &str) -> SeedResult<Vec<RowCells>> {
        let rtxn = self.env.read_txn().map_err(txn_err)?;
        self.require_table_in(&rtxn, table)?;

        let mut rows: Vec<RowCells> = Vec::new();
        for (key, value) in self.cells_with_prefix(&rtxn, &table_prefix(table))? {
            let (row, column) = decode_key(&key)?;
            let cell = decode_value(&value)?;
            match rows.last_mut() {
                Some(last) if last.row == row => {
                    last.cells.insert(column, cell);
                }
                _ => {
                    let mut cells = BTreeMap::new();
                    cells.insert(column, cell);
                    rows.push(RowCells { row, cells });
                }
            }
        }
        Ok(rows)
    }

    fn delete_row(&self, table: &str, row: &str) -> SeedResult<bool> {
        let mut wtxn = self.env.write_txn().map_err(txn_err)?;
        self.require_table_in(&wtxn, table)?;
        let keys = self.cells_with_prefix(&wtxn, &row_prefix(table, row))?;
        if keys.is_empty() {
            return Ok(false);
        }
        for (key, _) in &keys {
            self.cells.delete(&mut wtxn, key).map_err(txn_err)?;
        }
        wtxn.commit().map_err(txn_err)?;
        Ok(true)
    }
}
