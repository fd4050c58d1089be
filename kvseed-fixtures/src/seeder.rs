//! The fixture seeder: one data table, its rows, and its lookup mappings.

use chrono::{DateTime, Utc};
use kvseed_core::{QualifiedColumn, SeedConfig, SeedResult};
use kvseed_storage::StoreClient;
use serde::Serialize;

use crate::lookup::LookupTable;
use crate::rows::{rows, DATA_FAMILY, FIXTURE_COLUMNS};

/// Outcome of a successful seeding run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub data_table: String,
    pub lookup_table: String,
    pub rows_written: u64,
    pub cells_written: u64,
    pub mapping_columns: usize,
    pub lookup_table_created: bool,
    pub seeded_at: DateTime<Utc>,
}

/// Outcome of a teardown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeardownReport {
    pub data_table: String,
    pub table_dropped: bool,
    pub mappings_removed: bool,
}

/// Seeds the lookup regression fixture into a store.
pub struct FixtureSeeder<'a> {
    store: &'a dyn StoreClient,
    config: &'a SeedConfig,
}

impl<'a> FixtureSeeder<'a> {
    pub fn new(store: &'a dyn StoreClient, config: &'a SeedConfig) -> Self {
        Self { store, config }
    }

    pub fn data_table(&self) -> String {
        self.config.data_table()
    }

    /// Create the data table, write every row, then write the mapping row.
    ///
    /// Not idempotent: fails with `TableExists` if the data table is
    /// already present. Any store error aborts the run where it occurs.
    pub fn seed(&self) -> SeedResult<SeedReport> {
        self.config.validate()?;
        let data_table = self.data_table();
        let _span = tracing::info_span!("seed", table = %data_table).entered();

        self.store.create(&data_table, DATA_FAMILY)?;
        tracing::info!(rows = self.config.row_count, "populating data table");

        let mut rows_written = 0u64;
        let mut cells_written = 0u64;
        for row in rows(self.config.row_count) {
            let row = row?;
            for (qualifier, value) in row.cells() {
                let column = QualifiedColumn::new(DATA_FAMILY, qualifier)?;
                self.store.put(&data_table, &row.key, &column, value.as_bytes())?;
                cells_written += 1;
            }
            rows_written += 1;
            tracing::debug!(row = %row.key, "row written");
        }

        let lookup = LookupTable::new(self.store);
        let lookup_table_created = if self.config.create_lookup_table {
            lookup.ensure_exists()?
        } else {
            false
        };

        let sources = FIXTURE_COLUMNS
            .iter()
            .map(|c| QualifiedColumn::new(DATA_FAMILY, c.source))
            .collect::<Result<Vec<_>, _>>()?;
        let mapping_columns = lookup.write_mappings(
            &data_table,
            FIXTURE_COLUMNS.iter().map(|c| c.logical).zip(sources.iter()),
        )?;

        tracing::info!(rows_written, cells_written, mapping_columns, "fixture seeded");

        Ok(SeedReport {
            data_table,
            lookup_table: lookup.table().to_string(),
            rows_written,
            cells_written,
            mapping_columns,
            lookup_table_created,
            seeded_at: Utc::now(),
        })
    }

    /// Drop the data table and its mapping row. Missing pieces are skipped.
    pub fn teardown(&self) -> SeedResult<TeardownReport> {
        let data_table = self.data_table();
        let _span = tracing::info_span!("teardown", table = %data_table).entered();

        let table_dropped = self.store.drop_table(&data_table)?;
        let mappings_removed = LookupTable::new(self.store).remove(&data_table)?;
        tracing::info!(table_dropped, mappings_removed, "fixture removed");

        Ok(TeardownReport {
            data_table,
            table_dropped,
            mappings_removed,
        })
    }
}
