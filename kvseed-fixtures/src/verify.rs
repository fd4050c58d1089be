//! Fixture verification and dataset digests.

use std::collections::{BTreeMap, HashMap};

use kvseed_core::{QualifiedColumn, SeedConfig, SeedResult};
use kvseed_storage::StoreClient;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::lookup::{LOOKUP_FAMILY, LOOKUP_TABLE};
use crate::rows::{rows, DATA_FAMILY, FIXTURE_COLUMNS};

/// One cell that differs from the fixture definition. `None` means absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mismatch {
    pub table: String,
    pub row: String,
    pub column: String,
    pub expected: Option<String>,
    pub actual: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifyReport {
    pub data_table: String,
    pub rows_checked: u64,
    pub cells_checked: u64,
    pub mismatches: Vec<Mismatch>,
}

impl VerifyReport {
    pub fn is_ok(&self) -> bool {
        self.mismatches.is_empty()
    }
}

type Expected = BTreeMap<QualifiedColumn, String>;

fn compare(
    table: &str,
    row: &str,
    expected: &Expected,
    actual: &BTreeMap<QualifiedColumn, String>,
    out: &mut Vec<Mismatch>,
) -> u64 {
    let mut checked = 0;
    for (column, want) in expected {
        checked += 1;
        let got = actual.get(column);
        if got != Some(want) {
            out.push(Mismatch {
                table: table.to_string(),
                row: row.to_string(),
                column: column.to_string(),
                expected: Some(want.clone()),
                actual: got.cloned(),
            });
        }
    }
    for (column, got) in actual {
        if !expected.contains_key(column) {
            out.push(Mismatch {
                table: table.to_string(),
                row: row.to_string(),
                column: column.to_string(),
                expected: None,
                actual: Some(got.clone()),
            });
        }
    }
    checked
}

/// Check the store against the fixture `config` describes.
///
/// Every data row and the mapping row are compared cell by cell; unexpected
/// rows and columns are reported too. A missing data table is an error, a
/// missing lookup table shows up as mismatches.
pub fn verify(store: &dyn StoreClient, config: &SeedConfig) -> SeedResult<VerifyReport> {
    let data_table = config.data_table();
    let _span = tracing::info_span!("verify", table = %data_table).entered();

    let mut actual_rows: HashMap<String, BTreeMap<QualifiedColumn, String>> = store
        .scan(&data_table)?
        .into_iter()
        .map(|r| {
            let cells = r
                .cells
                .into_iter()
                .map(|(c, cell)| (c, cell.value_lossy()))
                .collect();
            (r.row, cells)
        })
        .collect();

    let mut mismatches = Vec::new();
    let mut rows_checked = 0u64;
    let mut cells_checked = 0u64;

    for row in rows(config.row_count) {
        let row = row?;
        let mut expected = Expected::new();
        for (qualifier, value) in row.cells() {
            expected.insert(QualifiedColumn::new(DATA_FAMILY, qualifier)?, value.to_string());
        }
        let actual = actual_rows.remove(&row.key).unwrap_or_default();
        cells_checked += compare(&data_table, &row.key, &expected, &actual, &mut mismatches);
        rows_checked += 1;
    }

    let mut extra: Vec<_> = actual_rows.into_iter().collect();
    extra.sort_by(|a, b| a.0.cmp(&b.0));
    for (row, actual) in extra {
        compare(&data_table, &row, &Expected::new(), &actual, &mut mismatches);
    }

    let mut expected_mapping = Expected::new();
    for c in FIXTURE_COLUMNS {
        expected_mapping.insert(
            QualifiedColumn::new(LOOKUP_FAMILY, c.logical)?,
            QualifiedColumn::new(DATA_FAMILY, c.source)?.to_string(),
        );
    }
    let actual_mapping: BTreeMap<QualifiedColumn, String> = if store.table_exists(LOOKUP_TABLE)? {
        store
            .row(LOOKUP_TABLE, &data_table)?
            .into_iter()
            .map(|(c, cell)| (c, cell.value_lossy()))
            .collect()
    } else {
        BTreeMap::new()
    };
    cells_checked += compare(
        LOOKUP_TABLE,
        &data_table,
        &expected_mapping,
        &actual_mapping,
        &mut mismatches,
    );

    if mismatches.is_empty() {
        tracing::info!(rows_checked, cells_checked, "fixture verified");
    } else {
        tracing::warn!(count = mismatches.len(), "fixture mismatches found");
    }

    Ok(VerifyReport {
        data_table,
        rows_checked,
        cells_checked,
        mismatches,
    })
}

/// SHA-256 (hex) of a table's contents in scan order. Timestamps are not
/// hashed, so equal data gives equal digests.
pub fn digest(store: &dyn StoreClient, table: &str) -> SeedResult<String> {
    let mut hasher = Sha256::new();
    for row in store.scan(table)? {
        for (column, cell) in &row.cells {
            hasher.update(row.row.as_bytes());
            hasher.update([0u8]);
            hasher.update(column.to_string().as_bytes());
            hasher.update([0u8]);
            hasher.update(&cell.value);
            hasher.update(b"\n");
        }
    }
    Ok(hex::encode(hasher.finalize()))
}
