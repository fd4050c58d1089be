//! Deterministic fixture rows.
//!
//! Row `i` (1-based) carries five string cells under family `col`, each a
//! pure function of `i`.

use kvseed_core::{format_bool, format_double, format_long, FixtureError};

/// Column family of the data table.
pub const DATA_FAMILY: &str = "col";

pub const ROW_PREFIX: &str = "row_";

pub const DOUB_FACTOR: f64 = 1.001;

pub const LONGNUM_FACTOR: i64 = 100_000_000_000;

/// A logical field name and the data-table column it maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixtureColumn {
    pub logical: &'static str,
    pub source: &'static str,
}

/// Mapping entries written to the lookup table, in write order.
pub const FIXTURE_COLUMNS: [FixtureColumn; 5] = [
    FixtureColumn { logical: "name", source: "name" },
    FixtureColumn { logical: "num", source: "number" },
    FixtureColumn { logical: "dub", source: "doub" },
    FixtureColumn { logical: "longnum", source: "longnum" },
    FixtureColumn { logical: "bool", source: "bool" },
];

/// The values of one data-table row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureRow {
    pub index: u64,
    pub key: String,
    pub name: String,
    pub number: String,
    pub doub: String,
    pub longnum: String,
    pub flag: &'static str,
}

impl FixtureRow {
    /// Build row `index`.
    pub fn generate(index: u64) -> Result<Self, FixtureError> {
        let longnum = i64::try_from(index)
            .ok()
            .and_then(|i| i.checked_mul(LONGNUM_FACTOR))
            .ok_or(FixtureError::Overflow { index })?;

        let key = row_key(index);
        Ok(Self {
            index,
            name: key.clone(),
            key,
            number: index.to_string(),
            doub: format_double(DOUB_FACTOR * index as f64),
            longnum: format_long(longnum),
            flag: format_bool(index % 2 == 0),
        })
    }

    /// `(qualifier, value)` pairs in write order.
    pub fn cells(&self) -> [(&'static str, &str); 5] {
        [
            ("name", self.name.as_str()),
            ("number", self.number.as_str()),
            ("doub", self.doub.as_str()),
            ("longnum", self.longnum.as_str()),
            ("bool", self.flag),
        ]
    }
}

/// Row key for index `i`.
pub fn row_key(index: u64) -> String {
    format!("{}{}", ROW_PREFIX, index)
}

/// Rows `1..=count`.
pub fn rows(count: u64) -> impl Iterator<Item = Result<FixtureRow, FixtureError>> {
    (1..=count).map(FixtureRow::generate)
}
