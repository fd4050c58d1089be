//! Naming and value types shared by the store and the fixtures.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{NameKind, StoreError};

static TABLE_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.\-]+$").unwrap());
static FAMILY_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.\-]+$").unwrap());

fn invalid(kind: NameKind, name: &str, reason: &str) -> StoreError {
    StoreError::InvalidName {
        kind,
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

/// Validate a table name.
pub fn validate_table_name(name: &str) -> Result<(), StoreError> {
    if TABLE_NAME.is_match(name) {
        Ok(())
    } else {
        Err(invalid(
            NameKind::Table,
            name,
            "must be non-empty and use only [A-Za-z0-9_.-]",
        ))
    }
}

/// Validate a column family name.
pub fn validate_family(name: &str) -> Result<(), StoreError> {
    if FAMILY_NAME.is_match(name) {
        Ok(())
    } else {
        Err(invalid(
            NameKind::Family,
            name,
            "must be non-empty and use only [A-Za-z0-9_.-]",
        ))
    }
}

/// Validate a column qualifier.
pub fn validate_qualifier(name: &str) -> Result<(), StoreError> {
    if name.is_empty() {
        return Err(invalid(NameKind::Qualifier, name, "must not be empty"));
    }
    if name.contains('\0') {
        return Err(invalid(NameKind::Qualifier, name, "must not contain NUL"));
    }
    Ok(())
}

/// Validate a row key.
pub fn validate_row_key(row: &str) -> Result<(), StoreError> {
    if row.is_empty() {
        return Err(invalid(NameKind::Row, row, "must not be empty"));
    }
    if row.contains('\0') {
        return Err(invalid(NameKind::Row, row, "must not contain NUL"));
    }
    Ok(())
}

/// A column family plus column name, written `family:qualifier`.
///
/// Ordering is by family, then qualifier, which is the order a scan returns
/// columns in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct QualifiedColumn {
    family: String,
    qualifier: String,
}

impl QualifiedColumn {
    /// Build a qualified column from its parts, validating both.
    pub fn new(family: impl Into<String>, qualifier: impl Into<String>) -> Result<Self, StoreError> {
        let family = family.into();
        let qualifier = qualifier.into();
        validate_family(&family)?;
        validate_qualifier(&qualifier)?;
        Ok(Self { family, qualifier })
    }

    /// Parse `family:qualifier`. The qualifier may itself contain ':'.
    pub fn parse(s: &str) -> Result<Self, StoreError> {
        let (family, qualifier) = s
            .split_once(':')
            .ok_or_else(|| invalid(NameKind::Column, s, "expected family:qualifier"))?;
        Self::new(family, qualifier)
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    pub fn qualifier(&self) -> &str {
        &self.qualifier
    }
}

impl fmt::Display for QualifiedColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.family, self.qualifier)
    }
}

impl FromStr for QualifiedColumn {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<QualifiedColumn> for String {
    fn from(c: QualifiedColumn) -> Self {
        c.to_string()
    }
}

impl TryFrom<String> for QualifiedColumn {
    type Error = StoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

/// A single stored cell: the latest value written plus its write time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub value: Vec<u8>,
    pub timestamp: DateTime<Utc>,
}

impl Cell {
    pub fn new(value: impl Into<Vec<u8>>, timestamp: DateTime<Utc>) -> Self {
        Self {
            value: value.into(),
            timestamp,
        }
    }

    /// The value as UTF-8, if it is valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.value).ok()
    }

    /// The value as UTF-8, replacing invalid sequences.
    pub fn value_lossy(&self) -> String {
        String::from_utf8_lossy(&self.value).into_owned()
    }
}

/// Schema of a table: its name and declared column families.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescriptor {
    pub name: String,
    pub families: Vec<String>,
}

impl TableDescriptor {
    /// Build a validated descriptor. Duplicate families are collapsed.
    pub fn new<I, S>(name: impl Into<String>, families: I) -> Result<Self, StoreError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        validate_table_name(&name)?;

        let mut out: Vec<String> = Vec::new();
        for family in families {
            let family = family.into();
            validate_family(&family)?;
            if !out.contains(&family) {
                out.push(family);
            }
        }
        if out.is_empty() {
            return Err(StoreError::NoFamilies { table: name });
        }

        Ok(Self {
            name,
            families: out,
        })
    }

    pub fn has_family(&self, family: &str) -> bool {
        self.families.iter().any(|f| f == family)
    }

    /// Fail with `UnknownFamily` unless `column`'s family is declared.
    pub fn check_column(&self, column: &QualifiedColumn) -> Result<(), StoreError> {
        if self.has_family(column.family()) {
            Ok(())
        } else {
            Err(StoreError::UnknownFamily {
                table: self.name.clone(),
                family: column.family().to_string(),
            })
        }
    }
}

/// All cells of one row, keyed by column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowCells {
    pub row: String,
    pub cells: BTreeMap<QualifiedColumn, Cell>,
}
