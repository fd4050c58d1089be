//! Error types for kvseed operations

use thiserror::Error;

/// Store layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Table already exists: {table}")]
    TableExists { table: String },

    #[error("Table not found: {table}")]
    TableNotFound { table: String },

    #[error("Unknown column family {family} in table {table}")]
    UnknownFamily { table: String, family: String },

    #[error("Table {table} must declare at least one column family")]
    NoFamilies { table: String },

    #[error("Invalid {kind} name {name:?}: {reason}")]
    InvalidName {
        kind: NameKind,
        name: String,
        reason: String,
    },

    #[error("Corrupt store data: {reason}")]
    Corrupt { reason: String },

    #[error("Store backend failure: {reason}")]
    Backend { reason: String },

    #[error("Store lock poisoned")]
    LockPoisoned,
}

/// Which kind of identifier failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
    Table,
    Family,
    Qualifier,
    Row,
    Column,
}

impl std::fmt::Display for NameKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NameKind::Table => "table",
            NameKind::Family => "column family",
            NameKind::Qualifier => "qualifier",
            NameKind::Row => "row key",
            NameKind::Column => "column",
        };
        f.write_str(s)
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: &'static str },

    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Fixture generation and lookup errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FixtureError {
    #[error("longnum overflows i64 for row index {index}")]
    Overflow { index: u64 },

    #[error("Row count must be positive")]
    EmptyFixture,

    #[error("Malformed mapping {field} in {table}: {value:?}")]
    MalformedMapping {
        table: String,
        field: String,
        value: String,
    },
}

/// Master error type for all kvseed errors.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fixture error: {0}")]
    Fixture(#[from] FixtureError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for kvseed operations.
pub type SeedResult<T> = Result<T, SeedError>;
