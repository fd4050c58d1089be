//! kvseed Core - shared types for the lookup fixture seeder
//!
//! Errors, table/column naming, canonical value formatting and the seeder
//! configuration. No I/O beyond reading a config file.

pub mod config;
pub mod error;
pub mod format;
pub mod types;

pub use config::{
    render_table_name, SeedConfig, StoreBackend, StoreConfig, CANONICAL_ROW_COUNT, CONFIG_ENV,
    DEFAULT_TABLE_TEMPLATE, MAX_STORE_SIZE_MB, MAX_STORE_TABLES, TESTNAME_PLACEHOLDER,
};
pub use error::{ConfigError, FixtureError, NameKind, SeedError, SeedResult, StoreError};
pub use format::{format_bool, format_double, format_long};
pub use types::{
    validate_family, validate_qualifier, validate_row_key, validate_table_name, Cell,
    QualifiedColumn, RowCells, TableDescriptor,
};
