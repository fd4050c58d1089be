//! Seeder configuration.
//!
//! A config file must spell out every field. `SeedConfig::canonical` builds
//! the fixed regression fixture for a test name without a file.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::{NoExpand, Regex};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::validate_table_name;

/// Placeholder substituted with the test name in `table_template`.
pub const TESTNAME_PLACEHOLDER: &str = "{FULL_TESTNAME}";

/// Template used when none is configured.
pub const DEFAULT_TABLE_TEMPLATE: &str = "{FULL_TESTNAME}_table";

/// Rows in the canonical fixture.
pub const CANONICAL_ROW_COUNT: u64 = 100;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "KVSEED_CONFIG";

/// Largest LMDB map size accepted, in megabytes (1 TiB).
pub const MAX_STORE_SIZE_MB: usize = 1024 * 1024;

/// Largest live-table cap accepted.
pub const MAX_STORE_TABLES: u32 = 4096;

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{FULL_TESTNAME\}").unwrap());

/// Which store implementation to seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// LMDB environment on disk.
    Lmdb,
    /// Process memory; contents vanish on exit.
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Environment directory, required for `lmdb`.
    pub path: Option<PathBuf>,
    pub max_size_mb: usize,
    pub max_tables: u32,
}

impl StoreConfig {
    pub fn lmdb(path: impl Into<PathBuf>) -> Self {
        Self {
            backend: StoreBackend::Lmdb,
            path: Some(path.into()),
            max_size_mb: 64,
            max_tables: 126,
        }
    }

    pub fn memory() -> Self {
        Self {
            backend: StoreBackend::Memory,
            path: None,
            max_size_mb: 64,
            max_tables: 126,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedConfig {
    /// Value substituted for `{FULL_TESTNAME}`.
    pub test_name: String,
    pub table_template: String,
    pub row_count: u64,
    /// Create the shared lookup table when it does not exist yet.
    pub create_lookup_table: bool,
    pub store: StoreConfig,
}

impl SeedConfig {
    /// The regression fixture: 100 rows, default template, lookup table
    /// provisioned on demand.
    pub fn canonical(test_name: impl Into<String>, store: StoreConfig) -> Self {
        Self {
            test_name: test_name.into(),
            table_template: DEFAULT_TABLE_TEMPLATE.to_string(),
            row_count: CANONICAL_ROW_COUNT,
            create_lookup_table: true,
            store,
        }
    }

    /// Load from an explicit path, falling back to `KVSEED_CONFIG`.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(config_path_from_env)
            .ok_or(ConfigError::MissingRequired { field: "config path" })?;
        Self::from_path(&path)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: SeedConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.test_name.trim().is_empty() {
            return Err(ConfigError::MissingRequired { field: "test_name" });
        }
        if !self.table_template.contains(TESTNAME_PLACEHOLDER) {
            return Err(ConfigError::InvalidValue {
                field: "table_template",
                reason: format!("must contain {}", TESTNAME_PLACEHOLDER),
            });
        }
        if let Err(e) = validate_table_name(&self.data_table()) {
            return Err(ConfigError::InvalidValue {
                field: "test_name",
                reason: e.to_string(),
            });
        }
        if self.row_count == 0 {
            return Err(ConfigError::InvalidValue {
                field: "row_count",
                reason: "must be > 0".to_string(),
            });
        }
        if self.store.backend == StoreBackend::Lmdb {
            match &self.store.path {
                Some(p) if !p.as_os_str().is_empty() => {}
                _ => return Err(ConfigError::MissingRequired { field: "store.path" }),
            }
        }
        if self.store.max_size_mb == 0 || self.store.max_size_mb > MAX_STORE_SIZE_MB {
            return Err(ConfigError::InvalidValue {
                field: "store.max_size_mb",
                reason: format!("must be between 1 and {}", MAX_STORE_SIZE_MB),
            });
        }
        if self.store.max_tables == 0 || self.store.max_tables > MAX_STORE_TABLES {
            return Err(ConfigError::InvalidValue {
                field: "store.max_tables",
                reason: format!("must be between 1 and {}", MAX_STORE_TABLES),
            });
        }
        Ok(())
    }

    /// The data table's full name.
    pub fn data_table(&self) -> String {
        render_table_name(&self.table_template, &self.test_name)
    }
}

/// Substitute every `{FULL_TESTNAME}` in `template` with `test_name`.
pub fn render_table_name(template: &str, test_name: &str) -> String {
    PLACEHOLDER
        .replace_all(template, NoExpand(test_name))
        .into_owned()
}

fn config_path_from_env() -> Option<PathBuf> {
    std::env::var(CONFIG_ENV).ok().map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
test_name = "hbase_lookup"
table_template = "pxf_{FULL_TESTNAME}"
row_count = 100
create_lookup_table = true

[store]
backend = "lmdb"
path = "/tmp/kvseed"
max_size_mb = 32
max_tables = 16
"#;

    #[test]
    fn test_render_table_name() {
        assert_eq!(render_table_name("{FULL_TESTNAME}_table", "t1"), "t1_table");
        assert_eq!(
            render_table_name("{FULL_TESTNAME}_{FULL_TESTNAME}", "x"),
            "x_x"
        );
        // Replacement text is literal.
        assert_eq!(render_table_name("{FULL_TESTNAME}", "$1"), "$1");
    }

    #[test]
    fn test_canonical_config() {
        let config = SeedConfig::canonical("smoke", StoreConfig::memory());
        assert_eq!(config.row_count, 100);
        assert_eq!(config.data_table(), "smoke_table");
        assert!(config.create_lookup_table);
        config.validate().unwrap();
    }

    #[test]
    fn test_parse_full_config() {
        let config = SeedConfig::from_toml_str(FULL).unwrap();
        assert_eq!(config.test_name, "hbase_lookup");
        assert_eq!(config.data_table(), "pxf_hbase_lookup");
        assert_eq!(config.store.backend, StoreBackend::Lmdb);
        assert_eq!(config.store.path, Some(PathBuf::from("/tmp/kvseed")));
        assert_eq!(config.store.max_tables, 16);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let toml = format!("{}\nextra = 1\n", FULL.replace("[store]", "bogus = 2\n[store]"));
        assert!(matches!(
            SeedConfig::from_toml_str(&toml),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_field_rejected() {
        let toml = FULL.replace("row_count = 100\n", "");
        assert!(matches!(
            SeedConfig::from_toml_str(&toml),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_template_without_placeholder_rejected() {
        let mut config = SeedConfig::canonical("t", StoreConfig::memory());
        config.table_template = "fixed".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue {
                field: "table_template",
                ..
            })
        ));
    }

    #[test]
    fn test_invalid_test_name_rejected() {
        let config = SeedConfig::canonical("has space", StoreConfig::memory());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue {
                field: "test_name",
                ..
            })
        ));
        let empty = SeedConfig::canonical("  ", StoreConfig::memory());
        assert!(matches!(
            empty.validate(),
            Err(ConfigError::MissingRequired { field: "test_name" })
        ));
    }

    #[test]
    fn test_zero_rows_rejected() {
        let mut config = SeedConfig::canonical("t", StoreConfig::memory());
        config.row_count = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_store_limits_bounded() {
        let mut config = SeedConfig::canonical("t", StoreConfig::memory());
        config.store.max_tables = u32::MAX;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field: "store.max_tables", .. })
        ));

        let mut config = SeedConfig::canonical("t", StoreConfig::memory());
        config.store.max_size_mb = usize::MAX;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field: "store.max_size_mb", .. })
        ));

        let mut config = SeedConfig::canonical("t", StoreConfig::memory());
        config.store.max_tables = MAX_STORE_TABLES;
        config.store.max_size_mb = MAX_STORE_SIZE_MB;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_lmdb_requires_path() {
        let mut store = StoreConfig::lmdb("/tmp/x");
        store.path = None;
        let config = SeedConfig::canonical("t", store);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingRequired { field: "store.path" })
        ));
    }

    #[test]
    fn test_from_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("seed.toml");
        std::fs::write(&path, FULL).unwrap();
        let config = SeedConfig::load(Some(&path)).unwrap();
        assert_eq!(config.row_count, 100);
    }

    #[test]
    fn test_from_missing_path() {
        let err = SeedConfig::from_path(Path::new("/nonexistent/kvseed.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
