//! Catalog configuration.
//!
//! # Responsibility
//! - Describe backend locations and logical table names in one value.
//! - Load from TOML and apply `APICAT_*` environment overrides.
//!
//! # Invariants
//! - A validated config has non-empty table names and bucket, and a positive
//!   scan page size.

use crate::store::DEFAULT_SCAN_PAGE_SIZE;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const ENV_DATABASE_PATH: &str = "APICAT_DATABASE_PATH";
pub const ENV_BLOB_ROOT: &str = "APICAT_BLOB_ROOT";
pub const ENV_BUCKET: &str = "APICAT_BUCKET";
pub const ENV_SERVICE_TABLE: &str = "APICAT_SERVICE_TABLE";
pub const ENV_VERSION_TABLE: &str = "APICAT_VERSION_TABLE";
pub const ENV_SCAN_PAGE_SIZE: &str = "APICAT_SCAN_PAGE_SIZE";
pub const ENV_LOG_LEVEL: &str = "APICAT_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "APICAT_LOG_DIR";

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(toml::de::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "failed to parse config: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        Self::Parse(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CatalogConfig {
    /// SQLite file holding every metadata table.
    pub database_path: PathBuf,
    /// Root directory of the filesystem blob store.
    pub blob_root: PathBuf,
    /// Bucket receiving uploaded artifacts.
    pub bucket: String,
    pub service_table: String,
    pub version_table: String,
    pub scan_page_size: u32,
    /// `trace|debug|info|warn|error`. Requires `log_dir`; defaults to
    /// `default_log_level()` when only `log_dir` is set.
    pub log_level: Option<String>,
    /// Absolute directory for rolling log files. Logging stays off when unset.
    pub log_dir: Option<PathBuf>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("apicat.sqlite3"),
            blob_root: PathBuf::from("blobs"),
            bucket: "apicat-artifacts".to_string(),
            service_table: "services".to_string(),
            version_table: "versions".to_string(),
            scan_page_size: DEFAULT_SCAN_PAGE_SIZE,
            log_level: None,
            log_dir: None,
        }
    }
}

impl CatalogConfig {
    /// Parses TOML; absent keys take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Reads a TOML file, applies environment overrides and validates.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus environment overrides, validated.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self::default().apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Applies `APICAT_*` variables from the process environment.
    pub fn apply_env(self) -> Result<Self, ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Applies overrides from `lookup`, which maps a variable name to a value.
    pub fn apply_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(value) = lookup(ENV_DATABASE_PATH) {
            self.database_path = PathBuf::from(value);
        }
        if let Some(value) = lookup(ENV_BLOB_ROOT) {
            self.blob_root = PathBuf::from(value);
        }
        if let Some(value) = lookup(ENV_BUCKET) {
            self.bucket = value;
        }
        if let Some(value) = lookup(ENV_SERVICE_TABLE) {
            self.service_table = value;
        }
        if let Some(value) = lookup(ENV_VERSION_TABLE) {
            self.version_table = value;
        }
        if let Some(value) = lookup(ENV_SCAN_PAGE_SIZE) {
            self.scan_page_size = value.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!(
                    "{ENV_SCAN_PAGE_SIZE} must be a positive integer, got `{value}`"
                ))
            })?;
        }
        if let Some(value) = lookup(ENV_LOG_LEVEL) {
            self.log_level = Some(value);
        }
        if let Some(value) = lookup(ENV_LOG_DIR) {
            self.log_dir = Some(PathBuf::from(value));
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_table.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "service_table cannot be empty".to_string(),
            ));
        }
        if self.version_table.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "version_table cannot be empty".to_string(),
            ));
        }
        if self.service_table == self.version_table {
            return Err(ConfigError::Invalid(
                "service_table and version_table must differ".to_string(),
            ));
        }
        if self.bucket.trim().is_empty() {
            return Err(ConfigError::Invalid("bucket cannot be empty".to_string()));
        }
        if self.scan_page_size == 0 {
            return Err(ConfigError::Invalid(
                "scan_page_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{CatalogConfig, ConfigError, ENV_BUCKET, ENV_SCAN_PAGE_SIZE};
    use std::collections::HashMap;
    use std::path::PathBuf;

    #[test]
    fn toml_fills_missing_keys_with_defaults() {
        let config = CatalogConfig::from_toml_str(
            r#"
            database_path = "/var/lib/apicat/meta.sqlite3"
            bucket = "specs"
            "#,
        )
        .unwrap();

        assert_eq!(
            config.database_path,
            PathBuf::from("/var/lib/apicat/meta.sqlite3")
        );
        assert_eq!(config.bucket, "specs");
        assert_eq!(config.service_table, "services");
        assert_eq!(config.scan_page_size, 100);
        config.validate().unwrap();
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = CatalogConfig::from_toml_str("bukcet = \"typo\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn overrides_replace_file_values() {
        let env: HashMap<&str, &str> = [(ENV_BUCKET, "override"), (ENV_SCAN_PAGE_SIZE, "7")]
            .into_iter()
            .collect();
        let config = CatalogConfig::default()
            .apply_overrides(|name| env.get(name).map(|value| value.to_string()))
            .unwrap();

        assert_eq!(config.bucket, "override");
        assert_eq!(config.scan_page_size, 7);
    }

    #[test]
    fn malformed_page_size_override_is_rejected() {
        let err = CatalogConfig::default()
            .apply_overrides(|name| (name == ENV_SCAN_PAGE_SIZE).then(|| "many".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn validate_rejects_zero_page_size_and_shared_tables() {
        let zero_page = CatalogConfig {
            scan_page_size: 0,
            ..CatalogConfig::default()
        };
        assert!(zero_page.validate().is_err());

        let shared = CatalogConfig {
            version_table: "services".to_string(),
            ..CatalogConfig::default()
        };
        assert!(shared.validate().is_err());
    }
}
