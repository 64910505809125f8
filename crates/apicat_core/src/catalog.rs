//! Explicitly constructed catalog handle.
//!
//! # Responsibility
//! - Open the metadata backend and blob store once from a [`CatalogConfig`].
//! - Hand out repositories bound to the configured tables.
//!
//! # Invariants
//! - The handle is immutable after `open`; repositories borrow it.
//! - No process-wide singleton: callers pass the handle to whoever needs it.

use crate::blob::FsBlobStore;
use crate::config::{CatalogConfig, ConfigError};
use crate::db::{open_db, open_db_in_memory, DbError};
use crate::repo::service_repo::MetadataServiceRepository;
use crate::repo::version_repo::MetadataVersionRepository;
use crate::service::catalog_service::CatalogService;
use crate::store::SqliteMetadataStore;
use log::info;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub type SqliteServiceRepository<'c> = MetadataServiceRepository<SqliteMetadataStore<'c>>;
pub type SqliteVersionRepository<'c> =
    MetadataVersionRepository<SqliteMetadataStore<'c>, &'c FsBlobStore>;
pub type SqliteCatalogService<'c> =
    CatalogService<SqliteServiceRepository<'c>, SqliteVersionRepository<'c>>;

#[derive(Debug)]
pub enum CatalogError {
    Config(ConfigError),
    Db(DbError),
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl Display for CatalogError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "failed to open metadata store: {err}"),
            Self::Io { path, source } => {
                write!(f, "failed to prepare `{}`: {source}", path.display())
            }
        }
    }
}

impl Error for CatalogError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Io { source, .. } => Some(source),
        }
    }
}

impl From<ConfigError> for CatalogError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<DbError> for CatalogError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

pub struct Catalog {
    conn: Connection,
    blob_store: FsBlobStore,
    config: CatalogConfig,
}

impl Catalog {
    /// Validates `config`, opens the metadata database file and prepares the
    /// blob store root.
    pub fn open(config: CatalogConfig) -> Result<Self, CatalogError> {
        config.validate()?;
        if let Some(parent) = config.database_path.parent() {
            if !parent.as_os_str().is_empty() {
                create_dir(parent.to_path_buf())?;
            }
        }
        create_dir(config.blob_root.clone())?;

        let conn = open_db(&config.database_path)?;
        info!(
            "event=catalog_open module=catalog status=ok service_table={} version_table={}",
            config.service_table, config.version_table
        );
        Ok(Self::from_parts(conn, config))
    }

    /// Same as [`Self::open`] with an in-memory metadata database.
    pub fn open_in_memory(config: CatalogConfig) -> Result<Self, CatalogError> {
        config.validate()?;
        let conn = open_db_in_memory()?;
        Ok(Self::from_parts(conn, config))
    }

    fn from_parts(conn: Connection, config: CatalogConfig) -> Self {
        Self {
            conn,
            blob_store: FsBlobStore::new(config.blob_root.clone()),
            config,
        }
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    pub fn blob_store(&self) -> &FsBlobStore {
        &self.blob_store
    }

    pub fn metadata_store(&self) -> SqliteMetadataStore<'_> {
        SqliteMetadataStore::new(&self.conn).with_page_size(self.config.scan_page_size)
    }

    pub fn service_repository(&self) -> SqliteServiceRepository<'_> {
        MetadataServiceRepository::new(self.metadata_store(), self.config.service_table.as_str())
    }

    pub fn version_repository(&self) -> SqliteVersionRepository<'_> {
        MetadataVersionRepository::new(
            self.metadata_store(),
            &self.blob_store,
            self.config.version_table.as_str(),
        )
    }

    pub fn catalog_service(&self) -> SqliteCatalogService<'_> {
        CatalogService::new(
            self.service_repository(),
            self.version_repository(),
            self.config.bucket.as_str(),
        )
    }
}

fn create_dir(path: PathBuf) -> Result<(), CatalogError> {
    std::fs::create_dir_all(&path).map_err(|source| CatalogError::Io { path, source })
}
