//! Repository layer for a catalog of API services and their versioned
//! specification artifacts.
//!
//! Metadata lives in a key-value record store with atomic conditional
//! writes; artifact bodies live in a blob store. Repositories translate
//! backend failures into [`RepoError`].

pub mod blob;
pub mod catalog;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod store;

pub use blob::{BlobError, BlobLocation, BlobResult, BlobStore, FsBlobStore};
pub use catalog::{Catalog, CatalogError};
pub use config::{CatalogConfig, ConfigError};
pub use logging::{default_log_level, init_from_config, init_logging, logging_status, LoggingError};
pub use model::service::{ServiceChange, ServiceRecord, ServiceUpdate};
pub use model::version::VersionRecord;
pub use repo::service_repo::{MetadataServiceRepository, ServiceRepository};
pub use repo::upload::UploadCoordinator;
pub use repo::version_repo::{MetadataVersionRepository, VersionRepository};
pub use repo::{RepoError, RepoErrorKind, RepoResult};
pub use service::catalog_service::{
    validate_service_name, ArtifactFormat, CatalogService, CatalogServiceError, PublishRequest,
    VersionUpdateRequest,
};
pub use store::{
    FieldUpdate, MetadataStore, Precondition, Record, RecordKey, ScanFilter, SqliteMetadataStore,
    StoreError, StoreResult,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
