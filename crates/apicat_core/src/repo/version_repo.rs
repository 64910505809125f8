//! Version repository contract and metadata-store implementation.
//!
//! # Responsibility
//! - Persist composite-key `(service_id, version)` records.
//! - Pair artifact uploads with metadata through [`UploadCoordinator`].
//!
//! # Invariants
//! - `create_version` never overwrites; `update_version` never creates.
//! - `upload_version` may overwrite existing metadata for the same key.
//! - `service_id` is not checked against the service table.

use crate::blob::{BlobLocation, BlobStore};
use crate::model::version::VersionRecord;
use crate::repo::error::{map_conditional, RepoError, RepoResult};
use crate::repo::upload::UploadCoordinator;
use crate::store::{MetadataStore, Precondition, ScanFilter};
use log::info;

/// Repository interface for version records.
pub trait VersionRepository {
    /// All versions of one service in insertion order. Empty when none.
    fn get_all_versions(&self, service_id: &str) -> RepoResult<Vec<VersionRecord>>;
    /// Creates a record; `AlreadyExists` when the composite key is taken.
    fn create_version(&self, record: &VersionRecord) -> RepoResult<VersionRecord>;
    /// Replaces every non-key field; `NotFound` when the key is absent.
    fn update_version(&self, record: &VersionRecord) -> RepoResult<VersionRecord>;
    /// Writes `content` to `location`, then the record unconditionally.
    fn upload_version(
        &self,
        record: &VersionRecord,
        location: &BlobLocation,
        content: &[u8],
    ) -> RepoResult<VersionRecord>;
}

/// Version repository bound to one logical table and one blob store.
#[derive(Debug, Clone)]
pub struct MetadataVersionRepository<S: MetadataStore, B: BlobStore> {
    store: S,
    blob_store: B,
    table: String,
}

impl<S: MetadataStore, B: BlobStore> MetadataVersionRepository<S, B> {
    pub fn new(store: S, blob_store: B, table: impl Into<String>) -> Self {
        Self {
            store,
            blob_store,
            table: table.into(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }
}

impl<S: MetadataStore, B: BlobStore> VersionRepository for MetadataVersionRepository<S, B> {
    fn get_all_versions(&self, service_id: &str) -> RepoResult<Vec<VersionRecord>> {
        let filter = ScanFilter::Partition(service_id.to_string());
        Ok(self.store.scan(&self.table, &filter)?)
    }

    fn create_version(&self, record: &VersionRecord) -> RepoResult<VersionRecord> {
        self.store
            .conditional_put(&self.table, record, Precondition::MustNotExist)
            .map_err(|err| {
                map_conditional(err, || {
                    RepoError::AlreadyExists(format!(
                        "version `{}` of service `{}` already exists",
                        record.version, record.service_id
                    ))
                })
            })?;

        info!(
            "event=version_create module=repo status=ok table={}",
            self.table
        );
        Ok(record.clone())
    }

    fn update_version(&self, record: &VersionRecord) -> RepoResult<VersionRecord> {
        self.store
            .conditional_put(&self.table, record, Precondition::MustExist)
            .map_err(|err| {
                map_conditional(err, || {
                    RepoError::NotFound(format!(
                        "id `{}` and version `{}` do not exist",
                        record.service_id, record.version
                    ))
                })
            })?;

        info!(
            "event=version_update module=repo status=ok table={}",
            self.table
        );
        Ok(record.clone())
    }

    fn upload_version(
        &self,
        record: &VersionRecord,
        location: &BlobLocation,
        content: &[u8],
    ) -> RepoResult<VersionRecord> {
        UploadCoordinator::new(&self.store, &self.blob_store, &self.table)
            .publish(record, location, content)
    }
}
