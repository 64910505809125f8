//! Blob-then-metadata publish protocol.
//!
//! # Invariants
//! - The record key is checked before anything is written.
//! - The blob write always precedes the metadata write.
//! - A blob failure aborts before any metadata is written.
//! - A metadata failure leaves the blob in place (orphan blob). No compensating
//!   delete is attempted.
//! - The metadata write is unconditional and may overwrite an existing
//!   version record.

use crate::blob::{BlobLocation, BlobStore};
use crate::model::version::VersionRecord;
use crate::repo::error::{RepoError, RepoResult};
use crate::store::{MetadataStore, Precondition, Record};
use log::{error, info};
use std::time::Instant;

/// Publishes one version: artifact body into the blob store, then its record
/// into the version table.
pub struct UploadCoordinator<'a, S: MetadataStore, B: BlobStore> {
    store: &'a S,
    blob_store: &'a B,
    table: &'a str,
}

impl<'a, S: MetadataStore, B: BlobStore> UploadCoordinator<'a, S, B> {
    pub fn new(store: &'a S, blob_store: &'a B, table: &'a str) -> Self {
        Self {
            store,
            blob_store,
            table,
        }
    }

    pub fn publish(
        &self,
        record: &VersionRecord,
        location: &BlobLocation,
        content: &[u8],
    ) -> RepoResult<VersionRecord> {
        let started_at = Instant::now();
        record.key().validate()?;

        if let Err(err) = self
            .blob_store
            .put(&location.bucket, &location.key, content)
        {
            error!(
                "event=version_upload module=upload status=error stage=blob duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            );
            return Err(RepoError::BlobWrite(err));
        }

        if let Err(err) = self
            .store
            .conditional_put(self.table, record, Precondition::None)
        {
            error!(
                "event=version_upload module=upload status=error stage=metadata orphan_blob={} duration_ms={} error={}",
                location,
                started_at.elapsed().as_millis(),
                err
            );
            return Err(RepoError::MetadataWrite(err));
        }

        info!(
            "event=version_upload module=upload status=ok table={} bytes={} duration_ms={}",
            self.table,
            content.len(),
            started_at.elapsed().as_millis()
        );
        Ok(record.clone())
    }
}
