//! Service repository contract and metadata-store implementation.
//!
//! # Responsibility
//! - Persist single-key service records.
//! - Translate store preconditions into create/update semantics.
//!
//! # Invariants
//! - `create_service` is the only guard on id uniqueness and relies on the
//!   store's atomic `MustNotExist` write.
//! - `update_service` writes only supplied fields. Concurrent updates are
//!   last-write-wins; there is no version token.
//! - Service names are not re-validated here.

use crate::model::service::{ServiceRecord, ServiceUpdate};
use crate::repo::error::{map_conditional, RepoError, RepoResult};
use crate::store::{FieldUpdate, MetadataStore, Precondition, RecordKey, ScanFilter};
use log::info;

/// Repository interface for service records.
pub trait ServiceRepository {
    /// Point lookup. `Ok(None)` means not found.
    fn get_service(&self, id: &str) -> RepoResult<Option<ServiceRecord>>;
    /// Full scan. Order is not guaranteed.
    fn get_service_list(&self) -> RepoResult<Vec<ServiceRecord>>;
    /// Creates a record; `AlreadyExists` when the id is taken.
    fn create_service(&self, record: &ServiceRecord) -> RepoResult<()>;
    /// Applies a partial update and returns the post-update record.
    fn update_service(&self, update: &ServiceUpdate) -> RepoResult<ServiceRecord>;
    /// Deletes unconditionally and returns the prior record, if any.
    fn delete_service(&self, id: &str) -> RepoResult<Option<ServiceRecord>>;
}

/// Service repository bound to one logical table of a metadata store.
#[derive(Debug, Clone)]
pub struct MetadataServiceRepository<S: MetadataStore> {
    store: S,
    table: String,
}

impl<S: MetadataStore> MetadataServiceRepository<S> {
    pub fn new(store: S, table: impl Into<String>) -> Self {
        Self {
            store,
            table: table.into(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }
}

impl<S: MetadataStore> ServiceRepository for MetadataServiceRepository<S> {
    fn get_service(&self, id: &str) -> RepoResult<Option<ServiceRecord>> {
        Ok(self.store.get(&self.table, &RecordKey::single(id))?)
    }

    fn get_service_list(&self) -> RepoResult<Vec<ServiceRecord>> {
        Ok(self.store.scan(&self.table, &ScanFilter::All)?)
    }

    fn create_service(&self, record: &ServiceRecord) -> RepoResult<()> {
        self.store
            .conditional_put(&self.table, record, Precondition::MustNotExist)
            .map_err(|err| {
                map_conditional(err, || {
                    RepoError::AlreadyExists(format!("service id `{}` already exists", record.id))
                })
            })?;

        info!(
            "event=service_create module=repo status=ok table={}",
            self.table
        );
        Ok(())
    }

    fn update_service(&self, update: &ServiceUpdate) -> RepoResult<ServiceRecord> {
        let id = match update.id.as_deref() {
            Some(id) if !id.is_empty() => id,
            _ => {
                return Err(RepoError::InvalidArgument(
                    "service id is required".to_string(),
                ))
            }
        };
        if update.is_empty() {
            return Err(RepoError::InvalidArgument(
                "nothing to update".to_string(),
            ));
        }

        let fields: Vec<FieldUpdate> = update
            .changes
            .iter()
            .map(|change| change.to_field_update())
            .collect();
        let updated = self
            .store
            .update_fields(&self.table, &RecordKey::single(id), &fields)
            .map_err(|err| {
                map_conditional(err, || {
                    RepoError::NotFound(format!("service id `{id}` does not exist"))
                })
            })?;

        info!(
            "event=service_update module=repo status=ok table={} fields={}",
            self.table,
            fields.len()
        );
        Ok(updated)
    }

    fn delete_service(&self, id: &str) -> RepoResult<Option<ServiceRecord>> {
        let deleted: Option<ServiceRecord> =
            self.store.delete(&self.table, &RecordKey::single(id))?;

        info!(
            "event=service_delete module=repo status=ok table={} deleted={}",
            self.table,
            deleted.is_some()
        );
        Ok(deleted)
    }
}
