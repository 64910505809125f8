//! Generic key-value record store used by every metadata repository.
//!
//! # Responsibility
//! - Offer point reads, conditional point writes, field-level updates and
//!   partition scans over typed records, independent of the backend.
//! - Report precondition violations distinctly from backend failures.
//!
//! # Invariants
//! - A conditional write is evaluated atomically by the backend. Callers must
//!   never emulate one with a read followed by a write.
//! - A scan returns only after every backend page has been drained.
//! - Scans are not isolated from concurrent writers: a record written just
//!   before or during a scan may or may not appear.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod sqlite;

pub use sqlite::{SqliteMetadataStore, DEFAULT_SCAN_PAGE_SIZE};

pub type StoreResult<T> = Result<T, StoreError>;

/// Location of one record inside a logical table.
///
/// Single-key tables leave `sort` unset; composite-key tables put the second
/// key component there.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordKey {
    pub partition: String,
    pub sort: Option<String>,
}

impl RecordKey {
    pub fn single(partition: impl Into<String>) -> Self {
        Self {
            partition: partition.into(),
            sort: None,
        }
    }

    pub fn composite(partition: impl Into<String>, sort: impl Into<String>) -> Self {
        Self {
            partition: partition.into(),
            sort: Some(sort.into()),
        }
    }

    /// Rejects an empty partition key or an empty sort key.
    pub fn validate(&self) -> StoreResult<()> {
        if self.partition.is_empty() {
            return Err(StoreError::InvalidRequest(
                "partition key cannot be empty".to_string(),
            ));
        }
        if self.sort.as_deref() == Some("") {
            return Err(StoreError::InvalidRequest(
                "sort key cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl Display for RecordKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.sort {
            Some(sort) => write!(f, "{}/{}", self.partition, sort),
            None => write!(f, "{}", self.partition),
        }
    }
}

/// A typed record persisted by a [`MetadataStore`].
pub trait Record: Serialize + DeserializeOwned {
    /// Key derived from the record's own key attributes.
    fn key(&self) -> RecordKey;
}

/// Existence check evaluated atomically together with a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    /// Write unconditionally, overwriting any stored record.
    None,
    /// The key must be absent.
    MustNotExist,
    /// The full key (both components for composite keys) must be present.
    MustExist,
}

impl Precondition {
    fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::MustNotExist => "must_not_exist",
            Self::MustExist => "must_exist",
        }
    }
}

/// Equality filter applied by [`MetadataStore::scan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanFilter {
    All,
    Partition(String),
}

/// One `SET field = value` clause of a field-level update.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldUpdate {
    pub field: &'static str,
    pub value: serde_json::Value,
}

impl FieldUpdate {
    pub fn set(field: &'static str, value: impl Into<serde_json::Value>) -> Self {
        Self {
            field,
            value: value.into(),
        }
    }
}

/// Backend-neutral failure of a store primitive.
#[derive(Debug)]
pub enum StoreError {
    /// The existence precondition did not hold; nothing was written.
    PreconditionFailed {
        table: String,
        key: RecordKey,
        precondition: Precondition,
    },
    /// Backend communication or execution failure, including busy timeouts.
    Sqlite(rusqlite::Error),
    /// Record could not be encoded or a stored body could not be decoded.
    Codec(serde_json::Error),
    /// Caller supplied a request the store cannot express.
    InvalidRequest(String),
}

impl StoreError {
    pub fn is_precondition_failed(&self) -> bool {
        matches!(self, Self::PreconditionFailed { .. })
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PreconditionFailed {
                table,
                key,
                precondition,
            } => write!(
                f,
                "conditional check `{}` failed for `{key}` in table `{table}`",
                precondition.as_str()
            ),
            Self::Sqlite(err) => write!(f, "metadata backend error: {err}"),
            Self::Codec(err) => write!(f, "record codec error: {err}"),
            Self::InvalidRequest(message) => write!(f, "invalid store request: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::Codec(err) => Some(err),
            Self::PreconditionFailed { .. } | Self::InvalidRequest(_) => None,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Codec(value)
    }
}

/// Primitive operations a metadata backend must provide.
///
/// `table` names a logical table; one backend may host several.
pub trait MetadataStore {
    /// Point read. `Ok(None)` when no record has this key.
    fn get<R: Record>(&self, table: &str, key: &RecordKey) -> StoreResult<Option<R>>;

    /// Writes `record` only if `precondition` holds for its key.
    fn conditional_put<R: Record>(
        &self,
        table: &str,
        record: &R,
        precondition: Precondition,
    ) -> StoreResult<()>;

    /// Applies `updates` to an existing record and returns the new state.
    ///
    /// Fails with [`StoreError::PreconditionFailed`] when the key is absent.
    /// Fields not named in `updates` keep their stored values.
    fn update_fields<R: Record>(
        &self,
        table: &str,
        key: &RecordKey,
        updates: &[FieldUpdate],
    ) -> StoreResult<R>;

    /// Unconditional delete. Returns the record as it was before removal.
    fn delete<R: Record>(&self, table: &str, key: &RecordKey) -> StoreResult<Option<R>>;

    /// Returns every record matching `filter`, in insertion order.
    fn scan<R: Record>(&self, table: &str, filter: &ScanFilter) -> StoreResult<Vec<R>>;
}

impl<S: MetadataStore> MetadataStore for &S {
    fn get<R: Record>(&self, table: &str, key: &RecordKey) -> StoreResult<Option<R>> {
        (**self).get(table, key)
    }

    fn conditional_put<R: Record>(
        &self,
        table: &str,
        record: &R,
        precondition: Precondition,
    ) -> StoreResult<()> {
        (**self).conditional_put(table, record, precondition)
    }

    fn update_fields<R: Record>(
        &self,
        table: &str,
        key: &RecordKey,
        updates: &[FieldUpdate],
    ) -> StoreResult<R> {
        (**self).update_fields(table, key, updates)
    }

    fn delete<R: Record>(&self, table: &str, key: &RecordKey) -> StoreResult<Option<R>> {
        (**self).delete(table, key)
    }

    fn scan<R: Record>(&self, table: &str, filter: &ScanFilter) -> StoreResult<Vec<R>> {
        (**self).scan(table, filter)
    }
}
