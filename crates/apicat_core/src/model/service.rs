//! Service record and partial-update model.

use crate::store::{FieldUpdate, Record, RecordKey};
use serde::{Deserialize, Serialize};

const FIELD_NAME: &str = "servicename";
const FIELD_LATEST_VERSION: &str = "latestversion";
const FIELD_LAST_UPDATED: &str = "lastupdated";

/// One named API service and its latest-version pointer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRecord {
    /// Primary key. Assigned once at creation.
    pub id: String,
    /// URL-safe name; validated by callers before it reaches a repository.
    #[serde(rename = "servicename")]
    pub name: String,
    #[serde(rename = "latestversion")]
    pub latest_version: String,
    /// Unix epoch milliseconds, set by the caller on every write.
    #[serde(rename = "lastupdated")]
    pub last_updated: i64,
}

impl ServiceRecord {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        latest_version: impl Into<String>,
        last_updated: i64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            latest_version: latest_version.into(),
            last_updated,
        }
    }
}

impl Record for ServiceRecord {
    fn key(&self) -> RecordKey {
        RecordKey::single(self.id.as_str())
    }
}

/// One explicitly supplied field of a partial service update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceChange {
    Name(String),
    LatestVersion(String),
    LastUpdated(i64),
}

impl ServiceChange {
    pub(crate) fn to_field_update(&self) -> FieldUpdate {
        match self {
            Self::Name(value) => FieldUpdate::set(FIELD_NAME, value.as_str()),
            Self::LatestVersion(value) => FieldUpdate::set(FIELD_LATEST_VERSION, value.as_str()),
            Self::LastUpdated(value) => FieldUpdate::set(FIELD_LAST_UPDATED, *value),
        }
    }
}

/// Partial update of a service record.
///
/// Only fields present in `changes` are written; every other stored field
/// keeps its value. When a field appears more than once, the last change wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceUpdate {
    /// Target id. Required; `None` or empty is rejected.
    pub id: Option<String>,
    pub changes: Vec<ServiceChange>,
}

impl ServiceUpdate {
    pub fn for_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            changes: Vec::new(),
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.changes.push(ServiceChange::Name(name.into()));
        self
    }

    pub fn latest_version(mut self, version: impl Into<String>) -> Self {
        self.changes
            .push(ServiceChange::LatestVersion(version.into()));
        self
    }

    pub fn last_updated(mut self, epoch_ms: i64) -> Self {
        self.changes.push(ServiceChange::LastUpdated(epoch_ms));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}
