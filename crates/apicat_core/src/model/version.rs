//! Version record model.

use crate::store::{Record, RecordKey};
use serde::{Deserialize, Serialize};

/// One published specification artifact of a service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    /// Owning service id. Not checked against the service table.
    #[serde(rename = "id")]
    pub service_id: String,
    pub version: String,
    /// Blob key of the artifact body.
    pub path: String,
    #[serde(rename = "lastupdated")]
    pub last_updated: i64,
    #[serde(rename = "enable")]
    pub enabled: bool,
    /// Free-form label such as `latest` or `beta`.
    pub tag: String,
}

impl Record for VersionRecord {
    fn key(&self) -> RecordKey {
        RecordKey::composite(self.service_id.as_str(), self.version.as_str())
    }
}
