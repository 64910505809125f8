//! Catalog use-case service.
//!
//! # Responsibility
//! - Validate caller input (service names, versions, artifact formats) before
//!   it reaches the repositories.
//! - Assign ids, timestamps and artifact keys for new services and versions.
//!
//! # Invariants
//! - Service names match `^[A-Za-z0-9_-]*$`.
//! - Artifact keys have the shape `swagger/<service_id>/<version>_<unix_secs>.<ext>`.
//! - Repository errors pass through unchanged inside `CatalogServiceError::Repo`.

use crate::blob::BlobLocation;
use crate::model::service::{ServiceRecord, ServiceUpdate};
use crate::model::version::VersionRecord;
use crate::repo::error::RepoError;
use crate::repo::service_repo::ServiceRepository;
use crate::repo::version_repo::VersionRepository;
use log::info;
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

static SERVICE_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]*$").expect("valid service name regex"));

/// `latest_version` of a freshly registered service.
pub const INITIAL_VERSION: &str = "0.0.0";
const ARTIFACT_KEY_PREFIX: &str = "swagger";
const MAX_VERSION_COMPONENTS: usize = 3;

/// Returns whether `name` is URL-safe (`^[A-Za-z0-9_-]*$`).
pub fn validate_service_name(name: &str) -> bool {
    SERVICE_NAME_RE.is_match(name)
}

/// Serialization format of an uploaded specification document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactFormat {
    Yaml,
    Json,
}

impl ArtifactFormat {
    /// Accepts `yaml`, `yml` and `json`, case-insensitively.
    pub fn parse(value: &str) -> Result<Self, CatalogServiceError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Ok(Self::Yaml),
            "json" => Ok(Self::Json),
            _ => Err(CatalogServiceError::UnsupportedFormat(value.to_string())),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Yaml => "yml",
            Self::Json => "json",
        }
    }
}

/// Normalizes a document version to one to three dot-separated, trimmed components.
pub fn normalize_version(raw: &str) -> Result<String, CatalogServiceError> {
    let components: Vec<&str> = raw.trim().split('.').map(str::trim).collect();
    if components.len() > MAX_VERSION_COMPONENTS
        || components.iter().any(|component| component.is_empty())
    {
        return Err(CatalogServiceError::InvalidVersion(raw.to_string()));
    }
    Ok(components.join("."))
}

/// Builds the blob key for one uploaded artifact.
pub fn artifact_key(
    service_id: &str,
    version: &str,
    format: ArtifactFormat,
    unix_secs: i64,
) -> String {
    format!(
        "{ARTIFACT_KEY_PREFIX}/{service_id}/{version}_{unix_secs}.{}",
        format.extension()
    )
}

/// Service error for catalog use-cases.
#[derive(Debug)]
pub enum CatalogServiceError {
    InvalidServiceName(String),
    InvalidVersion(String),
    UnsupportedFormat(String),
    /// A JSON document that does not parse.
    InvalidDocument(String),
    /// The document's own `info.version` disagrees with the requested version.
    VersionMismatch { requested: String, document: String },
    Repo(RepoError),
}

impl Display for CatalogServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidServiceName(name) => write!(
                f,
                "service name must be url-safe (^[A-Za-z0-9_-]*$): `{name}`"
            ),
            Self::InvalidVersion(value) => write!(f, "invalid version format: `{value}`"),
            Self::UnsupportedFormat(value) => {
                write!(f, "unsupported artifact format `{value}`; expected yaml|yml|json")
            }
            Self::InvalidDocument(message) => write!(f, "invalid spec document: {message}"),
            Self::VersionMismatch {
                requested,
                document,
            } => write!(
                f,
                "requested version `{requested}` does not match document version `{document}`"
            ),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CatalogServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for CatalogServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

pub type CatalogResult<T> = Result<T, CatalogServiceError>;

/// Upload request for one specification document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRequest {
    /// Document version as supplied by the caller.
    ///
    /// JSON documents carrying `info.version` must agree with it after
    /// normalization. YAML documents are not parsed; their version is taken
    /// as given.
    pub version: String,
    /// `yaml`, `yml` or `json`.
    pub format: String,
    pub enabled: bool,
    pub tag: String,
    pub contents: Vec<u8>,
}

/// Replacement attributes for an existing version record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionUpdateRequest {
    /// Blob key of the artifact the version points at.
    pub path: String,
    pub enabled: bool,
    pub tag: String,
}

/// Use-case service composing the service and version repositories.
pub struct CatalogService<SR: ServiceRepository, VR: VersionRepository> {
    services: SR,
    versions: VR,
    bucket: String,
}

impl<SR: ServiceRepository, VR: VersionRepository> CatalogService<SR, VR> {
    pub fn new(services: SR, versions: VR, bucket: impl Into<String>) -> Self {
        Self {
            services,
            versions,
            bucket: bucket.into(),
        }
    }

    /// Registers a new service under a generated id.
    pub fn register_service(&self, name: &str) -> CatalogResult<ServiceRecord> {
        ensure_service_name(name)?;
        let record = ServiceRecord::new(
            Uuid::new_v4().to_string(),
            name,
            INITIAL_VERSION,
            now_epoch_ms(),
        );
        self.services.create_service(&record)?;
        info!("event=service_register module=service status=ok");
        Ok(record)
    }

    /// Renames a service and stamps `last_updated`.
    pub fn rename_service(&self, id: &str, name: &str) -> CatalogResult<ServiceRecord> {
        ensure_service_name(name)?;
        let update = ServiceUpdate::for_id(id)
            .name(name)
            .last_updated(now_epoch_ms());
        Ok(self.services.update_service(&update)?)
    }

    pub fn get_service(&self, id: &str) -> CatalogResult<Option<ServiceRecord>> {
        Ok(self.services.get_service(id)?)
    }

    pub fn list_services(&self) -> CatalogResult<Vec<ServiceRecord>> {
        Ok(self.services.get_service_list()?)
    }

    pub fn delete_service(&self, id: &str) -> CatalogResult<Option<ServiceRecord>> {
        Ok(self.services.delete_service(id)?)
    }

    pub fn list_versions(&self, service_id: &str) -> CatalogResult<Vec<VersionRecord>> {
        Ok(self.versions.get_all_versions(service_id)?)
    }

    /// Uploads a document and records it as a version of `service_id`.
    pub fn publish_version(
        &self,
        service_id: &str,
        request: &PublishRequest,
    ) -> CatalogResult<VersionRecord> {
        self.publish_version_at(service_id, request, now_epoch_ms())
    }

    /// Replaces the path, flag and tag of an existing version and stamps
    /// `last_updated`. `NotFound` when `(service_id, version)` is absent.
    pub fn update_version(
        &self,
        service_id: &str,
        version: &str,
        request: &VersionUpdateRequest,
    ) -> CatalogResult<VersionRecord> {
        self.update_version_at(service_id, version, request, now_epoch_ms())
    }

    /// Same as [`Self::update_version`] with an explicit clock reading.
    pub fn update_version_at(
        &self,
        service_id: &str,
        version: &str,
        request: &VersionUpdateRequest,
        now_ms: i64,
    ) -> CatalogResult<VersionRecord> {
        let record = VersionRecord {
            service_id: service_id.to_string(),
            version: version.to_string(),
            path: request.path.clone(),
            last_updated: now_ms,
            enabled: request.enabled,
            tag: request.tag.clone(),
        };
        let updated = self.versions.update_version(&record)?;
        info!("event=version_update module=service status=ok");
        Ok(updated)
    }

    /// Same as [`Self::publish_version`] with an explicit clock reading.
    pub fn publish_version_at(
        &self,
        service_id: &str,
        request: &PublishRequest,
        now_ms: i64,
    ) -> CatalogResult<VersionRecord> {
        let format = ArtifactFormat::parse(&request.format)?;
        let version = normalize_version(&request.version)?;
        check_document_version(format, &request.contents, &version)?;
        let key = artifact_key(service_id, &version, format, now_ms / 1000);

        let record = VersionRecord {
            service_id: service_id.to_string(),
            version,
            path: key.clone(),
            last_updated: now_ms,
            enabled: request.enabled,
            tag: request.tag.clone(),
        };
        let location = BlobLocation::new(self.bucket.as_str(), key);
        Ok(self
            .versions
            .upload_version(&record, &location, &request.contents)?)
    }
}

/// Checks a JSON document's `info.version` against the normalized `version`.
pub fn check_document_version(
    format: ArtifactFormat,
    contents: &[u8],
    version: &str,
) -> CatalogResult<()> {
    if format != ArtifactFormat::Json {
        return Ok(());
    }
    let document: serde_json::Value = serde_json::from_slice(contents)
        .map_err(|err| CatalogServiceError::InvalidDocument(err.to_string()))?;
    let Some(raw) = document
        .pointer("/info/version")
        .and_then(serde_json::Value::as_str)
    else {
        return Ok(());
    };

    let document_version = normalize_version(raw)?;
    if document_version != version {
        return Err(CatalogServiceError::VersionMismatch {
            requested: version.to_string(),
            document: document_version,
        });
    }
    Ok(())
}

fn ensure_service_name(name: &str) -> CatalogResult<()> {
    if validate_service_name(name) {
        Ok(())
    } else {
        Err(CatalogServiceError::InvalidServiceName(name.to_string()))
    }
}

/// Current wall-clock time in Unix epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
