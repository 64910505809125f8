//! Domain error taxonomy returned by every repository call.

use crate::blob::BlobError;
use crate::store::StoreError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository failure translated from backend-specific errors.
///
/// Repositories never retry. A `Backend` failure caused by a timeout may or
/// may not have been applied; a retried create can legitimately observe
/// `AlreadyExists` for its own earlier write.
#[derive(Debug)]
pub enum RepoError {
    /// Target key does not exist.
    NotFound(String),
    /// A create hit a key that is already taken.
    AlreadyExists(String),
    /// Missing or empty required field, or nothing to update.
    InvalidArgument(String),
    /// Metadata backend failure, including timeouts and codec errors.
    Backend(StoreError),
    /// Upload aborted before any metadata was written.
    BlobWrite(BlobError),
    /// Upload stored the artifact but could not commit its metadata.
    MetadataWrite(StoreError),
}

/// Field-free discriminant of [`RepoError`] for transport mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepoErrorKind {
    NotFound,
    AlreadyExists,
    InvalidArgument,
    Backend,
    BlobWrite,
    MetadataWrite,
}

impl RepoErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::AlreadyExists => "already_exists",
            Self::InvalidArgument => "invalid_argument",
            Self::Backend => "backend_error",
            Self::BlobWrite => "blob_write_error",
            Self::MetadataWrite => "metadata_write_error",
        }
    }
}

impl RepoError {
    pub fn kind(&self) -> RepoErrorKind {
        match self {
            Self::NotFound(_) => RepoErrorKind::NotFound,
            Self::AlreadyExists(_) => RepoErrorKind::AlreadyExists,
            Self::InvalidArgument(_) => RepoErrorKind::InvalidArgument,
            Self::Backend(_) => RepoErrorKind::Backend,
            Self::BlobWrite(_) => RepoErrorKind::BlobWrite,
            Self::MetadataWrite(_) => RepoErrorKind::MetadataWrite,
        }
    }

    /// Whether the artifact body is known to be persisted despite the error.
    pub fn artifact_persisted(&self) -> bool {
        matches!(self, Self::MetadataWrite(_))
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(message) => write!(f, "not found: {message}"),
            Self::AlreadyExists(message) => write!(f, "already exists: {message}"),
            Self::InvalidArgument(message) => write!(f, "invalid argument: {message}"),
            Self::Backend(err) => write!(f, "{err}"),
            Self::BlobWrite(err) => write!(f, "artifact upload failed: {err}"),
            Self::MetadataWrite(err) => {
                write!(f, "artifact stored but metadata write failed: {err}")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Backend(err) | Self::MetadataWrite(err) => Some(err),
            Self::BlobWrite(err) => Some(err),
            Self::NotFound(_) | Self::AlreadyExists(_) | Self::InvalidArgument(_) => None,
        }
    }
}

impl From<StoreError> for RepoError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::InvalidRequest(message) => Self::InvalidArgument(message),
            other => Self::Backend(other),
        }
    }
}

/// Maps a store error, turning a precondition failure into a call-specific
/// domain error.
pub(crate) fn map_conditional(
    err: StoreError,
    on_precondition: impl FnOnce() -> RepoError,
) -> RepoError {
    if err.is_precondition_failed() {
        on_precondition()
    } else {
        err.into()
    }
}
