//! Connection bootstrap for the SQLite metadata backend.
//!
//! `open_db`/`open_db_in_memory` hand out connections whose `records` schema
//! is current; [`migrations`] owns the schema history. Every failure names
//! the bootstrap stage it happened in.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    /// SQLite could not open `target` (a file path or `:memory:`).
    Open {
        target: String,
        source: rusqlite::Error,
    },
    /// A connection setting (`journal_mode`, `busy_timeout`, ...) was refused.
    Pragma {
        pragma: &'static str,
        source: rusqlite::Error,
    },
    /// Migration `version` (`name`) failed; the schema keeps its prior version.
    Migration {
        version: u32,
        name: &'static str,
        source: rusqlite::Error,
    },
    /// The file was written by a newer build of this crate.
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

impl DbError {
    /// Stable code used in `db_open` log events.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Open { .. } => "db_open_failed",
            Self::Pragma { .. } => "db_pragma_failed",
            Self::Migration { .. } => "db_migration_failed",
            Self::UnsupportedSchemaVersion { .. } => "db_schema_too_new",
        }
    }

    pub(crate) fn pragma(pragma: &'static str) -> impl FnOnce(rusqlite::Error) -> Self {
        move |source| Self::Pragma { pragma, source }
    }
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open { target, source } => {
                write!(f, "cannot open metadata database `{target}`: {source}")
            }
            Self::Pragma { pragma, source } => write!(f, "cannot set `{pragma}`: {source}"),
            Self::Migration {
                version,
                name,
                source,
            } => write!(f, "metadata migration {version} ({name}) failed: {source}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "metadata schema version {db_version} is newer than supported {latest_supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Open { source, .. }
            | Self::Pragma { source, .. }
            | Self::Migration { source, .. } => Some(source),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}
