//! Metadata schema migration registry and executor.
//!
//! # Invariants
//! - `version` values must remain monotonic.
//! - Applied migration version is mirrored to `PRAGMA user_version`.
//! - Pending migrations are applied in one transaction; a failure leaves the
//!   schema at its previous version.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "records",
    sql: include_str!("0001_records.sql"),
}];

/// Returns the latest migration version known by this binary.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Returns the schema version currently recorded on `conn`.
pub fn applied_version(conn: &Connection) -> DbResult<u32> {
    conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))
        .map_err(DbError::pragma("user_version"))
}

/// Applies all pending migrations on the provided connection.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let current = applied_version(conn)?;
    let latest = latest_version();

    if current > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current,
            latest_supported: latest,
        });
    }
    let pending: Vec<&Migration> = MIGRATIONS.iter().filter(|m| m.version > current).collect();
    let Some(last) = pending.last().copied() else {
        return Ok(());
    };

    let tx = conn.transaction().map_err(|source| last.failed(source))?;
    for migration in pending {
        tx.execute_batch(migration.sql)
            .and_then(|()| tx.pragma_update(None, "user_version", migration.version))
            .map_err(|source| migration.failed(source))?;
        info!(
            "event=db_migrate module=db status=ok version={} name={}",
            migration.version, migration.name
        );
    }
    tx.commit().map_err(|source| last.failed(source))
}

impl Migration {
    fn failed(&self, source: rusqlite::Error) -> DbError {
        DbError::Migration {
            version: self.version,
            name: self.name,
            source,
        }
    }
}
