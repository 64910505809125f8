//! Connection bootstrap utilities for the SQLite metadata backend.
//!
//! # Responsibility
//! - Open file or in-memory SQLite connections.
//! - Configure connection pragmas required by conditional writes.
//! - Trigger schema migrations before returning a usable connection.
//!
//! # Invariants
//! - Returned connections have a busy timeout, so lock contention surfaces
//!   as a backend error instead of blocking forever.
//! - Returned connections have migrations fully applied.

use super::migrations::apply_migrations;
use super::{DbError, DbResult};
use log::{error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens a SQLite database file and applies all pending migrations.
///
/// File databases run in WAL mode so scans do not block writers on other
/// connections.
///
/// # Side effects
/// - Performs connection bootstrap and migration checks.
/// - Emits `db_open` logging events with duration and status.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode=file");

    let path = path.as_ref();
    let mut conn = match Connection::open(path) {
        Ok(conn) => conn,
        Err(source) => {
            let err = DbError::Open {
                target: path.display().to_string(),
                source,
            };
            return Err(log_open_failure(err, "file", started_at));
        }
    };

    let bootstrap = enable_wal(&conn).and_then(|()| bootstrap_connection(&mut conn));
    finish_open(conn, bootstrap, "file", started_at)
}

/// Opens an in-memory SQLite database and applies all pending migrations.
///
/// # Side effects
/// - Performs connection bootstrap and migration checks.
/// - Emits `db_open` logging events with duration and status.
pub fn open_db_in_memory() -> DbResult<Connection> {
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode=memory");

    let mut conn = match Connection::open_in_memory() {
        Ok(conn) => conn,
        Err(source) => {
            let err = DbError::Open {
                target: ":memory:".to_string(),
                source,
            };
            return Err(log_open_failure(err, "memory", started_at));
        }
    };

    let bootstrap = bootstrap_connection(&mut conn);
    finish_open(conn, bootstrap, "memory", started_at)
}

fn finish_open(
    conn: Connection,
    bootstrap: DbResult<()>,
    mode: &str,
    started_at: Instant,
) -> DbResult<Connection> {
    match bootstrap {
        Ok(()) => {
            info!(
                "event=db_open module=db status=ok mode={} duration_ms={}",
                mode,
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => Err(log_open_failure(err, mode, started_at)),
    }
}

fn log_open_failure(err: DbError, mode: &str, started_at: Instant) -> DbError {
    error!(
        "event=db_open module=db status=error mode={} duration_ms={} error_code={} error={}",
        mode,
        started_at.elapsed().as_millis(),
        err.error_code(),
        err
    );
    err
}

fn enable_wal(conn: &Connection) -> DbResult<()> {
    conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))
        .map_err(DbError::pragma("journal_mode"))?;
    Ok(())
}

fn bootstrap_connection(conn: &mut Connection) -> DbResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")
        .map_err(DbError::pragma("foreign_keys"))?;
    conn.busy_timeout(BUSY_TIMEOUT)
        .map_err(DbError::pragma("busy_timeout"))?;
    apply_migrations(conn)
}
