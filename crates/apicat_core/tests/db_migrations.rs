use apicat_core::db::migrations::{applied_version, latest_version};
use apicat_core::db::{open_db, open_db_in_memory, DbError};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(applied_version(&conn).unwrap(), latest_version());
    assert_table_exists(&conn, "records");
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog.sqlite3");

    let conn_first = open_db(&path).unwrap();
    conn_first
        .execute(
            "INSERT INTO records (table_name, partition_key, body) VALUES ('services', 'S1', '{}');",
            [],
        )
        .unwrap();
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(applied_version(&conn_second).unwrap(), latest_version());
    let rows: i64 = conn_second
        .query_row("SELECT COUNT(*) FROM records;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(rows, 1);
}

#[test]
fn file_databases_run_in_wal_mode() {
    let dir = tempfile::tempdir().unwrap();
    let conn = open_db(dir.path().join("wal.sqlite3")).unwrap();

    let mode: String = conn
        .query_row("PRAGMA journal_mode;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(mode.to_ascii_lowercase(), "wal");
}

#[test]
fn records_table_rejects_invalid_json_bodies() {
    let conn = open_db_in_memory().unwrap();

    let result = conn.execute(
        "INSERT INTO records (table_name, partition_key, body) VALUES ('services', 'S1', 'not json');",
        [],
    );
    assert!(result.is_err());
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.sqlite3");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
