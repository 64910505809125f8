//! SQLite implementation of [`MetadataStore`].
//!
//! All logical tables share the `records` table; a record is addressed by
//! `(table_name, partition_key, sort_key)` and stored as a JSON body.
//!
//! # Invariants
//! - Every conditional write is a single SQL statement, so the existence check
//!   and the write are atomic with respect to other connections.
//! - Upserts keep the original `seq`, which preserves insertion order.

use super::{
    FieldUpdate, MetadataStore, Precondition, Record, RecordKey, ScanFilter, StoreError,
    StoreResult,
};
use log::{debug, error, info};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::time::Instant;

/// Rows fetched per scan page unless configured otherwise.
pub const DEFAULT_SCAN_PAGE_SIZE: u32 = 100;

const SELECT_BODY_SQL: &str = "SELECT body
FROM records
WHERE table_name = ?1
  AND partition_key = ?2
  AND sort_key = ?3;";

const INSERT_IF_ABSENT_SQL: &str = "INSERT INTO records (table_name, partition_key, sort_key, body)
VALUES (?1, ?2, ?3, ?4)
ON CONFLICT (table_name, partition_key, sort_key) DO NOTHING;";

const UPSERT_SQL: &str = "INSERT INTO records (table_name, partition_key, sort_key, body)
VALUES (?1, ?2, ?3, ?4)
ON CONFLICT (table_name, partition_key, sort_key) DO UPDATE SET body = excluded.body;";

const REPLACE_IF_PRESENT_SQL: &str = "UPDATE records
SET body = ?4
WHERE table_name = ?1
  AND partition_key = ?2
  AND sort_key = ?3;";

const DELETE_RETURNING_SQL: &str = "DELETE FROM records
WHERE table_name = ?1
  AND partition_key = ?2
  AND sort_key = ?3
RETURNING body;";

const SCAN_PAGE_SQL: &str = "SELECT seq, body
FROM records
WHERE table_name = ?1
  AND (?2 IS NULL OR partition_key = ?2)
  AND seq > ?3
ORDER BY seq ASC
LIMIT ?4;";

/// Metadata store over a migrated SQLite connection.
#[derive(Debug, Clone, Copy)]
pub struct SqliteMetadataStore<'conn> {
    conn: &'conn Connection,
    page_size: u32,
}

impl<'conn> SqliteMetadataStore<'conn> {
    /// Wraps a connection returned by [`crate::db::open_db`] or
    /// [`crate::db::open_db_in_memory`].
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            conn,
            page_size: DEFAULT_SCAN_PAGE_SIZE,
        }
    }

    /// Sets the number of rows fetched per scan page. Zero is raised to one.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }
}

impl MetadataStore for SqliteMetadataStore<'_> {
    fn get<R: Record>(&self, table: &str, key: &RecordKey) -> StoreResult<Option<R>> {
        let started_at = Instant::now();
        let result = (|| -> StoreResult<Option<R>> {
            key.validate()?;
            let body: Option<String> = self
                .conn
                .query_row(
                    SELECT_BODY_SQL,
                    params![table, key.partition, sort_key(key)],
                    |row| row.get(0),
                )
                .optional()?;
            body.as_deref().map(decode).transpose()
        })();
        finish("store_get", table, started_at, result)
    }

    fn conditional_put<R: Record>(
        &self,
        table: &str,
        record: &R,
        precondition: Precondition,
    ) -> StoreResult<()> {
        let started_at = Instant::now();
        let key = record.key();
        let result = (|| -> StoreResult<()> {
            key.validate()?;
            let body = serde_json::to_string(record)?;
            let sql = match precondition {
                Precondition::None => UPSERT_SQL,
                Precondition::MustNotExist => INSERT_IF_ABSENT_SQL,
                Precondition::MustExist => REPLACE_IF_PRESENT_SQL,
            };
            let changed = self.conn.execute(
                sql,
                params![table, key.partition, sort_key(&key), body],
            )?;
            if changed == 0 {
                return Err(StoreError::PreconditionFailed {
                    table: table.to_string(),
                    key: key.clone(),
                    precondition,
                });
            }
            Ok(())
        })();
        finish("store_put", table, started_at, result)
    }

    fn update_fields<R: Record>(
        &self,
        table: &str,
        key: &RecordKey,
        updates: &[FieldUpdate],
    ) -> StoreResult<R> {
        let started_at = Instant::now();
        let result = (|| -> StoreResult<R> {
            key.validate()?;
            let (sql, binds) = build_update_sql(table, key, updates)?;
            let body: Option<String> = self
                .conn
                .query_row(&sql, params_from_iter(binds), |row| row.get(0))
                .optional()?;
            match body {
                Some(body) => decode(&body),
                None => Err(StoreError::PreconditionFailed {
                    table: table.to_string(),
                    key: key.clone(),
                    precondition: Precondition::MustExist,
                }),
            }
        })();
        finish("store_update", table, started_at, result)
    }

    fn delete<R: Record>(&self, table: &str, key: &RecordKey) -> StoreResult<Option<R>> {
        let started_at = Instant::now();
        let result = (|| -> StoreResult<Option<R>> {
            key.validate()?;
            let body: Option<String> = self
                .conn
                .query_row(
                    DELETE_RETURNING_SQL,
                    params![table, key.partition, sort_key(key)],
                    |row| row.get(0),
                )
                .optional()?;
            body.as_deref().map(decode).transpose()
        })();
        finish("store_delete", table, started_at, result)
    }

    fn scan<R: Record>(&self, table: &str, filter: &ScanFilter) -> StoreResult<Vec<R>> {
        let started_at = Instant::now();
        let partition = match filter {
            ScanFilter::All => None,
            ScanFilter::Partition(partition) => Some(partition.as_str()),
        };

        let result = (|| -> StoreResult<Vec<R>> {
            let mut stmt = self.conn.prepare(SCAN_PAGE_SQL)?;
            let mut records = Vec::new();
            let mut after_seq: i64 = 0;
            let mut pages = 0u32;

            // Keyset pagination: keep fetching until a short page proves the
            // table is drained.
            loop {
                let mut rows = stmt.query(params![
                    table,
                    partition,
                    after_seq,
                    i64::from(self.page_size)
                ])?;
                let mut fetched = 0u32;
                while let Some(row) = rows.next()? {
                    after_seq = row.get(0)?;
                    let body: String = row.get(1)?;
                    records.push(decode(&body)?);
                    fetched += 1;
                }
                pages += 1;
                if fetched < self.page_size {
                    break;
                }
            }

            debug!(
                "event=store_scan_pages module=store table={} pages={} records={}",
                table,
                pages,
                records.len()
            );
            Ok(records)
        })();
        finish("store_scan", table, started_at, result)
    }
}

fn build_update_sql(
    table: &str,
    key: &RecordKey,
    updates: &[FieldUpdate],
) -> StoreResult<(String, Vec<Value>)> {
    if updates.is_empty() {
        return Err(StoreError::InvalidRequest(
            "field update requires at least one field".to_string(),
        ));
    }

    let mut sql = String::from("UPDATE records SET body = json_set(body");
    let mut binds = vec![
        Value::Text(table.to_string()),
        Value::Text(key.partition.clone()),
        Value::Text(sort_key(key).to_string()),
    ];

    for update in updates {
        if !is_valid_field_name(update.field) {
            return Err(StoreError::InvalidRequest(format!(
                "unsupported field name `{}`",
                update.field
            )));
        }
        let path_index = binds.len() + 1;
        sql.push_str(&format!(", ?{path_index}, json(?{})", path_index + 1));
        binds.push(Value::Text(format!("$.{}", update.field)));
        binds.push(Value::Text(serde_json::to_string(&update.value)?));
    }

    sql.push_str(
        ")
WHERE table_name = ?1
  AND partition_key = ?2
  AND sort_key = ?3
RETURNING body;",
    );
    Ok((sql, binds))
}

fn is_valid_field_name(field: &str) -> bool {
    !field.is_empty()
        && field
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

fn sort_key(key: &RecordKey) -> &str {
    key.sort.as_deref().unwrap_or("")
}

fn decode<R: Record>(body: &str) -> StoreResult<R> {
    Ok(serde_json::from_str(body)?)
}

fn finish<T>(op: &str, table: &str, started_at: Instant, result: StoreResult<T>) -> StoreResult<T> {
    let duration_ms = started_at.elapsed().as_millis();
    match &result {
        Ok(_) => debug!(
            "event={} module=store status=ok table={} duration_ms={}",
            op, table, duration_ms
        ),
        Err(err) if err.is_precondition_failed() => info!(
            "event={} module=store status=rejected table={} duration_ms={} reason=precondition_failed",
            op, table, duration_ms
        ),
        Err(err) => error!(
            "event={} module=store status=error table={} duration_ms={} error={}",
            op, table, duration_ms, err
        ),
    }
    result
}
