/// FileStore: SQLite-backed, versioned key-value store of synced files.
use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use dosprobe_types::ProbeError;

use crate::record::FileRecord;

/// Schema version stamped into `PRAGMA user_version`.
pub const STORE_VERSION: i64 = 21;

/// The persistent side of the virtual filesystem.
pub struct FileStore {
    conn: Connection,
}

impl FileStore {
    /// Open (or create) the store at the given path.
    ///
    /// Enables WAL mode and creates the `file_data` table when absent. A
    /// store written by a newer schema version is rejected.
    pub fn open(path: &Path) -> Result<Self, ProbeError> {
        let conn = Connection::open(path)
            .map_err(|e| ProbeError::StoreError(format!("failed to open database: {e}")))?;

        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| ProbeError::StoreError(format!("failed to set WAL mode: {e}")))?;

        let on_disk: i64 = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .map_err(|e| ProbeError::StoreError(format!("failed to read schema version: {e}")))?;
        if on_disk > STORE_VERSION {
            return Err(ProbeError::StoreError(format!(
                "store schema version {on_disk} is newer than supported version {STORE_VERSION}"
            )));
        }

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS file_data (
                path TEXT PRIMARY KEY NOT NULL,
                contents BLOB NOT NULL,
                mode INTEGER NOT NULL,
                timestamp TEXT NOT NULL
            );",
        )
        .map_err(|e| ProbeError::StoreError(format!("failed to create schema: {e}")))?;

        if on_disk < STORE_VERSION {
            conn.pragma_update(None, "user_version", STORE_VERSION)
                .map_err(|e| ProbeError::StoreError(format!("failed to stamp version: {e}")))?;
        }

        info!(path = %path.display(), version = STORE_VERSION, "file store opened");
        Ok(Self { conn })
    }

    /// The schema version recorded in the database.
    pub fn version(&self) -> Result<i64, ProbeError> {
        self.conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .map_err(|e| ProbeError::StoreError(format!("failed to read schema version: {e}")))
    }

    /// Fetch the record for `path`, if one was synced.
    pub fn get(&self, path: &str) -> Result<Option<FileRecord>, ProbeError> {
        let row: Option<(Vec<u8>, u32, String)> = self
            .conn
            .query_row(
                "SELECT contents, mode, timestamp FROM file_data WHERE path = ?1",
                params![path],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()
            .map_err(|e| ProbeError::StoreError(format!("failed to query {path}: {e}")))?;

        row.map(|(contents, mode, timestamp)| {
            Ok(FileRecord {
                path: path.to_string(),
                contents,
                mode,
                timestamp: parse_timestamp(&timestamp)?,
            })
        })
        .transpose()
    }

    /// Insert or replace a single record.
    pub fn put(&self, record: &FileRecord) -> Result<(), ProbeError> {
        upsert(&self.conn, record)
    }

    /// Remove the record for `path`. Returns whether a record existed.
    pub fn delete(&self, path: &str) -> Result<bool, ProbeError> {
        let n = self
            .conn
            .execute("DELETE FROM file_data WHERE path = ?1", params![path])
            .map_err(|e| ProbeError::StoreError(format!("failed to delete {path}: {e}")))?;
        Ok(n > 0)
    }

    /// All stored paths in lexical order.
    pub fn paths(&self) -> Result<Vec<String>, ProbeError> {
        let mut stmt = self
            .conn
            .prepare("SELECT path FROM file_data ORDER BY path ASC")
            .map_err(|e| ProbeError::StoreError(format!("failed to prepare query: {e}")))?;
        let rows = stmt
            .query_map([], |row| row.get(0))
            .map_err(|e| ProbeError::StoreError(format!("failed to list paths: {e}")))?;
        rows.collect::<Result<Vec<String>, _>>()
            .map_err(|e| ProbeError::StoreError(format!("failed to read path: {e}")))
    }

    /// Make the store mirror `records` exactly, in one transaction.
    ///
    /// Records whose path is absent from `records` are removed. This is the
    /// write half of a full filesystem sync.
    pub fn replace_all(&mut self, records: &[FileRecord]) -> Result<(), ProbeError> {
        let tx = self
            .conn
            .transaction()
            .map_err(|e| ProbeError::StoreError(format!("failed to begin sync: {e}")))?;

        tx.execute("DELETE FROM file_data", [])
            .map_err(|e| ProbeError::StoreError(format!("failed to clear store: {e}")))?;
        for record in records {
            upsert(&tx, record)?;
        }

        tx.commit()
            .map_err(|e| ProbeError::StoreError(format!("failed to commit sync: {e}")))?;
        debug!(files = records.len(), "file store synced");
        Ok(())
    }
}

fn upsert(conn: &Connection, record: &FileRecord) -> Result<(), ProbeError> {
    conn.execute(
        "INSERT INTO file_data (path, contents, mode, timestamp) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(path) DO UPDATE SET
            contents = excluded.contents,
            mode = excluded.mode,
            timestamp = excluded.timestamp",
        params![
            record.path,
            record.contents,
            record.mode,
            record.timestamp.to_rfc3339(),
        ],
    )
    .map_err(|e| ProbeError::StoreError(format!("failed to write {}: {e}", record.path)))?;
    Ok(())
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, ProbeError> {
    DateTime::parse_from_rfc3339(raw)
        .map(Into::into)
        .map_err(|e| ProbeError::StoreError(format!("invalid timestamp {raw:?}: {e}")))
}
