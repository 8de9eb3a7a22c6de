//! Store - SQLite-backed record and checkpoint persistence

use std::collections::HashMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use tracing::{debug, info};

use crate::error::StoreError;
use crate::record::{Filter, Record};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS records (
    collection  TEXT NOT NULL,
    id          TEXT NOT NULL,
    body        TEXT NOT NULL,
    updated_at  INTEGER NOT NULL,
    PRIMARY KEY (collection, id)
);

CREATE TABLE IF NOT EXISTS record_index (
    collection  TEXT NOT NULL,
    id          TEXT NOT NULL,
    field       TEXT NOT NULL,
    value       TEXT NOT NULL,
    PRIMARY KEY (collection, id, field)
);

CREATE INDEX IF NOT EXISTS idx_record_index_lookup
    ON record_index (collection, field, value);

CREATE TABLE IF NOT EXISTS checkpoints (
    thread_id   TEXT PRIMARY KEY,
    body        TEXT NOT NULL,
    updated_at  INTEGER NOT NULL
);
";

/// SQLite-backed store for records and checkpoints
///
/// One `Store` per data directory. The directory holds the database file and
/// a lock file; the lock is held for the lifetime of the `Store`.
pub struct Store {
    conn: Connection,
    dir: PathBuf,
    // Held, never read - dropping it releases the advisory lock
    _lock: File,
}

impl Store {
    /// Open (or create) the store at the given data directory
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        debug!(dir = %dir.display(), "Store::open: called");
        fs::create_dir_all(&dir)?;

        let lock_path = dir.join(".lock");
        let lock = File::create(&lock_path)?;
        lock.try_lock_exclusive()
            .map_err(|_| StoreError::Locked(lock_path.display().to_string()))?;

        let conn = Connection::open(dir.join("museflow.db"))?;
        conn.execute_batch(SCHEMA)?;

        info!(dir = %dir.display(), "Store opened");
        Ok(Self {
            conn,
            dir,
            _lock: lock,
        })
    }

    /// Data directory this store was opened at
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    // === Record operations ===

    /// Insert a new record, returning its id
    ///
    /// Fails with `Conflict` if a record with the same id already exists in
    /// the collection.
    pub fn create<R: Record>(&mut self, record: &R) -> Result<String, StoreError> {
        let collection = R::collection_name();
        debug!(collection, id = record.id(), "Store::create: called");
        let body = serde_json::to_string(record)?;
        let fields = record.indexed_fields();

        let tx = self.conn.transaction()?;
        let exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM records WHERE collection = ? AND id = ?)",
            params![collection, record.id()],
            |row| row.get(0),
        )?;
        if exists {
            return Err(StoreError::Conflict(format!("{}/{}", collection, record.id())));
        }

        tx.execute(
            "INSERT INTO records (collection, id, body, updated_at) VALUES (?, ?, ?, ?)",
            params![collection, record.id(), body, record.updated_at()],
        )?;
        write_index_rows(&tx, collection, record.id(), &fields)?;
        tx.commit()?;

        Ok(record.id().to_string())
    }

    /// Fetch a record by id
    pub fn get<R: Record>(&self, id: &str) -> Result<Option<R>, StoreError> {
        let collection = R::collection_name();
        debug!(collection, %id, "Store::get: called");
        let body: Option<String> = self
            .conn
            .query_row(
                "SELECT body FROM records WHERE collection = ? AND id = ?",
                params![collection, id],
                |row| row.get(0),
            )
            .optional()?;

        match body {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Replace an existing record
    ///
    /// Fails with `NotFound` if the record does not exist.
    pub fn update<R: Record>(&mut self, record: &R) -> Result<(), StoreError> {
        let collection = R::collection_name();
        debug!(collection, id = record.id(), "Store::update: called");
        let body = serde_json::to_string(record)?;
        let fields = record.indexed_fields();

        let tx = self.conn.transaction()?;
        let changed = tx.execute(
            "UPDATE records SET body = ?, updated_at = ? WHERE collection = ? AND id = ?",
            params![body, record.updated_at(), collection, record.id()],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("{}/{}", collection, record.id())));
        }

        tx.execute(
            "DELETE FROM record_index WHERE collection = ? AND id = ?",
            params![collection, record.id()],
        )?;
        write_index_rows(&tx, collection, record.id(), &fields)?;
        tx.commit()?;

        Ok(())
    }

    /// Delete a record by id, returning whether it existed
    pub fn delete<R: Record>(&mut self, id: &str) -> Result<bool, StoreError> {
        let collection = R::collection_name();
        debug!(collection, %id, "Store::delete: called");
        let tx = self.conn.transaction()?;
        let changed = tx.execute(
            "DELETE FROM records WHERE collection = ? AND id = ?",
            params![collection, id],
        )?;
        tx.execute(
            "DELETE FROM record_index WHERE collection = ? AND id = ?",
            params![collection, id],
        )?;
        tx.commit()?;
        Ok(changed > 0)
    }

    /// List records matching all given index filters, newest first
    pub fn list<R: Record>(&self, filters: &[Filter]) -> Result<Vec<R>, StoreError> {
        let collection = R::collection_name();
        debug!(collection, filter_count = filters.len(), "Store::list: called");

        let mut sql = String::from("SELECT body FROM records WHERE collection = ?");
        let mut args: Vec<String> = vec![collection.to_string()];
        for filter in filters {
            sql.push_str(
                " AND id IN (SELECT id FROM record_index \
                 WHERE collection = ? AND field = ? AND value = ?)",
            );
            args.push(collection.to_string());
            args.push(filter.field.clone());
            args.push(filter.value.as_text());
        }
        sql.push_str(" ORDER BY updated_at DESC");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(args.iter()), |row| row.get::<_, String>(0))?;

        let mut records = Vec::new();
        for body in rows {
            records.push(serde_json::from_str(&body?)?);
        }
        debug!(collection, count = records.len(), "Store::list: done");
        Ok(records)
    }

    /// Rebuild the index side table for a record type
    ///
    /// Needed after the indexed_fields definition of a type changes, or after
    /// records were imported out of band. Returns the number of records
    /// reindexed.
    pub fn rebuild_indexes<R: Record>(&mut self) -> Result<usize, StoreError> {
        let collection = R::collection_name();
        debug!(collection, "Store::rebuild_indexes: called");
        let records: Vec<R> = self.list(&[])?;

        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM record_index WHERE collection = ?", params![collection])?;
        for record in &records {
            write_index_rows(&tx, collection, record.id(), &record.indexed_fields())?;
        }
        tx.commit()?;

        info!(collection, count = records.len(), "Rebuilt indexes");
        Ok(records.len())
    }

    // === Checkpoint operations ===

    /// Write (or overwrite) the checkpoint for a thread id
    pub fn write_checkpoint(&mut self, thread_id: &str, body: &str) -> Result<(), StoreError> {
        debug!(%thread_id, body_len = body.len(), "Store::write_checkpoint: called");
        self.conn.execute(
            "INSERT INTO checkpoints (thread_id, body, updated_at) VALUES (?, ?, ?) \
             ON CONFLICT(thread_id) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at",
            params![thread_id, body, crate::now_ms()],
        )?;
        Ok(())
    }

    /// Read the checkpoint for a thread id, if any
    pub fn read_checkpoint(&self, thread_id: &str) -> Result<Option<String>, StoreError> {
        debug!(%thread_id, "Store::read_checkpoint: called");
        let body = self
            .conn
            .query_row(
                "SELECT body FROM checkpoints WHERE thread_id = ?",
                params![thread_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(body)
    }

    /// Remove the checkpoint for a thread id, returning whether it existed
    pub fn delete_checkpoint(&mut self, thread_id: &str) -> Result<bool, StoreError> {
        debug!(%thread_id, "Store::delete_checkpoint: called");
        let changed = self
            .conn
            .execute("DELETE FROM checkpoints WHERE thread_id = ?", params![thread_id])?;
        Ok(changed > 0)
    }
}

/// Insert index rows for one record
fn write_index_rows(
    tx: &rusqlite::Transaction<'_>,
    collection: &str,
    id: &str,
    fields: &HashMap<String, crate::IndexValue>,
) -> Result<(), StoreError> {
    for (field, value) in fields {
        tx.execute(
            "INSERT OR REPLACE INTO record_index (collection, id, field, value) VALUES (?, ?, ?, ?)",
            params![collection, id, field, value.as_text()],
        )?;
    }
    Ok(())
}
