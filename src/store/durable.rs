//! ACID-durable session and relevance store backed by redb.
//!
//! Tables:
//!
//! - `sessions`: session id -> postal code string
//! - `relevance_meta`: `"columns"` -> bincode `Vec<String>`
//! - `relevance_rows`: postal code -> bincode `Vec<bool>`
//!
//! Each lookup reads a row and the column list in one read transaction, and
//! an import writes both in one write transaction; nothing is held open
//! across a localization run. Changing the column list clears the rows.

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableTable, TableDefinition, WriteTransaction};

use crate::error::StoreError;

use super::{RelevanceRow, RelevanceStore, SessionStore, StoreResult};

const SESSIONS: TableDefinition<&str, &str> = TableDefinition::new("sessions");
const RELEVANCE_META: TableDefinition<&str, &[u8]> = TableDefinition::new("relevance_meta");
const RELEVANCE_ROWS: TableDefinition<i64, &[u8]> = TableDefinition::new("relevance_rows");

const COLUMNS_KEY: &str = "columns";

fn redb_err<E: std::fmt::Display>(context: &'static str) -> impl FnOnce(E) -> StoreError {
    move |e| StoreError::Redb {
        message: format!("{context} failed: {e}"),
    }
}

/// ACID-durable store using redb.
pub struct DurableStore {
    db: Arc<Database>,
}

impl DurableStore {
    /// Open or create a durable store in the given directory.
    pub fn open(data_dir: &Path) -> StoreResult<Self> {
        std::fs::create_dir_all(data_dir).map_err(|e| StoreError::Io { source: e })?;
        let db_path = data_dir.join("climind.redb");
        let db = Database::create(&db_path).map_err(|e| StoreError::Redb {
            message: format!("failed to open redb at {}: {e}", db_path.display()),
        })?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        Ok(store)
    }

    /// Create all tables so read transactions never see a missing table.
    fn ensure_tables(&self) -> StoreResult<()> {
        let txn = self
            .db
            .begin_write()
            .map_err(redb_err("begin_write"))?;
        txn.open_table(SESSIONS)
            .map_err(redb_err("open sessions"))?;
        txn.open_table(RELEVANCE_META)
            .map_err(redb_err("open relevance_meta"))?;
        txn.open_table(RELEVANCE_ROWS)
            .map_err(redb_err("open relevance_rows"))?;
        txn.commit().map_err(redb_err("commit"))?;
        Ok(())
    }

    /// Store `columns` inside `txn`. A changed column list empties the row
    /// table in the same transaction.
    fn write_columns(txn: &WriteTransaction, columns: &[String]) -> StoreResult<()> {
        let changed = {
            let mut meta = txn
                .open_table(RELEVANCE_META)
                .map_err(redb_err("open relevance_meta"))?;
            let current = match meta.get(COLUMNS_KEY).map_err(redb_err("get columns"))? {
                Some(raw) => decode_columns(raw.value())?,
                None => Vec::new(),
            };
            if current != columns {
                let encoded = bincode::serialize(columns).map_err(|e| StoreError::Serialization {
                    message: format!("failed to encode relevance columns: {e}"),
                })?;
                meta.insert(COLUMNS_KEY, encoded.as_slice())
                    .map_err(redb_err("insert columns"))?;
                true
            } else {
                false
            }
        };
        if changed {
            tracing::info!(columns = columns.len(), "relevance columns changed, clearing rows");
            txn.delete_table(RELEVANCE_ROWS)
                .map_err(redb_err("clear relevance_rows"))?;
            txn.open_table(RELEVANCE_ROWS)
                .map_err(redb_err("open relevance_rows"))?;
        }
        Ok(())
    }

    /// Number of stored relevance rows.
    pub fn row_count(&self) -> StoreResult<usize> {
        let txn = self
            .db
            .begin_read()
            .map_err(redb_err("begin_read"))?;
        let table = txn
            .open_table(RELEVANCE_ROWS)
            .map_err(redb_err("open relevance_rows"))?;
        let iter = table.iter().map_err(redb_err("iter"))?;
        Ok(iter.count())
    }
}

impl SessionStore for DurableStore {
    fn postal_code(&self, session_id: &str) -> StoreResult<Option<String>> {
        let txn = self
            .db
            .begin_read()
            .map_err(redb_err("begin_read"))?;
        let table = txn
            .open_table(SESSIONS)
            .map_err(redb_err("open sessions"))?;
        let result = table
            .get(session_id)
            .map_err(redb_err("get session"))?;
        Ok(result.map(|guard| guard.value().to_string()))
    }

    fn set_postal_code(&self, session_id: &str, postal_code: &str) -> StoreResult<()> {
        let txn = self
            .db
            .begin_write()
            .map_err(redb_err("begin_write"))?;
        {
            let mut table = txn
                .open_table(SESSIONS)
                .map_err(redb_err("open sessions"))?;
            table
                .insert(session_id, postal_code)
                .map_err(redb_err("insert session"))?;
        }
        txn.commit().map_err(redb_err("commit"))?;
        Ok(())
    }
}

impl RelevanceStore for DurableStore {
    fn relevance_row(&self, postal_code: i64) -> StoreResult<Option<RelevanceRow>> {
        let txn = self
            .db
            .begin_read()
            .map_err(redb_err("begin_read"))?;
        let rows = txn
            .open_table(RELEVANCE_ROWS)
            .map_err(redb_err("open relevance_rows"))?;
        let Some(raw) = rows.get(postal_code).map_err(redb_err("get row"))? else {
            return Ok(None);
        };
        let values = decode_row(postal_code, raw.value())?;

        let meta = txn
            .open_table(RELEVANCE_META)
            .map_err(redb_err("open relevance_meta"))?;
        let columns = match meta.get(COLUMNS_KEY).map_err(redb_err("get columns"))? {
            Some(raw) => decode_columns(raw.value())?,
            None => Vec::new(),
        };
        Ok(Some(RelevanceRow { columns, values }))
    }

    fn put_columns(&self, columns: Vec<String>) -> StoreResult<()> {
        let txn = self
            .db
            .begin_write()
            .map_err(redb_err("begin_write"))?;
        Self::write_columns(&txn, &columns)?;
        txn.commit().map_err(redb_err("commit"))?;
        Ok(())
    }

    fn put_row(&self, postal_code: i64, values: Vec<bool>) -> StoreResult<()> {
        let encoded = encode_row(postal_code, &values)?;
        let txn = self
            .db
            .begin_write()
            .map_err(redb_err("begin_write"))?;
        {
            let mut table = txn
                .open_table(RELEVANCE_ROWS)
                .map_err(redb_err("open relevance_rows"))?;
            table
                .insert(postal_code, encoded.as_slice())
                .map_err(redb_err("insert row"))?;
        }
        txn.commit().map_err(redb_err("commit"))?;
        Ok(())
    }

    fn import_rows(&self, columns: Vec<String>, rows: Vec<(i64, Vec<bool>)>) -> StoreResult<()> {
        let txn = self
            .db
            .begin_write()
            .map_err(redb_err("begin_write"))?;
        Self::write_columns(&txn, &columns)?;
        {
            let mut table = txn
                .open_table(RELEVANCE_ROWS)
                .map_err(redb_err("open relevance_rows"))?;
            for (postal_code, values) in &rows {
                let encoded = encode_row(*postal_code, values)?;
                table
                    .insert(*postal_code, encoded.as_slice())
                    .map_err(redb_err("insert row"))?;
            }
        }
        txn.commit().map_err(redb_err("commit"))?;
        Ok(())
    }
}

fn decode_columns(raw: &[u8]) -> StoreResult<Vec<String>> {
    bincode::deserialize(raw).map_err(|e| StoreError::Serialization {
        message: format!("failed to decode relevance columns: {e}"),
    })
}

fn decode_row(postal_code: i64, raw: &[u8]) -> StoreResult<Vec<bool>> {
    bincode::deserialize(raw).map_err(|e| StoreError::Serialization {
        message: format!("failed to decode relevance row {postal_code}: {e}"),
    })
}

fn encode_row(postal_code: i64, values: &[bool]) -> StoreResult<Vec<u8>> {
    bincode::serialize(values).map_err(|e| StoreError::Serialization {
        message: format!("failed to encode relevance row {postal_code}: {e}"),
    })
}

impl std::fmt::Debug for DurableStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DurableStore").finish()
    }
}
