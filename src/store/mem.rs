//! In-memory session and relevance store backed by DashMap.
//!
//! Used by tests and by embedders that load relevance data themselves. All
//! data is lost on process exit.

use std::sync::RwLock;

use dashmap::DashMap;

use super::{RelevanceRow, RelevanceStore, SessionStore, StoreResult};

/// Concurrent in-memory store using sharded hashmaps.
#[derive(Debug, Default)]
pub struct MemStore {
    sessions: DashMap<String, String>,
    columns: RwLock<Vec<String>>,
    rows: DashMap<i64, Vec<bool>>,
}

impl MemStore {
    /// Create an empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored relevance rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of sessions with a postal code.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Caller holds the column write lock.
    fn replace_columns(&self, current: &mut Vec<String>, columns: Vec<String>) {
        if *current != columns {
            if !self.rows.is_empty() {
                tracing::info!(
                    stale_rows = self.rows.len(),
                    "relevance columns changed, clearing rows"
                );
            }
            self.rows.clear();
        }
        *current = columns;
    }
}

impl SessionStore for MemStore {
    fn postal_code(&self, session_id: &str) -> StoreResult<Option<String>> {
        Ok(self.sessions.get(session_id).map(|v| v.value().clone()))
    }

    fn set_postal_code(&self, session_id: &str, postal_code: &str) -> StoreResult<()> {
        self.sessions
            .insert(session_id.to_string(), postal_code.to_string());
        Ok(())
    }
}

impl RelevanceStore for MemStore {
    fn relevance_row(&self, postal_code: i64) -> StoreResult<Option<RelevanceRow>> {
        // Holding the column lock keeps the row paired with its columns.
        let columns = self.columns.read().expect("columns lock poisoned");
        let Some(values) = self.rows.get(&postal_code).map(|v| v.value().clone()) else {
            return Ok(None);
        };
        Ok(Some(RelevanceRow {
            columns: columns.clone(),
            values,
        }))
    }

    fn put_columns(&self, columns: Vec<String>) -> StoreResult<()> {
        let mut current = self.columns.write().expect("columns lock poisoned");
        self.replace_columns(&mut current, columns);
        Ok(())
    }

    fn put_row(&self, postal_code: i64, values: Vec<bool>) -> StoreResult<()> {
        let _columns = self.columns.read().expect("columns lock poisoned");
        self.rows.insert(postal_code, values);
        Ok(())
    }

    fn import_rows(&self, columns: Vec<String>, rows: Vec<(i64, Vec<bool>)>) -> StoreResult<()> {
        let mut current = self.columns.write().expect("columns lock poisoned");
        self.replace_columns(&mut current, columns);
        for (postal_code, values) in rows {
            self.rows.insert(postal_code, values);
        }
        Ok(())
    }
}
