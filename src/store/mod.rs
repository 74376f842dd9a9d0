//! Session and relevance data stores.
//!
//! The engine reads through two narrow traits so the backing store can be
//! swapped:
//!
//! - [`SessionStore`]: session id -> stored postal code
//! - [`RelevanceStore`]: postal code -> relevance row
//!
//! Two implementations are provided:
//!
//! - [`MemStore`](mem::MemStore): concurrent hashmaps (DashMap), nothing persisted
//! - [`DurableStore`](durable::DurableStore): ACID tables in redb

pub mod durable;
pub mod mem;

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::relevance::parse_postal_code;

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// One relevance row: concept columns as full IRIs, one value per column.
///
/// The postal-code key column is not part of `columns`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelevanceRow {
    pub columns: Vec<String>,
    pub values: Vec<bool>,
}

/// Resolves a session to the postal code the user entered.
pub trait SessionStore: Send + Sync {
    fn postal_code(&self, session_id: &str) -> StoreResult<Option<String>>;

    fn set_postal_code(&self, session_id: &str, postal_code: &str) -> StoreResult<()>;
}

/// Per-postal-code relevance facts. All rows share one column list.
///
/// A row is only meaningful against the column list it was written with, so
/// changing the column list discards every stored row.
pub trait RelevanceStore: Send + Sync {
    /// The row for `postal_code` paired with the column list it was written under.
    fn relevance_row(&self, postal_code: i64) -> StoreResult<Option<RelevanceRow>>;

    /// Replace the shared column list. Existing rows are cleared if it changes.
    fn put_columns(&self, columns: Vec<String>) -> StoreResult<()>;

    fn put_row(&self, postal_code: i64, values: Vec<bool>) -> StoreResult<()>;

    /// Write a column list and its rows as one unit.
    ///
    /// Stores that can do so apply it atomically; the default writes the
    /// columns, then each row.
    fn import_rows(&self, columns: Vec<String>, rows: Vec<(i64, Vec<bool>)>) -> StoreResult<()> {
        self.put_columns(columns)?;
        for (postal_code, values) in rows {
            self.put_row(postal_code, values)?;
        }
        Ok(())
    }
}

/// Bulk relevance data as imported by the CLI.
///
/// ```json
/// {"columns": ["http://webprotege.stanford.edu/R..."], "rows": {"19104": [true]}}
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelevanceImport {
    pub columns: Vec<String>,
    pub rows: BTreeMap<String, Vec<bool>>,
}

impl RelevanceImport {
    pub fn from_file(path: &Path) -> StoreResult<Self> {
        let json = std::fs::read_to_string(path).map_err(|source| StoreError::Io { source })?;
        serde_json::from_str(&json).map_err(|e| StoreError::Serialization {
            message: format!("invalid relevance import {}: {e}", path.display()),
        })
    }

    /// Validate every row, then write columns and rows. Returns the row count.
    ///
    /// Rows from an earlier import survive only if the column list is unchanged.
    pub fn apply(&self, store: &dyn RelevanceStore) -> StoreResult<usize> {
        let mut rows = Vec::with_capacity(self.rows.len());
        for (key, values) in &self.rows {
            let code = parse_postal_code(key).ok_or_else(|| StoreError::Serialization {
                message: format!("postal code {key:?} is not numeric"),
            })?;
            if values.len() != self.columns.len() {
                return Err(StoreError::Serialization {
                    message: format!(
                        "row {key} has {} values for {} columns",
                        values.len(),
                        self.columns.len()
                    ),
                });
            }
            rows.push((code, values.clone()));
        }

        let count = rows.len();
        store.import_rows(self.columns.clone(), rows)?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mem::MemStore;

    fn column(short: &str) -> String {
        format!("http://webprotege.stanford.edu/{short}")
    }

    #[test]
    fn import_writes_rows() {
        let import: RelevanceImport = serde_json::from_str(
            r#"{"columns": ["http://webprotege.stanford.edu/Ra", "http://webprotege.stanford.edu/Rb"],
                "rows": {"19104": [true, false], "02139": [false, false]}}"#,
        )
        .unwrap();
        let store = MemStore::new();
        assert_eq!(import.apply(&store).unwrap(), 2);

        let row = store.relevance_row(2139).unwrap().unwrap();
        assert_eq!(row.values, vec![false, false]);
        assert_eq!(row.columns.len(), 2);
    }

    #[test]
    fn import_rejects_bad_rows_before_writing() {
        let import = RelevanceImport {
            columns: vec!["http://webprotege.stanford.edu/Ra".into()],
            rows: BTreeMap::from([
                ("19104".to_string(), vec![true]),
                ("N1 9GU".to_string(), vec![true]),
            ]),
        };
        let store = MemStore::new();
        assert!(import.apply(&store).is_err());
        assert_eq!(store.relevance_row(19104).unwrap(), None);
    }

    #[test]
    fn reimport_with_reordered_columns_drops_stale_rows() {
        let store = MemStore::new();
        RelevanceImport {
            columns: vec![column("RA"), column("RB")],
            rows: BTreeMap::from([("1".to_string(), vec![true, false])]),
        }
        .apply(&store)
        .unwrap();
        RelevanceImport {
            columns: vec![column("RB"), column("RA")],
            rows: BTreeMap::from([("2".to_string(), vec![true, false])]),
        }
        .apply(&store)
        .unwrap();

        assert_eq!(store.relevance_row(1).unwrap(), None);
        let row = store.relevance_row(2).unwrap().unwrap();
        assert_eq!(row.columns, vec![column("RB"), column("RA")]);
        assert_eq!(row.values, vec![true, false]);
    }

    #[test]
    fn reimport_with_same_columns_merges_rows() {
        let columns = vec![column("RA")];
        let store = MemStore::new();
        for (code, value) in [("1", true), ("2", false)] {
            RelevanceImport {
                columns: columns.clone(),
                rows: BTreeMap::from([(code.to_string(), vec![value])]),
            }
            .apply(&store)
            .unwrap();
        }
        assert_eq!(store.relevance_row(1).unwrap().unwrap().values, vec![true]);
        assert_eq!(store.relevance_row(2).unwrap().unwrap().values, vec![false]);
    }
}
