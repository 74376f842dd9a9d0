//! Per-postal-code local relevance facts for a user.
//!
//! A session resolves to a postal code, the postal code to one relevance row,
//! and the row's concept columns to a [`RelevanceRecord`] keyed by short
//! concept identifier.

use std::collections::HashMap;

use crate::error::RelevanceError;
use crate::ontology::iri::IriScheme;
use crate::store::{RelevanceRow, RelevanceStore, SessionStore};

/// Short concept identifier -> "locally relevant" for one postal code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelevanceRecord {
    postal_code: i64,
    flags: HashMap<String, bool>,
}

impl RelevanceRecord {
    pub fn new(postal_code: i64, flags: HashMap<String, bool>) -> Self {
        Self { postal_code, flags }
    }

    /// Convert a store row, shortening every column IRI with `scheme`.
    pub fn from_row(
        postal_code: i64,
        row: &RelevanceRow,
        scheme: &IriScheme,
    ) -> Result<Self, RelevanceError> {
        if row.columns.len() != row.values.len() {
            return Err(RelevanceError::MalformedRow {
                postal_code,
                message: format!(
                    "{} columns but {} values",
                    row.columns.len(),
                    row.values.len()
                ),
            });
        }
        let mut flags = HashMap::with_capacity(row.columns.len());
        for (column, &value) in row.columns.iter().zip(&row.values) {
            let short = scheme
                .short_id(column)
                .map_err(|e| RelevanceError::MalformedRow {
                    postal_code,
                    message: e.to_string(),
                })?;
            flags.insert(short.to_string(), value);
        }
        Ok(Self { postal_code, flags })
    }

    pub fn postal_code(&self) -> i64 {
        self.postal_code
    }

    pub fn get(&self, short_id: &str) -> Option<bool> {
        self.flags.get(short_id).copied()
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> + '_ {
        self.flags.iter().map(|(k, &v)| (k.as_str(), v))
    }
}

/// Why a lookup produced no relevance data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoData {
    /// The session has no recorded postal code.
    NoPostalCode,
    /// The stored postal code is not an integer.
    InvalidPostalCode(String),
    /// No relevance row for this postal code.
    NoRow(i64),
    /// The row exists but carries no concept columns.
    EmptyRow(i64),
}

impl std::fmt::Display for NoData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NoData::NoPostalCode => write!(f, "no postal code recorded"),
            NoData::InvalidPostalCode(raw) => write!(f, "postal code {raw:?} is not numeric"),
            NoData::NoRow(code) => write!(f, "no relevance row for postal code {code}"),
            NoData::EmptyRow(code) => write!(f, "relevance row for postal code {code} is empty"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    Found(RelevanceRecord),
    NoData(NoData),
}

/// Parse a stored postal code. Only integer codes are supported; codes with
/// letters yield `None`.
pub fn parse_postal_code(raw: &str) -> Option<i64> {
    raw.trim().parse().ok()
}

/// Resolves a session to its relevance record.
pub struct RelevanceLookup<'a> {
    sessions: &'a dyn SessionStore,
    relevance: &'a dyn RelevanceStore,
    scheme: &'a IriScheme,
}

impl<'a> RelevanceLookup<'a> {
    pub fn new(
        sessions: &'a dyn SessionStore,
        relevance: &'a dyn RelevanceStore,
        scheme: &'a IriScheme,
    ) -> Self {
        Self {
            sessions,
            relevance,
            scheme,
        }
    }

    /// Fetch the record for `session_id`.
    ///
    /// Missing or unusable data is `Ok(LookupOutcome::NoData)`; `Err` means a
    /// store could not be queried or returned a malformed row.
    pub fn lookup(&self, session_id: &str) -> Result<LookupOutcome, RelevanceError> {
        let Some(raw) = self.sessions.postal_code(session_id)? else {
            return Ok(LookupOutcome::NoData(NoData::NoPostalCode));
        };
        let Some(postal_code) = parse_postal_code(&raw) else {
            return Ok(LookupOutcome::NoData(NoData::InvalidPostalCode(raw)));
        };
        let Some(row) = self.relevance.relevance_row(postal_code)? else {
            return Ok(LookupOutcome::NoData(NoData::NoRow(postal_code)));
        };
        let record = RelevanceRecord::from_row(postal_code, &row, self.scheme)?;
        if record.is_empty() {
            return Ok(LookupOutcome::NoData(NoData::EmptyRow(postal_code)));
        }
        Ok(LookupOutcome::Found(record))
    }
}
