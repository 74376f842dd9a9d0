//! Short concept identifiers derived from full IRIs.
//!
//! Concept IRIs look like `http://webprotege.stanford.edu/R8znJBKduM7l8XDXMalSWSl`.
//! The short identifier is everything from a fixed offset past the first
//! occurrence of a domain marker; with the defaults (`"edu"`, offset 4) that is
//! the trailing `R8znJBKduM7l8XDXMalSWSl`.

use serde::{Deserialize, Serialize};

use crate::error::OntologyError;

/// How short identifiers are cut out of a full IRI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IriScheme {
    /// Substring located with a first-occurrence search.
    pub marker: String,
    /// Byte offset from the start of the marker to the short identifier.
    pub offset: usize,
}

impl Default for IriScheme {
    fn default() -> Self {
        Self {
            marker: "edu".into(),
            offset: 4,
        }
    }
}

impl IriScheme {
    /// Extract the short identifier from `iri`.
    ///
    /// Fails if the marker is absent, or the offset lands past the end of the
    /// IRI (overflow included) or inside a multi-byte character.
    pub fn short_id<'a>(&self, iri: &'a str) -> Result<&'a str, OntologyError> {
        let malformed = || OntologyError::MalformedIri {
            iri: iri.to_string(),
            marker: self.marker.clone(),
        };
        let pos = iri
            .find(&self.marker)
            .and_then(|start| start.checked_add(self.offset))
            .ok_or_else(malformed)?;
        match iri.get(pos..) {
            Some(short) if !short.is_empty() => Ok(short),
            _ => Err(malformed()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn webprotege_iri_maps_to_trailing_id() {
        let scheme = IriScheme::default();
        assert_eq!(
            scheme
                .short_id("http://webprotege.stanford.edu/R8znJBKduM7l8XDXMalSWSl")
                .unwrap(),
            "R8znJBKduM7l8XDXMalSWSl"
        );
    }

    #[test]
    fn first_marker_occurrence_wins() {
        let scheme = IriScheme::default();
        assert_eq!(
            scheme.short_id("http://x.edu/Redu1").unwrap(),
            "Redu1"
        );
    }

    #[test]
    fn missing_marker_is_an_error() {
        let scheme = IriScheme::default();
        let err = scheme.short_id("urn:concept:R123").unwrap_err();
        assert!(matches!(err, OntologyError::MalformedIri { .. }));
    }

    #[test]
    fn nothing_after_marker_is_an_error() {
        let scheme = IriScheme::default();
        assert!(scheme.short_id("http://stanford.edu/").is_err());
        assert!(scheme.short_id("http://stanford.edu").is_err());
    }

    #[test]
    fn custom_marker_and_offset() {
        let scheme = IriScheme {
            marker: "webprotege.stanford.edu".into(),
            offset: 24,
        };
        assert_eq!(
            scheme
                .short_id("http://webprotege.stanford.edu/Rabc")
                .unwrap(),
            "Rabc"
        );
    }

    #[test]
    fn huge_offset_is_an_error() {
        let scheme = IriScheme {
            marker: "edu".into(),
            offset: usize::MAX,
        };
        let err = scheme
            .short_id("http://webprotege.stanford.edu/Rabc")
            .unwrap_err();
        assert!(matches!(err, OntologyError::MalformedIri { .. }));
    }
}
