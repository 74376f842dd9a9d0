//! Rich diagnostic error types for the localization engine.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes and help text. Only [`OntologyError`] and
//! [`PropagationError`] are fatal to a localization run; relevance lookup
//! failures are recovered by the engine and reported as a fallback.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for the localization engine.
#[derive(Debug, Error, Diagnostic)]
pub enum LocalizeError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Ontology(#[from] OntologyError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Relevance(#[from] RelevanceError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Propagation(#[from] PropagationError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Ontology errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum OntologyError {
    #[error("failed to read ontology graph {path}: {source}")]
    #[diagnostic(
        code(climind::ontology::io),
        help("Check that the graph file exists and is readable, or configure `graph_backup_file`.")
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse ontology graph {path}: {message}")]
    #[diagnostic(
        code(climind::ontology::parse),
        help(
            "The graph file must be node-link JSON with `nodes` and `links` arrays. \
             Re-export it from the ontology store."
        )
    )]
    Parse { path: String, message: String },

    #[error("node {node_id} has an empty iri")]
    #[diagnostic(
        code(climind::ontology::missing_iri),
        help("Every concept node needs its full IRI; short identifiers are derived from it.")
    )]
    MissingIri { node_id: String },

    #[error("duplicate node id: {node_id}")]
    #[diagnostic(
        code(climind::ontology::duplicate_node),
        help("Node ids must be unique within one ontology graph.")
    )]
    DuplicateNode { node_id: String },

    #[error("link {source_id} -> {target_id} references an unknown node")]
    #[diagnostic(
        code(climind::ontology::dangling_link),
        help("Every link endpoint must name a node declared in the `nodes` array.")
    )]
    DanglingLink { source_id: String, target_id: String },

    #[error("iri {iri:?} has no short identifier after marker {marker:?}")]
    #[diagnostic(
        code(climind::ontology::malformed_iri),
        help(
            "The short identifier is taken from a fixed offset past the first \
             occurrence of the domain marker. Fix the node's IRI or the `[iri]` config."
        )
    )]
    MalformedIri { iri: String, marker: String },

    #[error("projection left a directed cycle through {iri}")]
    #[diagnostic(
        code(climind::ontology::still_cyclic),
        help("The cycle breaker returned a graph that still contains a cycle. This is a bug.")
    )]
    StillCyclic { iri: String },
}

// ---------------------------------------------------------------------------
// Store errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("I/O error: {source}")]
    #[diagnostic(
        code(climind::store::io),
        help(
            "A filesystem operation failed. Check that the data directory exists \
             and has correct permissions."
        )
    )]
    Io {
        #[source]
        source: std::io::Error,
    },

    #[error("redb transaction error: {message}")]
    #[diagnostic(
        code(climind::store::redb),
        help(
            "The embedded database encountered a transaction error. \
             Try again, or re-import the relevance data into a fresh data directory."
        )
    )]
    Redb { message: String },

    #[error("serialization error: {message}")]
    #[diagnostic(
        code(climind::store::serde),
        help("Stored data could not be decoded. Re-import the relevance data.")
    )]
    Serialization { message: String },
}

// ---------------------------------------------------------------------------
// Relevance errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum RelevanceError {
    #[error("relevance store unavailable: {source}")]
    #[diagnostic(
        code(climind::relevance::unavailable),
        help("The session or relevance store could not be queried. The request may be retried.")
    )]
    Unavailable {
        #[source]
        source: StoreError,
    },

    #[error("malformed relevance row for postal code {postal_code}: {message}")]
    #[diagnostic(
        code(climind::relevance::malformed_row),
        help("Each relevance column must be a full concept IRI with exactly one value per column.")
    )]
    MalformedRow { postal_code: i64, message: String },
}

impl From<StoreError> for RelevanceError {
    fn from(source: StoreError) -> Self {
        RelevanceError::Unavailable { source }
    }
}

// ---------------------------------------------------------------------------
// Propagation errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum PropagationError {
    #[error("cycle detected while resolving {iri}")]
    #[diagnostic(
        code(climind::propagate::cycle),
        help(
            "Propagation requires an acyclic graph. Run the acyclic projection \
             before propagating locality flags."
        )
    )]
    CycleDetected { iri: String },

    #[error("seed node index {index} is not in the graph")]
    #[diagnostic(
        code(climind::propagate::unknown_seed),
        help("Seeds must come from terminal-node selection on the same graph.")
    )]
    UnknownSeed { index: usize },
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    #[diagnostic(code(climind::config::read))]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {message}")]
    #[diagnostic(
        code(climind::config::parse),
        help("The config file must be valid TOML. See the `[iri]`, `[vocabulary]`, `[propagation]` and `[paths]` tables.")
    )]
    Parse { message: String },

    #[error("invalid configuration: {message}")]
    #[diagnostic(code(climind::config::invalid), help("Check the LocalizeConfig fields. {message}"))]
    Invalid { message: String },
}

/// Convenience alias for functions returning localization results.
pub type LocalizeResult<T> = std::result::Result<T, LocalizeError>;
