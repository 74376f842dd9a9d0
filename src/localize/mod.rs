//! Graph localization pipeline.
//!
//! Given the master ontology and one user's relevance record:
//!
//! 1. [`acyclic`]: project the master graph onto an acyclic working copy
//! 2. [`annotate`]: merge the record's flags onto matching nodes
//! 3. [`terminal`]: select the seed leaves of the working copy
//! 4. [`propagate`]: push flags from the seeds up to every cause
//!
//! [`localize_graph`] runs all four; the master graph is only read.

pub mod acyclic;
pub mod annotate;
pub mod propagate;
pub mod terminal;

use crate::config::LocalizeConfig;
use crate::error::LocalizeResult;
use crate::ontology::OntologyGraph;
use crate::relevance::RelevanceRecord;

use acyclic::CycleBreaker;
use annotate::AnnotationReport;
use propagate::{CombinePolicy, PropagationReport};

/// What one localization run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalizationReport {
    pub postal_code: i64,
    /// Edges dropped by the acyclic projection, as `(source id, target id)`.
    pub removed_edges: Vec<(String, String)>,
    pub annotation: AnnotationReport,
    pub propagation: PropagationReport,
}

/// Build the localized acyclic copy of `master` for one relevance record.
pub fn localize_graph(
    master: &OntologyGraph,
    record: &RelevanceRecord,
    config: &LocalizeConfig,
    breaker: &dyn CycleBreaker,
    policy: &dyn CombinePolicy,
) -> LocalizeResult<(OntologyGraph, LocalizationReport)> {
    let projection = breaker.project(master, &config.vocabulary.causal_edge)?;
    let mut graph = projection.graph;

    let annotation = annotate::annotate(&mut graph, record, &config.iri)?;
    let seeds = terminal::select_terminal_nodes(&graph, &config.vocabulary);
    let propagation =
        propagate::propagate(&mut graph, &seeds, &config.vocabulary.causal_edge, policy)?;

    Ok((
        graph,
        LocalizationReport {
            postal_code: record.postal_code(),
            removed_edges: projection.removed,
            annotation,
            propagation,
        },
    ))
}
