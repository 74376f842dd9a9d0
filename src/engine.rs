//! Engine facade: the localization entry point.
//!
//! The [`Localizer`] owns the shared master ontology, the two data stores and
//! the swappable cycle-breaking and combination policies. One call to
//! [`Localizer::localize`] serves one user request.

use std::collections::BTreeSet;
use std::sync::Arc;

use petgraph::graph::NodeIndex;

use crate::config::LocalizeConfig;
use crate::error::LocalizeResult;
use crate::localize::acyclic::{CycleBreaker, DfsBackEdgeBreaker};
use crate::localize::propagate::CombinePolicy;
use crate::localize::{self, LocalizationReport, terminal};
use crate::ontology::{OntologyGraph, SharedOntology};
use crate::relevance::{LookupOutcome, NoData, RelevanceLookup};
use crate::store::{RelevanceStore, SessionStore};

/// Why a request got the master graph back unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fallback {
    NoData(NoData),
    /// A store failed or returned malformed data; the message is the error.
    LookupFailed(String),
}

impl std::fmt::Display for Fallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Fallback::NoData(reason) => write!(f, "{reason}"),
            Fallback::LookupFailed(message) => write!(f, "relevance lookup failed: {message}"),
        }
    }
}

/// Result of one localization request.
#[derive(Debug, Clone)]
pub enum Localized {
    /// No usable relevance data; this is the shared master graph itself.
    Unchanged {
        graph: Arc<OntologyGraph>,
        reason: Fallback,
    },
    /// Request-owned acyclic copy with locality flags populated.
    Localized {
        graph: OntologyGraph,
        report: LocalizationReport,
    },
}

impl Localized {
    pub fn graph(&self) -> &OntologyGraph {
        match self {
            Localized::Unchanged { graph, .. } => graph.as_ref(),
            Localized::Localized { graph, .. } => graph,
        }
    }

    pub fn is_localized(&self) -> bool {
        matches!(self, Localized::Localized { .. })
    }
}

/// Personalizes the shared ontology for individual sessions.
pub struct Localizer {
    config: LocalizeConfig,
    ontology: SharedOntology,
    sessions: Arc<dyn SessionStore>,
    relevance: Arc<dyn RelevanceStore>,
    breaker: Box<dyn CycleBreaker>,
    policy: Box<dyn CombinePolicy>,
}

impl Localizer {
    /// Create a localizer with the default DFS cycle breaker and the
    /// combination rule from `config`.
    pub fn new(
        config: LocalizeConfig,
        ontology: SharedOntology,
        sessions: Arc<dyn SessionStore>,
        relevance: Arc<dyn RelevanceStore>,
    ) -> LocalizeResult<Self> {
        config.validate()?;
        tracing::info!(
            nodes = ontology.graph().node_count(),
            edges = ontology.graph().edge_count(),
            rule = ?config.propagation.rule,
            "initializing localizer"
        );
        let policy = Box::new(config.propagation.rule);
        Ok(Self {
            config,
            ontology,
            sessions,
            relevance,
            breaker: Box::new(DfsBackEdgeBreaker),
            policy,
        })
    }

    /// Replace the cycle-breaking strategy.
    pub fn with_cycle_breaker(mut self, breaker: impl CycleBreaker + 'static) -> Self {
        self.breaker = Box::new(breaker);
        self
    }

    /// Replace the flag combination policy.
    pub fn with_policy(mut self, policy: impl CombinePolicy + 'static) -> Self {
        self.policy = Box::new(policy);
        self
    }

    /// Localize the ontology for `session_id`.
    ///
    /// Without usable relevance data the shared master graph is returned
    /// as-is. Errors are reserved for broken graph data (malformed IRIs,
    /// cycles surviving projection).
    pub fn localize(&self, session_id: &str) -> LocalizeResult<Localized> {
        let lookup = RelevanceLookup::new(
            self.sessions.as_ref(),
            self.relevance.as_ref(),
            &self.config.iri,
        );
        let record = match lookup.lookup(session_id) {
            Ok(LookupOutcome::Found(record)) => record,
            Ok(LookupOutcome::NoData(reason)) => {
                tracing::debug!(session = session_id, %reason, "no relevance data");
                return Ok(self.unchanged(Fallback::NoData(reason)));
            }
            Err(err) => {
                tracing::warn!(session = session_id, error = %err, "relevance lookup failed");
                return Ok(self.unchanged(Fallback::LookupFailed(err.to_string())));
            }
        };

        let (graph, report) = localize::localize_graph(
            self.ontology.graph(),
            &record,
            &self.config,
            self.breaker.as_ref(),
            self.policy.as_ref(),
        )?;
        tracing::info!(
            session = session_id,
            postal_code = report.postal_code,
            removed_edges = report.removed_edges.len(),
            annotated = report.annotation.annotated,
            seeds = report.propagation.seeds,
            resolved = report.propagation.visited,
            "localized ontology"
        );
        Ok(Localized::Localized { graph, report })
    }

    /// Seed leaves of the acyclic projection, as node indices into it.
    pub fn terminal_nodes(&self) -> LocalizeResult<(OntologyGraph, BTreeSet<NodeIndex>)> {
        let projection = self
            .breaker
            .project(self.ontology.graph(), &self.config.vocabulary.causal_edge)?;
        let seeds = terminal::select_terminal_nodes(&projection.graph, &self.config.vocabulary);
        Ok((projection.graph, seeds))
    }

    pub fn ontology(&self) -> &SharedOntology {
        &self.ontology
    }

    pub fn config(&self) -> &LocalizeConfig {
        &self.config
    }

    fn unchanged(&self, reason: Fallback) -> Localized {
        Localized::Unchanged {
            graph: self.ontology.handle(),
            reason,
        }
    }
}

impl std::fmt::Debug for Localizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Localizer")
            .field("config", &self.config)
            .field("ontology", self.ontology.graph())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::localize::propagate::CombineRule;
    use crate::ontology::{CausalEdge, ConceptNode};
    use crate::store::mem::MemStore;

    fn iri(short: &str) -> String {
        format!("http://webprotege.stanford.edu/{short}")
    }

    fn ontology() -> SharedOntology {
        let mut g = OntologyGraph::new();
        g.add_node(ConceptNode::new("cause", iri("Rcause"))).unwrap();
        g.add_node(ConceptNode::new("leaf", iri("Rleaf")).with_test_ontology(["test ontology"]))
            .unwrap();
        g.add_edge("cause", "leaf", CausalEdge::new("causes_or_promotes"))
            .unwrap();
        SharedOntology::new(g)
    }

    fn localizer(store: Arc<MemStore>) -> Localizer {
        Localizer::new(
            LocalizeConfig::default(),
            ontology(),
            store.clone(),
            store,
        )
        .unwrap()
    }

    #[test]
    fn localizes_with_data() {
        let store = Arc::new(MemStore::new());
        store.set_postal_code("s", "19104").unwrap();
        store.put_columns(vec![iri("Rleaf")]).unwrap();
        store.put_row(19104, vec![true]).unwrap();

        let result = localizer(store).localize("s").unwrap();
        assert!(result.is_localized());
        assert_eq!(
            result.graph().node_by_id("cause").unwrap().is_possibly_local,
            Some(true)
        );
    }

    #[test]
    fn missing_session_returns_master() {
        let store = Arc::new(MemStore::new());
        let localizer = localizer(store);
        let result = localizer.localize("nobody").unwrap();
        let Localized::Unchanged { graph, reason } = result else {
            panic!("expected fallback");
        };
        assert!(Arc::ptr_eq(&graph, &localizer.ontology().handle()));
        assert_eq!(reason, Fallback::NoData(NoData::NoPostalCode));
    }

    #[test]
    fn policy_can_be_swapped() {
        let store = Arc::new(MemStore::new());
        store.set_postal_code("s", "1").unwrap();
        store.put_columns(vec![iri("Rleaf")]).unwrap();
        store.put_row(1, vec![false]).unwrap();

        let localizer = localizer(store).with_policy(CombineRule::All);
        let result = localizer.localize("s").unwrap();
        assert_eq!(
            result.graph().node_by_id("cause").unwrap().is_possibly_local,
            Some(false)
        );
    }

    #[test]
    fn terminal_nodes_of_projection() {
        let localizer = localizer(Arc::new(MemStore::new()));
        let (graph, seeds) = localizer.terminal_nodes().unwrap();
        let ids: Vec<_> = seeds
            .iter()
            .map(|&i| graph.node(i).unwrap().id.as_str())
            .collect();
        assert_eq!(ids, vec!["leaf"]);
    }
}
