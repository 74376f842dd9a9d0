//! Acyclic projection of the ontology graph.
//!
//! The master graph may contain causal loops (warming promotes X, X promotes
//! warming). Traversals downstream need a DAG, so each request works on a
//! copy with the cycle-closing edges removed.

use std::collections::HashSet;

use petgraph::algo::{DfsSpace, has_path_connecting};
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::{DfsEvent, EdgeFiltered, EdgeRef, depth_first_search};

use crate::error::OntologyError;
use crate::ontology::{OntologyGraph, OntologyResult};

/// Acyclic working copy plus the edges that were dropped to get there.
#[derive(Debug, Clone)]
pub struct Projection {
    /// Same node set and node indices as the input, no directed cycles.
    pub graph: OntologyGraph,
    /// Removed edges as `(source id, target id)`.
    pub removed: Vec<(String, String)>,
}

/// Strategy for turning an arbitrary directed graph into a DAG.
///
/// `causal_edge` names the edge type propagation runs over; strategies should
/// prefer dropping other edge types when a loop mixes them.
///
/// Implementations must be deterministic for a fixed node/edge insertion
/// order: terminal-node selection depends on which edges survive.
pub trait CycleBreaker: Send + Sync {
    fn project(&self, graph: &OntologyGraph, causal_edge: &str) -> OntologyResult<Projection>;
}

/// Breaks causal loops first, then fits the remaining edge types around them.
///
/// 1. A DFS over causal edges only, started from each node in insertion order,
///    finds the causal back edges. Those are dropped, including every parallel
///    causal edge between the same pair.
/// 2. Non-causal edges are then added in insertion order, skipping any edge
///    whose target already reaches its source.
///
/// A causal edge is therefore only ever dropped to break a purely causal loop.
#[derive(Debug, Clone, Copy, Default)]
pub struct DfsBackEdgeBreaker;

impl CycleBreaker for DfsBackEdgeBreaker {
    fn project(&self, graph: &OntologyGraph, causal_edge: &str) -> OntologyResult<Projection> {
        let inner = graph.inner();

        let causal_only = EdgeFiltered::from_fn(inner, |e| e.weight().kind == causal_edge);
        let mut back_edges: HashSet<(NodeIndex, NodeIndex)> = HashSet::new();
        depth_first_search(&causal_only, inner.node_indices(), |event| {
            if let DfsEvent::BackEdge(u, v) = event {
                back_edges.insert((u, v));
            }
        });

        // Surviving structure so far; node indices match `inner`.
        let mut skeleton: DiGraph<(), ()> =
            DiGraph::with_capacity(inner.node_count(), inner.edge_count());
        for _ in inner.node_indices() {
            skeleton.add_node(());
        }

        let mut dropped: HashSet<EdgeIndex> = HashSet::new();
        let (causal, other): (Vec<_>, Vec<_>) = inner
            .edge_references()
            .partition(|e| e.weight().kind == causal_edge);
        for e in causal {
            if back_edges.contains(&(e.source(), e.target())) {
                dropped.insert(e.id());
            } else {
                skeleton.add_edge(e.source(), e.target(), ());
            }
        }

        let mut space = DfsSpace::new(&skeleton);
        for e in other {
            if has_path_connecting(&skeleton, e.target(), e.source(), Some(&mut space)) {
                dropped.insert(e.id());
            } else {
                skeleton.add_edge(e.source(), e.target(), ());
            }
        }

        let mut removed = Vec::new();
        let projected = graph.filter_edges(|ei| {
            if !dropped.contains(&ei) {
                return true;
            }
            if let Some((s, t)) = inner.edge_endpoints(ei) {
                if let (Some(src), Some(dst)) = (graph.node(s), graph.node(t)) {
                    tracing::debug!(
                        source = %src.id,
                        target = %dst.id,
                        kind = %inner[ei].kind,
                        "dropping cycle-closing edge"
                    );
                    removed.push((src.id.clone(), dst.id.clone()));
                }
            }
            false
        });

        ensure_acyclic(&projected)?;
        Ok(Projection {
            graph: projected,
            removed,
        })
    }
}

/// Fail if `graph` still has a directed cycle.
pub fn ensure_acyclic(graph: &OntologyGraph) -> OntologyResult<()> {
    if !graph.is_cyclic() {
        return Ok(());
    }
    let iri = graph
        .cyclic_components()
        .first()
        .and_then(|members| members.first())
        .and_then(|id| graph.node_by_id(id))
        .map(|n| n.iri.clone())
        .unwrap_or_default();
    Err(OntologyError::StillCyclic { iri })
}
