//! Ontology graph: concept nodes joined by typed causal edges.
//!
//! The master graph is loaded once and shared read-only behind a
//! [`SharedOntology`] handle. Localization never mutates it; every request
//! works on its own acyclic copy.
//!
//! - [`iri`]: short identifiers derived from concept IRIs
//! - [`load`]: node-link JSON loading, validation and backup fallback

pub mod iri;
pub mod load;

use std::collections::HashMap;
use std::sync::Arc;

use petgraph::Direction;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};

use crate::error::OntologyError;

/// Result type for ontology operations.
pub type OntologyResult<T> = std::result::Result<T, OntologyError>;

/// A concept in the climate-risk ontology.
///
/// Classification tags are kept as typed optional lists rather than an open
/// attribute bag; the flag is absent until localization computes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptNode {
    /// Node key within the graph.
    pub id: String,
    /// Full concept IRI.
    pub iri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(rename = "test ontology", default, skip_serializing_if = "Option::is_none")]
    pub test_ontology: Option<Vec<String>>,
    #[serde(rename = "risk solution", default, skip_serializing_if = "Option::is_none")]
    pub risk_solution: Option<Vec<String>>,
    /// Carried through for consumers; localization does not read it.
    #[serde(rename = "all classes", default, skip_serializing_if = "Option::is_none")]
    pub all_classes: Option<Vec<String>>,
    #[serde(
        rename = "isPossiblyLocal",
        default,
        with = "flag",
        skip_serializing_if = "Option::is_none"
    )]
    pub is_possibly_local: Option<bool>,
}

impl ConceptNode {
    /// Create an untagged node.
    pub fn new(id: impl Into<String>, iri: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            iri: iri.into(),
            label: None,
            test_ontology: None,
            risk_solution: None,
            all_classes: None,
            is_possibly_local: None,
        }
    }

    /// Set the `test ontology` tag values.
    pub fn with_test_ontology<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.test_ontology = Some(values.into_iter().map(Into::into).collect());
        self
    }

    /// Set the `risk solution` tag values.
    pub fn with_risk_solution<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.risk_solution = Some(values.into_iter().map(Into::into).collect());
        self
    }
}

/// Directed, typed edge: `source` causes or promotes `target` when the type is causal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CausalEdge {
    #[serde(rename = "type")]
    pub kind: String,
}

impl CausalEdge {
    pub fn new(kind: impl Into<String>) -> Self {
        Self { kind: kind.into() }
    }
}

/// Concept graph keyed by node id, backed by petgraph.
#[derive(Debug, Clone, Default)]
pub struct OntologyGraph {
    graph: DiGraph<ConceptNode, CausalEdge>,
    index: HashMap<String, NodeIndex>,
}

impl OntologyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node. Ids must be unique and IRIs non-empty.
    pub fn add_node(&mut self, node: ConceptNode) -> OntologyResult<NodeIndex> {
        if node.iri.trim().is_empty() {
            return Err(OntologyError::MissingIri { node_id: node.id });
        }
        if self.index.contains_key(&node.id) {
            return Err(OntologyError::DuplicateNode { node_id: node.id });
        }
        let id = node.id.clone();
        let idx = self.graph.add_node(node);
        self.index.insert(id, idx);
        Ok(idx)
    }

    /// Insert an edge between two existing nodes, by id.
    pub fn add_edge(
        &mut self,
        source: &str,
        target: &str,
        edge: CausalEdge,
    ) -> OntologyResult<EdgeIndex> {
        match (self.index_of(source), self.index_of(target)) {
            (Some(s), Some(t)) => Ok(self.graph.add_edge(s, t, edge)),
            _ => Err(OntologyError::DanglingLink {
                source_id: source.to_string(),
                target_id: target.to_string(),
            }),
        }
    }

    pub fn index_of(&self, id: &str) -> Option<NodeIndex> {
        self.index.get(id).copied()
    }

    pub fn node(&self, idx: NodeIndex) -> Option<&ConceptNode> {
        self.graph.node_weight(idx)
    }

    pub fn node_mut(&mut self, idx: NodeIndex) -> Option<&mut ConceptNode> {
        self.graph.node_weight_mut(idx)
    }

    /// Look a node up by its id.
    pub fn node_by_id(&self, id: &str) -> Option<&ConceptNode> {
        self.index_of(id).and_then(|idx| self.node(idx))
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Node indices in insertion order.
    pub fn node_indices(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.node_indices()
    }

    /// All nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &ConceptNode> + '_ {
        self.graph.node_weights()
    }

    /// All edges as `(source, target, edge)` in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = (NodeIndex, NodeIndex, &CausalEdge)> + '_ {
        self.graph
            .edge_references()
            .map(|e| (e.source(), e.target(), e.weight()))
    }

    /// Targets of outgoing edges of the given type.
    pub fn children(&self, idx: NodeIndex, kind: &str) -> Vec<NodeIndex> {
        self.neighbors_of_kind(idx, kind, Direction::Outgoing)
    }

    /// Sources of incoming edges of the given type.
    pub fn parents(&self, idx: NodeIndex, kind: &str) -> Vec<NodeIndex> {
        self.neighbors_of_kind(idx, kind, Direction::Incoming)
    }

    fn neighbors_of_kind(&self, idx: NodeIndex, kind: &str, dir: Direction) -> Vec<NodeIndex> {
        self.graph
            .edges_directed(idx, dir)
            .filter(|e| e.weight().kind == kind)
            .map(|e| match dir {
                Direction::Outgoing => e.target(),
                Direction::Incoming => e.source(),
            })
            .collect()
    }

    pub fn is_cyclic(&self) -> bool {
        petgraph::algo::is_cyclic_directed(&self.graph)
    }

    /// Strongly connected components that contain a cycle, largest first.
    ///
    /// Each component is reported as node ids. Single nodes count only when
    /// they carry a self-loop.
    pub fn cyclic_components(&self) -> Vec<Vec<String>> {
        let mut components: Vec<Vec<String>> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|members| {
                members.len() > 1
                    || members
                        .first()
                        .is_some_and(|&n| self.graph.find_edge(n, n).is_some())
            })
            .map(|members| {
                members
                    .into_iter()
                    .filter_map(|idx| self.node(idx).map(|n| n.id.clone()))
                    .collect()
            })
            .collect();
        components.sort_by(|a, b| b.len().cmp(&a.len()));
        components
    }

    /// Copy of this graph with the same nodes (same indices) and only the
    /// edges for which `keep` returns true.
    pub(crate) fn filter_edges<F>(&self, mut keep: F) -> OntologyGraph
    where
        F: FnMut(EdgeIndex) -> bool,
    {
        let graph = self
            .graph
            .filter_map(|_, node| Some(node.clone()), |ei, edge| {
                keep(ei).then(|| edge.clone())
            });
        OntologyGraph {
            graph,
            index: self.index.clone(),
        }
    }

    pub(crate) fn inner(&self) -> &DiGraph<ConceptNode, CausalEdge> {
        &self.graph
    }
}

/// Read-only handle on the master ontology, cheap to clone across requests.
#[derive(Debug, Clone)]
pub struct SharedOntology(Arc<OntologyGraph>);

impl SharedOntology {
    pub fn new(graph: OntologyGraph) -> Self {
        Self(Arc::new(graph))
    }

    pub fn graph(&self) -> &OntologyGraph {
        &self.0
    }

    /// The shared graph itself, for returning it unchanged to callers.
    pub fn handle(&self) -> Arc<OntologyGraph> {
        Arc::clone(&self.0)
    }
}

/// `isPossiblyLocal` is written as 0/1 in the node-link format.
mod flag {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<bool>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => s.serialize_some(&u8::from(*v)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Bool(bool),
            Int(u64),
        }

        match Option::<Raw>::deserialize(d)? {
            None => Ok(None),
            Some(Raw::Bool(b)) => Ok(Some(b)),
            Some(Raw::Int(0)) => Ok(Some(false)),
            Some(Raw::Int(1)) => Ok(Some(true)),
            Some(Raw::Int(n)) => Err(D::Error::custom(format!(
                "isPossiblyLocal must be 0 or 1, got {n}"
            ))),
        }
    }
}
