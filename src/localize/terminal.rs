//! Terminal ("leaf") risk nodes that seed localization.

use std::collections::BTreeSet;

use petgraph::graph::NodeIndex;

use crate::config::Vocabulary;
use crate::ontology::{ConceptNode, OntologyGraph};

/// Select the seed nodes of `graph`.
///
/// A node qualifies when it has no outgoing causal edge, its `test ontology`
/// tag's first value is the test-ontology marker, and it is not tagged as a
/// generic risk-solution container.
pub fn select_terminal_nodes(graph: &OntologyGraph, vocab: &Vocabulary) -> BTreeSet<NodeIndex> {
    graph
        .node_indices()
        .filter(|&idx| is_terminal(graph, idx, vocab))
        .collect()
}

/// Whether a single node passes every seed rule.
pub fn is_terminal(graph: &OntologyGraph, idx: NodeIndex, vocab: &Vocabulary) -> bool {
    let Some(node) = graph.node(idx) else {
        return false;
    };
    is_causal_leaf(graph, idx, vocab)
        && in_test_ontology(node, vocab)
        && !is_solution_container(node, vocab)
}

fn is_causal_leaf(graph: &OntologyGraph, idx: NodeIndex, vocab: &Vocabulary) -> bool {
    graph.children(idx, &vocab.causal_edge).is_empty()
}

fn in_test_ontology(node: &ConceptNode, vocab: &Vocabulary) -> bool {
    node.test_ontology
        .as_ref()
        .and_then(|values| values.first())
        .is_some_and(|first| *first == vocab.test_ontology)
}

fn is_solution_container(node: &ConceptNode, vocab: &Vocabulary) -> bool {
    node.risk_solution
        .as_ref()
        .is_some_and(|values| values.iter().any(|v| *v == vocab.risk_solution))
}
