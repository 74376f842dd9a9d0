//! Upward propagation of the local-relevance flag.
//!
//! Starting from the seed leaves, every cause that (transitively) leads to a
//! seed along causal edges gets a flag derived from its effects. Each node is
//! resolved once; the visited map doubles as the cycle guard.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};

use crate::error::PropagationError;
use crate::ontology::OntologyGraph;

/// Derives a node's flag from its own annotation and its resolved children.
pub trait CombinePolicy: Send + Sync {
    /// `own` is the node's annotated flag; `children` holds the resolved flags
    /// of its causal children that lead to a seed.
    fn combine(&self, own: Option<bool>, children: &[Option<bool>]) -> Option<bool>;
}

/// Built-in combination rules. Children without a flag are ignored; with no
/// flagged child at all the node keeps its own annotation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CombineRule {
    /// Possibly local if any effect is possibly local.
    #[default]
    Any,
    /// Possibly local only if every flagged effect is.
    All,
}

impl CombinePolicy for CombineRule {
    fn combine(&self, own: Option<bool>, children: &[Option<bool>]) -> Option<bool> {
        let mut known = children.iter().flatten().copied().peekable();
        if known.peek().is_none() {
            return own;
        }
        Some(match self {
            CombineRule::Any => known.any(|f| f),
            CombineRule::All => known.all(|f| f),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    InProgress,
    Resolved(Option<bool>),
}

/// Counts from one propagation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PropagationReport {
    pub seeds: usize,
    /// Nodes resolved (seeds plus their causal ancestors).
    pub visited: usize,
    pub local: usize,
    pub not_local: usize,
    pub unresolved: usize,
}

/// Resolve flags for `seeds` and all of their causal ancestors.
///
/// Nodes that do not lead to a seed keep whatever flag they had. Fails with
/// [`PropagationError::CycleDetected`] if the causal subgraph is not acyclic.
pub fn propagate(
    graph: &mut OntologyGraph,
    seeds: &BTreeSet<NodeIndex>,
    causal_edge: &str,
    policy: &dyn CombinePolicy,
) -> Result<PropagationReport, PropagationError> {
    if let Some(missing) = seeds.iter().find(|&&s| graph.node(s).is_none()) {
        return Err(PropagationError::UnknownSeed {
            index: missing.index(),
        });
    }

    let reach = ancestors(graph, seeds, causal_edge);
    let mut order: Vec<NodeIndex> = reach.iter().copied().collect();
    order.sort();

    let mut visited: HashMap<NodeIndex, Visit> = HashMap::with_capacity(reach.len());
    for node in order {
        resolve(graph, node, &reach, causal_edge, policy, &mut visited)?;
    }

    let mut report = PropagationReport {
        seeds: seeds.len(),
        visited: visited.len(),
        ..Default::default()
    };
    for visit in visited.values() {
        match visit {
            Visit::Resolved(Some(true)) => report.local += 1,
            Visit::Resolved(Some(false)) => report.not_local += 1,
            _ => report.unresolved += 1,
        }
    }
    tracing::debug!(
        seeds = report.seeds,
        visited = report.visited,
        local = report.local,
        not_local = report.not_local,
        "propagated locality flags"
    );
    Ok(report)
}

/// Seeds plus every node with a causal path to a seed.
fn ancestors(
    graph: &OntologyGraph,
    seeds: &BTreeSet<NodeIndex>,
    causal_edge: &str,
) -> HashSet<NodeIndex> {
    let mut reach: HashSet<NodeIndex> = seeds.iter().copied().collect();
    let mut queue: VecDeque<NodeIndex> = seeds.iter().copied().collect();
    while let Some(node) = queue.pop_front() {
        for parent in graph.parents(node, causal_edge) {
            if reach.insert(parent) {
                queue.push_back(parent);
            }
        }
    }
    reach
}

/// Post-order resolution of `root` over children inside `reach`.
fn resolve(
    graph: &mut OntologyGraph,
    root: NodeIndex,
    reach: &HashSet<NodeIndex>,
    causal_edge: &str,
    policy: &dyn CombinePolicy,
    visited: &mut HashMap<NodeIndex, Visit>,
) -> Result<(), PropagationError> {
    let mut stack = vec![(root, false)];
    while let Some((node, expanded)) = stack.pop() {
        let children: Vec<NodeIndex> = graph
            .children(node, causal_edge)
            .into_iter()
            .filter(|c| reach.contains(c))
            .collect();

        if expanded {
            let flags = children
                .iter()
                .map(|c| match visited.get(c) {
                    Some(Visit::Resolved(flag)) => Ok(*flag),
                    _ => Err(cycle_at(graph, *c)),
                })
                .collect::<Result<Vec<_>, _>>()?;
            let own = graph.node(node).and_then(|n| n.is_possibly_local);
            let flag = policy.combine(own, &flags);
            if let Some(n) = graph.node_mut(node) {
                n.is_possibly_local = flag;
            }
            visited.insert(node, Visit::Resolved(flag));
            continue;
        }

        match visited.get(&node) {
            Some(Visit::Resolved(_)) => continue,
            // An unexpanded node already on the path means we came back around.
            Some(Visit::InProgress) => return Err(cycle_at(graph, node)),
            None => {}
        }
        visited.insert(node, Visit::InProgress);
        stack.push((node, true));
        for child in children {
            match visited.get(&child) {
                Some(Visit::Resolved(_)) => {}
                Some(Visit::InProgress) => return Err(cycle_at(graph, child)),
                None => stack.push((child, false)),
            }
        }
    }
    Ok(())
}

fn cycle_at(graph: &OntologyGraph, idx: NodeIndex) -> PropagationError {
    PropagationError::CycleDetected {
        iri: graph
            .node(idx)
            .map(|n| n.iri.clone())
            .unwrap_or_else(|| format!("#{}", idx.index())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ontology::{CausalEdge, ConceptNode};

    const CAUSAL: &str = "causes_or_promotes";

    fn graph(ids: &[&str], edges: &[(&str, &str)]) -> OntologyGraph {
        let mut g = OntologyGraph::new();
        for id in ids {
            g.add_node(ConceptNode::new(*id, format!("http://webprotege.stanford.edu/R{id}")))
                .unwrap();
        }
        for (s, t) in edges {
            g.add_edge(s, t, CausalEdge::new(CAUSAL)).unwrap();
        }
        g
    }

    fn set(g: &mut OntologyGraph, id: &str, flag: bool) {
        let idx = g.index_of(id).unwrap();
        g.node_mut(idx).unwrap().is_possibly_local = Some(flag);
    }

    fn flag(g: &OntologyGraph, id: &str) -> Option<bool> {
        g.node_by_id(id).unwrap().is_possibly_local
    }

    fn seeds(g: &OntologyGraph, ids: &[&str]) -> BTreeSet<NodeIndex> {
        ids.iter().map(|id| g.index_of(id).unwrap()).collect()
    }

    #[test]
    fn chain_resolves_to_seed_flag() {
        let mut g = graph(&["X", "Y", "Z"], &[("X", "Y"), ("Y", "Z")]);
        set(&mut g, "Z", true);
        let s = seeds(&g, &["Z"]);
        let report = propagate(&mut g, &s, CAUSAL, &CombineRule::Any).unwrap();
        assert_eq!(flag(&g, "Y"), Some(true));
        assert_eq!(flag(&g, "X"), Some(true));
        assert_eq!(report.visited, 3);
        assert_eq!(report.local, 3);
    }

    #[test]
    fn any_rule_ors_children() {
        // A causes both B (local) and C (not local).
        let mut g = graph(&["A", "B", "C"], &[("A", "B"), ("A", "C")]);
        set(&mut g, "B", true);
        set(&mut g, "C", false);
        set(&mut g, "A", false);
        let s = seeds(&g, &["B", "C"]);
        propagate(&mut g, &s, CAUSAL, &CombineRule::Any).unwrap();
        assert_eq!(flag(&g, "A"), Some(true));
    }

    #[test]
    fn all_rule_ands_children() {
        let mut g = graph(&["A", "B", "C"], &[("A", "B"), ("A", "C")]);
        set(&mut g, "B", true);
        set(&mut g, "C", false);
        let s = seeds(&g, &["B", "C"]);
        propagate(&mut g, &s, CAUSAL, &CombineRule::All).unwrap();
        assert_eq!(flag(&g, "A"), Some(false));
    }

    #[test]
    fn diamond_resolves_each_node_once() {
        let mut g = graph(
            &["top", "left", "right", "leaf"],
            &[("top", "left"), ("top", "right"), ("left", "leaf"), ("right", "leaf")],
        );
        set(&mut g, "leaf", true);
        let s = seeds(&g, &["leaf"]);
        let report = propagate(&mut g, &s, CAUSAL, &CombineRule::Any).unwrap();
        assert_eq!(report.visited, 4);
        assert!(report.visited <= g.node_count());
        assert_eq!(flag(&g, "top"), Some(true));
    }

    #[test]
    fn unreachable_nodes_keep_annotation() {
        let mut g = graph(&["A", "B", "lonely", "other"], &[("A", "B"), ("lonely", "other")]);
        set(&mut g, "B", false);
        set(&mut g, "lonely", true);
        let s = seeds(&g, &["B"]);
        propagate(&mut g, &s, CAUSAL, &CombineRule::Any).unwrap();
        assert_eq!(flag(&g, "A"), Some(false));
        assert_eq!(flag(&g, "lonely"), Some(true));
        assert_eq!(flag(&g, "other"), None);
    }

    #[test]
    fn non_seed_children_are_ignored() {
        // A causes the seed S and an off-path node N flagged local.
        let mut g = graph(&["A", "S", "N"], &[("A", "S"), ("A", "N")]);
        set(&mut g, "S", false);
        set(&mut g, "N", true);
        let s = seeds(&g, &["S"]);
        propagate(&mut g, &s, CAUSAL, &CombineRule::Any).unwrap();
        assert_eq!(flag(&g, "A"), Some(false));
    }

    #[test]
    fn unflagged_seed_leaves_ancestor_annotation() {
        let mut g = graph(&["A", "S"], &[("A", "S")]);
        set(&mut g, "A", true);
        let s = seeds(&g, &["S"]);
        let report = propagate(&mut g, &s, CAUSAL, &CombineRule::Any).unwrap();
        assert_eq!(flag(&g, "S"), None);
        assert_eq!(flag(&g, "A"), Some(true));
        assert_eq!(report.unresolved, 1);
    }

    #[test]
    fn other_edge_types_are_not_followed() {
        let mut g = graph(&["S", "fix"], &[]);
        g.add_edge(
            "fix",
            "S",
            CausalEdge::new("is_inhibited_or_prevented_or_blocked_or_slowed_by"),
        )
        .unwrap();
        set(&mut g, "S", true);
        let s = seeds(&g, &["S"]);
        let report = propagate(&mut g, &s, CAUSAL, &CombineRule::Any).unwrap();
        assert_eq!(report.visited, 1);
        assert_eq!(flag(&g, "fix"), None);
    }

    #[test]
    fn cycle_fails_fast() {
        let mut g = graph(&["A", "B", "S"], &[("A", "B"), ("B", "A"), ("B", "S")]);
        set(&mut g, "S", true);
        let s = seeds(&g, &["S"]);
        let err = propagate(&mut g, &s, CAUSAL, &CombineRule::Any).unwrap_err();
        assert!(matches!(err, PropagationError::CycleDetected { .. }));
    }

    #[test]
    fn unknown_seed_rejected() {
        let mut g = graph(&["A"], &[]);
        let s = BTreeSet::from([NodeIndex::new(7)]);
        assert!(matches!(
            propagate(&mut g, &s, CAUSAL, &CombineRule::Any),
            Err(PropagationError::UnknownSeed { index: 7 })
        ));
    }

    #[test]
    fn combine_rule_edge_cases() {
        assert_eq!(CombineRule::Any.combine(Some(true), &[]), Some(true));
        assert_eq!(CombineRule::Any.combine(None, &[None, None]), None);
        assert_eq!(CombineRule::Any.combine(Some(true), &[Some(false)]), Some(false));
        assert_eq!(CombineRule::All.combine(None, &[Some(true), None]), Some(true));
    }
}
