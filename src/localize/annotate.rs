//! Merge relevance facts onto graph nodes.

use crate::ontology::iri::IriScheme;
use crate::ontology::{OntologyGraph, OntologyResult};
use crate::relevance::RelevanceRecord;

/// Counts from one annotation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnnotationReport {
    /// Nodes whose flag was set.
    pub annotated: usize,
    pub local: usize,
    pub not_local: usize,
    /// Record keys that matched no node.
    pub unmatched: usize,
}

/// Set `is_possibly_local` on every node whose short identifier is in `record`.
///
/// Nodes not in the record keep their current flag. Graph structure is not
/// touched, and a malformed IRI aborts before any node is written.
pub fn annotate(
    graph: &mut OntologyGraph,
    record: &RelevanceRecord,
    scheme: &IriScheme,
) -> OntologyResult<AnnotationReport> {
    let mut updates = Vec::new();
    let mut matched = std::collections::HashSet::new();
    for idx in graph.node_indices() {
        let Some(node) = graph.node(idx) else {
            continue;
        };
        let short = scheme.short_id(&node.iri)?;
        if let Some(flag) = record.get(short) {
            matched.insert(short.to_string());
            updates.push((idx, flag));
        }
    }

    let mut report = AnnotationReport {
        unmatched: record.len() - matched.len(),
        ..Default::default()
    };
    for (idx, flag) in updates {
        if let Some(node) = graph.node_mut(idx) {
            node.is_possibly_local = Some(flag);
            report.annotated += 1;
            if flag {
                report.local += 1;
            } else {
                report.not_local += 1;
            }
        }
    }

    if report.unmatched > 0 {
        tracing::debug!(
            unmatched = report.unmatched,
            postal_code = record.postal_code(),
            "relevance columns without a matching concept"
        );
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::error::OntologyError;
    use crate::ontology::{CausalEdge, ConceptNode};

    fn graph() -> OntologyGraph {
        let mut g = OntologyGraph::new();
        for (id, short) in [("flood", "Rflood"), ("heat", "Rheat"), ("drought", "Rdrought")] {
            g.add_node(ConceptNode::new(
                id,
                format!("http://webprotege.stanford.edu/{short}"),
            ))
            .unwrap();
        }
        g.add_edge("heat", "drought", CausalEdge::new("causes_or_promotes"))
            .unwrap();
        g
    }

    fn record() -> RelevanceRecord {
        RelevanceRecord::new(
            19104,
            HashMap::from([
                ("Rflood".to_string(), true),
                ("Rheat".to_string(), false),
                ("Rwildfire".to_string(), true),
            ]),
        )
    }

    fn flags(g: &OntologyGraph) -> Vec<Option<bool>> {
        g.nodes().map(|n| n.is_possibly_local).collect()
    }

    #[test]
    fn sets_matching_flags_only() {
        let mut g = graph();
        let report = annotate(&mut g, &record(), &IriScheme::default()).unwrap();
        assert_eq!(flags(&g), vec![Some(true), Some(false), None]);
        assert_eq!(report.annotated, 2);
        assert_eq!(report.local, 1);
        assert_eq!(report.not_local, 1);
        assert_eq!(report.unmatched, 1);
        assert_eq!(g.edge_count(), 1);
    }

    #[test]
    fn annotation_is_idempotent() {
        let mut once = graph();
        annotate(&mut once, &record(), &IriScheme::default()).unwrap();
        let mut twice = graph();
        annotate(&mut twice, &record(), &IriScheme::default()).unwrap();
        annotate(&mut twice, &record(), &IriScheme::default()).unwrap();
        assert_eq!(flags(&once), flags(&twice));
    }

    #[test]
    fn malformed_iri_fails_without_writes() {
        let mut g = graph();
        g.add_node(ConceptNode::new("odd", "urn:concept:Rodd")).unwrap();
        let err = annotate(&mut g, &record(), &IriScheme::default()).unwrap_err();
        assert!(matches!(err, OntologyError::MalformedIri { .. }));
        assert!(g.nodes().all(|n| n.is_possibly_local.is_none()));
    }
}
