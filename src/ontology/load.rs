//! Node-link JSON import/export for ontology graphs.
//!
//! ```json
//! {
//!   "directed": true,
//!   "nodes": [{"id": "flooding", "iri": "http://webprotege.stanford.edu/R...", "test ontology": ["test ontology"]}],
//!   "links": [{"source": "heavy rain", "target": "flooding", "type": "causes_or_promotes"}]
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::OntologyError;

use super::{CausalEdge, ConceptNode, OntologyGraph, OntologyResult};

/// Serialized link record.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LinkRecord {
    source: String,
    target: String,
    #[serde(flatten)]
    edge: CausalEdge,
}

#[derive(Debug, Serialize, Deserialize)]
struct GraphDocument {
    #[serde(default = "default_directed")]
    directed: bool,
    nodes: Vec<ConceptNode>,
    #[serde(default)]
    links: Vec<LinkRecord>,
}

fn default_directed() -> bool {
    true
}

/// Build a graph from a node-link JSON string, validating every node and link.
pub fn parse_graph(json: &str, origin: &str) -> OntologyResult<OntologyGraph> {
    let doc: GraphDocument = serde_json::from_str(json).map_err(|e| OntologyError::Parse {
        path: origin.to_string(),
        message: e.to_string(),
    })?;
    if !doc.directed {
        return Err(OntologyError::Parse {
            path: origin.to_string(),
            message: "ontology graph must be directed".into(),
        });
    }

    let mut graph = OntologyGraph::new();
    for node in doc.nodes {
        graph.add_node(node)?;
    }
    for link in doc.links {
        graph.add_edge(&link.source, &link.target, link.edge)?;
    }
    Ok(graph)
}

/// Load a graph file.
pub fn load_graph(path: &Path) -> OntologyResult<OntologyGraph> {
    let json = std::fs::read_to_string(path).map_err(|source| OntologyError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let graph = parse_graph(&json, &path.display().to_string())?;
    tracing::info!(
        path = %path.display(),
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "loaded ontology graph"
    );
    Ok(graph)
}

/// Load the primary graph file, falling back to `backup` when the primary
/// cannot be read or fails validation.
pub fn load_with_backup(primary: &Path, backup: Option<&Path>) -> OntologyResult<OntologyGraph> {
    match (load_graph(primary), backup) {
        (Ok(graph), _) => Ok(graph),
        (Err(err), Some(backup)) => {
            tracing::warn!(
                primary = %primary.display(),
                backup = %backup.display(),
                error = %err,
                "primary ontology graph unusable, loading backup"
            );
            load_graph(backup)
        }
        (Err(err), None) => Err(err),
    }
}

/// Serialize a graph to node-link JSON.
pub fn to_json(graph: &OntologyGraph) -> OntologyResult<String> {
    let doc = GraphDocument {
        directed: true,
        nodes: graph.nodes().cloned().collect(),
        links: graph
            .edges()
            .filter_map(|(s, t, edge)| {
                Some(LinkRecord {
                    source: graph.node(s)?.id.clone(),
                    target: graph.node(t)?.id.clone(),
                    edge: edge.clone(),
                })
            })
            .collect(),
    };
    serde_json::to_string_pretty(&doc).map_err(|e| OntologyError::Parse {
        path: "<memory>".into(),
        message: e.to_string(),
    })
}

/// Write a graph to `path` as node-link JSON.
pub fn save_graph(graph: &OntologyGraph, path: &Path) -> OntologyResult<()> {
    let json = to_json(graph)?;
    std::fs::write(path, json).map_err(|source| OntologyError::Io {
        path: path.display().to_string(),
        source,
    })
}
