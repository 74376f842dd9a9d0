//! Benchmarks for the localization pipeline.

use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use climind_localize::config::LocalizeConfig;
use climind_localize::engine::Localizer;
use climind_localize::localize::acyclic::{CycleBreaker, DfsBackEdgeBreaker};
use climind_localize::ontology::{CausalEdge, ConceptNode, OntologyGraph, SharedOntology};
use climind_localize::store::mem::MemStore;
use climind_localize::store::{RelevanceStore, SessionStore};

const POSTAL_CODE: i64 = 19104;

fn iri(layer: usize, i: usize) -> String {
    format!("http://webprotege.stanford.edu/R{layer}x{i}")
}

/// `depth` layers of `width` concepts; each concept causes two in the next
/// layer, and every tenth concept closes a loop back to the layer above.
/// The last layer holds the risk leaves.
fn layered(depth: usize, width: usize) -> OntologyGraph {
    let mut g = OntologyGraph::new();
    for layer in 0..depth {
        for i in 0..width {
            let mut node = ConceptNode::new(format!("{layer}:{i}"), iri(layer, i));
            if layer == depth - 1 {
                node = node.with_test_ontology(["test ontology"]);
            }
            g.add_node(node).unwrap();
        }
    }
    for layer in 0..depth - 1 {
        for i in 0..width {
            let source = format!("{layer}:{i}");
            for j in [i, (i + 1) % width] {
                let target = format!("{}:{j}", layer + 1);
                g.add_edge(&source, &target, CausalEdge::new("causes_or_promotes"))
                    .unwrap();
            }
            if layer > 0 && layer < depth - 1 && i % 10 == 0 {
                let target = format!("{}:{i}", layer - 1);
                g.add_edge(&source, &target, CausalEdge::new("causes_or_promotes"))
                    .unwrap();
            }
        }
    }
    g
}

fn localizer(depth: usize, width: usize) -> Localizer {
    let store = Arc::new(MemStore::new());
    store.set_postal_code("bench", &POSTAL_CODE.to_string()).unwrap();
    store
        .put_columns((0..width).map(|i| iri(depth - 1, i)).collect())
        .unwrap();
    store
        .put_row(POSTAL_CODE, (0..width).map(|i| i % 3 == 0).collect())
        .unwrap();
    Localizer::new(
        LocalizeConfig::default(),
        SharedOntology::new(layered(depth, width)),
        store.clone(),
        store,
    )
    .unwrap()
}

fn bench_projection(c: &mut Criterion) {
    let graph = layered(20, 50);
    c.bench_function("acyclic_projection_1000", |bench| {
        bench.iter(|| black_box(DfsBackEdgeBreaker
                .project(&graph, "causes_or_promotes")
                .unwrap()))
    });
}

fn bench_localize(c: &mut Criterion) {
    let mut group = c.benchmark_group("localize");
    for (depth, width) in [(10, 20), (20, 50), (40, 100)] {
        let localizer = localizer(depth, width);
        group.bench_with_input(
            BenchmarkId::from_parameter(depth * width),
            &localizer,
            |bench, localizer| bench.iter(|| black_box(localizer.localize("bench").unwrap())),
        );
    }
    group.finish();
}

criterion_group!(benches, bench_projection, bench_localize);
criterion_main!(benches);
