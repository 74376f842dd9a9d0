// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # climind-localize
//!
//! Personalizes a climate-risk causal ontology for one user: every concept
//! that leads to a locally relevant risk in the user's postal code is flagged
//! `isPossiblyLocal`.
//!
//! ## Architecture
//!
//! - **Ontology** (`ontology`): petgraph-backed concept graph, node-link JSON loading
//! - **Relevance** (`relevance`): session -> postal code -> per-concept relevance record
//! - **Pipeline** (`localize`): acyclic projection, annotation, seed selection, propagation
//! - **Stores** (`store`): in-memory (DashMap) and durable (redb) session/relevance data
//! - **Engine** (`engine`): the [`Localizer`](engine::Localizer) request entry point
//!
//! ## Library usage
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use climind_localize::config::LocalizeConfig;
//! use climind_localize::engine::Localizer;
//! use climind_localize::ontology::{SharedOntology, load::load_graph};
//! use climind_localize::store::durable::DurableStore;
//!
//! let graph = load_graph(Path::new("ontology/Climate_Mind_DiGraph.json")).unwrap();
//! let store = Arc::new(DurableStore::open(Path::new(".climind")).unwrap());
//! let localizer = Localizer::new(
//!     LocalizeConfig::default(),
//!     SharedOntology::new(graph),
//!     store.clone(),
//!     store,
//! )
//! .unwrap();
//! let result = localizer.localize("quiz-session-uuid").unwrap();
//! println!("localized: {}", result.is_localized());
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod localize;
pub mod ontology;
pub mod relevance;
pub mod store;
