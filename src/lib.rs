//! # Critical Graphs
//!
//! Exact verification of k-critical graphs for small simple graphs.
//!
//! This crate provides:
//! - A compact bitset graph with pure vertex/edge removal and graph6 I/O.
//! - An **exact** k-colourability oracle (backtracking over colour classes in
//!   descending-degree order) and chromatic number computation seeded by the
//!   clique number.
//! - A criticality engine deciding vertex- and edge-criticality, with
//!   counter-examples, optional deadlines and parallel short-circuiting.
//! - A batch driver classifying `order{n}_chi{k}.txt` graph6 corpora.
//!
//! ## Quick Start
//!
//! ```
//! use critical_graphs::prelude::*;
//!
//! let k4 = parse_graph6("C~").unwrap();
//! assert_eq!(chromatic_number(&k4), 4);
//! assert!(is_vertex_critical(&k4, 4));
//!
//! // A 5-cycle with a chord is 3-chromatic but not 3-critical.
//! let g = construction::cycle(5).unwrap().with_edge(0, 2).unwrap();
//! let verdict = CriticalityEngine::default()
//!     .check_vertex(&g, ChromaticHint::Compute)
//!     .unwrap();
//! assert_eq!(
//!     verdict,
//!     Verdict::NotCritical { k: 3, reason: Rejection::VertexNotCritical { vertex: 3 } }
//! );
//! ```
//!
//! ## Validating Known Graphs
//!
//! ```
//! use critical_graphs::validate::validate_known_graphs;
//!
//! // Validate bundled critical graphs
//! validate_known_graphs().expect("all bundled graphs should validate");
//! ```
//!
//! ## Budgets
//!
//! ```
//! use critical_graphs::prelude::*;
//! use std::time::Duration;
//!
//! let g = construction::mycielskian(&construction::cycle(5).unwrap()).unwrap();
//! let budget = Budget::unlimited().with_timeout(Duration::from_secs(5));
//! let decision = ColoringOracle::new().decide(&g, 3, &budget);
//! assert_eq!(decision.is_colorable(), Some(false));
//! ```
//!
//! ## Modules
//!
//! - [`graph`]: Bitset graph, pure removals and adjacency-matrix parsing.
//! - [`graph6`]: graph6 encoding and decoding.
//! - [`construction`]: Complete graphs, cycles, wheels, circulants, Mycielskians, random graphs.
//! - [`clique`]: Exact clique search with greedy-colouring bounds.
//! - [`oracle`]: k-colourability decisions, chromatic numbers and budgets.
//! - [`critical`]: Vertex- and edge-criticality verdicts.
//! - [`forbidden`]: Induced-subgraph search and H-free filters.
//! - [`batch`]: Parallel classification of graph6 corpora.
//! - [`config`]: Engine configuration and TOML loading.
//! - [`validate`]: Deterministic validation of bundled known graphs.
//!
//! ## Performance Notes
//!
//! - The graph representation uses `u64` bitsets, limiting graphs to 64 vertices.
//! - k-colourability is NP-complete: the oracle always terminates but may take
//!   exponential time. Use an `oracle_timeout_ms` for untrusted corpora.
//! - For maximum performance, compile with: `RUSTFLAGS="-C target-cpu=native" cargo build --release`

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::inline_always)] // Intentional for hot-path code
#![allow(clippy::many_single_char_names)] // Mathematical variable names
#![allow(clippy::needless_range_loop)] // Often clearer for matrix indexing
#![allow(clippy::doc_markdown)] // LaTeX-style notation in docs
#![allow(clippy::multiple_crate_versions)] // Cargo.lock management is external

pub mod batch;
pub mod clique;
pub mod config;
pub mod construction;
pub mod critical;
pub mod error;
pub mod forbidden;
pub mod graph;
pub mod graph6;
pub mod oracle;
pub mod validate;

/// Re-export commonly used types for convenience.
pub mod prelude {
    pub use crate::batch::{retain_h_free, run_batch, run_corpus, scan_corpus, BatchItem, BatchReport};
    pub use crate::config::{CriticalityMode, EngineConfig, RemovalOrder};
    pub use crate::construction;
    pub use crate::critical::{
        is_edge_critical, is_vertex_critical, ChromaticHint, CriticalityEngine, Rejection, Verdict,
    };
    pub use crate::error::{validate_k, BatchError, ConfigError, CriticalityError, GraphError};
    pub use crate::forbidden::{contains_induced, is_h_free, Pattern};
    pub use crate::graph::{parse_adjacency_matrix, Graph};
    pub use crate::graph6::{parse_graph6, to_graph6};
    pub use crate::oracle::{
        chromatic_number, is_k_colorable, Budget, CachedOracle, ColoringOracle, Decision, Interrupt,
    };
    pub use crate::validate::validate_known_graphs;
}
