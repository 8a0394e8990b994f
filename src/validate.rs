//! Fast deterministic validation of known small critical graphs.

use crate::construction;
use crate::critical::{ChromaticHint, CriticalityEngine};
use crate::graph::{parse_adjacency_matrix, Graph};
use crate::graph6::{parse_graph6, to_graph6};
use crate::oracle::ColoringOracle;

const KNOWN_CRITICAL: &str = include_str!("../data/known_critical.g6");
const GROTZSCH: &str = include_str!("../data/grotzsch.txt");

// ============================================================================
// Public API
// ============================================================================

/// Validates the bundled graphs:
/// - every line of `known_critical.g6` (complete graphs, odd cycles, the odd
///   wheel \(W_5\), the Grötzsch graph) is vertex- and edge-critical for its `k`;
/// - `grotzsch.txt` is the Mycielskian of \(C_5\);
/// - a handful of non-critical graphs are rejected.
///
/// # Errors
/// Returns an error message naming the first graph that fails.
pub fn validate_known_graphs() -> Result<(), String> {
    for (idx, line) in KNOWN_CRITICAL.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let name = format!("known_critical.g6:{}", idx + 1);
        let (encoding, k) = line
            .split_once(' ')
            .ok_or_else(|| format!("{name}: expected `<graph6> <k>`"))?;
        let k: usize = k
            .trim()
            .parse()
            .map_err(|e| format!("{name}: bad k {k:?}: {e}"))?;
        let graph = parse_graph6(encoding).map_err(|e| format!("{name}: {e}"))?;
        validate_critical(&graph, k).map_err(|e| format!("{name} ({encoding}): {e}"))?;
    }

    let grotzsch = parse_adjacency_matrix(GROTZSCH).map_err(|e| format!("grotzsch.txt: {e}"))?;
    let expected = construction::cycle(5)
        .and_then(|c5| construction::mycielskian(&c5))
        .map_err(|e| format!("grotzsch.txt: {e}"))?;
    if grotzsch != expected {
        return Err(format!(
            "grotzsch.txt: decoded {} but the Mycielskian of C5 is {}",
            to_graph6(&grotzsch),
            to_graph6(&expected)
        ));
    }
    validate_critical(&grotzsch, 4).map_err(|e| format!("grotzsch.txt: {e}"))?;

    for (name, graph, k) in non_critical_cases().map_err(|e| e.to_string())? {
        validate_not_critical(&graph, k).map_err(|e| format!("{name}: {e}"))?;
    }
    Ok(())
}

/// Checks that `graph` has chromatic number `k` and is both vertex- and edge-critical.
///
/// # Errors
/// Returns an error message describing the first property that fails.
pub fn validate_critical(graph: &Graph, k: usize) -> Result<(), String> {
    let chi = ColoringOracle::new().chromatic_number(graph);
    if chi != k {
        return Err(format!("chromatic number is {chi}, expected {k}"));
    }

    let engine = CriticalityEngine::default();
    let vertex = engine
        .check_vertex(graph, ChromaticHint::Known(k))
        .map_err(|e| e.to_string())?;
    if !vertex.is_critical() {
        return Err(format!("vertex check: {vertex}"));
    }
    let edge = engine
        .check_edge(graph, ChromaticHint::Known(k))
        .map_err(|e| e.to_string())?;
    if !edge.is_critical() {
        return Err(format!("edge check: {edge}"));
    }
    Ok(())
}

/// Checks that `graph` is not k-vertex-critical.
///
/// # Errors
/// Returns an error message if the engine accepts the graph.
pub fn validate_not_critical(graph: &Graph, k: usize) -> Result<(), String> {
    match CriticalityEngine::default().is_vertex_critical(graph, k) {
        Ok(false) => Ok(()),
        Ok(true) => Err(format!("accepted as {k}-critical")),
        Err(e) => Err(e.to_string()),
    }
}

// ============================================================================
// Internal
// ============================================================================

fn non_critical_cases() -> Result<Vec<(&'static str, Graph, usize)>, crate::error::GraphError> {
    Ok(vec![
        ("C6", construction::cycle(6)?, 2),
        ("C5 with chord", construction::cycle(5)?.with_edge(0, 2)?, 3),
        ("C5 against k = 4", construction::cycle(5)?, 4),
        ("wheel with a six-cycle rim", construction::wheel(7)?, 3),
        ("empty graph", Graph::empty(0)?, 0),
        ("two isolated vertices", Graph::empty(2)?, 1),
    ])
}

// ============================================================================
// Tests
// ============================================================================
