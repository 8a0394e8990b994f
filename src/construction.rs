//! Named graph families used when hunting for critical graphs.
//!
//! Circulants are the main source of candidates in practice (vertex-transitive
//! graphs are cheap to enumerate); the Mycielskian lifts a k-critical graph to a
//! (k+1)-critical one and is handy for producing known positives.

use crate::error::GraphError;
use crate::graph::{bit, Graph, MAX_VERTICES};
use rand::Rng;

// ============================================================================
// Deterministic families
// ============================================================================

/// Complete graph \(K_n\).
///
/// # Errors
/// Fails if `n > 64`.
pub fn complete(n: usize) -> Result<Graph, GraphError> {
    let mut edges = Vec::with_capacity(n * n.saturating_sub(1) / 2);
    for i in 0..n {
        for j in (i + 1)..n {
            edges.push((i, j));
        }
    }
    Graph::from_edges(n, &edges)
}

/// Path \(P_n\) on vertices `0 - 1 - ... - (n-1)`.
///
/// # Errors
/// Fails if `n > 64`.
pub fn path(n: usize) -> Result<Graph, GraphError> {
    let edges: Vec<(usize, usize)> = (1..n).map(|i| (i - 1, i)).collect();
    Graph::from_edges(n, &edges)
}

/// Cycle \(C_n\) on vertices `0..n`.
///
/// Degenerates to a single edge for `n = 2` and to no edges for `n < 2`.
///
/// # Errors
/// Fails if `n > 64`.
pub fn cycle(n: usize) -> Result<Graph, GraphError> {
    circulant(n, &[1])
}

/// Wheel on `n` vertices: hub `0` joined to a rim cycle on `1..n`.
///
/// # Errors
/// Fails if `n > 64`.
pub fn wheel(n: usize) -> Result<Graph, GraphError> {
    if n == 0 {
        return Graph::empty(0);
    }
    let rim = cycle(n - 1)?;
    let mut edges: Vec<(usize, usize)> = rim.edges().into_iter().map(|(u, v)| (u + 1, v + 1)).collect();
    edges.extend((1..n).map(|v| (0, v)));
    Graph::from_edges(n, &edges)
}

/// Circulant graph: `i ~ j` iff `(j - i) mod n` or `(i - j) mod n` is in `connections`.
///
/// Distances are reduced mod `n`; a distance of `0` is ignored.
///
/// # Errors
/// Fails if `n > 64`.
pub fn circulant(n: usize, connections: &[usize]) -> Result<Graph, GraphError> {
    let mut edges = Vec::new();
    for i in 0..n {
        for &d in connections {
            let d = d % n;
            if d == 0 {
                continue;
            }
            edges.push((i, (i + d) % n));
        }
    }
    Graph::from_edges(n, &edges)
}

/// Mycielskian \(\mu(G)\): order `2n + 1`, same clique number, chromatic number plus one.
///
/// Vertex `i < n` is the original vertex, `n + i` its shadow, and `2n` the apex.
///
/// # Errors
/// Fails if the result would exceed 64 vertices.
pub fn mycielskian(graph: &Graph) -> Result<Graph, GraphError> {
    let n = graph.order();
    let order = 2 * n + 1;
    if order > MAX_VERTICES {
        return Err(GraphError::TooManyVertices { n: order });
    }
    let mut edges = Vec::with_capacity(3 * graph.edge_count() + n);
    for (u, v) in graph.edges() {
        edges.push((u, v));
        edges.push((u, n + v));
        edges.push((v, n + u));
    }
    edges.extend((0..n).map(|i| (n + i, 2 * n)));
    Graph::from_edges(order, &edges)
}

// ============================================================================
// Random graphs
// ============================================================================

/// Erdős–Rényi graph \(G(n, p)\).
///
/// # Errors
/// Fails if `n > 64`.
pub fn random<R: Rng>(n: usize, p: f64, rng: &mut R) -> Result<Graph, GraphError> {
    debug_assert!((0.0..=1.0).contains(&p), "p must be in [0, 1]");
    let mut rows = Graph::empty(n)?.rows().to_vec();
    for i in 0..n {
        for j in (i + 1)..n {
            if rng.random_bool(p) {
                rows[i] |= bit(j);
                rows[j] |= bit(i);
            }
        }
    }
    Ok(Graph::from_rows_unchecked(rows))
}

// ============================================================================
// Tests
// ============================================================================
