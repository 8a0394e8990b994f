//! Induced-subgraph search and H-free filters.
//!
//! A graph is H-free when no vertex subset induces a copy of H: the copy must
//! preserve edges *and* non-edges. Critical-graph catalogues are usually
//! filtered this way (P5-free, (P4 + P1)-free, 2P2-free, claw-free, ...).

use crate::construction;
use crate::error::GraphError;
use crate::graph::{bit, bits, Graph};
use crate::graph6::parse_graph6;
use std::cmp::Reverse;
use std::fmt;
use std::str::FromStr;

/// A small named graph used as a forbidden induced subgraph.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pattern {
    name: String,
    graph: Graph,
}

impl Pattern {
    /// Wraps an arbitrary graph under `name`.
    pub fn new(name: impl Into<String>, graph: Graph) -> Self {
        Self {
            name: name.into(),
            graph,
        }
    }

    /// Path \(P_t\) on `t` vertices.
    ///
    /// # Errors
    /// Fails if `t > 64`.
    pub fn path(t: usize) -> Result<Self, GraphError> {
        Ok(Self::new(format!("P{t}"), construction::path(t)?))
    }

    /// Cycle \(C_t\).
    ///
    /// # Errors
    /// Fails if `t > 64`.
    pub fn cycle(t: usize) -> Result<Self, GraphError> {
        Ok(Self::new(format!("C{t}"), construction::cycle(t)?))
    }

    /// Complete graph \(K_t\).
    ///
    /// # Errors
    /// Fails if `t > 64`.
    pub fn complete(t: usize) -> Result<Self, GraphError> {
        Ok(Self::new(format!("K{t}"), construction::complete(t)?))
    }

    /// The claw \(K_{1,3}\): centre `0`, leaves `1, 2, 3`.
    pub fn claw() -> Self {
        Self::new("claw", Graph::from_rows_unchecked(vec![0b1110, 0b0001, 0b0001, 0b0001]))
    }

    /// Two disjoint edges, \(2P_2\).
    pub fn two_p2() -> Self {
        Self::new("2P2", Graph::from_rows_unchecked(vec![0b0010, 0b0001, 0b1000, 0b0100]))
    }

    /// A path on four vertices plus an isolated vertex, \(P_4 + P_1\).
    pub fn p4_plus_p1() -> Self {
        Self::new(
            "P4+P1",
            Graph::from_rows_unchecked(vec![0b00010, 0b00101, 0b01010, 0b00100, 0b00000]),
        )
    }

    /// Decodes a pattern from graph6, naming it after the encoding.
    ///
    /// # Errors
    /// Propagates graph6 decoding errors.
    pub fn from_graph6(text: &str) -> Result<Self, GraphError> {
        let graph = parse_graph6(text)?;
        Ok(Self::new(text.trim(), graph))
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Underlying graph.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }
}

/// Parses a pattern name: `P<t>`, `C<t>`, `K<t>`, `claw`, `2P2`, `P4+P1`, or
/// any other text as graph6.
impl FromStr for Pattern {
    type Err = GraphError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let text = text.trim();
        match text {
            "claw" => return Ok(Self::claw()),
            "2P2" => return Ok(Self::two_p2()),
            "P4+P1" => return Ok(Self::p4_plus_p1()),
            _ => {}
        }
        let mut chars = text.chars();
        let family = chars.next();
        if let (Some(family @ ('P' | 'C' | 'K')), Ok(t)) = (family, chars.as_str().parse::<usize>()) {
            return match family {
                'P' => Self::path(t),
                'C' => Self::cycle(t),
                _ => Self::complete(t),
            };
        }
        Self::from_graph6(text)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

// ============================================================================
// Search
// ============================================================================

/// Finds an induced copy of `pattern` in `graph`.
///
/// On success `result[i]` is the host vertex playing pattern vertex `i`.
pub fn find_induced(graph: &Graph, pattern: &Pattern) -> Option<Vec<usize>> {
    let h = pattern.graph();
    let t = h.order();
    if t > graph.order() {
        return None;
    }

    // Most constrained pattern vertices first.
    let mut order: Vec<usize> = (0..t).collect();
    order.sort_by_key(|&p| (Reverse(h.degree(p)), p));

    let mut assigned = vec![usize::MAX; t];
    if extend(graph, h, &order, 0, 0, &mut assigned) {
        Some(assigned)
    } else {
        None
    }
}

fn extend(graph: &Graph, h: &Graph, order: &[usize], depth: usize, used: u64, assigned: &mut [usize]) -> bool {
    if depth == order.len() {
        return true;
    }
    let p = order[depth];

    let mut candidates = graph.vertex_mask() & !used;
    for &q in &order[..depth] {
        let host = graph.neighbors(assigned[q]);
        candidates &= if h.has_edge(p, q) { host } else { !host };
    }

    for x in bits(candidates) {
        assigned[p] = x;
        if extend(graph, h, order, depth + 1, used | bit(x), assigned) {
            return true;
        }
    }
    assigned[p] = usize::MAX;
    false
}

/// Returns `true` iff `graph` contains `pattern` as an induced subgraph.
pub fn contains_induced(graph: &Graph, pattern: &Pattern) -> bool {
    find_induced(graph, pattern).is_some()
}

/// Returns `true` iff `graph` contains none of `patterns` as an induced subgraph.
pub fn is_h_free(graph: &Graph, patterns: &[Pattern]) -> bool {
    patterns.iter().all(|p| !contains_induced(graph, p))
}

// ============================================================================
// Tests
// ============================================================================
