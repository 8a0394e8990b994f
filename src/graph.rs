//! Simple undirected graphs stored as neighbour bitsets (currently \(n \le 64\)).
//!
//! A [`Graph`] is immutable from the outside: every removal returns a fresh value,
//! so a graph that is being iterated by a criticality check can never change
//! underneath it.

use crate::error::GraphError;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

// ============================================================================
// Bit helpers
// ============================================================================

/// Largest supported graph order.
pub const MAX_VERTICES: usize = 64;

/// Returns a mask with the lowest `n` bits set.
#[inline(always)]
pub const fn all_bits(n: usize) -> u64 {
    if n >= 64 {
        u64::MAX
    } else {
        (1u64 << n) - 1
    }
}

#[inline(always)]
pub(crate) const fn bit(v: usize) -> u64 {
    1u64 << v
}

/// Iterator over the set bits of a mask, lowest first.
#[derive(Clone, Copy, Debug)]
pub struct Bits(u64);

impl Iterator for Bits {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<usize> {
        if self.0 == 0 {
            return None;
        }
        let v = self.0.trailing_zeros() as usize;
        self.0 &= self.0 - 1;
        Some(v)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.0.count_ones() as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for Bits {}

/// Iterates the vertices in `mask` in ascending order.
#[inline]
pub fn bits(mask: u64) -> Bits {
    Bits(mask)
}

/// Packs the bits of `row` selected by `keep` into the low positions, preserving order.
#[inline]
fn compact(row: u64, keep: u64) -> u64 {
    let mut out = 0u64;
    for (i, v) in bits(keep).enumerate() {
        if row & bit(v) != 0 {
            out |= bit(i);
        }
    }
    out
}

// ============================================================================
// Graph
// ============================================================================

/// A simple, unweighted, undirected graph on vertices `0..n`.
///
/// Representation: `rows[v]` is the neighbour bitset of vertex `v`.
/// Invariants: no self-loops, symmetric rows, no bits at or beyond `n`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Graph {
    n: usize,
    rows: Vec<u64>,
}

/// Structural cache key for a [`Graph`]: the order plus the neighbour bitsets.
///
/// Two graphs share a key iff they are identical under the fixed vertex numbering.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GraphKey {
    order: usize,
    rows: Box<[u64]>,
}

impl GraphKey {
    /// Number of vertices of the keyed graph.
    pub fn order(&self) -> usize {
        self.order
    }
}

impl Graph {
    /// Creates an edgeless graph on `n` vertices.
    ///
    /// # Errors
    /// Returns [`GraphError::TooManyVertices`] if `n > 64`.
    pub fn empty(n: usize) -> Result<Self, GraphError> {
        check_order(n)?;
        Ok(Self {
            n,
            rows: vec![0u64; n],
        })
    }

    /// Builds a graph on `n` vertices from an edge list.
    ///
    /// Repeated edges (in either orientation) collapse into one.
    ///
    /// # Errors
    /// Fails if an endpoint is outside `0..n`, an edge is a self-loop, or `n > 64`.
    pub fn from_edges(n: usize, edges: &[(usize, usize)]) -> Result<Self, GraphError> {
        let mut g = Self::empty(n)?;
        for &(u, v) in edges {
            g.check_vertex(u)?;
            g.check_vertex(v)?;
            if u == v {
                return Err(GraphError::SelfLoop { vertex: u });
            }
            g.rows[u] |= bit(v);
            g.rows[v] |= bit(u);
        }
        Ok(g)
    }

    /// Builds a graph from an adjacency mapping `vertex -> neighbours`.
    ///
    /// The order is one more than the largest identifier mentioned anywhere in the
    /// mapping, so vertices that appear only as neighbours still exist. A neighbour
    /// listed on one side only is treated as an edge.
    ///
    /// # Errors
    /// Fails on self-loops or if more than 64 vertices are implied.
    pub fn from_adjacency(adjacency: &BTreeMap<usize, BTreeSet<usize>>) -> Result<Self, GraphError> {
        let n = adjacency
            .iter()
            .flat_map(|(&u, nbrs)| std::iter::once(u).chain(nbrs.iter().copied()))
            .max()
            .map_or(0, |max| max + 1);
        let edges: Vec<(usize, usize)> = adjacency
            .iter()
            .flat_map(|(&u, nbrs)| nbrs.iter().map(move |&v| (u, v)))
            .collect();
        Self::from_edges(n, &edges)
    }

    /// Builds a graph from neighbour bitsets, validating every invariant.
    ///
    /// # Errors
    /// Fails on stray bits, self-loops, asymmetry, or more than 64 rows.
    pub fn from_rows(rows: Vec<u64>) -> Result<Self, GraphError> {
        let n = rows.len();
        check_order(n)?;
        let mask = all_bits(n);
        for (i, &row) in rows.iter().enumerate() {
            if row & !mask != 0 {
                return Err(GraphError::StrayBits { row: i, order: n });
            }
            if row & bit(i) != 0 {
                return Err(GraphError::SelfLoop { vertex: i });
            }
        }
        for i in 0..n {
            for j in bits(rows[i]) {
                if rows[j] & bit(i) == 0 {
                    return Err(GraphError::NotSymmetric { i, j });
                }
            }
        }
        Ok(Self { n, rows })
    }

    /// Wraps rows that are valid by construction.
    pub(crate) fn from_rows_unchecked(rows: Vec<u64>) -> Self {
        let n = rows.len();
        debug_assert!(n <= MAX_VERTICES);
        debug_assert!(Self::from_rows(rows.clone()).is_ok(), "invalid rows");
        Self { n, rows }
    }

    /// Returns the number of vertices.
    #[inline(always)]
    pub fn order(&self) -> usize {
        self.n
    }

    /// Returns `true` for the graph with no vertices.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Returns the neighbour bitsets.
    #[inline(always)]
    pub fn rows(&self) -> &[u64] {
        &self.rows
    }

    /// Returns the bitset of all vertices.
    #[inline(always)]
    pub fn vertex_mask(&self) -> u64 {
        all_bits(self.n)
    }

    /// Returns the neighbour bitset of `v`.
    #[inline(always)]
    pub fn neighbors(&self, v: usize) -> u64 {
        debug_assert!(v < self.n);
        self.rows[v]
    }

    /// Returns whether the edge `(u, v)` exists.
    #[inline(always)]
    pub fn has_edge(&self, u: usize, v: usize) -> bool {
        debug_assert!(u < self.n && v < self.n);
        (self.rows[u] & bit(v)) != 0
    }

    /// Returns the degree of vertex `v`.
    #[inline(always)]
    pub fn degree(&self, v: usize) -> u32 {
        debug_assert!(v < self.n);
        self.rows[v].count_ones()
    }

    /// Returns the smallest degree, or `None` for the empty graph.
    pub fn min_degree(&self) -> Option<u32> {
        self.rows.iter().map(|r| r.count_ones()).min()
    }

    /// Returns the largest degree, or `None` for the empty graph.
    pub fn max_degree(&self) -> Option<u32> {
        self.rows.iter().map(|r| r.count_ones()).max()
    }

    /// Returns the total number of edges.
    pub fn edge_count(&self) -> usize {
        let sum: u32 = self.rows.iter().map(|r| r.count_ones()).sum();
        (sum as usize) / 2
    }

    /// Returns every edge once as `(u, v)` with `u < v`, in ascending order.
    pub fn edges(&self) -> Vec<(usize, usize)> {
        let mut out = Vec::with_capacity(self.edge_count());
        for u in 0..self.n {
            let above = self.rows[u] & !all_bits(u + 1);
            out.extend(bits(above).map(|v| (u, v)));
        }
        out
    }

    /// Returns the complement graph.
    pub fn complement(&self) -> Graph {
        let mask = self.vertex_mask();
        let rows = (0..self.n).map(|v| !self.rows[v] & mask & !bit(v)).collect();
        Graph::from_rows_unchecked(rows)
    }

    /// Returns the subgraph induced by `mask`, renumbered densely in ascending order.
    pub fn induced(&self, mask: u64) -> Graph {
        let keep = mask & self.vertex_mask();
        let rows = bits(keep).map(|v| compact(self.rows[v], keep)).collect();
        Graph::from_rows_unchecked(rows)
    }

    /// Returns a copy with vertex `v` deleted.
    ///
    /// Vertices above `v` are renumbered down by one so identifiers stay dense.
    ///
    /// # Errors
    /// Returns [`GraphError::VertexOutOfRange`] if `v >= n`.
    pub fn without_vertex(&self, v: usize) -> Result<Graph, GraphError> {
        self.check_vertex(v)?;
        let low = bit(v) - 1;
        let shift_down = |row: u64| {
            let row = row & !bit(v);
            (row & low) | ((row >> 1) & !low)
        };
        let rows = (0..self.n)
            .filter(|&u| u != v)
            .map(|u| shift_down(self.rows[u]))
            .collect();
        Ok(Graph::from_rows_unchecked(rows))
    }

    /// Returns a copy with the edge `(u, v)` deleted; the vertex set is unchanged.
    ///
    /// # Errors
    /// Fails if either endpoint is out of range or the edge is absent.
    pub fn without_edge(&self, u: usize, v: usize) -> Result<Graph, GraphError> {
        self.check_vertex(u)?;
        self.check_vertex(v)?;
        if u == v || !self.has_edge(u, v) {
            return Err(GraphError::EdgeNotPresent { u, v });
        }
        let mut rows = self.rows.clone();
        rows[u] &= !bit(v);
        rows[v] &= !bit(u);
        Ok(Graph::from_rows_unchecked(rows))
    }

    /// Returns a copy with the edge `(u, v)` added (a no-op if already present).
    ///
    /// # Errors
    /// Fails if either endpoint is out of range or `u == v`.
    pub fn with_edge(&self, u: usize, v: usize) -> Result<Graph, GraphError> {
        self.check_vertex(u)?;
        self.check_vertex(v)?;
        if u == v {
            return Err(GraphError::SelfLoop { vertex: u });
        }
        let mut rows = self.rows.clone();
        rows[u] |= bit(v);
        rows[v] |= bit(u);
        Ok(Graph::from_rows_unchecked(rows))
    }

    /// Returns the structural cache key of this graph.
    pub fn key(&self) -> GraphKey {
        GraphKey {
            order: self.n,
            rows: self.rows.clone().into_boxed_slice(),
        }
    }

    #[inline]
    fn check_vertex(&self, v: usize) -> Result<(), GraphError> {
        if v < self.n {
            Ok(())
        } else {
            Err(GraphError::VertexOutOfRange {
                vertex: v,
                order: self.n,
            })
        }
    }

    // ------------------------------------------------------------------------
    // Text I/O
    // ------------------------------------------------------------------------

    /// Saves the adjacency matrix to a file as an `n x n` matrix of `0/1` characters.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created or written.
    pub fn save_to_file(&self, filename: impl AsRef<Path>) -> io::Result<()> {
        let mut f = File::create(filename)?;
        self.write_to(&mut f)
    }

    /// Writes the adjacency matrix to a writer as an `n x n` matrix of `0/1` characters.
    ///
    /// # Errors
    /// Returns an error if writing fails.
    pub fn write_to<W: Write>(&self, mut w: W) -> io::Result<()> {
        for i in 0..self.n {
            for j in 0..self.n {
                let edge = (self.rows[i] >> j) & 1;
                write!(w, "{edge}")?;
            }
            writeln!(w)?;
        }
        Ok(())
    }

    /// Loads a graph from a file containing an `n x n` adjacency matrix.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or the matrix is malformed.
    pub fn load_from_file(filename: impl AsRef<Path>) -> Result<Self, GraphError> {
        let file = File::open(filename).map_err(|e| GraphError::Io(e.to_string()))?;
        let reader = BufReader::new(file);
        let mut text = String::new();
        for line in reader.lines() {
            let line = line.map_err(|e| GraphError::Io(e.to_string()))?;
            text.push_str(&line);
            text.push('\n');
        }
        parse_adjacency_matrix(&text)
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("order", &self.n)
            .field("edges", &self.edges())
            .finish()
    }
}

impl fmt::Display for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", crate::graph6::to_graph6(self))
    }
}

#[inline]
fn check_order(n: usize) -> Result<(), GraphError> {
    if n > MAX_VERTICES {
        Err(GraphError::TooManyVertices { n })
    } else {
        Ok(())
    }
}

// ============================================================================
// Parsing
// ============================================================================

/// Parses a `0/1` adjacency matrix from text.
///
/// Rules:
/// - Blank lines are ignored.
/// - The matrix must be square, symmetric, and have a zero diagonal.
/// - `n` must be `<= 64`.
///
/// # Errors
/// Returns an error if the input is empty, non-square, contains invalid characters,
/// has self-loops, or is not symmetric.
pub fn parse_adjacency_matrix(text: &str) -> Result<Graph, GraphError> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    if lines.is_empty() {
        return Err(GraphError::Empty);
    }
    let n = lines.len();
    check_order(n)?;

    let mut rows = Vec::with_capacity(n);
    for (i, line) in lines.iter().enumerate() {
        let bytes = line.as_bytes();
        if bytes.len() != n {
            return Err(GraphError::NonSquare {
                row: i,
                expected: n,
                got: bytes.len(),
            });
        }
        let mut mask = 0u64;
        for (j, &b) in bytes.iter().enumerate() {
            match b {
                b'0' => {}
                b'1' => mask |= bit(j),
                _ => {
                    return Err(GraphError::InvalidChar {
                        row: i,
                        col: j,
                        ch: b as char,
                    })
                }
            }
        }
        rows.push(mask);
    }

    Graph::from_rows(rows)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_xorshift::XorShiftRng;

    fn random_graph(rng: &mut XorShiftRng, n: usize, p: f64) -> Graph {
        let mut edges = Vec::new();
        for i in 0..n {
            for j in (i + 1)..n {
                if rng.random_bool(p) {
                    edges.push((i, j));
                }
            }
        }
        Graph::from_edges(n, &edges).unwrap()
    }

    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    #[test]
    fn from_edges_collapses_duplicates() {
        let g = Graph::from_edges(3, &[(0, 1), (1, 0), (0, 1), (1, 2)]).unwrap();
        assert_eq!(g.edge_count(), 2);
        assert_eq!(g.edges(), vec![(0, 1), (1, 2)]);
    }

    #[test]
    fn from_edges_rejects_out_of_range_endpoint() {
        let err = Graph::from_edges(3, &[(0, 3)]).unwrap_err();
        assert_eq!(err, GraphError::VertexOutOfRange { vertex: 3, order: 3 });
    }

    #[test]
    fn from_edges_rejects_self_loop() {
        let err = Graph::from_edges(3, &[(1, 1)]).unwrap_err();
        assert_eq!(err, GraphError::SelfLoop { vertex: 1 });
    }

    #[test]
    fn too_many_vertices_is_rejected() {
        assert_eq!(
            Graph::empty(65).unwrap_err(),
            GraphError::TooManyVertices { n: 65 }
        );
        assert_eq!(Graph::empty(64).unwrap().order(), 64);
    }

    #[test]
    fn from_adjacency_counts_neighbour_only_vertices() {
        let mut adj = BTreeMap::new();
        adj.insert(0, BTreeSet::from([1, 4]));
        let g = Graph::from_adjacency(&adj).unwrap();
        assert_eq!(g.order(), 5);
        assert!(g.has_edge(4, 0));
        assert_eq!(g.degree(2), 0);
    }

    #[test]
    fn from_adjacency_of_empty_map_is_empty_graph() {
        let g = Graph::from_adjacency(&BTreeMap::new()).unwrap();
        assert!(g.is_empty());
    }

    #[test]
    fn from_rows_validates_invariants() {
        assert_eq!(
            Graph::from_rows(vec![0b10, 0b00]).unwrap_err(),
            GraphError::NotSymmetric { i: 0, j: 1 }
        );
        assert_eq!(
            Graph::from_rows(vec![0b01, 0b00]).unwrap_err(),
            GraphError::SelfLoop { vertex: 0 }
        );
        assert_eq!(
            Graph::from_rows(vec![0b100, 0b000]).unwrap_err(),
            GraphError::StrayBits { row: 0, order: 2 }
        );
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    #[test]
    fn handshaking_lemma_holds() {
        let mut rng = XorShiftRng::seed_from_u64(42);
        for _ in 0..10 {
            let g = random_graph(&mut rng, 32, 0.25);
            let sum_deg: u32 = (0..g.order()).map(|v| g.degree(v)).sum();
            assert_eq!(sum_deg as usize, 2 * g.edge_count());
            assert_eq!(g.edges().len(), g.edge_count());
        }
    }

    #[test]
    fn degree_bounds() {
        // Star with centre 0
        let g = Graph::from_edges(4, &[(0, 1), (0, 2), (0, 3)]).unwrap();
        assert_eq!(g.max_degree(), Some(3));
        assert_eq!(g.min_degree(), Some(1));
        assert_eq!(Graph::empty(0).unwrap().min_degree(), None);
    }

    #[test]
    fn complement_is_involutive() {
        let mut rng = XorShiftRng::seed_from_u64(7);
        let g = random_graph(&mut rng, 12, 0.4);
        let c = g.complement();
        assert_eq!(g.edge_count() + c.edge_count(), 12 * 11 / 2);
        assert_eq!(c.complement(), g);
    }

    // -------------------------------------------------------------------------
    // Removal
    // -------------------------------------------------------------------------

    #[test]
    fn without_vertex_reindexes_densely() {
        // Path 0-1-2-3; removing 1 leaves 0 isolated and 1-2 (old 2-3).
        let g = Graph::from_edges(4, &[(0, 1), (1, 2), (2, 3)]).unwrap();
        let h = g.without_vertex(1).unwrap();
        assert_eq!(h.order(), 3);
        assert_eq!(h.edges(), vec![(1, 2)]);
        // Original is untouched.
        assert_eq!(g.edges(), vec![(0, 1), (1, 2), (2, 3)]);
    }

    #[test]
    fn without_vertex_matches_induced_subgraph() {
        let mut rng = XorShiftRng::seed_from_u64(0xC0FFEE);
        for _ in 0..20 {
            let g = random_graph(&mut rng, 20, 0.35);
            for v in 0..g.order() {
                let h = g.without_vertex(v).unwrap();
                assert_eq!(h, g.induced(g.vertex_mask() & !bit(v)));
                assert_eq!(h.edge_count(), g.edge_count() - g.degree(v) as usize);
            }
        }
    }

    #[test]
    fn without_vertex_handles_top_bit() {
        let g = Graph::from_edges(64, &[(62, 63), (0, 63)]).unwrap();
        let h = g.without_vertex(63).unwrap();
        assert_eq!(h.order(), 63);
        assert_eq!(h.edge_count(), 0);
        let h = g.without_vertex(0).unwrap();
        assert_eq!(h.edges(), vec![(61, 62)]);
    }

    #[test]
    fn without_vertex_rejects_out_of_range() {
        let g = Graph::empty(3).unwrap();
        assert_eq!(
            g.without_vertex(3).unwrap_err(),
            GraphError::VertexOutOfRange { vertex: 3, order: 3 }
        );
    }

    #[test]
    fn without_edge_keeps_vertex_set() {
        let g = Graph::from_edges(3, &[(0, 1), (1, 2)]).unwrap();
        let h = g.without_edge(2, 1).unwrap();
        assert_eq!(h.order(), 3);
        assert_eq!(h.edges(), vec![(0, 1)]);
        assert_eq!(
            h.without_edge(1, 2).unwrap_err(),
            GraphError::EdgeNotPresent { u: 1, v: 2 }
        );
    }

    #[test]
    fn repeated_removal_is_idempotent() {
        let mut rng = XorShiftRng::seed_from_u64(99);
        let g = random_graph(&mut rng, 10, 0.5);
        let a = g.without_vertex(4).unwrap();
        let b = g.without_vertex(4).unwrap();
        assert_eq!(a.key(), b.key());
        assert_eq!(a.to_string(), b.to_string());
    }

    #[test]
    fn key_distinguishes_labelled_graphs() {
        let a = Graph::from_edges(3, &[(0, 1)]).unwrap();
        let b = Graph::from_edges(3, &[(1, 2)]).unwrap();
        assert_ne!(a.key(), b.key());
        assert_eq!(a.key(), a.clone().key());
        assert_eq!(a.key().order(), 3);
    }

    // -------------------------------------------------------------------------
    // Parsing
    // -------------------------------------------------------------------------

    #[test]
    fn write_and_parse_roundtrip() {
        let mut rng = XorShiftRng::seed_from_u64(5);
        let g = random_graph(&mut rng, 9, 0.5);
        let mut buf = Vec::new();
        g.write_to(&mut buf).unwrap();
        let parsed = parse_adjacency_matrix(std::str::from_utf8(&buf).unwrap()).unwrap();
        assert_eq!(parsed, g);
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("g.txt");
        let g = Graph::from_edges(5, &[(0, 1), (1, 2), (2, 3), (3, 4), (4, 0)]).unwrap();
        g.save_to_file(&path).unwrap();
        assert_eq!(Graph::load_from_file(&path).unwrap(), g);
    }

    #[test]
    fn parse_adjacency_matrix_rejects_non_square() {
        let err = parse_adjacency_matrix("010\n10\n000\n").unwrap_err();
        assert!(matches!(err, GraphError::NonSquare { row: 1, .. }));
    }

    #[test]
    fn parse_adjacency_matrix_rejects_invalid_char() {
        let err = parse_adjacency_matrix("0x\n10\n").unwrap_err();
        assert!(matches!(err, GraphError::InvalidChar { ch: 'x', .. }));
    }

    #[test]
    fn parse_adjacency_matrix_rejects_self_loop() {
        let err = parse_adjacency_matrix("11\n10\n").unwrap_err();
        assert_eq!(err, GraphError::SelfLoop { vertex: 0 });
    }

    #[test]
    fn parse_adjacency_matrix_rejects_non_symmetric() {
        let err = parse_adjacency_matrix("01\n00\n").unwrap_err();
        assert_eq!(err, GraphError::NotSymmetric { i: 0, j: 1 });
    }

    #[test]
    fn parse_adjacency_matrix_rejects_whitespace_only() {
        assert_eq!(parse_adjacency_matrix("  \n\n").unwrap_err(), GraphError::Empty);
    }

    #[test]
    fn all_bits_mask_correctness() {
        assert_eq!(all_bits(0), 0);
        assert_eq!(all_bits(1), 1);
        assert_eq!(all_bits(5), 0b11111);
        assert_eq!(all_bits(64), u64::MAX);
    }

    #[test]
    fn bits_iterates_ascending() {
        let v: Vec<usize> = bits(0b1010_0101).collect();
        assert_eq!(v, vec![0, 2, 5, 7]);
        assert_eq!(bits(0b111).len(), 3);
    }
}
