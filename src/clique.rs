//! Exact clique detection for small graphs (currently \(n \le 64\)).
//!
//! The clique number \(\omega(G)\) is a lower bound on the chromatic number, so
//! the colouring oracle starts its search from it. The search is a standard
//! branch-and-bound with a greedy colouring bound for pruning (Tomita-style).

use crate::graph::{bit, bits, Graph, MAX_VERTICES};

// ============================================================================
// CliqueSearch
// ============================================================================

/// Exact oracle for clique existence and clique number queries.
///
/// Internally reuses a stack buffer to avoid repeated allocations.
#[derive(Clone, Debug, Default)]
pub struct CliqueSearch {
    stack: Vec<usize>,
}

impl CliqueSearch {
    /// Creates a new search with preallocated scratch space.
    pub fn new() -> Self {
        Self {
            stack: Vec::with_capacity(MAX_VERTICES),
        }
    }

    /// Returns `true` iff the graph contains a clique of size `k`.
    pub fn has_clique_of_size(&mut self, graph: &Graph, k: usize) -> bool {
        if k == 0 {
            return true;
        }
        if k > graph.order() {
            return false;
        }
        self.stack.clear();
        self.search_exists(graph.rows(), k, 0, graph.vertex_mask())
    }

    /// Writes one clique of size `k` to `out` if it exists.
    pub fn find_clique_of_size(&mut self, graph: &Graph, k: usize, out: &mut Vec<usize>) -> bool {
        out.clear();
        if k == 0 {
            return true;
        }
        if k > graph.order() {
            return false;
        }
        self.stack.clear();
        if self.search_exists(graph.rows(), k, 0, graph.vertex_mask()) {
            out.extend_from_slice(&self.stack);
            out.sort_unstable();
            return true;
        }
        false
    }

    /// Returns the clique number \(\omega(G)\) (0 for the empty graph).
    pub fn clique_number(&mut self, graph: &Graph) -> usize {
        self.stack.clear();
        max_clique_size(graph.rows(), 0, graph.vertex_mask())
    }

    /// Returns the independence number \(\alpha(G)\).
    pub fn independence_number(&mut self, graph: &Graph) -> usize {
        self.clique_number(&graph.complement())
    }

    fn search_exists(&mut self, adj: &[u64], k: usize, size: usize, mut candidates: u64) -> bool {
        if size >= k {
            return true;
        }

        let remaining = candidates.count_ones() as usize;
        if size + remaining < k {
            return false;
        }

        let mut order = [0usize; MAX_VERTICES];
        let mut colors = [0u8; MAX_VERTICES];
        let len = color_sort(adj, candidates, &mut order, &mut colors);

        for idx in (0..len).rev() {
            let color_bound = colors[idx] as usize;
            if size + color_bound < k {
                return false;
            }

            let v = order[idx];
            self.stack.push(v);
            if self.search_exists(adj, k, size + 1, candidates & adj[v]) {
                return true;
            }
            self.stack.pop();
            candidates &= !bit(v);
        }
        false
    }
}

fn max_clique_size(adj: &[u64], size: usize, mut candidates: u64) -> usize {
    if candidates == 0 {
        return size;
    }

    let mut order = [0usize; MAX_VERTICES];
    let mut colors = [0u8; MAX_VERTICES];
    let len = color_sort(adj, candidates, &mut order, &mut colors);

    let mut best = size;
    for idx in (0..len).rev() {
        let color_bound = colors[idx] as usize;
        if size + color_bound <= best {
            break;
        }

        let v = order[idx];
        let found = max_clique_size(adj, size + 1, candidates & adj[v]);
        best = best.max(found);
        candidates &= !bit(v);
    }
    best
}

/// Greedily grows a clique by repeatedly taking the candidate with most candidate neighbours.
///
/// This is a **lower bound** on \(\omega(G)\) and costs \(O(n^2)\).
pub fn greedy_clique(graph: &Graph) -> Vec<usize> {
    let adj = graph.rows();
    let mut candidates = graph.vertex_mask();
    let mut clique = Vec::new();

    while candidates != 0 {
        let best = bits(candidates)
            .max_by_key(|&v| ((adj[v] & candidates).count_ones(), std::cmp::Reverse(v)))
            .unwrap_or(0);
        clique.push(best);
        candidates &= adj[best];
    }
    clique
}

// ============================================================================
// Greedy coloring for clique bound
// ============================================================================

#[inline]
fn color_sort(
    adj: &[u64],
    mut candidates: u64,
    order: &mut [usize; MAX_VERTICES],
    colors: &mut [u8; MAX_VERTICES],
) -> usize {
    let mut len = 0usize;
    let mut color: u8 = 0;

    while candidates != 0 {
        color += 1;
        let mut available = candidates;
        while available != 0 {
            let v = available.trailing_zeros() as usize;
            let v_mask = bit(v);
            order[len] = v;
            colors[len] = color;
            len += 1;
            candidates &= !v_mask;
            available &= !v_mask;
            available &= !adj[v];
        }
    }
    len
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::construction;
    use rand::SeedableRng;
    use rand_xorshift::XorShiftRng;

    fn is_clique(g: &Graph, subset: u64) -> bool {
        bits(subset).all(|v| (g.neighbors(v) & subset) == (subset & !bit(v)))
    }

    fn brute_omega(g: &Graph) -> usize {
        let mut best = 0usize;
        for subset in 0..(1u64 << g.order()) {
            let sz = subset.count_ones() as usize;
            if sz > best && is_clique(g, subset) {
                best = sz;
            }
        }
        best
    }

    #[test]
    fn clique_number_matches_bruteforce() {
        let mut rng = XorShiftRng::seed_from_u64(0xDEADBEEF);
        let mut search = CliqueSearch::new();
        for _ in 0..40 {
            let g = construction::random(13, 0.55, &mut rng).unwrap();
            let omega = brute_omega(&g);
            assert_eq!(search.clique_number(&g), omega);
            for k in 0..=g.order() {
                assert_eq!(search.has_clique_of_size(&g, k), k <= omega, "k={k}");
            }
        }
    }

    #[test]
    fn find_clique_returns_valid_clique() {
        let mut rng = XorShiftRng::seed_from_u64(0xBCDE);
        let mut search = CliqueSearch::new();
        let mut witness = Vec::new();
        for _ in 0..30 {
            let g = construction::random(16, 0.6, &mut rng).unwrap();
            let omega = search.clique_number(&g);
            assert!(search.find_clique_of_size(&g, omega, &mut witness));
            assert_eq!(witness.len(), omega);
            let mask = witness.iter().fold(0u64, |m, &v| m | bit(v));
            assert!(is_clique(&g, mask), "witness is not a clique");
            assert!(!search.find_clique_of_size(&g, omega + 1, &mut witness));
            assert!(witness.is_empty());
        }
    }

    #[test]
    fn greedy_clique_is_a_clique_and_a_lower_bound() {
        let mut rng = XorShiftRng::seed_from_u64(0xAAAA);
        let mut search = CliqueSearch::new();
        for _ in 0..30 {
            let g = construction::random(20, 0.5, &mut rng).unwrap();
            let clique = greedy_clique(&g);
            let mask = clique.iter().fold(0u64, |m, &v| m | bit(v));
            assert!(is_clique(&g, mask));
            assert!(clique.len() <= search.clique_number(&g));
        }
    }

    #[test]
    fn base_cases() {
        let mut search = CliqueSearch::new();
        let empty = Graph::empty(0).unwrap();
        assert_eq!(search.clique_number(&empty), 0);
        assert!(greedy_clique(&empty).is_empty());

        let edgeless = Graph::empty(10).unwrap();
        assert_eq!(search.clique_number(&edgeless), 1);
        assert!(search.has_clique_of_size(&edgeless, 0));
        assert!(!search.has_clique_of_size(&edgeless, 11));
        assert_eq!(search.independence_number(&edgeless), 10);
    }

    #[test]
    fn complete_and_cycle() {
        let mut search = CliqueSearch::new();
        let k8 = construction::complete(8).unwrap();
        assert_eq!(search.clique_number(&k8), 8);
        assert_eq!(search.independence_number(&k8), 1);

        // C5 has no triangle and no independent set of size 3 (R(3,3) = 6).
        let c5 = construction::cycle(5).unwrap();
        assert!(!search.has_clique_of_size(&c5, 3));
        assert_eq!(search.independence_number(&c5), 2);
    }

    #[test]
    fn grotzsch_graph_is_triangle_free() {
        let g = construction::mycielskian(&construction::cycle(5).unwrap()).unwrap();
        assert_eq!(CliqueSearch::new().clique_number(&g), 2);
    }
}
