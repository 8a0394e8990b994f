//! Exact k-colourability oracle and chromatic number computation.
//!
//! The decision procedure is a backtracking search over colour assignments:
//! vertices are coloured in descending-degree order, colours are tried in
//! ascending order, and the first complete proper assignment wins. Colour
//! classes are kept as bitsets and copied into each recursion frame, so a
//! frame never has to undo what a sibling branch did.
//!
//! # Performance
//!
//! Deciding k-colourability is NP-complete. The search always terminates but
//! may take exponential time on adversarial inputs; callers that need a bound
//! pass a [`Budget`] with a deadline or a cancellation flag.

use crate::clique::{greedy_clique, CliqueSearch};
use crate::graph::{bit, bits, Graph, GraphKey, MAX_VERTICES};
use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};

/// Number of search nodes between two budget checks.
const BUDGET_CHECK_INTERVAL: u64 = 1024;

// ============================================================================
// Coloring
// ============================================================================

/// A total vertex colouring: `colors()[v]` is the colour of vertex `v`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Coloring {
    colors: Vec<usize>,
}

impl Coloring {
    /// Wraps an explicit colour assignment.
    pub fn new(colors: Vec<usize>) -> Self {
        Self { colors }
    }

    /// Returns the colour of every vertex.
    pub fn colors(&self) -> &[usize] {
        &self.colors
    }

    /// Returns the colour of vertex `v`.
    pub fn color_of(&self, v: usize) -> usize {
        self.colors[v]
    }

    /// Returns the number of colours used (`max + 1`, or 0 when there are no vertices).
    pub fn num_colors(&self) -> usize {
        self.colors.iter().max().map_or(0, |&c| c + 1)
    }

    /// Returns `true` iff this assignment covers `graph` and no edge is monochromatic.
    pub fn is_proper(&self, graph: &Graph) -> bool {
        self.colors.len() == graph.order()
            && graph
                .edges()
                .into_iter()
                .all(|(u, v)| self.colors[u] != self.colors[v])
    }
}

// ============================================================================
// Budget
// ============================================================================

/// Why a budgeted oracle call stopped without an answer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Interrupt {
    /// The deadline passed.
    Timeout,
    /// The shared cancellation flag was raised.
    Cancelled,
}

/// Limits on a single oracle call.
///
/// Both limits are polled at the search root and then every 1024 search nodes,
/// so a call may overrun its deadline slightly before it notices.
#[derive(Clone, Copy, Debug, Default)]
pub struct Budget<'a> {
    deadline: Option<Instant>,
    cancel: Option<&'a AtomicBool>,
}

impl<'a> Budget<'a> {
    /// A budget that never interrupts.
    pub const fn unlimited() -> Self {
        Self {
            deadline: None,
            cancel: None,
        }
    }

    /// Stops the call once `timeout` has elapsed from now.
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self {
            deadline: Instant::now().checked_add(timeout),
            ..self
        }
    }

    /// Stops the call at `deadline`.
    #[must_use]
    pub fn with_deadline(self, deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            ..self
        }
    }

    /// Stops the call as soon as `flag` is observed `true`.
    #[must_use]
    pub fn with_cancel(self, flag: &'a AtomicBool) -> Self {
        Self {
            cancel: Some(flag),
            ..self
        }
    }

    /// Returns `true` if this budget can never interrupt.
    pub fn is_unlimited(&self) -> bool {
        self.deadline.is_none() && self.cancel.is_none()
    }

    #[inline]
    fn check(&self) -> Option<Interrupt> {
        if self.cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
            return Some(Interrupt::Cancelled);
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Some(Interrupt::Timeout);
        }
        None
    }
}

/// Outcome of a budgeted k-colourability query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    /// A proper colouring with at most k colours exists; here is one.
    Colorable(Coloring),
    /// No proper colouring with at most k colours exists.
    NotColorable,
    /// The budget ran out before the search finished.
    Interrupted(Interrupt),
}

impl Decision {
    /// Returns the definitive answer, or `None` if the call was interrupted.
    pub fn is_colorable(&self) -> Option<bool> {
        match self {
            Decision::Colorable(_) => Some(true),
            Decision::NotColorable => Some(false),
            Decision::Interrupted(_) => None,
        }
    }
}

// ============================================================================
// ColoringOracle
// ============================================================================

enum Step {
    Found([u64; MAX_VERTICES]),
    Exhausted,
    Interrupted(Interrupt),
}

/// Exact colouring oracle.
///
/// Holds scratch space and a node counter; create one per thread.
#[derive(Clone, Debug)]
pub struct ColoringOracle {
    order: Vec<usize>,
    nodes: u64,
    use_clique_bound: bool,
}

impl Default for ColoringOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl ColoringOracle {
    /// Creates an oracle that seeds chromatic number searches with the clique number.
    pub fn new() -> Self {
        Self {
            order: Vec::with_capacity(MAX_VERTICES),
            nodes: 0,
            use_clique_bound: true,
        }
    }

    /// Enables or disables the clique-number lower bound in [`Self::chromatic_number`].
    #[must_use]
    pub fn with_clique_bound(mut self, enabled: bool) -> Self {
        self.use_clique_bound = enabled;
        self
    }

    /// Returns the number of search nodes expanded since this oracle was created.
    pub fn nodes_expanded(&self) -> u64 {
        self.nodes
    }

    /// Returns `true` iff `graph` has a proper colouring with colours `0..k`.
    pub fn is_k_colorable(&mut self, graph: &Graph, k: usize) -> bool {
        self.find_coloring(graph, k).is_some()
    }

    /// Returns some proper colouring with at most `k` colours, if one exists.
    ///
    /// Callers must not rely on which colouring is returned.
    pub fn find_coloring(&mut self, graph: &Graph, k: usize) -> Option<Coloring> {
        match self.decide(graph, k, &Budget::unlimited()) {
            Decision::Colorable(c) => Some(c),
            Decision::NotColorable | Decision::Interrupted(_) => None,
        }
    }

    /// Decides k-colourability within `budget`.
    pub fn decide(&mut self, graph: &Graph, k: usize, budget: &Budget<'_>) -> Decision {
        let n = graph.order();
        if n == 0 {
            return Decision::Colorable(Coloring::new(Vec::new()));
        }
        if k == 0 {
            return Decision::NotColorable;
        }
        if k >= n {
            return Decision::Colorable(Coloring::new((0..n).collect()));
        }
        if greedy_clique(graph).len() > k {
            return Decision::NotColorable;
        }

        self.order.clear();
        self.order.extend(0..n);
        self.order.sort_by_key(|&v| (Reverse(graph.degree(v)), v));

        let order = std::mem::take(&mut self.order);
        let step = self.extend(graph, &order, k, 0, [0u64; MAX_VERTICES], 0, budget);
        self.order = order;

        match step {
            Step::Found(classes) => Decision::Colorable(classes_to_coloring(&classes, n)),
            Step::Exhausted => Decision::NotColorable,
            Step::Interrupted(why) => Decision::Interrupted(why),
        }
    }

    /// Colours `order[depth]` given the classes fixed so far, recursing on success.
    #[allow(clippy::too_many_arguments)]
    fn extend(
        &mut self,
        graph: &Graph,
        order: &[usize],
        k: usize,
        depth: usize,
        classes: [u64; MAX_VERTICES],
        used: usize,
        budget: &Budget<'_>,
    ) -> Step {
        if depth == order.len() {
            return Step::Found(classes);
        }

        self.nodes += 1;
        if depth == 0 || self.nodes % BUDGET_CHECK_INTERVAL == 0 {
            if let Some(why) = budget.check() {
                return Step::Interrupted(why);
            }
        }

        let v = order[depth];
        let neighbors = graph.neighbors(v);
        // Colours are interchangeable, so opening more than one fresh colour is redundant.
        let limit = (used + 1).min(k);

        for c in 0..limit {
            if classes[c] & neighbors != 0 {
                continue;
            }
            let mut next = classes;
            next[c] |= bit(v);
            let next_used = used.max(c + 1);
            match self.extend(graph, order, k, depth + 1, next, next_used, budget) {
                Step::Exhausted => {}
                done => return done,
            }
        }
        Step::Exhausted
    }

    /// Returns the chromatic number of `graph`; the empty graph has chromatic number 0.
    pub fn chromatic_number(&mut self, graph: &Graph) -> usize {
        match self.chromatic_number_within(graph, &Budget::unlimited()) {
            Ok(chi) => chi,
            Err(_) => unreachable!("an unlimited budget never interrupts"),
        }
    }

    /// Computes the chromatic number within `budget`.
    ///
    /// Starts from \(\max(1, \omega(G))\) (or 1 without the clique bound) and stops
    /// early when a greedy colouring already matches the candidate.
    ///
    /// # Errors
    /// Returns the [`Interrupt`] if the budget ran out.
    pub fn chromatic_number_within(
        &mut self,
        graph: &Graph,
        budget: &Budget<'_>,
    ) -> Result<usize, Interrupt> {
        let n = graph.order();
        if n == 0 {
            return Ok(0);
        }

        let lower = if self.use_clique_bound {
            CliqueSearch::new().clique_number(graph).max(1)
        } else {
            1
        };
        let upper = greedy_coloring(graph).num_colors();

        for k in lower..upper {
            match self.decide(graph, k, budget) {
                Decision::Colorable(_) => return Ok(k),
                Decision::NotColorable => {}
                Decision::Interrupted(why) => return Err(why),
            }
        }
        Ok(upper.max(lower))
    }
}

/// First-fit colouring in descending-degree order; an upper bound on \(\chi(G)\).
pub fn greedy_coloring(graph: &Graph) -> Coloring {
    let n = graph.order();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by_key(|&v| (Reverse(graph.degree(v)), v));

    let mut classes = [0u64; MAX_VERTICES];
    for &v in &order {
        let c = (0..n)
            .find(|&c| classes[c] & graph.neighbors(v) == 0)
            .unwrap_or(n - 1);
        classes[c] |= bit(v);
    }
    classes_to_coloring(&classes, n)
}

fn classes_to_coloring(classes: &[u64; MAX_VERTICES], n: usize) -> Coloring {
    let mut colors = vec![0usize; n];
    for (c, &class) in classes.iter().enumerate() {
        for v in bits(class) {
            colors[v] = c;
        }
    }
    Coloring::new(colors)
}

// ============================================================================
// CachedOracle
// ============================================================================

/// Thread-safe memo of chromatic numbers and k-colourability decisions,
/// keyed by [`GraphKey`].
///
/// Only definitive results are cached; interrupted computations leave no entry.
/// A cached chromatic number also answers every decision for that graph.
#[derive(Debug)]
pub struct CachedOracle {
    chromatic: RwLock<HashMap<GraphKey, usize>>,
    decisions: RwLock<HashMap<(GraphKey, usize), bool>>,
    hits: AtomicU64,
    use_clique_bound: bool,
}

impl CachedOracle {
    /// Creates an empty cache.
    pub fn new(use_clique_bound: bool) -> Self {
        Self {
            chromatic: RwLock::new(HashMap::new()),
            decisions: RwLock::new(HashMap::new()),
            hits: AtomicU64::new(0),
            use_clique_bound,
        }
    }

    /// Returns the chromatic number of `graph`, computing it on a miss.
    pub fn chromatic_number(&self, graph: &Graph) -> usize {
        match self.chromatic_number_within(graph, &Budget::unlimited()) {
            Ok(chi) => chi,
            Err(_) => unreachable!("an unlimited budget never interrupts"),
        }
    }

    /// Returns the chromatic number of `graph` within `budget`, computing it on a miss.
    ///
    /// # Errors
    /// Returns the [`Interrupt`] if the computation ran out of budget.
    pub fn chromatic_number_within(
        &self,
        graph: &Graph,
        budget: &Budget<'_>,
    ) -> Result<usize, Interrupt> {
        let key = graph.key();
        if let Some(chi) = self.cached_chromatic(&key) {
            return Ok(chi);
        }

        let chi = ColoringOracle::new()
            .with_clique_bound(self.use_clique_bound)
            .chromatic_number_within(graph, budget)?;
        self.chromatic
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, chi);
        Ok(chi)
    }

    /// Decides k-colourability of `graph` within `budget`, running `oracle` on a miss.
    ///
    /// # Errors
    /// Returns the [`Interrupt`] if the search ran out of budget.
    pub fn is_k_colorable_within(
        &self,
        oracle: &mut ColoringOracle,
        graph: &Graph,
        k: usize,
        budget: &Budget<'_>,
    ) -> Result<bool, Interrupt> {
        let key = graph.key();
        if let Some(chi) = self.cached_chromatic(&key) {
            return Ok(chi <= k);
        }
        let key = (key, k);
        if let Some(&colorable) = self
            .decisions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(colorable);
        }

        let colorable = match oracle.decide(graph, k, budget) {
            Decision::Colorable(_) => true,
            Decision::NotColorable => false,
            Decision::Interrupted(why) => return Err(why),
        };
        self.decisions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, colorable);
        Ok(colorable)
    }

    fn cached_chromatic(&self, key: &GraphKey) -> Option<usize> {
        let chi = self
            .chromatic
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .copied()?;
        self.hits.fetch_add(1, Ordering::Relaxed);
        Some(chi)
    }

    /// Number of cached entries, chromatic numbers and decisions together.
    pub fn len(&self) -> usize {
        self.chromatic.read().unwrap_or_else(PoisonError::into_inner).len()
            + self.decisions.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of lookups answered from the cache.
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Drops every cached entry.
    pub fn clear(&self) {
        self.chromatic
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.decisions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

// ============================================================================
// Convenience functions
// ============================================================================

/// Returns `true` iff `graph` is k-colourable. See [`ColoringOracle::is_k_colorable`].
pub fn is_k_colorable(graph: &Graph, k: usize) -> bool {
    ColoringOracle::new().is_k_colorable(graph, k)
}

/// Returns the chromatic number of `graph`. See [`ColoringOracle::chromatic_number`].
pub fn chromatic_number(graph: &Graph) -> usize {
    ColoringOracle::new().chromatic_number(graph)
}

// ============================================================================
// Tests
// ============================================================================
