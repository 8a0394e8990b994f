//! Criticality engine: vertex- and edge-criticality verdicts.
//!
//! A graph is k-critical when its chromatic number is exactly `k` and every
//! single-vertex removal lowers it; k-edge-critical when every single-edge
//! removal lowers it. Once \(\chi(G) = k\) is established, each removal trial
//! is one oracle query "is the reduced graph (k-1)-colourable?", and the first
//! `false` is a counter-example.
//!
//! Trials never mutate the input: every reduced graph is a fresh value.

use crate::config::{CriticalityMode, EngineConfig, RemovalOrder};
use crate::error::{ConfigError, CriticalityError, Stage};
use crate::graph::Graph;
use crate::oracle::{Budget, CachedOracle, ColoringOracle, Decision, Interrupt};
use rayon::prelude::*;
use std::fmt;
use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;
use std::time::Instant;
use tracing::{debug, warn};

// ============================================================================
// Verdicts
// ============================================================================

/// What the engine knows about the chromatic number before a check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChromaticHint {
    /// The chromatic number is supplied (for example by a corpus file name) and
    /// only checked against (k-1)-colourability, not recomputed.
    Known(usize),
    /// Compute the chromatic number with the oracle.
    Compute,
}

/// Why a graph is not critical.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Rejection {
    /// The chromatic number is not the target.
    ChromaticMismatch {
        /// The actual chromatic number.
        actual: usize,
    },
    /// The graph has no vertices, or fewer vertices than the target chromatic number.
    TooFewVertices {
        /// Number of vertices.
        n: usize,
    },
    /// Removing this vertex leaves a graph that still needs `k` colours.
    VertexNotCritical {
        /// Counter-example vertex.
        vertex: usize,
    },
    /// Removing this edge leaves a graph that still needs `k` colours.
    EdgeNotCritical {
        /// First endpoint.
        u: usize,
        /// Second endpoint.
        v: usize,
    },
    /// This vertex has degree below `k - 1`, so removing it cannot lower the chromatic number.
    LowDegree {
        /// Counter-example vertex.
        vertex: usize,
        /// Its degree.
        degree: u32,
    },
}

impl Rejection {
    /// Returns the counter-example vertex, if the rejection names one.
    pub fn vertex(&self) -> Option<usize> {
        match *self {
            Rejection::VertexNotCritical { vertex } | Rejection::LowDegree { vertex, .. } => {
                Some(vertex)
            }
            _ => None,
        }
    }

    /// Returns the counter-example edge, if the rejection names one.
    pub fn edge(&self) -> Option<(usize, usize)> {
        match *self {
            Rejection::EdgeNotCritical { u, v } => Some((u, v)),
            _ => None,
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::ChromaticMismatch { actual } => write!(f, "chromatic number is {actual}"),
            Rejection::TooFewVertices { n } => write!(f, "only {n} vertices"),
            Rejection::VertexNotCritical { vertex } => {
                write!(f, "removing vertex {vertex} does not lower the chromatic number")
            }
            Rejection::EdgeNotCritical { u, v } => {
                write!(f, "removing edge ({u}, {v}) does not lower the chromatic number")
            }
            Rejection::LowDegree { vertex, degree } => {
                write!(f, "vertex {vertex} has degree {degree}")
            }
        }
    }
}

/// Outcome of one criticality check, evaluated against chromatic number `k`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Verdict {
    /// The graph is k-critical in the requested mode.
    Critical {
        /// Chromatic number the check ran against.
        k: usize,
    },
    /// The graph is not k-critical.
    NotCritical {
        /// Chromatic number the check ran against.
        k: usize,
        /// First reason found.
        reason: Rejection,
    },
}

impl Verdict {
    /// The chromatic number this verdict was evaluated against.
    pub fn k(&self) -> usize {
        match *self {
            Verdict::Critical { k } | Verdict::NotCritical { k, .. } => k,
        }
    }

    /// Returns `true` for [`Verdict::Critical`].
    pub fn is_critical(&self) -> bool {
        matches!(self, Verdict::Critical { .. })
    }

    /// Returns the rejection reason, if any.
    pub fn reason(&self) -> Option<&Rejection> {
        match self {
            Verdict::Critical { .. } => None,
            Verdict::NotCritical { reason, .. } => Some(reason),
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Critical { k } => write!(f, "{k}-critical"),
            Verdict::NotCritical { k, reason } => write!(f, "not {k}-critical: {reason}"),
        }
    }
}

// ============================================================================
// Removal trials
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Removal {
    Vertex(usize),
    Edge(usize, usize),
}

impl Removal {
    fn stage(self) -> Stage {
        match self {
            Removal::Vertex(vertex) => Stage::VertexRemoval { vertex },
            Removal::Edge(u, v) => Stage::EdgeRemoval { u, v },
        }
    }

    fn rejection(self) -> Rejection {
        match self {
            Removal::Vertex(vertex) => Rejection::VertexNotCritical { vertex },
            Removal::Edge(u, v) => Rejection::EdgeNotCritical { u, v },
        }
    }
}

enum Trial {
    /// The reduced graph is (k-1)-colourable.
    Reduced,
    /// The reduced graph still needs k colours.
    Counterexample,
    /// Another worker already found a counter-example.
    Cancelled,
}

// ============================================================================
// CriticalityEngine
// ============================================================================

/// Decides vertex- and edge-criticality with a [`ColoringOracle`].
///
/// The engine holds no per-check state, so one engine can serve many threads.
#[derive(Debug)]
pub struct CriticalityEngine {
    config: EngineConfig,
    pool: Option<rayon::ThreadPool>,
    cache: Option<CachedOracle>,
}

impl Default for CriticalityEngine {
    fn default() -> Self {
        Self {
            config: EngineConfig::default(),
            pool: None,
            cache: None,
        }
    }
}

impl CriticalityEngine {
    /// Builds an engine, spawning a dedicated pool when `workers > 0` and removals run in parallel.
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] if the configuration is unusable or the pool cannot start.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let pool = if config.parallel_removals && config.workers > 0 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(config.workers)
                .thread_name(|i| format!("critical-removal-{i}"))
                .build()
                .map_err(|e| ConfigError::Invalid(format!("cannot start worker pool: {e}")))?;
            Some(pool)
        } else {
            None
        };
        let cache = config
            .cache_chromatic
            .then(|| CachedOracle::new(config.use_clique_bound));
        Ok(Self {
            config,
            pool,
            cache,
        })
    }

    /// The configuration this engine was built with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn oracle(&self) -> ColoringOracle {
        ColoringOracle::new().with_clique_bound(self.config.use_clique_bound)
    }

    fn budget<'a>(&self, cancel: Option<&'a AtomicBool>) -> Budget<'a> {
        let mut budget = Budget::unlimited();
        if let Some(timeout) = self.config.oracle_timeout() {
            budget = budget.with_timeout(timeout);
        }
        if let Some(flag) = cancel {
            budget = budget.with_cancel(flag);
        }
        budget
    }

    /// Computes the chromatic number under the configured oracle deadline.
    ///
    /// # Errors
    /// Returns [`CriticalityError::Timeout`] if the oracle ran out of time.
    pub fn chromatic_number(&self, graph: &Graph) -> Result<usize, CriticalityError> {
        let started = Instant::now();
        let budget = self.budget(None);
        let result = match &self.cache {
            Some(cache) => cache.chromatic_number_within(graph, &budget),
            None => self.oracle().chromatic_number_within(graph, &budget),
        };
        result.map_err(|_| {
            let elapsed = started.elapsed();
            warn!(
                order = graph.order(),
                elapsed_ms = elapsed.as_millis() as u64,
                "chromatic number computation timed out"
            );
            CriticalityError::Timeout {
                stage: Stage::ChromaticNumber,
                elapsed,
            }
        })
    }

    /// Checks criticality, taking the target chromatic number from `hint`.
    ///
    /// With [`ChromaticHint::Known`] the full chromatic number is not recomputed:
    /// one oracle call confirms the graph is not (k-1)-colourable, and the
    /// removal trials catch a \(\chi(G)\) above `k`. With
    /// [`ChromaticHint::Compute`] the verdict is evaluated against \(\chi(G)\).
    ///
    /// # Errors
    /// Returns [`CriticalityError::Timeout`] if some oracle call ran out of time
    /// and no counter-example was found.
    pub fn check(
        &self,
        graph: &Graph,
        hint: ChromaticHint,
        mode: CriticalityMode,
    ) -> Result<Verdict, CriticalityError> {
        let n = graph.order();
        let (k, known) = match hint {
            ChromaticHint::Known(k) => (k, true),
            ChromaticHint::Compute => (self.chromatic_number(graph)?, false),
        };
        if n == 0 || n < k {
            return Ok(Verdict::NotCritical {
                k,
                reason: Rejection::TooFewVertices { n },
            });
        }
        if k == 0 {
            let actual = self.chromatic_number(graph)?;
            return Ok(Verdict::NotCritical {
                k,
                reason: Rejection::ChromaticMismatch { actual },
            });
        }
        if known {
            if let Some(verdict) = self.below_known_k(graph, k)? {
                return Ok(verdict);
            }
        }
        self.removal_verdict(graph, k, mode)
    }

    /// [`Self::check`] in vertex mode.
    ///
    /// # Errors
    /// See [`Self::check`].
    pub fn check_vertex(&self, graph: &Graph, hint: ChromaticHint) -> Result<Verdict, CriticalityError> {
        self.check(graph, hint, CriticalityMode::Vertex)
    }

    /// [`Self::check`] in edge mode.
    ///
    /// # Errors
    /// See [`Self::check`].
    pub fn check_edge(&self, graph: &Graph, hint: ChromaticHint) -> Result<Verdict, CriticalityError> {
        self.check(graph, hint, CriticalityMode::Edge)
    }

    /// Checks k-criticality for a given `k`, first verifying that \(\chi(G) = k\).
    ///
    /// # Errors
    /// See [`Self::check`].
    pub fn check_against(
        &self,
        graph: &Graph,
        k: usize,
        mode: CriticalityMode,
    ) -> Result<Verdict, CriticalityError> {
        let n = graph.order();
        if n == 0 || n < k {
            return Ok(Verdict::NotCritical {
                k,
                reason: Rejection::TooFewVertices { n },
            });
        }
        let actual = self.chromatic_number(graph)?;
        if actual != k {
            debug!(order = n, k, actual, "chromatic number differs from target");
            return Ok(Verdict::NotCritical {
                k,
                reason: Rejection::ChromaticMismatch { actual },
            });
        }
        self.removal_verdict(graph, k, mode)
    }

    /// Returns `true` iff `graph` is k-vertex-critical.
    ///
    /// # Errors
    /// See [`Self::check`].
    pub fn is_vertex_critical(&self, graph: &Graph, k: usize) -> Result<bool, CriticalityError> {
        Ok(self
            .check_against(graph, k, CriticalityMode::Vertex)?
            .is_critical())
    }

    /// Returns `true` iff `graph` is k-edge-critical.
    ///
    /// # Errors
    /// See [`Self::check`].
    pub fn is_edge_critical(&self, graph: &Graph, k: usize) -> Result<bool, CriticalityError> {
        Ok(self
            .check_against(graph, k, CriticalityMode::Edge)?
            .is_critical())
    }

    /// Returns the `k` in `range` for which `graph` is k-critical, if any.
    ///
    /// Only \(k = \chi(G)\) can qualify, so this computes \(\chi(G)\) once.
    ///
    /// # Errors
    /// See [`Self::check`].
    pub fn classify(
        &self,
        graph: &Graph,
        range: RangeInclusive<usize>,
        mode: CriticalityMode,
    ) -> Result<Option<usize>, CriticalityError> {
        let chi = self.chromatic_number(graph)?;
        if !range.contains(&chi) {
            return Ok(None);
        }
        let verdict = self.check(graph, ChromaticHint::Known(chi), mode)?;
        Ok(verdict.is_critical().then_some(chi))
    }

    /// Runs the removal trials once \(\chi(G) = k \ge 1\) is established.
    fn removal_verdict(
        &self,
        graph: &Graph,
        k: usize,
        mode: CriticalityMode,
    ) -> Result<Verdict, CriticalityError> {
        let started = Instant::now();
        let n = graph.order();

        if mode == CriticalityMode::Vertex && self.config.min_degree_precheck {
            if let Some((vertex, degree)) = low_degree_vertex(graph, k) {
                debug!(order = n, k, vertex, degree, "rejected by minimum degree");
                return Ok(Verdict::NotCritical {
                    k,
                    reason: Rejection::LowDegree { vertex, degree },
                });
            }
        }

        let removals = self.removals(graph, mode);
        let found = if self.config.parallel_removals && removals.len() > 1 {
            self.find_counterexample_parallel(graph, k, &removals)?
        } else {
            self.find_counterexample(graph, k, &removals)?
        };

        let verdict = match found {
            None => Verdict::Critical { k },
            Some(removal) => Verdict::NotCritical {
                k,
                reason: removal.rejection(),
            },
        };
        debug!(
            order = n,
            k,
            %mode,
            critical = verdict.is_critical(),
            trials = removals.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "criticality check finished"
        );
        Ok(verdict)
    }

    fn removals(&self, graph: &Graph, mode: CriticalityMode) -> Vec<Removal> {
        match mode {
            CriticalityMode::Vertex => {
                let mut vertices: Vec<usize> = (0..graph.order()).collect();
                if self.config.removal_order == RemovalOrder::LowDegreeFirst {
                    vertices.sort_by_key(|&v| (graph.degree(v), v));
                }
                vertices.into_iter().map(Removal::Vertex).collect()
            }
            CriticalityMode::Edge => {
                let mut edges = graph.edges();
                if self.config.removal_order == RemovalOrder::LowDegreeFirst {
                    edges.sort_by_key(|&(u, v)| (graph.degree(u) + graph.degree(v), u, v));
                }
                edges.into_iter().map(|(u, v)| Removal::Edge(u, v)).collect()
            }
        }
    }

    /// One k-colourability decision, answered from the cache when enabled.
    fn colorable(
        &self,
        oracle: &mut ColoringOracle,
        graph: &Graph,
        k: usize,
        budget: &Budget<'_>,
    ) -> Result<bool, Interrupt> {
        if let Some(cache) = &self.cache {
            return cache.is_k_colorable_within(oracle, graph, k, budget);
        }
        match oracle.decide(graph, k, budget) {
            Decision::Colorable(_) => Ok(true),
            Decision::NotColorable => Ok(false),
            Decision::Interrupted(why) => Err(why),
        }
    }

    /// Rejects a supplied `k` when the graph is already (k-1)-colourable.
    ///
    /// A \(\chi(G) > k\) slips through here but never survives the removal
    /// trials, since then every `G - v` also needs more than `k - 1` colours.
    fn below_known_k(&self, graph: &Graph, k: usize) -> Result<Option<Verdict>, CriticalityError> {
        let started = Instant::now();
        let mut oracle = self.oracle();
        match self.colorable(&mut oracle, graph, k - 1, &self.budget(None)) {
            Ok(false) => Ok(None),
            Ok(true) => {
                let actual = self.chromatic_number(graph)?;
                debug!(order = graph.order(), k, actual, "supplied chromatic number is too high");
                Ok(Some(Verdict::NotCritical {
                    k,
                    reason: Rejection::ChromaticMismatch { actual },
                }))
            }
            Err(_) => {
                let elapsed = started.elapsed();
                warn!(
                    order = graph.order(),
                    k,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "checking the supplied chromatic number timed out"
                );
                Err(CriticalityError::Timeout {
                    stage: Stage::ChromaticNumber,
                    elapsed,
                })
            }
        }
    }

    /// Tests one removal: is the reduced graph (k-1)-colourable?
    fn trial(
        &self,
        oracle: &mut ColoringOracle,
        graph: &Graph,
        k: usize,
        removal: Removal,
        cancel: Option<&AtomicBool>,
    ) -> Result<Trial, CriticalityError> {
        let reduced = match removal {
            Removal::Vertex(v) => graph.without_vertex(v)?,
            Removal::Edge(u, v) => graph.without_edge(u, v)?,
        };
        let started = Instant::now();
        match self.colorable(oracle, &reduced, k - 1, &self.budget(cancel)) {
            Ok(true) => Ok(Trial::Reduced),
            Ok(false) => {
                debug!(order = graph.order(), k, ?removal, "removal does not lower the chromatic number");
                Ok(Trial::Counterexample)
            }
            Err(Interrupt::Cancelled) => Ok(Trial::Cancelled),
            Err(Interrupt::Timeout) => {
                let elapsed = started.elapsed();
                warn!(
                    order = graph.order(),
                    k,
                    ?removal,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "removal trial timed out"
                );
                Err(CriticalityError::Timeout {
                    stage: removal.stage(),
                    elapsed,
                })
            }
        }
    }

    /// Sequential trials with early exit on the first counter-example.
    ///
    /// A timed-out trial does not stop the loop: a later counter-example is still
    /// a definitive answer. Without one, the first timeout is returned.
    fn find_counterexample(
        &self,
        graph: &Graph,
        k: usize,
        removals: &[Removal],
    ) -> Result<Option<Removal>, CriticalityError> {
        let mut oracle = self.oracle();
        let mut first_failure = None;
        for &removal in removals {
            match self.trial(&mut oracle, graph, k, removal, None) {
                Ok(Trial::Counterexample) => return Ok(Some(removal)),
                Ok(Trial::Reduced | Trial::Cancelled) => {}
                Err(e) => {
                    first_failure.get_or_insert(e);
                }
            }
        }
        first_failure.map_or(Ok(None), Err)
    }

    /// Parallel trials sharing a stop flag.
    ///
    /// The first counter-example raises the flag; queued trials then skip and
    /// in-flight oracle calls abandon at their next budget check.
    fn find_counterexample_parallel(
        &self,
        graph: &Graph,
        k: usize,
        removals: &[Removal],
    ) -> Result<Option<Removal>, CriticalityError> {
        let stop = AtomicBool::new(false);
        let first_failure: OnceLock<CriticalityError> = OnceLock::new();

        let search = || {
            removals
                .par_iter()
                .map_init(
                    || self.oracle(),
                    |oracle, &removal| {
                        if stop.load(Ordering::Relaxed) {
                            return None;
                        }
                        match self.trial(oracle, graph, k, removal, Some(&stop)) {
                            Ok(Trial::Counterexample) => {
                                stop.store(true, Ordering::Relaxed);
                                Some(removal)
                            }
                            Ok(Trial::Reduced | Trial::Cancelled) => None,
                            Err(e) => {
                                let _ = first_failure.set(e);
                                None
                            }
                        }
                    },
                )
                .find_any(Option::is_some)
                .flatten()
        };

        let found = match &self.pool {
            Some(pool) => pool.install(search),
            None => search(),
        };
        if found.is_some() {
            return Ok(found);
        }
        first_failure.into_inner().map_or(Ok(None), Err)
    }
}

/// Returns a vertex of minimum degree if that degree is below `k - 1`.
///
/// Such a vertex is a genuine counter-example when \(\chi(G) = k\): any
/// (k-1)-colouring of `G - v` extends to `v`, so `G - v` still needs `k` colours.
fn low_degree_vertex(graph: &Graph, k: usize) -> Option<(usize, u32)> {
    let (degree, vertex) = (0..graph.order()).map(|v| (graph.degree(v), v)).min()?;
    ((degree as usize) + 1 < k).then_some((vertex, degree))
}

// ============================================================================
// Convenience functions
// ============================================================================

/// Returns `true` iff `graph` is k-vertex-critical, using a default engine (no deadline).
pub fn is_vertex_critical(graph: &Graph, k: usize) -> bool {
    CriticalityEngine::default()
        .is_vertex_critical(graph, k)
        .unwrap_or(false)
}

/// Returns `true` iff `graph` is k-edge-critical, using a default engine (no deadline).
pub fn is_edge_critical(graph: &Graph, k: usize) -> bool {
    CriticalityEngine::default()
        .is_edge_critical(graph, k)
        .unwrap_or(false)
}

// ============================================================================
// Tests
// ============================================================================
