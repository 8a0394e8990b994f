//! Error types shared across the crate.
//!
//! Construction-time problems are reported as [`GraphError`]; the criticality
//! engine wraps them in [`CriticalityError`] together with its own failure modes.
//! None of these are fatal to a batch run: the batch driver records them per item.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors encountered while building, decoding or editing a [`crate::graph::Graph`].
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum GraphError {
    /// An edge endpoint or removal target is not a vertex of the graph.
    #[error("vertex {vertex} is out of range for a graph of order {order}")]
    VertexOutOfRange {
        /// Offending vertex identifier.
        vertex: usize,
        /// Number of vertices in the graph.
        order: usize,
    },
    /// An edge joins a vertex to itself.
    #[error("self-loop at vertex {vertex}")]
    SelfLoop {
        /// The vertex with a self-loop.
        vertex: usize,
    },
    /// `A[i][j] != A[j][i]` in a supplied adjacency.
    #[error("adjacency is not symmetric at ({i}, {j})")]
    NotSymmetric {
        /// Row index.
        i: usize,
        /// Column index.
        j: usize,
    },
    /// A neighbour bitset has bits set at or beyond the graph order.
    #[error("row {row} has neighbour bits beyond order {order}")]
    StrayBits {
        /// Row index.
        row: usize,
        /// Number of vertices in the graph.
        order: usize,
    },
    /// The graph does not fit in a `u64` neighbour bitset.
    #[error("graph has {n} vertices; this implementation supports n <= 64")]
    TooManyVertices {
        /// Requested number of vertices.
        n: usize,
    },
    /// Attempted to remove an edge that is not in the graph.
    #[error("edge ({u}, {v}) is not present")]
    EdgeNotPresent {
        /// First endpoint.
        u: usize,
        /// Second endpoint.
        v: usize,
    },
    /// No non-empty rows were found in an adjacency matrix.
    #[error("adjacency matrix is empty")]
    Empty,
    /// Adjacency matrix is not square.
    #[error("adjacency matrix is not square: row {row} has length {got}, expected {expected}")]
    NonSquare {
        /// The row index with wrong length.
        row: usize,
        /// Expected length.
        expected: usize,
        /// Actual length.
        got: usize,
    },
    /// Encountered a non `0/1` character in an adjacency matrix.
    #[error("invalid character at ({row}, {col}): {ch:?} (expected '0' or '1')")]
    InvalidChar {
        /// Row index.
        row: usize,
        /// Column index.
        col: usize,
        /// The invalid character.
        ch: char,
    },
    /// A graph6 string could not be decoded.
    #[error("invalid graph6 string at byte {position}: {reason}")]
    Graph6 {
        /// Byte offset of the problem.
        position: usize,
        /// Short description.
        reason: &'static str,
    },
    /// I/O error (file not found, etc.).
    #[error("I/O error: {0}")]
    Io(String),
}

/// Step of a criticality check during which the oracle ran out of budget.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    /// Establishing the chromatic number of the input graph.
    ChromaticNumber,
    /// Testing the graph with one vertex removed.
    VertexRemoval {
        /// Removed vertex.
        vertex: usize,
    },
    /// Testing the graph with one edge removed.
    EdgeRemoval {
        /// First endpoint.
        u: usize,
        /// Second endpoint.
        v: usize,
    },
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::ChromaticNumber => write!(f, "computing the chromatic number"),
            Stage::VertexRemoval { vertex } => write!(f, "testing removal of vertex {vertex}"),
            Stage::EdgeRemoval { u, v } => write!(f, "testing removal of edge ({u}, {v})"),
        }
    }
}

/// Errors reported by the criticality engine.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum CriticalityError {
    /// The input graph was malformed.
    #[error(transparent)]
    Graph(#[from] GraphError),
    /// A negative chromatic number was requested.
    #[error("invalid chromatic number {k}: k must be non-negative")]
    InvalidK {
        /// The rejected value.
        k: i64,
    },
    /// The oracle could not decide within its configured budget.
    ///
    /// This is not a negative answer: the graph may or may not be critical.
    #[error("oracle timed out after {elapsed:?} while {stage}")]
    Timeout {
        /// What the engine was doing.
        stage: Stage,
        /// Time spent in the interrupted oracle call.
        elapsed: Duration,
    },
}

/// Converts an externally supplied (signed) chromatic number into a `usize`.
///
/// # Errors
/// Returns [`CriticalityError::InvalidK`] if `k` is negative.
pub fn validate_k(k: i64) -> Result<usize, CriticalityError> {
    usize::try_from(k).map_err(|_| CriticalityError::InvalidK { k })
}

/// File-level failures of the batch driver.
///
/// Per-graph failures never surface here; they are collected in the report.
#[derive(Error, Debug)]
pub enum BatchError {
    /// Reading or writing a corpus file failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File or directory involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// A corpus file name does not follow `order{n}_chi{k}.txt`.
    #[error("corpus file name {name:?} does not match order{{n}}_chi{{k}}.txt")]
    BadFileName {
        /// The offending name.
        name: String,
    },
}

impl BatchError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BatchError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors while loading an [`crate::config::EngineConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// The configuration text is not valid TOML for this schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    /// A value is syntactically valid but unusable.
    #[error("invalid config: {0}")]
    Invalid(String),
}
