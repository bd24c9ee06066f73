//! Error types for indset-core.

use indset_dist::{CommError, DistError};
use indset_graph::GraphError;
use thiserror::Error;

/// Result type for indset-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can stop an independent-set computation.
///
/// Input violations are caught before the first round and agreed on by the
/// whole group, so every worker stops together. Communication failures end
/// the run where they happen. Nothing is retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A per-node array does not have one entry per graph node.
    #[error("{what}: expected {expected} entries, got {actual}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// NaN has no place in the priority order.
    #[error("quality of node {node} is NaN")]
    NanQuality { node: usize },

    /// Two adjacent nodes share a global identifier, so neither outranks
    /// the other.
    #[error("adjacent nodes {a} and {b} share global identifier {global}")]
    DuplicateGlobal { a: usize, b: usize, global: u64 },

    /// The configured round limit was reached before convergence.
    #[error("no convergence within {limit} rounds")]
    RoundLimitExceeded { limit: usize },

    /// A node was still undecided when the group agreed none were.
    #[error("node {node} is still undecided after convergence")]
    Unconverged { node: usize },

    /// Another worker of the group rejected its inputs, so nobody ran.
    #[error("another worker rejected its inputs")]
    PeerFailed,

    /// The mesh has no entities of the requested dimension.
    #[error("mesh provides no entities of dimension {dim}")]
    UnknownDimension { dim: usize },

    /// A collective failed.
    #[error("communication failed: {0}")]
    Comm(#[from] CommError),

    /// The distribution rejected an exchange.
    #[error("exchange failed: {0}")]
    Dist(#[from] DistError),

    /// The adjacency input is malformed.
    #[error("invalid graph: {0}")]
    Graph(#[from] GraphError),
}
