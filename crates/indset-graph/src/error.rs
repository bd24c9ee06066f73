//! Error types for indset-graph.

use thiserror::Error;

/// Result type for indset-graph operations.
pub type Result<T> = std::result::Result<T, GraphError>;

/// Errors raised when graph or map inputs break their structural invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// The offsets array must hold at least the leading zero.
    #[error("offsets array is empty")]
    EmptyOffsets,

    /// The first offset must be zero.
    #[error("offsets must start at 0, found {0}")]
    NonZeroStart(usize),

    /// Offsets went backwards between two nodes.
    #[error("offsets decrease at node {node}: {prev} > {next}")]
    DecreasingOffsets { node: usize, prev: usize, next: usize },

    /// The last offset does not match the neighbor count.
    #[error("last offset {last} does not match {targets} targets")]
    OffsetTargetMismatch { last: usize, targets: usize },

    /// A neighbor index points outside the node range.
    #[error("target {target} at position {position} is out of range for {nnodes} nodes")]
    TargetOutOfRange {
        position: usize,
        target: usize,
        nnodes: usize,
    },

    /// An array did not have the length required by its companion structure.
    #[error("{what}: expected length {expected}, got {actual}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A map entry points outside its codomain.
    #[error("map entry {index} -> {value} is out of range for {range} entries")]
    MapOutOfRange {
        index: usize,
        value: usize,
        range: usize,
    },

    /// Component width must be at least one.
    #[error("component width must be positive")]
    ZeroWidth,
}
