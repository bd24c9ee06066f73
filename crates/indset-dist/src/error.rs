//! Error types for indset-dist.

use indset_graph::GraphError;
use thiserror::Error;

/// Result type for indset-dist operations.
pub type Result<T> = std::result::Result<T, DistError>;

/// Failures of the collective communication layer.
///
/// None of these are retried: a group that reports one is unusable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommError {
    /// An all-to-all exchange must carry one outgoing batch per worker.
    #[error("exchange needs {expected} outgoing batches, got {actual}")]
    WrongFanout { expected: usize, actual: usize },

    /// A peer contributed a value of a different type to the same collective.
    #[error("worker {from} contributed a payload of a different type")]
    PayloadMismatch { from: usize },

    /// A peer reached the collective without depositing its contribution.
    #[error("no contribution from worker {from}")]
    MissingContribution { from: usize },

    /// A peer panicked while holding the shared mailbox.
    #[error("worker group state is poisoned")]
    Poisoned,

    /// The group was closed because a worker left or gave up.
    #[error("worker group was aborted")]
    Aborted,
}

/// Errors that can occur while building or using a [`Dist`](crate::Dist).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DistError {
    /// The collective layer failed.
    #[error("communication failed: {0}")]
    Comm(#[from] CommError),

    /// A derived map was malformed.
    #[error("map construction failed: {0}")]
    Graph(#[from] GraphError),

    /// A data array does not match the number of roots.
    #[error("{what}: expected length {expected}, got {actual}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Component width must be at least one.
    #[error("component width must be positive")]
    ZeroWidth,

    /// An owner names a worker outside the group.
    #[error("rank {rank} is outside a group of {size}")]
    RankOutOfRange { rank: usize, size: usize },

    /// A message names a destination slot the receiver does not have.
    #[error("destination {index} is out of range for {ndests} destinations")]
    DestinationOutOfRange { index: usize, ndests: usize },

    /// Two roots wrote the same destination during a one-to-one exchange.
    #[error("destination {index} received more than one value")]
    DuplicateValue { index: usize },

    /// Some destinations received nothing during a one-to-one exchange.
    #[error("{missing} destination values were never received")]
    IncompleteExchange { missing: usize },
}
