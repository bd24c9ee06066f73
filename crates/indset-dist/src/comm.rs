//! Blocking collective communication.
//!
//! Every method of [`Comm`] is a collective: all workers of a group must
//! call the same methods in the same order, and each call returns only
//! once every worker has reached it. There is no timeout and no partial
//! progress; a worker that never arrives stalls the whole group.

use indset_graph::{ReduceOp, Reducible};

use crate::error::CommError;

/// A handle on one worker's membership in a synchronous worker group.
pub trait Comm: Clone + Send + Sync {
    /// This worker's index in `[0, size())`.
    fn rank(&self) -> usize;

    /// Number of workers in the group.
    fn size(&self) -> usize;

    /// Wait until every worker has arrived.
    fn barrier(&self) -> Result<(), CommError>;

    /// Combine one value from every worker; all workers get the result.
    fn allreduce<T: Reducible>(&self, value: T, op: ReduceOp) -> Result<T, CommError>;

    /// All-to-all exchange.
    ///
    /// `outgoing[r]` is delivered to worker `r`. The result holds, at index
    /// `s`, the batch worker `s` addressed to this worker.
    fn exchange<T: Send + 'static>(&self, outgoing: Vec<Vec<T>>) -> Result<Vec<Vec<T>>, CommError>;
}

/// The trivial group of one worker.
#[derive(Debug, Clone, Copy, Default)]
pub struct SelfComm;

impl Comm for SelfComm {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn barrier(&self) -> Result<(), CommError> {
        Ok(())
    }

    fn allreduce<T: Reducible>(&self, value: T, op: ReduceOp) -> Result<T, CommError> {
        Ok(T::identity(op).combine(value, op))
    }

    fn exchange<T: Send + 'static>(&self, outgoing: Vec<Vec<T>>) -> Result<Vec<Vec<T>>, CommError> {
        if outgoing.len() != 1 {
            return Err(CommError::WrongFanout {
                expected: 1,
                actual: outgoing.len(),
            });
        }
        Ok(outgoing)
    }
}
