//! Shared-memory worker group for single-process deployments.
//!
//! `n` threads each hold a [`ThreadComm`]. Collectives rendezvous on one
//! barrier and pass type-erased payloads through a shared mailbox. Every
//! collective waits on the barrier twice: once after depositing, once
//! after collecting, so no worker can overwrite a slot a peer has not
//! read yet.
//!
//! # Failure
//!
//! A group is only as alive as its slowest member. Once any worker leaves
//! [`ThreadGroup::run`] (by returning or by panicking) or calls
//! [`ThreadComm::abort`], the group is closed: workers blocked in a
//! collective, and every later collective, fail with
//! [`CommError::Aborted`] instead of waiting forever.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread;

use indset_graph::{ReduceOp, Reducible};
use tracing::{trace, warn};

use crate::comm::Comm;
use crate::error::CommError;

type Payload = Box<dyn Any + Send>;

#[derive(Debug, Default)]
struct Rendezvous {
    arrived: usize,
    generation: u64,
    closed: bool,
}

/// A reusable barrier that can be released early by closing it.
#[derive(Debug)]
struct Barrier {
    size: usize,
    state: Mutex<Rendezvous>,
    released: Condvar,
}

impl Barrier {
    fn new(size: usize) -> Self {
        Self {
            size,
            state: Mutex::new(Rendezvous::default()),
            released: Condvar::new(),
        }
    }

    fn wait(&self) -> Result<(), CommError> {
        let mut state = self.state.lock().map_err(|_| CommError::Poisoned)?;
        if state.closed {
            return Err(CommError::Aborted);
        }
        state.arrived += 1;
        if state.arrived == self.size {
            state.arrived = 0;
            state.generation = state.generation.wrapping_add(1);
            self.released.notify_all();
            return Ok(());
        }
        let generation = state.generation;
        // A completed generation wins over a later close.
        while state.generation == generation {
            if state.closed {
                return Err(CommError::Aborted);
            }
            state = self.released.wait(state).map_err(|_| CommError::Poisoned)?;
        }
        Ok(())
    }

    fn close(&self) {
        let mut state = match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        state.closed = true;
        self.released.notify_all();
    }
}

#[derive(Debug)]
struct Shared {
    size: usize,
    barrier: Barrier,
    /// One slot per worker, for all-reduce contributions.
    slots: Mutex<Vec<Option<Payload>>>,
    /// `size * size` slots, indexed `src * size + dst`.
    mailbox: Mutex<Vec<Option<Payload>>>,
}

impl Shared {
    fn slots(&self) -> Result<MutexGuard<'_, Vec<Option<Payload>>>, CommError> {
        self.slots.lock().map_err(|_| CommError::Poisoned)
    }

    fn mailbox(&self) -> Result<MutexGuard<'_, Vec<Option<Payload>>>, CommError> {
        self.mailbox.lock().map_err(|_| CommError::Poisoned)
    }
}

/// Builds the handles of an in-process worker group.
#[derive(Debug)]
pub struct ThreadGroup;

impl ThreadGroup {
    /// Create `size` connected handles, one per worker, in rank order.
    ///
    /// Callers driving their own threads should [`ThreadComm::abort`] a
    /// handle whose worker gives up early.
    #[must_use]
    pub fn new(size: usize) -> Vec<ThreadComm> {
        let shared = Arc::new(Shared {
            size,
            barrier: Barrier::new(size.max(1)),
            slots: Mutex::new((0..size).map(|_| None).collect()),
            mailbox: Mutex::new((0..size * size).map(|_| None).collect()),
        });
        (0..size)
            .map(|rank| ThreadComm {
                rank,
                shared: Arc::clone(&shared),
            })
            .collect()
    }

    /// Run `worker` on `size` scoped threads and collect results in rank order.
    ///
    /// A worker that returns or panics closes the group on its way out, so
    /// peers still waiting on it get [`CommError::Aborted`]. A panic on any
    /// worker is re-raised on the caller once all threads have been joined.
    pub fn run<F, R>(size: usize, worker: F) -> Vec<R>
    where
        F: Fn(ThreadComm) -> R + Sync,
        R: Send,
    {
        let comms = Self::new(size);
        let worker = &worker;
        thread::scope(|scope| {
            let handles: Vec<_> = comms
                .into_iter()
                .map(|comm| {
                    scope.spawn(move || {
                        let shared = Arc::clone(&comm.shared);
                        let rank = comm.rank;
                        let outcome = panic::catch_unwind(AssertUnwindSafe(|| worker(comm)));
                        if outcome.is_err() {
                            warn!(rank, "worker panicked, closing group");
                        }
                        shared.barrier.close();
                        outcome
                    })
                })
                .collect();
            let outcomes: Vec<_> = handles
                .into_iter()
                .map(|h| h.join().unwrap_or_else(Err))
                .collect();
            outcomes
                .into_iter()
                .map(|outcome| outcome.unwrap_or_else(|payload| panic::resume_unwind(payload)))
                .collect()
        })
    }
}

/// One worker's handle on a [`ThreadGroup`].
#[derive(Debug, Clone)]
pub struct ThreadComm {
    rank: usize,
    shared: Arc<Shared>,
}

impl ThreadComm {
    /// Close the group: every pending and future collective of every
    /// worker fails with [`CommError::Aborted`].
    pub fn abort(&self) {
        self.shared.barrier.close();
    }

    fn fail(&self, err: CommError) -> CommError {
        self.abort();
        err
    }
}

impl Comm for ThreadComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.shared.size
    }

    fn barrier(&self) -> Result<(), CommError> {
        self.shared.barrier.wait()
    }

    fn allreduce<T: Reducible>(&self, value: T, op: ReduceOp) -> Result<T, CommError> {
        self.shared.slots().map_err(|e| self.fail(e))?[self.rank] = Some(Box::new(value));
        self.shared.barrier.wait()?;

        let result = self.shared.slots().and_then(|slots| {
            slots
                .iter()
                .enumerate()
                .try_fold(T::identity(op), |acc, (from, slot)| {
                    let payload = slot
                        .as_ref()
                        .ok_or(CommError::MissingContribution { from })?;
                    let v = payload
                        .downcast_ref::<T>()
                        .ok_or(CommError::PayloadMismatch { from })?;
                    Ok(acc.combine(*v, op))
                })
        });

        self.shared.barrier.wait()?;
        result
    }

    fn exchange<T: Send + 'static>(&self, outgoing: Vec<Vec<T>>) -> Result<Vec<Vec<T>>, CommError> {
        let size = self.shared.size;
        // A wrong fanout still has to reach both barriers, or peers hang.
        let fanout = if outgoing.len() == size {
            Ok(())
        } else {
            Err(CommError::WrongFanout {
                expected: size,
                actual: outgoing.len(),
            })
        };

        if fanout.is_ok() {
            let mut mailbox = self.shared.mailbox().map_err(|e| self.fail(e))?;
            for (dst, batch) in outgoing.into_iter().enumerate() {
                trace!(src = self.rank, dst, len = batch.len(), "deposit batch");
                mailbox[self.rank * size + dst] = Some(Box::new(batch));
            }
        }
        self.shared.barrier.wait()?;

        let incoming = fanout.and_then(|()| {
            let mut mailbox = self.shared.mailbox()?;
            (0..size)
                .map(|from| {
                    let payload = mailbox[from * size + self.rank]
                        .take()
                        .ok_or(CommError::MissingContribution { from })?;
                    payload
                        .downcast::<Vec<T>>()
                        .map(|batch| *batch)
                        .map_err(|_| CommError::PayloadMismatch { from })
                })
                .collect::<Result<Vec<_>, _>>()
        });

        self.shared.barrier.wait()?;
        incoming
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_ranks() {
        let comms = ThreadGroup::new(3);
        let ranks: Vec<_> = comms.iter().map(Comm::rank).collect();
        assert_eq!(ranks, vec![0, 1, 2]);
        assert!(comms.iter().all(|c| c.size() == 3));
    }

    #[test]
    fn test_allreduce_across_threads() {
        let results = ThreadGroup::run(4, |comm| {
            let max = comm.allreduce(comm.rank() as i64, ReduceOp::Max).unwrap();
            let sum = comm.allreduce(comm.rank(), ReduceOp::Sum).unwrap();
            let min = comm.allreduce(10.0 - comm.rank() as f64, ReduceOp::Min).unwrap();
            (max, sum, min)
        });
        assert!(results.iter().all(|&r| r == (3, 6, 7.0)));
    }

    #[test]
    fn test_repeated_collectives_do_not_interfere() {
        let results = ThreadGroup::run(3, |comm| {
            (0..20)
                .map(|round| {
                    comm.allreduce(round * 10 + comm.rank(), ReduceOp::Max)
                        .unwrap()
                })
                .collect::<Vec<_>>()
        });
        let expected: Vec<usize> = (0..20).map(|round| round * 10 + 2).collect();
        assert!(results.iter().all(|r| *r == expected));
    }

    #[test]
    fn test_exchange_all_to_all() {
        let results = ThreadGroup::run(3, |comm| {
            let outgoing = (0..comm.size())
                .map(|dst| vec![(comm.rank(), dst)])
                .collect();
            comm.exchange(outgoing).unwrap()
        });
        for (rank, incoming) in results.iter().enumerate() {
            let expected: Vec<Vec<(usize, usize)>> =
                (0..3).map(|src| vec![(src, rank)]).collect();
            assert_eq!(*incoming, expected);
        }
    }

    #[test]
    fn test_exchange_type_mismatch_is_reported() {
        let results = ThreadGroup::run(2, |comm| {
            if comm.rank() == 0 {
                comm.exchange(vec![vec![1u32], vec![2u32]]).map(|_| ())
            } else {
                comm.exchange(vec![vec![1u8], vec![2u8]]).map(|_| ())
            }
        });
        assert_eq!(results[0], Err(CommError::PayloadMismatch { from: 1 }));
        assert_eq!(results[1], Err(CommError::PayloadMismatch { from: 0 }));
    }

    #[test]
    fn test_worker_leaving_early_releases_peers() {
        let results = ThreadGroup::run(3, |comm| {
            if comm.rank() == 2 {
                return Ok(0);
            }
            comm.allreduce(comm.rank(), ReduceOp::Sum)
        });
        assert_eq!(results[0], Err(CommError::Aborted));
        assert_eq!(results[1], Err(CommError::Aborted));
        assert_eq!(results[2], Ok(0));
    }

    #[test]
    fn test_worker_panic_is_reraised_without_hanging() {
        let outcome = std::panic::catch_unwind(|| {
            ThreadGroup::run(2, |comm| {
                if comm.rank() == 0 {
                    panic!("worker 0 failed");
                }
                comm.exchange(vec![vec![1u8], vec![2u8]]).map(|_| ())
            })
        });
        assert!(outcome.is_err());
    }

    #[test]
    fn test_abort_fails_later_collectives() {
        let results = ThreadGroup::run(2, |comm| {
            comm.barrier()?;
            if comm.rank() == 1 {
                comm.abort();
            }
            comm.barrier()
        });
        // Rank 0 may reach the second barrier first or second; either way it
        // is released with an error.
        assert!(results.iter().all(|r| *r == Err(CommError::Aborted)));
    }

    #[test]
    fn test_normal_completion_is_not_an_abort() {
        let results = ThreadGroup::run(4, |comm| {
            let total = comm.allreduce(1usize, ReduceOp::Sum)?;
            comm.barrier()?;
            Ok::<_, CommError>(total)
        });
        assert!(results.iter().all(|r| *r == Ok(4)));
    }

    #[test]
    fn test_exchange_wrong_fanout_does_not_hang() {
        let results = ThreadGroup::run(2, |comm| {
            let outgoing: Vec<Vec<u8>> = if comm.rank() == 0 {
                vec![vec![]]
            } else {
                vec![vec![], vec![]]
            };
            comm.exchange(outgoing).map(|_| ())
        });
        assert_eq!(results[0], Err(CommError::WrongFanout { expected: 2, actual: 1 }));
        assert_eq!(results[1], Err(CommError::MissingContribution { from: 0 }));
    }
}
