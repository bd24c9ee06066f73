//! Owner/copy distribution of entities across a worker group.
//!
//! A [`Dist`] is a three-level map: local *roots* fan out to *items*, and
//! each item names a *destination* slot on some worker. Two directions
//! matter for mesh entities:
//!
//! - copies → owners: every local entity is a root with exactly one item,
//!   pointing at the owner's slot for the same entity
//!   ([`Dist::from_owners`])
//! - owners → copies: the inverse; an owned entity fans out to every copy,
//!   itself included, and a non-owned entity fans out to nothing
//!   ([`Dist::invert`])
//!
//! Exchanging along owners → copies is how an owner's value reaches every
//! replica of the entity.

use indset_graph::{invert_map_by_sorting, ReduceOp, Reducible};
use tracing::trace;

use crate::comm::Comm;
use crate::error::{DistError, Result};

/// A slot on a specific worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Remote {
    /// Worker holding the slot
    pub rank: usize,
    /// Local index on that worker
    pub index: usize,
}

impl Remote {
    /// Create a new remote slot reference.
    pub const fn new(rank: usize, index: usize) -> Self {
        Self { rank, index }
    }
}

/// Mark the entities this worker owns.
pub fn owned_marks(owners: &[Remote], rank: usize) -> Vec<bool> {
    owners.iter().map(|o| o.rank == rank).collect()
}

/// A roots → items → destinations map bound to a worker group.
#[derive(Debug, Clone)]
pub struct Dist<C: Comm> {
    comm: C,
    /// Offsets grouping items by root; `None` means one item per root.
    roots2items: Option<Vec<usize>>,
    items2dests: Vec<Remote>,
    ndests: usize,
}

impl<C: Comm> Dist<C> {
    /// The copies → owners distribution of this worker's entities.
    ///
    /// `owners[i]` is the owning slot of local entity `i`. Every worker's
    /// entity count doubles as its destination count, since owners are
    /// local entities too.
    pub fn from_owners(comm: C, owners: Vec<Remote>) -> Result<Self> {
        let size = comm.size();
        if let Some(bad) = owners.iter().find(|o| o.rank >= size) {
            return Err(DistError::RankOutOfRange {
                rank: bad.rank,
                size,
            });
        }
        let ndests = owners.len();
        Ok(Self {
            comm,
            roots2items: None,
            items2dests: owners,
            ndests,
        })
    }

    /// A distribution where every entity is owned locally and has no copies.
    pub fn serial(comm: C, n: usize) -> Self {
        let rank = comm.rank();
        Self {
            comm,
            roots2items: None,
            items2dests: (0..n).map(|i| Remote::new(rank, i)).collect(),
            ndests: n,
        }
    }

    /// The group this distribution exchanges over.
    pub fn parent_comm(&self) -> &C {
        &self.comm
    }

    /// Number of local roots (length of arrays passed to `exch`).
    pub fn nroots(&self) -> usize {
        match &self.roots2items {
            Some(offsets) => offsets.len() - 1,
            None => self.items2dests.len(),
        }
    }

    /// Number of local destination slots (length of arrays `exch` returns).
    pub fn ndests(&self) -> usize {
        self.ndests
    }

    /// Where each item is sent.
    pub fn dests(&self) -> &[Remote] {
        &self.items2dests
    }

    fn items_of(&self, root: usize) -> std::ops::Range<usize> {
        match &self.roots2items {
            Some(offsets) => offsets[root]..offsets[root + 1],
            None => root..root + 1,
        }
    }

    /// Reverse the direction of the map (collective).
    ///
    /// Items of the result are ordered per root by (sending rank, sending
    /// root), so the outcome does not depend on thread timing.
    pub fn invert(&self) -> Result<Self> {
        let size = self.comm.size();
        let rank = self.comm.rank();
        let mut outgoing: Vec<Vec<(usize, Remote)>> = vec![Vec::new(); size];
        for root in 0..self.nroots() {
            for item in self.items_of(root) {
                let dest = self.items2dests[item];
                outgoing[dest.rank].push((dest.index, Remote::new(rank, root)));
            }
        }

        let received: Vec<(usize, Remote)> = self
            .comm
            .exchange(outgoing)?
            .into_iter()
            .flatten()
            .collect();
        let received_roots: Vec<usize> = received.iter().map(|&(index, _)| index).collect();
        if let Some(&index) = received_roots.iter().find(|&&i| i >= self.ndests) {
            return Err(DistError::DestinationOutOfRange {
                index,
                ndests: self.ndests,
            });
        }

        let fans = invert_map_by_sorting(&received_roots, self.ndests)?;
        let items2dests = fans.targets().iter().map(|&i| received[i].1).collect();
        let (offsets, _) = fans.into_parts();
        trace!(rank, roots = self.ndests, items = received.len(), "inverted dist");
        Ok(Self {
            comm: self.comm.clone(),
            roots2items: Some(offsets),
            items2dests,
            ndests: self.nroots(),
        })
    }

    fn send<T: Copy + Send + 'static>(&self, data: &[T], width: usize) -> Result<Vec<(usize, T)>> {
        if width == 0 {
            return Err(DistError::ZeroWidth);
        }
        let expected = self.nroots() * width;
        if data.len() != expected {
            return Err(DistError::LengthMismatch {
                what: "exchange data",
                expected,
                actual: data.len(),
            });
        }
        let mut outgoing: Vec<Vec<(usize, T)>> = vec![Vec::new(); self.comm.size()];
        for root in 0..self.nroots() {
            for item in self.items_of(root) {
                let dest = self.items2dests[item];
                for k in 0..width {
                    outgoing[dest.rank].push((dest.index * width + k, data[root * width + k]));
                }
            }
        }
        let received: Vec<(usize, T)> = self.comm.exchange(outgoing)?.into_iter().flatten().collect();
        let slots = self.ndests * width;
        if let Some(&(slot, _)) = received.iter().find(|(slot, _)| *slot >= slots) {
            return Err(DistError::DestinationOutOfRange {
                index: slot / width,
                ndests: self.ndests,
            });
        }
        Ok(received)
    }

    /// Send each root's `width` components to all of its destinations (collective).
    ///
    /// Every destination must receive exactly one value per component.
    pub fn exch<T: Copy + Send + 'static>(&self, data: &[T], width: usize) -> Result<Vec<T>> {
        let received = self.send(data, width)?;
        let mut out: Vec<Option<T>> = vec![None; self.ndests * width];
        for (slot, value) in received {
            if out[slot].replace(value).is_some() {
                return Err(DistError::DuplicateValue {
                    index: slot / width,
                });
            }
        }
        let missing = out.iter().filter(|v| v.is_none()).count();
        if missing > 0 {
            return Err(DistError::IncompleteExchange { missing });
        }
        Ok(out.into_iter().flatten().collect())
    }

    /// Send along the map and combine everything arriving at a destination (collective).
    ///
    /// Destinations that receive nothing hold the identity of `op`.
    pub fn exch_reduce<T: Reducible>(&self, data: &[T], width: usize, op: ReduceOp) -> Result<Vec<T>> {
        let received = self.send(data, width)?;
        let mut out = vec![T::identity(op); self.ndests * width];
        for (slot, value) in received {
            out[slot] = out[slot].combine(value, op);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::SelfComm;
    use crate::group::ThreadGroup;

    /// Two workers share entity "B":
    /// - worker 0 holds [A, B], owns both
    /// - worker 1 holds [B, C], owns C; its B is a copy of worker 0's index 1
    fn owners_for(rank: usize) -> Vec<Remote> {
        match rank {
            0 => vec![Remote::new(0, 0), Remote::new(0, 1)],
            _ => vec![Remote::new(0, 1), Remote::new(1, 1)],
        }
    }

    #[test]
    fn test_serial_exchange_is_identity() {
        let dist = Dist::serial(SelfComm, 3);
        let out = dist.exch(&[1.0, 2.0, 3.0], 1).unwrap();
        assert_eq!(out, vec![1.0, 2.0, 3.0]);
        let inverted = dist.invert().unwrap();
        assert_eq!(inverted.exch(&[4, 5, 6], 1).unwrap(), vec![4, 5, 6]);
    }

    #[test]
    fn test_exchange_checks_lengths() {
        let dist = Dist::serial(SelfComm, 2);
        assert!(matches!(
            dist.exch(&[1, 2, 3], 1),
            Err(DistError::LengthMismatch { expected: 2, actual: 3, .. })
        ));
        assert_eq!(dist.exch(&[1, 2], 0), Err(DistError::ZeroWidth));
    }

    #[test]
    fn test_from_owners_rejects_unknown_rank() {
        let result = Dist::from_owners(SelfComm, vec![Remote::new(1, 0)]);
        assert!(matches!(result, Err(DistError::RankOutOfRange { rank: 1, size: 1 })));
    }

    #[test]
    fn test_owned_marks() {
        assert_eq!(owned_marks(&owners_for(1), 1), vec![false, true]);
        assert_eq!(owned_marks(&owners_for(0), 0), vec![true, true]);
    }

    #[test]
    fn test_owner_value_reaches_copies() {
        let results = ThreadGroup::run(2, |comm| {
            let rank = comm.rank();
            let copies2owners = Dist::from_owners(comm, owners_for(rank)).unwrap();
            let owners2copies = copies2owners.invert().unwrap();
            assert_eq!(owners2copies.nroots(), 2);
            assert_eq!(owners2copies.ndests(), 2);
            // Each worker writes its own rank; only owners' writes survive.
            let data = vec![rank as i32 * 100, rank as i32 * 100 + 1];
            owners2copies.exch(&data, 1).unwrap()
        });
        assert_eq!(results[0], vec![0, 1]);
        // B comes from worker 0 slot 1, C is worker 1's own value
        assert_eq!(results[1], vec![1, 101]);
    }

    #[test]
    fn test_exchange_with_width() {
        let results = ThreadGroup::run(2, |comm| {
            let rank = comm.rank();
            let owners2copies = Dist::from_owners(comm, owners_for(rank))
                .unwrap()
                .invert()
                .unwrap();
            let data: Vec<u64> = (0..4).map(|k| (rank * 10 + k) as u64).collect();
            owners2copies.exch(&data, 2).unwrap()
        });
        assert_eq!(results[1], vec![2, 3, 12, 13]);
    }

    #[test]
    fn test_copies_reduce_to_owner() {
        let results = ThreadGroup::run(2, |comm| {
            let rank = comm.rank();
            let copies2owners = Dist::from_owners(comm, owners_for(rank)).unwrap();
            copies2owners.exch_reduce(&[1usize, 1], 1, ReduceOp::Sum).unwrap()
        });
        // Worker 0 owns A (1 copy) and B (2 copies)
        assert_eq!(results[0], vec![1, 2]);
        // Worker 1 owns C only; its B slot receives nothing
        assert_eq!(results[1], vec![0, 1]);
    }

    #[test]
    fn test_one_to_one_exchange_rejects_fan_in() {
        let results = ThreadGroup::run(2, |comm| {
            let rank = comm.rank();
            let copies2owners = Dist::from_owners(comm, owners_for(rank)).unwrap();
            copies2owners.exch(&[0u8, 0], 1)
        });
        assert_eq!(results[0], Err(DistError::DuplicateValue { index: 1 }));
        assert_eq!(results[1], Err(DistError::IncompleteExchange { missing: 1 }));
    }
}
