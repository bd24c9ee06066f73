//! Compressed sparse-row adjacency.
//!
//! A graph over `n` local nodes is two arrays:
//! - `offsets` of length `n + 1`, non-decreasing, starting at 0
//! - `targets` holding the neighbors of node `v` at `offsets[v]..offsets[v + 1]`
//!
//! The structure is immutable once built. It does not symmetrize: an edge
//! stored only as `a -> b` is only visible from `a`.

use crate::error::{GraphError, Result};
use crate::map::check_offsets;

/// An immutable CSR graph over local node indices.
///
/// Deserialization goes through [`Graph::new`], so a malformed payload is
/// refused instead of yielding a graph that panics on access.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawGraph"))]
pub struct Graph {
    offsets: Vec<usize>,
    targets: Vec<usize>,
}

/// Unvalidated wire form of a [`Graph`].
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawGraph {
    offsets: Vec<usize>,
    targets: Vec<usize>,
}

#[cfg(feature = "serde")]
impl TryFrom<RawGraph> for Graph {
    type Error = GraphError;

    fn try_from(raw: RawGraph) -> Result<Self> {
        Self::new(raw.offsets, raw.targets)
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::empty(0)
    }
}

impl Graph {
    /// Build a graph from raw CSR arrays, validating every invariant.
    pub fn new(offsets: Vec<usize>, targets: Vec<usize>) -> Result<Self> {
        check_offsets(&offsets, targets.len())?;
        let nnodes = offsets.len() - 1;
        if let Some((position, &target)) = targets.iter().enumerate().find(|(_, &t)| t >= nnodes) {
            return Err(GraphError::TargetOutOfRange {
                position,
                target,
                nnodes,
            });
        }
        Ok(Self { offsets, targets })
    }

    /// A graph with `n` nodes and no edges.
    pub fn empty(n: usize) -> Self {
        Self {
            offsets: vec![0; n + 1],
            targets: Vec::new(),
        }
    }

    /// Build a symmetric graph from an undirected edge list.
    ///
    /// Each `(a, b)` is stored as both `a -> b` and `b -> a`. Neighbor lists
    /// come out sorted. Self-loops are stored once.
    pub fn from_edges(n: usize, edges: &[(usize, usize)]) -> Result<Self> {
        let mut lists: Vec<Vec<usize>> = vec![Vec::new(); n];
        for (index, &(a, b)) in edges.iter().enumerate() {
            for v in [a, b] {
                if v >= n {
                    return Err(GraphError::MapOutOfRange {
                        index,
                        value: v,
                        range: n,
                    });
                }
            }
            lists[a].push(b);
            if a != b {
                lists[b].push(a);
            }
        }
        Ok(Self::from_lists(lists))
    }

    /// Build a graph from per-node neighbor lists, sorting and deduplicating
    /// each list.
    ///
    /// Callers must keep every entry below `lists.len()`.
    pub(crate) fn from_lists(mut lists: Vec<Vec<usize>>) -> Self {
        let mut offsets = Vec::with_capacity(lists.len() + 1);
        offsets.push(0);
        let mut targets = Vec::new();
        for list in &mut lists {
            list.sort_unstable();
            list.dedup();
            targets.extend_from_slice(list);
            offsets.push(targets.len());
        }
        Self { offsets, targets }
    }

    /// Skip validation for arrays produced by this crate's own algorithms.
    pub(crate) fn from_parts_unchecked(offsets: Vec<usize>, targets: Vec<usize>) -> Self {
        debug_assert!(Self::new(offsets.clone(), targets.clone()).is_ok());
        Self { offsets, targets }
    }

    /// Number of nodes.
    #[inline]
    pub fn nnodes(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Number of stored (directed) edges.
    #[inline]
    pub fn nedges(&self) -> usize {
        self.targets.len()
    }

    /// Neighbors of `v`.
    ///
    /// # Panics
    ///
    /// Panics if `v >= nnodes()`.
    #[inline]
    pub fn neighbors(&self, v: usize) -> &[usize] {
        &self.targets[self.offsets[v]..self.offsets[v + 1]]
    }

    /// Number of neighbors of `v`.
    #[inline]
    pub fn degree(&self, v: usize) -> usize {
        self.offsets[v + 1] - self.offsets[v]
    }

    /// The offsets array (`nnodes() + 1` entries).
    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// The flattened neighbor array.
    pub fn targets(&self) -> &[usize] {
        &self.targets
    }

    /// Consume the graph, returning `(offsets, targets)`.
    pub fn into_parts(self) -> (Vec<usize>, Vec<usize>) {
        (self.offsets, self.targets)
    }

    /// Whether every stored edge `a -> b` has a matching `b -> a`.
    pub fn is_symmetric(&self) -> bool {
        (0..self.nnodes()).all(|a| {
            self.neighbors(a)
                .iter()
                .all(|&b| self.neighbors(b).contains(&a))
        })
    }
}
