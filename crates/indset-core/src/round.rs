//! One round of priority-driven selection.
//!
//! # Local Round
//!
//! Every undecided node looks at the previous round's states of its
//! neighbors, independently of every other node:
//!
//! 1. **Domination**: a selected neighbor rejects the node.
//! 2. **Local maximum**: ignoring rejected neighbors, if no neighbor
//!    outranks the node it is selected; otherwise it waits.
//!
//! Nodes that already decided keep their state. Each round writes a fresh
//! array and only reads the previous one, so nodes can be evaluated in any
//! order or all at once.
//!
//! # Priority
//!
//! `u` outranks `v` when `(quality[u], global[u]) > (quality[v], global[v])`
//! lexicographically. Global identifiers are unique, so two distinct nodes
//! never tie.
//!
//! # Synchronized Round
//!
//! After the local round the owners' results are exchanged to every copy,
//! so all workers agree on boundary decisions before the next round reads
//! them.

use indset_dist::{Comm, Dist};
use indset_graph::Graph;
use rayon::prelude::*;
use tracing::trace;

use crate::error::{Error, Result};
use crate::state::NodeState;

/// A graph together with the per-node priority inputs of one selection run.
#[derive(Debug, Clone, Copy)]
pub struct PriorityGraph<'a> {
    graph: &'a Graph,
    quality: &'a [f64],
    globals: &'a [u64],
}

impl<'a> PriorityGraph<'a> {
    /// Bind quality and global identifiers to a graph.
    ///
    /// Both arrays need one entry per node, no quality may be NaN, and no
    /// two adjacent nodes may share a global identifier.
    pub fn new(graph: &'a Graph, quality: &'a [f64], globals: &'a [u64]) -> Result<Self> {
        let n = graph.nnodes();
        check_len("quality", n, quality.len())?;
        check_len("global identifiers", n, globals.len())?;
        if let Some(node) = quality.iter().position(|q| q.is_nan()) {
            return Err(Error::NanQuality { node });
        }
        for a in 0..n {
            if let Some(&b) = graph
                .neighbors(a)
                .iter()
                .find(|&&b| b != a && globals[b] == globals[a])
            {
                return Err(Error::DuplicateGlobal {
                    a,
                    b,
                    global: globals[a],
                });
            }
        }
        Ok(Self {
            graph,
            quality,
            globals,
        })
    }

    /// Number of nodes.
    pub fn nnodes(&self) -> usize {
        self.graph.nnodes()
    }

    /// The underlying adjacency.
    pub fn graph(&self) -> &'a Graph {
        self.graph
    }

    /// Whether `u` has strictly higher priority than `v`.
    #[inline]
    pub fn outranks(&self, u: usize, v: usize) -> bool {
        let (qu, qv) = (self.quality[u], self.quality[v]);
        qu > qv || (qu == qv && self.globals[u] > self.globals[v])
    }

    /// The state node `v` moves to, given everyone's previous state.
    #[inline]
    pub fn next_state(&self, old_state: &[NodeState], v: usize) -> NodeState {
        if old_state[v].is_decided() {
            return old_state[v];
        }
        let neighbors = self.graph.neighbors(v);
        if neighbors.iter().any(|&u| old_state[u] == NodeState::Selected) {
            return NodeState::Rejected;
        }
        let outranked = neighbors
            .iter()
            .filter(|&&u| old_state[u] != NodeState::Rejected)
            .any(|&u| self.outranks(u, v));
        if outranked {
            NodeState::Undecided
        } else {
            NodeState::Selected
        }
    }
}

fn check_len(what: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(Error::LengthMismatch {
            what,
            expected,
            actual,
        })
    }
}

/// Compute every node's next state from the previous round's array.
pub fn local_round(
    priorities: &PriorityGraph<'_>,
    old_state: &[NodeState],
    parallel: bool,
) -> Result<Vec<NodeState>> {
    check_len("previous state", priorities.nnodes(), old_state.len())?;
    let n = priorities.nnodes();
    let next = if parallel {
        (0..n)
            .into_par_iter()
            .map(|v| priorities.next_state(old_state, v))
            .collect()
    } else {
        (0..n).map(|v| priorities.next_state(old_state, v)).collect()
    };
    Ok(next)
}

/// Run a local round, then let owners overwrite every copy (collective).
pub fn synchronized_round<C: Comm>(
    owners2copies: &Dist<C>,
    priorities: &PriorityGraph<'_>,
    old_state: &[NodeState],
    parallel: bool,
) -> Result<Vec<NodeState>> {
    let local = local_round(priorities, old_state, parallel)?;
    let synced = owners2copies.exch(&local, 1)?;
    trace!(
        rank = owners2copies.parent_comm().rank(),
        nodes = synced.len(),
        "synchronized round states"
    );
    Ok(synced)
}
