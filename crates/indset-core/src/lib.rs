//! Distributed Independent-Set Selection
//!
//! Picks, over a partitioned mesh entity graph, a set of entities no two of
//! which are adjacent, as the basis of a local adaptation operation
//! (coarsening, refinement, swap).
//!
//! # Core Insight
//!
//! Priority is `(quality, global id)` compared lexicographically. Global
//! identifiers are unique, so every contest between neighbors has exactly
//! one winner, and the outcome depends only on the inputs, never on how
//! nodes are scheduled or how the graph is partitioned.
//!
//! # Rounds
//!
//! 1. Every worker evaluates its undecided nodes in parallel against the
//!    previous round's states ([`local_round`])
//! 2. Owners' results overwrite every copy ([`synchronized_round`])
//! 3. A MAX all-reduce over the state encoding decides whether anyone is
//!    still undecided ([`find`])
//!
//! # Example
//!
//! ```rust
//! use indset_core::{find_indset, EntityMesh, SelectionConfig};
//! use indset_dist::SelfComm;
//! use indset_graph::Graph;
//!
//! let star = Graph::from_edges(5, &[(0, 1), (1, 2), (2, 3), (3, 4)])?;
//! let mesh = EntityMesh::local(SelfComm, 0, star, vec![0, 1, 2, 3, 4])?;
//! let selection = find_indset(&mesh, 0, &[1.0; 5], &[true; 5], &SelectionConfig::default())?;
//! assert_eq!(selection.selected(), vec![0, 2, 4]);
//! # Ok::<(), indset_core::Error>(())
//! ```

mod config;
mod driver;
mod error;
mod mesh;
mod round;
mod state;
mod verify;

pub use config::SelectionConfig;
pub use driver::{find, initial_state, Selection};
pub use error::{Error, Result};
pub use mesh::{find_indset, EntityMesh, MeshProvider};
pub use round::{local_round, synchronized_round, PriorityGraph};
pub use state::{Decision, NodeState};
pub use verify::{verify_independent_set, Violation};

#[cfg(test)]
mod tests {
    use super::*;
    use indset_dist::{Dist, SelfComm};
    use indset_graph::Graph;

    #[test]
    fn pair_scenario_through_public_api() {
        let g = Graph::from_edges(2, &[(0, 1)]).unwrap();
        let dist = Dist::serial(SelfComm, 2);
        let sel = find(&dist, &g, &[1.0, 2.0], &[5, 3], &[true, true], &SelectionConfig::default()).unwrap();
        assert_eq!(sel.decisions(), &[Decision::Rejected, Decision::Selected]);
        assert_eq!(verify_independent_set(&g, &[true, true], sel.decisions()), Ok(()));
    }
}
