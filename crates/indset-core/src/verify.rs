//! Post-hoc checks of a converged selection.

use indset_graph::Graph;
use thiserror::Error;

use crate::state::Decision;

/// A way a set of decisions fails to be a maximal independent set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("{what}: expected {expected} entries, got {actual}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("node {node} was selected without being a candidate")]
    NonCandidateSelected { node: usize },

    #[error("adjacent nodes {a} and {b} are both selected")]
    AdjacentSelected { a: usize, b: usize },

    #[error("candidate {node} was rejected with no selected neighbor")]
    Undominated { node: usize },
}

/// Check independence and domination over a whole graph.
///
/// Only meaningful where `graph` holds each node's full neighborhood; on a
/// partition, boundary copies may lack the neighbor that rejected them.
pub fn verify_independent_set(
    graph: &Graph,
    candidates: &[bool],
    decisions: &[Decision],
) -> Result<(), Violation> {
    let n = graph.nnodes();
    for (what, actual) in [("candidates", candidates.len()), ("decisions", decisions.len())] {
        if actual != n {
            return Err(Violation::LengthMismatch {
                what,
                expected: n,
                actual,
            });
        }
    }
    for (v, decision) in decisions.iter().enumerate() {
        let neighbors = graph.neighbors(v);
        match decision {
            Decision::Selected => {
                if !candidates[v] {
                    return Err(Violation::NonCandidateSelected { node: v });
                }
                if let Some(&u) = neighbors
                    .iter()
                    .find(|&&u| u != v && decisions[u].is_selected())
                {
                    return Err(Violation::AdjacentSelected { a: v, b: u });
                }
            }
            Decision::Rejected => {
                if candidates[v] && !neighbors.iter().any(|&u| decisions[u].is_selected()) {
                    return Err(Violation::Undominated { node: v });
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Decision::{Rejected, Selected};

    fn triangle() -> Graph {
        Graph::from_edges(3, &[(0, 1), (1, 2), (2, 0)]).unwrap()
    }

    #[test]
    fn accepts_valid_selection() {
        let g = triangle();
        assert_eq!(verify_independent_set(&g, &[true; 3], &[Selected, Rejected, Rejected]), Ok(()));
    }

    #[test]
    fn detects_each_violation() {
        let g = triangle();
        assert_eq!(
            verify_independent_set(&g, &[true; 3], &[Selected, Selected, Rejected]),
            Err(Violation::AdjacentSelected { a: 0, b: 1 })
        );
        assert_eq!(
            verify_independent_set(&g, &[true; 3], &[Rejected; 3]),
            Err(Violation::Undominated { node: 0 })
        );
        assert_eq!(
            verify_independent_set(&g, &[false, true, true], &[Selected, Rejected, Rejected]),
            Err(Violation::NonCandidateSelected { node: 0 })
        );
    }

    #[test]
    fn mismatched_lengths_are_reported() {
        let path = Graph::from_edges(3, &[(0, 1), (1, 2)]).unwrap();
        assert_eq!(
            verify_independent_set(&path, &[true], &[Selected, Rejected, Selected]),
            Err(Violation::LengthMismatch {
                what: "candidates",
                expected: 3,
                actual: 1
            })
        );
        assert_eq!(
            verify_independent_set(&path, &[true; 3], &[Selected]),
            Err(Violation::LengthMismatch {
                what: "decisions",
                expected: 3,
                actual: 1
            })
        );
    }

    #[test]
    fn rejected_non_candidates_need_no_witness() {
        let g = Graph::empty(2);
        assert_eq!(verify_independent_set(&g, &[false, true], &[Rejected, Selected]), Ok(()));
    }
}
