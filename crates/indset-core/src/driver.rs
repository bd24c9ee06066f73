//! Convergence driver: synchronized rounds until nothing is undecided.
//!
//! # Termination
//!
//! Priority is a strict total order over candidates, so in every round the
//! highest-priority undecided node of the whole group either has a selected
//! neighbor (and is rejected) or outranks all its contenders (and is
//! selected). The undecided count therefore drops every round, and the run
//! takes at most as many rounds as there are candidates.

use indset_dist::{Comm, Dist, ReduceOp, Reducible};
use indset_graph::Graph;
use tracing::{debug, info, warn};

use crate::config::SelectionConfig;
use crate::error::{Error, Result};
use crate::round::{synchronized_round, PriorityGraph};
use crate::state::{Decision, NodeState};

/// The converged outcome of one selection run on one worker.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Selection {
    decisions: Vec<Decision>,
    rounds: usize,
}

impl Selection {
    /// Per-node decisions, indexed like the input graph.
    pub fn decisions(&self) -> &[Decision] {
        &self.decisions
    }

    /// Synchronized rounds the group needed.
    pub fn rounds(&self) -> usize {
        self.rounds
    }

    /// Whether local node `v` was selected.
    pub fn is_selected(&self, v: usize) -> bool {
        self.decisions[v].is_selected()
    }

    /// Local indices of the selected nodes, in increasing order.
    pub fn selected(&self) -> Vec<usize> {
        self.decisions
            .iter()
            .enumerate()
            .filter_map(|(v, d)| d.is_selected().then_some(v))
            .collect()
    }

    /// Number of selected local nodes (copies included).
    pub fn count_selected(&self) -> usize {
        self.decisions.iter().filter(|d| d.is_selected()).count()
    }

    /// Selected marks, usable as candidates for a follow-up run.
    pub fn selected_marks(&self) -> Vec<bool> {
        self.decisions.iter().map(|d| d.is_selected()).collect()
    }

    /// Consume the selection, keeping only the decisions.
    pub fn into_decisions(self) -> Vec<Decision> {
        self.decisions
    }
}

/// Undecided for candidates, rejected for everything else.
pub fn initial_state(candidates: &[bool]) -> Vec<NodeState> {
    candidates.iter().map(|&c| NodeState::initial(c)).collect()
}

fn max_code(state: &[NodeState]) -> i8 {
    i8::reduce_all(state.iter().map(|s| s.code()), ReduceOp::Max)
}

fn count_undecided(state: &[NodeState]) -> usize {
    state.iter().filter(|s| !s.is_decided()).count()
}

/// Turn one worker's verdict into the group's (collective).
///
/// If any worker failed, every worker gets `Err`: its own error where it
/// had one, [`Error::PeerFailed`] elsewhere.
pub(crate) fn agree<C: Comm, T>(comm: &C, local: Result<T>) -> Result<T> {
    let failed = comm.allreduce(i8::from(local.is_err()), ReduceOp::Max)?;
    if let Err(err) = &local {
        warn!(rank = comm.rank(), error = %err, "rejecting selection inputs");
    }
    let value = local?;
    if failed != 0 {
        return Err(Error::PeerFailed);
    }
    Ok(value)
}

fn check_inputs<'a, C: Comm>(
    owners2copies: &Dist<C>,
    graph: &'a Graph,
    quality: &'a [f64],
    globals: &'a [u64],
    candidates: &[bool],
) -> Result<PriorityGraph<'a>> {
    let priorities = PriorityGraph::new(graph, quality, globals)?;
    let n = graph.nnodes();
    for (what, actual) in [
        ("candidates", candidates.len()),
        ("distribution roots", owners2copies.nroots()),
        ("distribution destinations", owners2copies.ndests()),
    ] {
        if actual != n {
            return Err(Error::LengthMismatch {
                what,
                expected: n,
                actual,
            });
        }
    }
    Ok(priorities)
}

/// Compute a maximal independent set over a distributed graph (collective).
///
/// `owners2copies` must have one root and one destination per graph node.
/// Every worker of the group calls this with its own partition and gets back
/// decisions for all of its local nodes, copies included; copies always agree
/// with their owner. Inputs are checked before the first round, and a bad
/// input on any worker fails the call on all of them.
pub fn find<C: Comm>(
    owners2copies: &Dist<C>,
    graph: &Graph,
    quality: &[f64],
    globals: &[u64],
    candidates: &[bool],
    config: &SelectionConfig,
) -> Result<Selection> {
    let comm = owners2copies.parent_comm();
    let priorities = agree(
        comm,
        check_inputs(owners2copies, graph, quality, globals, candidates),
    )?;
    let n = graph.nnodes();

    // Copies take their owner's candidacy so the group starts consistent.
    let mut state = owners2copies.exch(&initial_state(candidates), 1)?;
    debug!(
        rank = comm.rank(),
        nodes = n,
        undecided = count_undecided(&state),
        "starting selection"
    );

    let mut rounds = 0;
    while comm.allreduce(max_code(&state), ReduceOp::Max)? == NodeState::Undecided.code() {
        if let Some(limit) = config.round_limit {
            if rounds >= limit {
                warn!(limit, "selection hit its round limit");
                return Err(Error::RoundLimitExceeded { limit });
            }
        }
        state = synchronized_round(owners2copies, &priorities, &state, config.parallel)?;
        rounds += 1;
        debug!(
            rank = comm.rank(),
            round = rounds,
            undecided = count_undecided(&state),
            "selection round complete"
        );
    }

    let decisions = state
        .into_iter()
        .enumerate()
        .map(|(node, s)| Decision::try_from(s).map_err(|_| Error::Unconverged { node }))
        .collect::<Result<Vec<_>>>()?;
    let selection = Selection { decisions, rounds };
    info!(
        rank = comm.rank(),
        rounds,
        selected = selection.count_selected(),
        nodes = n,
        "independent set converged"
    );
    Ok(selection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indset_dist::SelfComm;
    use proptest::prelude::*;

    fn run(graph: &Graph, quality: &[f64], globals: &[u64], candidates: &[bool]) -> Result<Selection> {
        let dist = Dist::serial(SelfComm, graph.nnodes());
        find(&dist, graph, quality, globals, candidates, &SelectionConfig::serial())
    }

    fn path(n: usize) -> Graph {
        let edges: Vec<_> = (1..n).map(|i| (i - 1, i)).collect();
        Graph::from_edges(n, &edges).unwrap()
    }

    #[test]
    fn isolated_node_selected_in_one_round() {
        let g = Graph::empty(1);
        let sel = run(&g, &[0.5], &[42], &[true]).unwrap();
        assert_eq!(sel.decisions(), &[Decision::Selected]);
        assert_eq!(sel.rounds(), 1);
    }

    #[test]
    fn higher_quality_wins_regardless_of_ids() {
        let g = path(2);
        for globals in [[0u64, 1], [1, 0]] {
            let sel = run(&g, &[1.0, 2.0], &globals, &[true, true]).unwrap();
            assert_eq!(sel.decisions(), &[Decision::Rejected, Decision::Selected]);
        }
    }

    #[test]
    fn tie_break_peels_path_from_high_ids() {
        let g = path(5);
        let sel = run(&g, &[1.0; 5], &[0, 1, 2, 3, 4], &[true; 5]).unwrap();
        assert_eq!(sel.selected(), vec![0, 2, 4]);
        assert!(!sel.is_selected(1));
        assert!(!sel.is_selected(3));
        assert!(sel.rounds() <= 5);
    }

    #[test]
    fn non_candidates_never_selected() {
        let g = Graph::empty(2);
        let sel = run(&g, &[1.0, 1.0], &[0, 1], &[false, true]).unwrap();
        assert_eq!(sel.decisions(), &[Decision::Rejected, Decision::Selected]);

        let none = run(&g, &[1.0, 1.0], &[0, 1], &[false, false]).unwrap();
        assert_eq!(none.rounds(), 0);
        assert_eq!(none.count_selected(), 0);
    }

    #[test]
    fn non_candidate_neighbor_does_not_block() {
        // 0 - 1 - 2, node 1 is the best but not a candidate
        let g = path(3);
        let sel = run(&g, &[0.0, 9.0, 0.0], &[0, 1, 2], &[true, false, true]).unwrap();
        assert_eq!(sel.selected(), vec![0, 2]);
    }

    #[test]
    fn empty_graph_converges_immediately() {
        let g = Graph::empty(0);
        let sel = run(&g, &[], &[], &[]).unwrap();
        assert_eq!(sel.rounds(), 0);
        assert!(sel.decisions().is_empty());
    }

    #[test]
    fn candidate_length_is_checked() {
        let g = path(3);
        assert_eq!(
            run(&g, &[0.0; 3], &[0, 1, 2], &[true]).unwrap_err(),
            Error::LengthMismatch {
                what: "candidates",
                expected: 3,
                actual: 1
            }
        );
        let dist = Dist::serial(SelfComm, 2);
        assert!(matches!(
            find(&dist, &g, &[0.0; 3], &[0, 1, 2], &[true; 3], &SelectionConfig::default()),
            Err(Error::LengthMismatch { what: "distribution roots", .. })
        ));
    }

    #[test]
    fn adjacent_duplicate_ids_are_refused() {
        let g = path(2);
        let err = run(&g, &[1.0, 1.0], &[7, 7], &[true, true]).unwrap_err();
        assert_eq!(err, Error::DuplicateGlobal { a: 0, b: 1, global: 7 });
    }

    #[test]
    fn round_limit_is_enforced() {
        let g = path(5);
        let dist = Dist::serial(SelfComm, 5);
        let config = SelectionConfig::serial().with_round_limit(1);
        let err = find(&dist, &g, &[1.0; 5], &[0, 1, 2, 3, 4], &[true; 5], &config).unwrap_err();
        assert_eq!(err, Error::RoundLimitExceeded { limit: 1 });
    }

    #[test]
    fn rerun_on_selection_is_idempotent() {
        let g = path(7);
        let quality = [3.0, 1.0, 4.0, 1.0, 5.0, 9.0, 2.0];
        let globals: Vec<u64> = (0..7).collect();
        let first = run(&g, &quality, &globals, &[true; 7]).unwrap();
        let second = run(&g, &quality, &globals, &first.selected_marks()).unwrap();
        assert_eq!(first.decisions(), second.decisions());
    }

    fn arb_problem() -> impl Strategy<Value = (Graph, Vec<f64>, Vec<u64>, Vec<bool>)> {
        (1usize..30).prop_flat_map(|n| {
            (
                proptest::collection::vec((0..n, 0..n), 0..(3 * n)),
                proptest::collection::vec(0u8..4, n),
                Just((0..n as u64).collect::<Vec<_>>()).prop_shuffle(),
                proptest::collection::vec(proptest::bool::weighted(0.8), n),
            )
                .prop_map(move |(edges, q, globals, candidates)| {
                    let graph = Graph::from_edges(n, &edges).unwrap();
                    let quality = q.into_iter().map(f64::from).collect();
                    (graph, quality, globals, candidates)
                })
        })
    }

    proptest! {
        #[test]
        fn converged_set_is_maximal_and_independent(
            (graph, quality, globals, candidates) in arb_problem()
        ) {
            let sel = run(&graph, &quality, &globals, &candidates).unwrap();
            let n = graph.nnodes();
            for v in 0..n {
                if sel.is_selected(v) {
                    prop_assert!(candidates[v]);
                    for &u in graph.neighbors(v) {
                        prop_assert!(u == v || !sel.is_selected(u));
                    }
                } else if candidates[v] {
                    prop_assert!(graph.neighbors(v).iter().any(|&u| sel.is_selected(u)));
                }
            }
            prop_assert!(sel.rounds() <= candidates.iter().filter(|&&c| c).count());
        }

        #[test]
        fn result_independent_of_evaluation_mode(
            (graph, quality, globals, candidates) in arb_problem()
        ) {
            let dist = Dist::serial(SelfComm, graph.nnodes());
            let serial = find(&dist, &graph, &quality, &globals, &candidates, &SelectionConfig::serial()).unwrap();
            let parallel = find(&dist, &graph, &quality, &globals, &candidates, &SelectionConfig::default()).unwrap();
            prop_assert_eq!(serial, parallel);
        }
    }
}
