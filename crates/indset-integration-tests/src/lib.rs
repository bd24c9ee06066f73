//! Partitioning fixtures for multi-worker selection tests.
//!
//! A [`Problem`] is a whole graph with per-node inputs. [`partition`] splits
//! it the way a mesh partitioner would: each worker keeps the nodes it owns
//! plus one layer of ghost copies, so every owned node sees its complete
//! neighborhood.

use indset_core::{find_indset, Decision, EntityMesh, Result, Selection, SelectionConfig};
use indset_dist::{Comm, Remote, ThreadGroup};
use indset_graph::Graph;

/// Entity dimension used for every fixture mesh.
pub const DIM: usize = 0;

/// A whole, unpartitioned selection problem.
#[derive(Debug, Clone)]
pub struct Problem {
    pub graph: Graph,
    pub quality: Vec<f64>,
    pub globals: Vec<u64>,
    pub candidates: Vec<bool>,
}

impl Problem {
    /// Every node a candidate, identifiers equal to node indices.
    pub fn uniform(graph: Graph, quality: Vec<f64>) -> Self {
        let n = graph.nnodes();
        Self {
            graph,
            quality,
            globals: (0..n as u64).collect(),
            candidates: vec![true; n],
        }
    }

    pub fn nnodes(&self) -> usize {
        self.graph.nnodes()
    }
}

/// One worker's share of a [`Problem`].
#[derive(Debug, Clone)]
pub struct Part {
    /// Global node of each local entity; owned entities come first.
    pub locals: Vec<usize>,
    /// Number of owned entities.
    pub nowned: usize,
    /// Adjacency induced on the local entities.
    pub star: Graph,
    /// Owning slot of each local entity.
    pub owners: Vec<Remote>,
}

impl Part {
    /// Pick out the local entries of a per-global-node array.
    pub fn gather<T: Copy>(&self, global: &[T]) -> Vec<T> {
        self.locals.iter().map(|&g| global[g]).collect()
    }
}

/// Split `graph` across `nparts` workers, node `g` owned by `parts[g]`.
pub fn partition(graph: &Graph, parts: &[usize], nparts: usize) -> indset_graph::Result<Vec<Part>> {
    let n = graph.nnodes();
    // Owned entities are numbered first, in global order, on their owner.
    let mut owned_index = vec![0; n];
    let mut nowned = vec![0; nparts];
    for g in 0..n {
        owned_index[g] = nowned[parts[g]];
        nowned[parts[g]] += 1;
    }

    (0..nparts)
        .map(|rank| {
            let mut locals: Vec<usize> = (0..n).filter(|&g| parts[g] == rank).collect();
            let mut ghosts: Vec<usize> = locals
                .iter()
                .flat_map(|&g| graph.neighbors(g).iter().copied())
                .filter(|&h| parts[h] != rank)
                .collect();
            ghosts.sort_unstable();
            ghosts.dedup();
            locals.extend(ghosts);

            let mut local_of = vec![None; n];
            for (i, &g) in locals.iter().enumerate() {
                local_of[g] = Some(i);
            }
            let mut edges = Vec::new();
            for (i, &g) in locals.iter().enumerate() {
                for &h in graph.neighbors(g) {
                    if let Some(j) = local_of[h] {
                        edges.push((i, j));
                    }
                }
            }
            let star = Graph::from_edges(locals.len(), &edges)?;
            let owners = locals
                .iter()
                .map(|&g| Remote::new(parts[g], owned_index[g]))
                .collect();

            Ok(Part {
                locals,
                nowned: nowned[rank],
                star,
                owners,
            })
        })
        .collect()
}

/// Contiguous blocks of nodes per worker.
pub fn block_parts(n: usize, nparts: usize) -> Vec<usize> {
    let per = n.div_ceil(nparts).max(1);
    (0..n).map(|g| (g / per).min(nparts - 1)).collect()
}

/// Nodes dealt round-robin, maximizing the boundary.
pub fn striped_parts(n: usize, nparts: usize) -> Vec<usize> {
    (0..n).map(|g| g % nparts).collect()
}

/// Run selection on every worker of an in-process group.
pub fn run_partitioned(
    problem: &Problem,
    parts: &[usize],
    nparts: usize,
    config: &SelectionConfig,
) -> Result<(Vec<Part>, Vec<Result<Selection>>)> {
    let shares = partition(&problem.graph, parts, nparts)?;
    let results = ThreadGroup::run(nparts, |comm| {
        let part = &shares[comm.rank()];
        let mesh = EntityMesh::new(
            comm,
            DIM,
            part.star.clone(),
            part.gather(&problem.globals),
            part.owners.clone(),
        )?;
        find_indset(
            &mesh,
            DIM,
            &part.gather(&problem.quality),
            &part.gather(&problem.candidates),
            config,
        )
    });
    Ok((shares, results))
}

/// Stitch per-worker selections into one decision per global node, taking
/// each node's decision from its owner.
pub fn assemble(n: usize, shares: &[Part], selections: &[Selection]) -> Vec<Decision> {
    let mut global = vec![Decision::Rejected; n];
    for (part, selection) in shares.iter().zip(selections) {
        for (i, &g) in part.locals[..part.nowned].iter().enumerate() {
            global[g] = selection.decisions()[i];
        }
    }
    global
}

/// Whether every ghost copy ended with its owner's decision.
pub fn copies_agree(shares: &[Part], selections: &[Selection], global: &[Decision]) -> bool {
    shares.iter().zip(selections).all(|(part, selection)| {
        part.locals
            .iter()
            .zip(selection.decisions())
            .all(|(&g, d)| *d == global[g])
    })
}

/// Path graph 0 - 1 - ... - (n-1).
pub fn path(n: usize) -> indset_graph::Result<Graph> {
    let edges: Vec<_> = (1..n).map(|i| (i - 1, i)).collect();
    Graph::from_edges(n, &edges)
}

/// Square grid with 8-neighbor connectivity, the vertex star of a quad mesh.
pub fn grid(side: usize) -> indset_graph::Result<Graph> {
    let id = |x: usize, y: usize| y * side + x;
    let mut edges = Vec::new();
    for y in 0..side {
        for x in 0..side {
            if x + 1 < side {
                edges.push((id(x, y), id(x + 1, y)));
            }
            if y + 1 < side {
                edges.push((id(x, y), id(x, y + 1)));
                if x + 1 < side {
                    edges.push((id(x, y), id(x + 1, y + 1)));
                }
                if x > 0 {
                    edges.push((id(x, y), id(x - 1, y + 1)));
                }
            }
        }
    }
    Graph::from_edges(side * side, &edges)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_keeps_full_neighborhoods() {
        let g = grid(4).unwrap();
        let parts = block_parts(g.nnodes(), 3);
        let shares = partition(&g, &parts, 3).unwrap();
        for part in &shares {
            for (i, &global) in part.locals[..part.nowned].iter().enumerate() {
                assert_eq!(part.star.degree(i), g.degree(global));
            }
        }
        let owned: usize = shares.iter().map(|p| p.nowned).sum();
        assert_eq!(owned, g.nnodes());
    }

    #[test]
    fn test_owners_point_at_owned_slots() {
        let g = path(6).unwrap();
        let parts = striped_parts(6, 2);
        let shares = partition(&g, &parts, 2).unwrap();
        for part in &shares {
            for (&global, owner) in part.locals.iter().zip(&part.owners) {
                let home = &shares[owner.rank];
                assert!(owner.index < home.nowned);
                assert_eq!(home.locals[owner.index], global);
            }
        }
    }
}
