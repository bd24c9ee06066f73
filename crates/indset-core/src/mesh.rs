//! Mesh-facing entry point.
//!
//! The mesh itself lives elsewhere. What selection needs from it, per
//! entity dimension, is the star graph, global identifiers, and the owner
//! of every local entity. [`MeshProvider`] is that contract;
//! [`EntityMesh`] is a ready-made provider for callers that already hold
//! those arrays for a single dimension.

use indset_dist::{Comm, Dist, Remote};
use indset_graph::Graph;
use tracing::debug;

use crate::config::SelectionConfig;
use crate::driver::{agree, find, Selection};
use crate::error::{Error, Result};

/// What a mesh must answer for independent-set selection.
pub trait MeshProvider {
    /// Group the mesh is partitioned over.
    type Comm: Comm;

    /// This worker's handle on the group.
    fn comm(&self) -> &Self::Comm;

    /// Adjacency between entities of dimension `dim` through shared incidence.
    fn ask_star(&self, dim: usize) -> Result<Graph>;

    /// One globally unique identifier per local entity of dimension `dim`.
    fn ask_globals(&self, dim: usize) -> Result<Vec<u64>>;

    /// The owning slot of every local entity of dimension `dim`.
    fn ask_owners(&self, dim: usize) -> Result<Vec<Remote>>;

    /// Copies → owners distribution of dimension `dim`.
    fn ask_dist(&self, dim: usize) -> Result<Dist<Self::Comm>> {
        Ok(Dist::from_owners(self.comm().clone(), self.ask_owners(dim)?)?)
    }
}

/// Select a conflict-free set of entities of dimension `dim` (collective).
///
/// Returns one terminal decision per local entity. A mesh query failing on
/// one worker fails the call on every worker.
pub fn find_indset<M: MeshProvider>(
    mesh: &M,
    dim: usize,
    quality: &[f64],
    candidates: &[bool],
    config: &SelectionConfig,
) -> Result<Selection> {
    let local = mesh
        .ask_star(dim)
        .and_then(|graph| Ok((graph, mesh.ask_globals(dim)?, mesh.ask_dist(dim)?)));
    let (graph, globals, copies2owners) = agree(mesh.comm(), local)?;
    let owners2copies = agree(mesh.comm(), copies2owners.invert().map_err(Error::from))?;
    debug!(
        dim,
        entities = graph.nnodes(),
        adjacencies = graph.nedges(),
        "mesh adjacency ready for selection"
    );
    find(&owners2copies, &graph, quality, &globals, candidates, config)
}

/// A single entity dimension of a partitioned mesh, held in memory.
#[derive(Debug, Clone)]
pub struct EntityMesh<C: Comm> {
    comm: C,
    dim: usize,
    star: Graph,
    globals: Vec<u64>,
    owners: Vec<Remote>,
}

impl<C: Comm> EntityMesh<C> {
    /// Wrap the arrays describing this worker's entities of dimension `dim`.
    pub fn new(comm: C, dim: usize, star: Graph, globals: Vec<u64>, owners: Vec<Remote>) -> Result<Self> {
        let n = star.nnodes();
        for (what, actual) in [("global identifiers", globals.len()), ("owners", owners.len())] {
            if actual != n {
                return Err(Error::LengthMismatch {
                    what,
                    expected: n,
                    actual,
                });
            }
        }
        Ok(Self {
            comm,
            dim,
            star,
            globals,
            owners,
        })
    }

    /// A mesh held entirely by this worker: every entity is owned locally.
    pub fn local(comm: C, dim: usize, star: Graph, globals: Vec<u64>) -> Result<Self> {
        let rank = comm.rank();
        let owners = (0..star.nnodes()).map(|i| Remote::new(rank, i)).collect();
        Self::new(comm, dim, star, globals, owners)
    }

    /// The entity dimension this mesh answers for.
    pub fn dim(&self) -> usize {
        self.dim
    }

    fn check_dim(&self, dim: usize) -> Result<()> {
        if dim == self.dim {
            Ok(())
        } else {
            Err(Error::UnknownDimension { dim })
        }
    }
}

impl<C: Comm> MeshProvider for EntityMesh<C> {
    type Comm = C;

    fn comm(&self) -> &C {
        &self.comm
    }

    fn ask_star(&self, dim: usize) -> Result<Graph> {
        self.check_dim(dim)?;
        Ok(self.star.clone())
    }

    fn ask_globals(&self, dim: usize) -> Result<Vec<u64>> {
        self.check_dim(dim)?;
        Ok(self.globals.clone())
    }

    fn ask_owners(&self, dim: usize) -> Result<Vec<Remote>> {
        self.check_dim(dim)?;
        Ok(self.owners.clone())
    }
}
