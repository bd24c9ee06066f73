//! Indset Adjacency Substrate
//!
//! Read-only compressed sparse-row (CSR) graphs over local node indices,
//! plus the map, scan and reduction utilities used to derive and query them.
//!
//! # Representation
//!
//! A [`Graph`] over `n` nodes stores:
//! - `offsets`: `n + 1` non-decreasing entries, `offsets[0] == 0`
//! - `targets`: the concatenated neighbor lists
//!
//! Graphs built from a mesh's star relation are symmetric, but nothing here
//! symmetrizes on its own: an edge stored one way is seen one way.
//!
//! # Data Layout
//!
//! Per-node data arrays carry `width` components per node, stored
//! contiguously (`data[v * width + k]`). Every utility taking a width
//! checks that array lengths agree with it.

mod csr;
mod error;
mod map;
mod ops;
mod reduce;

pub use csr::Graph;
pub use error::{GraphError, Result};
pub use map::{collect_marked, degrees, fan_reduce, invert_map_by_sorting, invert_marks, offset_scan, unmap, Fan};
pub use ops::{add_edges, categorize_graph, filter_graph, graph_reduce, unmap_graph, weighted_average};
pub use reduce::{ReduceOp, Reducible};
