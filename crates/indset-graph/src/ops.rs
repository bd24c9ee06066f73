//! Derived graphs and neighbor reductions.

use std::collections::BTreeMap;

use crate::csr::Graph;
use crate::error::{GraphError, Result};
use crate::map::{collect_marked, degrees, fan_reduce, offset_scan, unmap};
use crate::reduce::{ReduceOp, Reducible};

/// Concatenate, per node, the neighbor lists of two graphs over the same nodes.
///
/// Neighbors of `g1` come first. Duplicates are kept.
pub fn add_edges(g1: &Graph, g2: &Graph) -> Result<Graph> {
    if g1.nnodes() != g2.nnodes() {
        return Err(GraphError::LengthMismatch {
            what: "add_edges node count",
            expected: g1.nnodes(),
            actual: g2.nnodes(),
        });
    }
    let degs: Vec<usize> = (0..g1.nnodes())
        .map(|v| g1.degree(v) + g2.degree(v))
        .collect();
    let offsets = offset_scan(&degs);
    let mut targets = Vec::with_capacity(g1.nedges() + g2.nedges());
    for v in 0..g1.nnodes() {
        targets.extend_from_slice(g1.neighbors(v));
        targets.extend_from_slice(g2.neighbors(v));
    }
    Ok(Graph::from_parts_unchecked(offsets, targets))
}

/// Pull back a graph through `a2b`: node `a` gets the neighbor list of `a2b[a]`.
///
/// Neighbor indices are not renumbered, so they still refer to `b2c`'s
/// target space.
pub fn unmap_graph(a2b: &[usize], b2c: &Graph) -> Result<(Vec<usize>, Vec<usize>)> {
    let b_degrees = degrees(b2c.offsets());
    let a_degrees = unmap(a2b, &b_degrees, 1)?;
    let offsets = offset_scan(&a_degrees);
    let mut targets = Vec::with_capacity(offsets[offsets.len() - 1]);
    for &b in a2b {
        targets.extend_from_slice(b2c.neighbors(b));
    }
    Ok((offsets, targets))
}

/// Reduce the data of each node's neighbors.
pub fn graph_reduce<T: Reducible>(
    g: &Graph,
    b_data: &[T],
    width: usize,
    op: ReduceOp,
) -> Result<Vec<T>> {
    let arc_data = unmap(g.targets(), b_data, width)?;
    fan_reduce(g.offsets(), &arc_data, width, op)
}

/// Weighted average of neighbor data, one weight per stored edge.
///
/// Nodes whose weights sum to zero produce NaN components.
pub fn weighted_average(
    g: &Graph,
    arc_weights: &[f64],
    b_data: &[f64],
    width: usize,
) -> Result<Vec<f64>> {
    if arc_weights.len() != g.nedges() {
        return Err(GraphError::LengthMismatch {
            what: "arc weights",
            expected: g.nedges(),
            actual: arc_weights.len(),
        });
    }
    let arc_data = unmap(g.targets(), b_data, width)?;
    let weighted: Vec<f64> = arc_data
        .iter()
        .enumerate()
        .map(|(i, &x)| x * arc_weights[i / width])
        .collect();
    let totals = fan_reduce(g.offsets(), arc_weights, 1, ReduceOp::Sum)?;
    let sums = fan_reduce(g.offsets(), &weighted, width, ReduceOp::Sum)?;
    Ok(sums
        .iter()
        .enumerate()
        .map(|(i, &s)| s / totals[i / width])
        .collect())
}

/// Keep only the edges whose mark is set.
pub fn filter_graph(g: &Graph, keep_edge: &[bool]) -> Result<Graph> {
    if keep_edge.len() != g.nedges() {
        return Err(GraphError::LengthMismatch {
            what: "edge marks",
            expected: g.nedges(),
            actual: keep_edge.len(),
        });
    }
    let kept: Vec<usize> = keep_edge.iter().map(|&k| usize::from(k)).collect();
    let degs = fan_reduce(g.offsets(), &kept, 1, ReduceOp::Sum)?;
    let offsets = offset_scan(&degs);
    let targets = unmap(&collect_marked(keep_edge), g.targets(), 1)?;
    Ok(Graph::from_parts_unchecked(offsets, targets))
}

/// Split a graph by the category of each edge's target.
///
/// Every returned graph has the full node set; together they hold each
/// edge of `g` exactly once.
pub fn categorize_graph(g: &Graph, categories: &[i32]) -> Result<BTreeMap<i32, Graph>> {
    if categories.len() != g.nnodes() {
        return Err(GraphError::LengthMismatch {
            what: "node categories",
            expected: g.nnodes(),
            actual: categories.len(),
        });
    }
    let edge_categories: Vec<i32> = g.targets().iter().map(|&t| categories[t]).collect();
    let mut distinct = edge_categories.clone();
    distinct.sort_unstable();
    distinct.dedup();

    let mut result = BTreeMap::new();
    for category in distinct {
        let keep: Vec<bool> = edge_categories.iter().map(|&c| c == category).collect();
        result.insert(category, filter_graph(g, &keep)?);
    }
    Ok(result)
}
