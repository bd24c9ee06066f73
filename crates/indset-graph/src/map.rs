//! Index-map utilities.
//!
//! A map `a2b` is a slice where entry `a` names an index in `[0, nb)`.
//! Offsets arrays ("fans") group a flat array into per-node segments.
//! Data arrays carry `width` components per entry, stored contiguously.

use crate::error::{GraphError, Result};
use crate::reduce::{ReduceOp, Reducible};

fn check_width(width: usize) -> Result<()> {
    if width == 0 {
        Err(GraphError::ZeroWidth)
    } else {
        Ok(())
    }
}

/// Check that `offsets` is a valid fan over `len` entries: a leading zero,
/// non-decreasing, ending at `len`.
pub(crate) fn check_offsets(offsets: &[usize], len: usize) -> Result<()> {
    let (&first, _) = offsets.split_first().ok_or(GraphError::EmptyOffsets)?;
    if first != 0 {
        return Err(GraphError::NonZeroStart(first));
    }
    for (node, pair) in offsets.windows(2).enumerate() {
        if pair[0] > pair[1] {
            return Err(GraphError::DecreasingOffsets {
                node,
                prev: pair[0],
                next: pair[1],
            });
        }
    }
    let last = offsets[offsets.len() - 1];
    if last != len {
        return Err(GraphError::OffsetTargetMismatch { last, targets: len });
    }
    Ok(())
}

/// Exclusive prefix sum: `[2, 0, 3]` becomes `[0, 2, 2, 5]`.
pub fn offset_scan(degrees: &[usize]) -> Vec<usize> {
    let mut offsets = Vec::with_capacity(degrees.len() + 1);
    let mut total = 0;
    offsets.push(total);
    for &d in degrees {
        total += d;
        offsets.push(total);
    }
    offsets
}

/// Segment sizes of an offsets array; the inverse of [`offset_scan`].
pub fn degrees(offsets: &[usize]) -> Vec<usize> {
    offsets.windows(2).map(|w| w[1] - w[0]).collect()
}

/// Gather: entry `a` of the result is `b_data[a2b[a]]`, for each component.
pub fn unmap<T: Copy>(a2b: &[usize], b_data: &[T], width: usize) -> Result<Vec<T>> {
    check_width(width)?;
    if b_data.len() % width != 0 {
        return Err(GraphError::LengthMismatch {
            what: "unmap data",
            expected: b_data.len() / width * width,
            actual: b_data.len(),
        });
    }
    let nb = b_data.len() / width;
    let mut out = Vec::with_capacity(a2b.len() * width);
    for (index, &b) in a2b.iter().enumerate() {
        if b >= nb {
            return Err(GraphError::MapOutOfRange {
                index,
                value: b,
                range: nb,
            });
        }
        out.extend_from_slice(&b_data[b * width..(b + 1) * width]);
    }
    Ok(out)
}

/// Segmented reduction: entry `a` of the result combines every
/// `data[offsets[a]..offsets[a + 1]]` entry, component by component.
///
/// Empty segments produce the identity of `op`. `offsets` must be a valid
/// fan over `data.len() / width` entries.
pub fn fan_reduce<T: Reducible>(
    offsets: &[usize],
    data: &[T],
    width: usize,
    op: ReduceOp,
) -> Result<Vec<T>> {
    check_width(width)?;
    if data.len() % width != 0 {
        return Err(GraphError::LengthMismatch {
            what: "fan_reduce data",
            expected: data.len() / width * width,
            actual: data.len(),
        });
    }
    check_offsets(offsets, data.len() / width)?;
    let na = offsets.len() - 1;
    let mut out = vec![T::identity(op); na * width];
    for a in 0..na {
        for ab in offsets[a]..offsets[a + 1] {
            for k in 0..width {
                out[a * width + k] = out[a * width + k].combine(data[ab * width + k], op);
            }
        }
    }
    Ok(out)
}

/// A one-to-many map from `nroots` roots into a separate index space.
///
/// Unlike a [`Graph`](crate::Graph), the entries of a fan are not node
/// indices of the same set, so they are not bounded by `nroots`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fan {
    offsets: Vec<usize>,
    targets: Vec<usize>,
}

impl Fan {
    /// Build a fan from raw arrays, validating the offsets.
    pub fn new(offsets: Vec<usize>, targets: Vec<usize>) -> Result<Self> {
        check_offsets(&offsets, targets.len())?;
        Ok(Self { offsets, targets })
    }

    /// Number of roots.
    pub fn nroots(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Entries of root `b`.
    ///
    /// # Panics
    ///
    /// Panics if `b >= nroots()`.
    pub fn of(&self, b: usize) -> &[usize] {
        &self.targets[self.offsets[b]..self.offsets[b + 1]]
    }

    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    pub fn targets(&self) -> &[usize] {
        &self.targets
    }

    /// Consume the fan, returning `(offsets, targets)`.
    pub fn into_parts(self) -> (Vec<usize>, Vec<usize>) {
        (self.offsets, self.targets)
    }
}

/// Invert a many-to-one map `a2b` into a fan `b -> [a...]`.
///
/// Each `b` lists its preimages in increasing order of `a`. The result has
/// `nb` roots whose entries lie in `[0, a2b.len())`.
pub fn invert_map_by_sorting(a2b: &[usize], nb: usize) -> Result<Fan> {
    let mut counts = vec![0usize; nb];
    for (index, &b) in a2b.iter().enumerate() {
        if b >= nb {
            return Err(GraphError::MapOutOfRange {
                index,
                value: b,
                range: nb,
            });
        }
        counts[b] += 1;
    }
    let mut pairs: Vec<(usize, usize)> = a2b.iter().enumerate().map(|(a, &b)| (b, a)).collect();
    pairs.sort_unstable();
    Ok(Fan {
        offsets: offset_scan(&counts),
        targets: pairs.into_iter().map(|(_, a)| a).collect(),
    })
}

/// Flip every boolean mark.
pub fn invert_marks(marks: &[bool]) -> Vec<bool> {
    marks.iter().map(|&m| !m).collect()
}

/// Indices of the marked entries, in increasing order.
pub fn collect_marked(marks: &[bool]) -> Vec<usize> {
    marks
        .iter()
        .enumerate()
        .filter_map(|(i, &m)| m.then_some(i))
        .collect()
}
