//! Commutative reduction operators.
//!
//! Shared by segmented reductions over CSR fans and by the collective
//! all-reduce of the distribution layer, so both sides agree on what
//! `Max` of an empty set means.

use std::fmt;

/// A commutative, associative reduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ReduceOp {
    /// Smallest value wins
    Min,
    /// Largest value wins
    Max,
    /// Arithmetic sum
    Sum,
}

impl fmt::Display for ReduceOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Min => write!(f, "min"),
            Self::Max => write!(f, "max"),
            Self::Sum => write!(f, "sum"),
        }
    }
}

/// A value that can be combined under every [`ReduceOp`].
///
/// Integer sums wrap on overflow instead of panicking, so a reduction gives
/// the same answer in debug and release builds.
pub trait Reducible: Copy + Send + Sync + 'static {
    /// Neutral element of `op`: `identity(op).combine(x, op) == x`.
    fn identity(op: ReduceOp) -> Self;

    /// Combine two values under `op`.
    fn combine(self, other: Self, op: ReduceOp) -> Self;

    /// Reduce an iterator, starting from the identity.
    fn reduce_all<I>(values: I, op: ReduceOp) -> Self
    where
        I: IntoIterator<Item = Self>,
    {
        values
            .into_iter()
            .fold(Self::identity(op), |acc, v| acc.combine(v, op))
    }
}

macro_rules! impl_reducible_int {
    ($($t:ty),*) => {
        $(
            impl Reducible for $t {
                #[inline]
                fn identity(op: ReduceOp) -> Self {
                    match op {
                        ReduceOp::Min => <$t>::MAX,
                        ReduceOp::Max => <$t>::MIN,
                        ReduceOp::Sum => 0,
                    }
                }

                #[inline]
                fn combine(self, other: Self, op: ReduceOp) -> Self {
                    match op {
                        ReduceOp::Min => self.min(other),
                        ReduceOp::Max => self.max(other),
                        ReduceOp::Sum => self.wrapping_add(other),
                    }
                }
            }
        )*
    };
}

impl_reducible_int!(i8, i32, i64, u64, usize);

impl Reducible for f64 {
    #[inline]
    fn identity(op: ReduceOp) -> Self {
        match op {
            ReduceOp::Min => f64::INFINITY,
            ReduceOp::Max => f64::NEG_INFINITY,
            ReduceOp::Sum => 0.0,
        }
    }

    #[inline]
    fn combine(self, other: Self, op: ReduceOp) -> Self {
        match op {
            ReduceOp::Min => self.min(other),
            ReduceOp::Max => self.max(other),
            ReduceOp::Sum => self + other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_is_neutral() {
        for op in [ReduceOp::Min, ReduceOp::Max, ReduceOp::Sum] {
            assert_eq!(i8::identity(op).combine(3, op), 3);
            assert_eq!(i64::identity(op).combine(-7, op), -7);
            assert_eq!(f64::identity(op).combine(2.5, op), 2.5);
        }
    }

    #[test]
    fn reduce_all_empty_is_identity() {
        assert_eq!(i8::reduce_all(std::iter::empty(), ReduceOp::Max), i8::MIN);
        assert_eq!(usize::reduce_all(std::iter::empty(), ReduceOp::Sum), 0);
    }

    #[test]
    fn integer_sum_wraps() {
        assert_eq!(i8::MAX.combine(1, ReduceOp::Sum), i8::MIN);
        assert_eq!(usize::reduce_all([usize::MAX, 2], ReduceOp::Sum), 1);
    }

    #[test]
    fn reduce_all_values() {
        let values = [4i32, -1, 9, 2];
        assert_eq!(i32::reduce_all(values, ReduceOp::Max), 9);
        assert_eq!(i32::reduce_all(values, ReduceOp::Min), -1);
        assert_eq!(i32::reduce_all(values, ReduceOp::Sum), 14);
    }
}
