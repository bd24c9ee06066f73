//! Per-node selection state.

use std::fmt;

/// Where a node stands in the current round.
///
/// The discriminants order the states so a MAX reduction over the encoding
/// is `Undecided` exactly when some node is still undecided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(i8)]
pub enum NodeState {
    /// Out of the set: dominated by a selected neighbor, or never a candidate
    Rejected = 0,
    /// In the set
    Selected = 1,
    /// Still contending
    Undecided = 2,
}

impl NodeState {
    /// The wire/reduction encoding.
    #[inline]
    pub const fn code(self) -> i8 {
        self as i8
    }

    /// Whether the node has committed to a decision.
    #[inline]
    pub const fn is_decided(self) -> bool {
        !matches!(self, Self::Undecided)
    }

    /// Initial state for a node given its candidate mark.
    #[inline]
    pub const fn initial(candidate: bool) -> Self {
        if candidate {
            Self::Undecided
        } else {
            Self::Rejected
        }
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected => write!(f, "rejected"),
            Self::Selected => write!(f, "selected"),
            Self::Undecided => write!(f, "undecided"),
        }
    }
}

/// A terminal decision. Converged runs only ever report these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Decision {
    Selected,
    Rejected,
}

impl Decision {
    /// Whether the node is in the set.
    #[inline]
    pub const fn is_selected(self) -> bool {
        matches!(self, Self::Selected)
    }
}

impl From<Decision> for NodeState {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Selected => Self::Selected,
            Decision::Rejected => Self::Rejected,
        }
    }
}

impl TryFrom<NodeState> for Decision {
    type Error = NodeState;

    fn try_from(state: NodeState) -> Result<Self, Self::Error> {
        match state {
            NodeState::Selected => Ok(Self::Selected),
            NodeState::Rejected => Ok(Self::Rejected),
            NodeState::Undecided => Err(state),
        }
    }
}
