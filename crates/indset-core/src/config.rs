//! Selection run configuration.

/// Knobs for one independent-set computation.
///
/// Every worker of a group must use the same round limit, since giving up
/// is a collective decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionConfig {
    /// Give up after this many rounds.
    /// Default: no limit (termination is guaranteed for unique identifiers).
    pub round_limit: Option<usize>,

    /// Evaluate each local round on the rayon thread pool.
    pub parallel: bool,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            round_limit: None,
            parallel: true,
        }
    }
}

impl SelectionConfig {
    /// Evaluate local rounds on the calling thread.
    #[must_use]
    pub fn serial() -> Self {
        Self {
            parallel: false,
            ..Default::default()
        }
    }

    /// Stop with an error after `limit` rounds.
    #[must_use]
    pub fn with_round_limit(mut self, limit: usize) -> Self {
        self.round_limit = Some(limit);
        self
    }

    /// Remove the round limit.
    #[must_use]
    pub fn without_round_limit(mut self) -> Self {
        self.round_limit = None;
        self
    }
}
