/// URL state definitions for tracking crawl progress
///
/// A URL that has never been seen has no state at all. Once seen it moves
/// forward through the states below and never back.
use std::fmt;

/// Represents where a URL sits in the crawl lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UrlState {
    /// URL has been pushed to the frontier and is waiting for, or undergoing, a fetch
    Enqueued,

    /// URL has been fetched and fully processed
    Visited,
}

impl UrlState {
    /// Returns true if moving from `self` to `next` keeps the lifecycle monotonic
    ///
    /// Staying in the same state is not a transition and is rejected.
    pub fn can_transition_to(&self, next: UrlState) -> bool {
        matches!((self, next), (Self::Enqueued, Self::Visited))
    }

    /// Returns true if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Visited)
    }

    /// Short lowercase name used in logs and reports
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Enqueued => "enqueued",
            Self::Visited => "visited",
        }
    }
}

impl fmt::Display for UrlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
