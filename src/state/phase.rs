//! Coordinator phase machine
//!
//! A run moves `Seeded -> Running -> Draining -> Done`. `Seeded` may also jump
//! straight to `Draining` when a stop is requested before workers start.

use serde::Serialize;
use std::fmt;

/// The run-level state of a crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CrawlPhase {
    /// Start URLs are in the frontier, workers not yet started
    Seeded,

    /// Workers are pulling from the frontier
    Running,

    /// No new work is handed out; in-flight pages are finishing
    Draining,

    /// All workers have exited and results are final
    Done,
}

impl CrawlPhase {
    /// Returns true if the phase machine allows `self -> next`
    pub fn can_transition_to(&self, next: CrawlPhase) -> bool {
        matches!(
            (self, next),
            (Self::Seeded, Self::Running)
                | (Self::Seeded, Self::Draining)
                | (Self::Running, Self::Draining)
                | (Self::Draining, Self::Done)
        )
    }

    /// Returns true while workers may still be handed new URLs
    pub fn accepts_work(&self) -> bool {
        matches!(self, Self::Running)
    }

    /// Returns true once the run can no longer change
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Seeded => "seeded",
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        assert!(CrawlPhase::Seeded.can_transition_to(CrawlPhase::Running));
        assert!(CrawlPhase::Running.can_transition_to(CrawlPhase::Draining));
        assert!(CrawlPhase::Draining.can_transition_to(CrawlPhase::Done));
    }

    #[test]
    fn test_early_stop_from_seeded() {
        assert!(CrawlPhase::Seeded.can_transition_to(CrawlPhase::Draining));
    }

    #[test]
    fn test_invalid_transitions() {
        assert!(!CrawlPhase::Seeded.can_transition_to(CrawlPhase::Done));
        assert!(!CrawlPhase::Running.can_transition_to(CrawlPhase::Done));
        assert!(!CrawlPhase::Running.can_transition_to(CrawlPhase::Seeded));
        assert!(!CrawlPhase::Draining.can_transition_to(CrawlPhase::Running));
        assert!(!CrawlPhase::Done.can_transition_to(CrawlPhase::Draining));
        assert!(!CrawlPhase::Done.can_transition_to(CrawlPhase::Done));
    }

    #[test]
    fn test_only_running_accepts_work() {
        assert!(!CrawlPhase::Seeded.accepts_work());
        assert!(CrawlPhase::Running.accepts_work());
        assert!(!CrawlPhase::Draining.accepts_work());
        assert!(!CrawlPhase::Done.accepts_work());
    }

    #[test]
    fn test_serializes_lowercase() {
        let json = serde_json::to_string(&CrawlPhase::Draining).unwrap();
        assert_eq!(json, "\"draining\"");
    }
}
