//! State module for tracking crawl progress
//!
//! This module provides the state types shared by the frontier, the workers and
//! the coordinator during a single in-memory crawl run.
//!
//! # Components
//!
//! - `UrlState`: Tracks where a URL sits in its enqueued/visited lifecycle
//! - `CrawlPhase`: The coordinator's run-level state machine
//! - `CrawlCounters`: Lock-free outcome counters shared by all workers

mod counters;
mod phase;
mod url_state;

// Re-export main types
pub use counters::CrawlCounters;
pub use phase::CrawlPhase;
pub use url_state::UrlState;
