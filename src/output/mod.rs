//! Output module for crawl results and reports
//!
//! This module handles:
//! - Snapshotting and printing crawl statistics
//! - Exporting extracted records through output handlers

mod json;
pub mod stats;
mod traits;

pub use json::JsonOutputHandler;
pub use stats::{print_statistics, CrawlStatistics};
pub use traits::{OutputError, OutputHandler, OutputResult};
