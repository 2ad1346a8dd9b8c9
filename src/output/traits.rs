//! Output handler traits and types
//!
//! Export formats are collaborators that consume a finished [`CrawlReport`].
//! The crawl core never depends on them.

use crate::crawler::CrawlReport;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("Failed to format output: {0}")]
    Format(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for OutputError {
    fn from(e: serde_json::Error) -> Self {
        if e.is_io() {
            OutputError::Write(e.to_string())
        } else {
            OutputError::Format(e.to_string())
        }
    }
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Trait for output handlers
///
/// Handlers receive the final report once the crawl reaches `Done`, with
/// records in completion order.
pub trait OutputHandler {
    /// Writes the report to the handler's destination
    fn write_report(&self, report: &CrawlReport) -> OutputResult<()>;

    /// Short human-readable name of the destination, for logging
    fn describe(&self) -> String;
}
