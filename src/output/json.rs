//! JSON export of crawl results

use crate::crawler::{CrawlReport, Record};
use crate::output::stats::CrawlStatistics;
use crate::output::traits::{OutputHandler, OutputResult};
use crate::state::CrawlPhase;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Serialize)]
struct Metadata<'a> {
    phase: CrawlPhase,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    config_hash: Option<&'a str>,
    urls_visited: usize,
    statistics: &'a CrawlStatistics,
}

#[derive(Serialize)]
struct Document<'a> {
    metadata: Metadata<'a>,
    records: &'a [Record],
}

/// Writes `{ "metadata": {...}, "records": [...] }` to a file
#[derive(Debug, Clone)]
pub struct JsonOutputHandler {
    path: PathBuf,
}

impl JsonOutputHandler {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl OutputHandler for JsonOutputHandler {
    fn write_report(&self, report: &CrawlReport) -> OutputResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let document = Document {
            metadata: Metadata {
                phase: report.phase,
                started_at: report.started_at,
                finished_at: report.finished_at,
                config_hash: report.config_hash.as_deref(),
                urls_visited: report.visited.len(),
                statistics: &report.statistics,
            },
            records: &report.records,
        };

        let mut writer = BufWriter::new(File::create(&self.path)?);
        serde_json::to_writer_pretty(&mut writer, &document)?;
        writer.write_all(b"\n")?;
        writer.flush()?;

        tracing::info!(
            "Wrote {} records to {}",
            report.records.len(),
            self.path.display()
        );
        Ok(())
    }

    fn describe(&self) -> String {
        format!("JSON file {}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn report() -> CrawlReport {
        let now = Utc::now();
        CrawlReport {
            phase: CrawlPhase::Done,
            statistics: CrawlStatistics {
                attempted: 2,
                succeeded: 2,
                records: 2,
                urls_seen: 2,
                ..Default::default()
            },
            records: vec![
                Record::new("https://site.test/page/1/").with_field("name", "Green Tea"),
                Record::new("https://site.test/page/1/").with_field("name", "Oolong"),
            ],
            visited: vec![
                "https://site.test/".to_string(),
                "https://site.test/page/1".to_string(),
            ],
            started_at: now,
            finished_at: now,
            config_hash: Some("abc123".to_string()),
        }
    }

    #[test]
    fn test_writes_metadata_and_records() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("records.json");
        let handler = JsonOutputHandler::new(&path);

        handler.write_report(&report()).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let json: serde_json::Value = serde_json::from_str(&content).unwrap();

        assert_eq!(json["metadata"]["phase"], "done");
        assert_eq!(json["metadata"]["config_hash"], "abc123");
        assert_eq!(json["metadata"]["urls_visited"], 2);
        assert_eq!(json["metadata"]["statistics"]["succeeded"], 2);

        let records = json["records"].as_array().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["name"], "Green Tea");
        assert_eq!(records[1]["source_url"], "https://site.test/page/1/");
    }

    #[test]
    fn test_unwritable_path_is_error() {
        let dir = TempDir::new().unwrap();
        // A directory cannot be opened as a file
        let handler = JsonOutputHandler::new(dir.path());
        assert!(handler.write_report(&report()).is_err());
    }
}
