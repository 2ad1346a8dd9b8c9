//! Thread-safe accumulation of extracted records

use crate::crawler::extractor::Record;
use std::sync::{Mutex, MutexGuard};

/// Records collected during a crawl, in completion order
#[derive(Debug, Default)]
pub struct ResultSink {
    records: Mutex<Vec<Record>>,
}

impl ResultSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Record>> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Appends all records from one document as a single batch
    ///
    /// Records from the same page stay contiguous even when several workers
    /// append at once.
    pub fn append(&self, records: Vec<Record>) -> usize {
        let count = records.len();
        if count > 0 {
            self.lock().extend(records);
        }
        count
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Takes every record collected so far, leaving the sink empty
    pub fn drain(&self) -> Vec<Record> {
        std::mem::take(&mut *self.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_append_and_drain_preserve_order() {
        let sink = ResultSink::new();
        sink.append(vec![Record::new("https://site.test/a")]);
        sink.append(vec![
            Record::new("https://site.test/b"),
            Record::new("https://site.test/c"),
        ]);
        assert_eq!(sink.len(), 3);

        let drained = sink.drain();
        let sources: Vec<&str> = drained.iter().map(|r| r.source_url.as_str()).collect();
        assert_eq!(
            sources,
            vec![
                "https://site.test/a",
                "https://site.test/b",
                "https://site.test/c"
            ]
        );
        assert!(sink.is_empty());
    }

    #[test]
    fn test_concurrent_batches_stay_contiguous() {
        let sink = Arc::new(ResultSink::new());
        let handles: Vec<_> = (0..4)
            .map(|worker| {
                let sink = Arc::clone(&sink);
                std::thread::spawn(move || {
                    for page in 0..25 {
                        let source = format!("https://site.test/{}/{}", worker, page);
                        let batch = (0..3).map(|_| Record::new(source.clone())).collect();
                        sink.append(batch);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let records = sink.drain();
        assert_eq!(records.len(), 300);
        for batch in records.chunks(3) {
            assert!(batch.iter().all(|r| r.source_url == batch[0].source_url));
        }
    }
}
