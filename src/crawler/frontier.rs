//! Two-tier frontier with an atomic seen-set
//!
//! The frontier owns both queues and the seen-set behind a single lock, so
//! "is this URL new?" and "enqueue it" happen as one step. Two workers that
//! discover the same link at the same moment therefore produce exactly one
//! entry.

use crate::crawler::classifier::Tier;
use crate::state::UrlState;
use crate::url::dedup_key;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use url::Url;

/// A URL waiting in the frontier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    /// The URL to fetch, as it was linked
    pub url: Url,

    /// Normalized identity used for deduplication
    pub key: String,

    /// Priority tier the entry was queued under
    pub tier: Tier,
}

#[derive(Debug, Default)]
struct FrontierInner {
    high: VecDeque<FrontierEntry>,
    low: VecDeque<FrontierEntry>,
    seen: HashMap<String, UrlState>,
}

/// Prioritized, deduplicated queue of URLs awaiting a fetch attempt
#[derive(Debug, Default)]
pub struct Frontier {
    inner: Mutex<FrontierInner>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, FrontierInner> {
        // Every critical section leaves the queues consistent, so a panic in
        // another holder does not invalidate the data.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Adds a URL under the given tier unless it was already enqueued or visited
    ///
    /// Returns true if the URL was newly enqueued.
    pub fn push(&self, url: Url, tier: Tier) -> bool {
        let key = dedup_key(&url);
        let mut inner = self.lock();

        if let Some(state) = inner.seen.get(&key) {
            tracing::trace!("Frontier skip ({}): {}", state, key);
            return false;
        }

        inner.seen.insert(key.clone(), UrlState::Enqueued);
        let entry = FrontierEntry { url, key, tier };
        match tier {
            Tier::High => inner.high.push_back(entry),
            Tier::Low => inner.low.push_back(entry),
        }
        true
    }

    /// Removes and returns the next entry, preferring the high tier
    ///
    /// The popped URL stays `Enqueued` in the seen-set until
    /// [`Frontier::mark_visited`] is called, so it cannot be re-pushed while
    /// its fetch is in flight. Entries that were marked visited while still
    /// queued (a redirect landed on them) are dropped.
    pub fn pop(&self) -> Option<FrontierEntry> {
        let mut inner = self.lock();
        loop {
            let entry = match inner.high.pop_front() {
                Some(entry) => entry,
                None => inner.low.pop_front()?,
            };
            if inner.seen.get(&entry.key) == Some(&UrlState::Visited) {
                tracing::trace!("Frontier drop (already visited): {}", entry.key);
                continue;
            }
            return Some(entry);
        }
    }

    /// Records that a URL has been fully processed
    ///
    /// Accepts keys that were never enqueued (for example the target of a
    /// redirect), which moves them straight to `Visited`. Returns false if the
    /// key was already visited.
    pub fn mark_visited(&self, key: &str) -> bool {
        let mut inner = self.lock();
        match inner.seen.get(key).copied() {
            Some(state) if !state.can_transition_to(UrlState::Visited) => false,
            _ => {
                inner.seen.insert(key.to_string(), UrlState::Visited);
                true
            }
        }
    }

    /// Returns the lifecycle state of a key, or None if it was never seen
    pub fn state(&self, key: &str) -> Option<UrlState> {
        self.lock().seen.get(key).copied()
    }

    /// Number of queued entries across both tiers
    pub fn len(&self) -> usize {
        let inner = self.lock();
        inner.high.len() + inner.low.len()
    }

    pub fn is_empty(&self) -> bool {
        let inner = self.lock();
        inner.high.is_empty() && inner.low.is_empty()
    }

    /// Queue lengths as `(high, low)`
    pub fn tier_lengths(&self) -> (usize, usize) {
        let inner = self.lock();
        (inner.high.len(), inner.low.len())
    }

    /// Keys of every visited URL, sorted
    pub fn visited(&self) -> Vec<String> {
        let inner = self.lock();
        let mut keys: Vec<String> = inner
            .seen
            .iter()
            .filter(|(_, state)| **state == UrlState::Visited)
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Number of distinct URLs the frontier has ever seen
    pub fn seen_count(&self) -> usize {
        self.lock().seen.len()
    }
}
