//! Dispatch, budget and termination detection
//!
//! The scheduler owns the crawl phase and the count of fetches in flight.
//! Workers ask it for the next frontier entry; it answers with an entry, a
//! stop, or parks the worker until something changes.
//!
//! Termination needs the frontier and the in-flight count to agree. Both are
//! read under the scheduler lock, and every event that could change the
//! answer (new links pushed, a fetch completing, cancellation) notifies
//! waiters under the same lock. A worker that decides to wait registers for
//! the notification before releasing the lock, so no wakeup is lost between
//! the check and the wait.
//!
//! Lock order is always scheduler, then frontier.

use crate::crawler::frontier::{Frontier, FrontierEntry};
use crate::state::CrawlPhase;
use crate::CrawlError;
use std::pin::Pin;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::futures::Notified;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
struct SchedulerState {
    phase: CrawlPhase,

    /// Entries handed out whose processing has not finished
    in_flight: usize,

    /// Entries handed out since the crawl started
    dispatched: u64,
}

enum Dispatch<'a> {
    Ready(FrontierEntry),
    Stop,
    Wait(Pin<Box<Notified<'a>>>),
}

/// Hands out frontier entries and decides when the crawl is over
///
/// The crawl budget counts dispatched entries: once `max_pages` entries have
/// been handed out the phase moves to `Draining` and no further entries are
/// dispatched. Entries already in flight finish normally.
#[derive(Debug)]
pub struct Scheduler {
    state: Mutex<SchedulerState>,
    notify: Notify,
    cancel: CancellationToken,
    max_pages: Option<u64>,
}

impl Scheduler {
    pub fn new(max_pages: Option<u64>, cancel: CancellationToken) -> Self {
        Self {
            state: Mutex::new(SchedulerState {
                phase: CrawlPhase::Seeded,
                in_flight: 0,
                dispatched: 0,
            }),
            notify: Notify::new(),
            cancel,
            max_pages,
        }
    }

    fn lock(&self) -> MutexGuard<'_, SchedulerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn phase(&self) -> CrawlPhase {
        self.lock().phase
    }

    pub fn in_flight(&self) -> usize {
        self.lock().in_flight
    }

    pub fn dispatched(&self) -> u64 {
        self.lock().dispatched
    }

    pub fn max_pages(&self) -> Option<u64> {
        self.max_pages
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Moves to `to`, rejecting transitions the phase machine does not allow
    pub fn transition(&self, to: CrawlPhase) -> Result<(), CrawlError> {
        let mut state = self.lock();
        let from = state.phase;
        if !from.can_transition_to(to) {
            return Err(CrawlError::InvalidTransition { from, to });
        }

        tracing::debug!("Crawl phase {} -> {}", from, to);
        state.phase = to;
        self.notify.notify_waiters();
        Ok(())
    }

    /// Stops dispatching new work
    ///
    /// Has no effect once the crawl is already draining or done.
    pub fn begin_draining(&self, reason: &str) {
        let mut state = self.lock();
        self.drain_locked(&mut state, reason);
    }

    fn drain_locked(&self, state: &mut SchedulerState, reason: &str) {
        if state.phase.can_transition_to(CrawlPhase::Draining) {
            tracing::info!("Draining crawl: {}", reason);
            state.phase = CrawlPhase::Draining;
            self.notify.notify_waiters();
        }
    }

    fn try_dispatch(&self, frontier: &Frontier) -> Dispatch<'_> {
        let mut state = self.lock();

        if self.cancel.is_cancelled() {
            self.drain_locked(&mut state, "stop requested");
        }

        if !state.phase.accepts_work() {
            return Dispatch::Stop;
        }

        if let Some(max) = self.max_pages {
            if state.dispatched >= max {
                self.drain_locked(&mut state, "crawl budget reached");
                return Dispatch::Stop;
            }
        }

        if let Some(entry) = frontier.pop() {
            state.in_flight += 1;
            state.dispatched += 1;

            if self.max_pages == Some(state.dispatched) {
                self.drain_locked(&mut state, "crawl budget reached");
            }
            return Dispatch::Ready(entry);
        }

        if state.in_flight == 0 {
            self.drain_locked(&mut state, "frontier exhausted");
            return Dispatch::Stop;
        }

        // Another worker may still push links; wait for it under the lock
        let mut notified = Box::pin(self.notify.notified());
        notified.as_mut().enable();
        Dispatch::Wait(notified)
    }

    /// Waits for the next entry to process
    ///
    /// Returns None once the crawl is draining: the frontier ran dry with
    /// nothing in flight, the budget was spent, or a stop was requested.
    /// Every `Some` must be paired with one call to [`Scheduler::complete`].
    pub async fn next(&self, frontier: &Frontier) -> Option<FrontierEntry> {
        loop {
            match self.try_dispatch(frontier) {
                Dispatch::Ready(entry) => return Some(entry),
                Dispatch::Stop => return None,
                Dispatch::Wait(notified) => {
                    tokio::select! {
                        _ = notified => {}
                        _ = self.cancel.cancelled() => {}
                    }
                }
            }
        }
    }

    /// Records that a dispatched entry has been fully processed
    pub fn complete(&self) {
        let mut state = self.lock();
        state.in_flight = state.in_flight.saturating_sub(1);
        self.notify.notify_waiters();
    }

    /// Wakes idle workers after new entries were pushed
    pub fn notify_work(&self) {
        let _state = self.lock();
        self.notify.notify_waiters();
    }
}
