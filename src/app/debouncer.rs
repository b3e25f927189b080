//! Quiet-period coalescing of search/sort input.
//!
//! [`QueryDebouncer`] is clock-driven: callers pass the current instant to
//! [`submit`](QueryDebouncer::submit) and [`poll`](QueryDebouncer::poll), and
//! read [`deadline`](QueryDebouncer::deadline) to know when to poll next. The
//! runtime turns the deadline into a timer; tests use explicit instants.

use crate::domain::FeedQuery;
use std::time::{Duration, Instant};

/// Default quiet interval between the last keystroke and the outbound query.
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(300);

/// Holds the latest search/sort input until it has been quiet long enough.
#[derive(Debug, Clone)]
pub struct QueryDebouncer {
    quiet: Duration,
    pending: Option<(FeedQuery, Instant)>,
}

impl Default for QueryDebouncer {
    fn default() -> Self {
        Self::new(DEFAULT_QUIET_PERIOD)
    }
}

impl QueryDebouncer {
    #[must_use]
    pub const fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            pending: None,
        }
    }

    /// Records `query` as the latest input and restarts the quiet period.
    ///
    /// Any query submitted earlier and not yet emitted is dropped.
    pub fn submit(&mut self, query: FeedQuery, now: Instant) {
        if let Some((superseded, _)) = &self.pending {
            tracing::trace!(keyword = %superseded.keyword, "debounced query superseded");
        }
        self.pending = Some((query, now + self.quiet));
    }

    /// Returns the pending query if its quiet period has elapsed at `now`.
    ///
    /// Emits at most once per submitted query.
    pub fn poll(&mut self, now: Instant) -> Option<FeedQuery> {
        match &self.pending {
            Some((_, due)) if now >= *due => self.pending.take().map(|(query, _)| query),
            _ => None,
        }
    }

    /// Instant at which the pending query becomes ready, if any.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, due)| *due)
    }

    /// Drops the pending query without emitting it.
    pub fn cancel(&mut self) -> Option<FeedQuery> {
        self.pending.take().map(|(query, _)| query)
    }

    /// Quiet interval required before a query is emitted.
    #[must_use]
    pub const fn quiet_period(&self) -> Duration {
        self.quiet
    }
}
