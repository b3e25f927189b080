//! The façade the view layer talks to.
//!
//! [`FeedController`] owns the debouncer, the sequencer, the store and the
//! mutator, and is the only type a view needs: it takes user intents and
//! server responses, and hands back actions plus a snapshot to render.
//!
//! # Example
//!
//! ```rust
//! use feedsync::app::{Action, FeedController};
//! use feedsync::domain::{FeedQuery, Identity};
//! use std::time::{Duration, Instant};
//!
//! let mut feed = FeedController::new(Identity::new("me@x", "me"), Duration::from_millis(300));
//! let t0 = Instant::now();
//!
//! feed.on_search_sort_change(FeedQuery::from_params("cat", "votes", "desc")?, t0);
//! assert!(feed.poll(t0).is_empty());
//!
//! let actions = feed.poll(t0 + Duration::from_millis(300));
//! assert!(matches!(actions.as_slice(), [Action::Dispatch(_)]));
//! assert!(feed.is_loading());
//! # Ok::<(), feedsync::FeedError>(())
//! ```

use super::actions::{Action, Notice};
use super::debouncer::QueryDebouncer;
use super::mutator::OptimisticMutator;
use super::sequencer::RequestSequencer;
use super::store::{FeedSnapshot, FeedStore};
use crate::domain::{FeedError, FeedQuery, Identity, MutationKind, Post, PostId, Result};
use crate::worker::messages::{Outcome, RemoteRequest, RemoteResponse};
use std::time::{Duration, Instant};

/// Single owner of the feed state for one signed-in user.
#[derive(Debug, Clone)]
pub struct FeedController {
    user: Identity,
    debouncer: QueryDebouncer,
    sequencer: RequestSequencer,
    store: FeedStore,
    mutator: OptimisticMutator,
    /// Most recently issued query; what a manual refresh re-sends.
    active_query: FeedQuery,
}

impl FeedController {
    #[must_use]
    pub fn new(user: Identity, quiet_period: Duration) -> Self {
        Self {
            user,
            debouncer: QueryDebouncer::new(quiet_period),
            sequencer: RequestSequencer::new(),
            store: FeedStore::new(),
            mutator: OptimisticMutator::new(),
            active_query: FeedQuery::default(),
        }
    }

    // ---- reads ------------------------------------------------------------

    /// Records new search/sort input. The read goes out once input is quiet.
    pub fn on_search_sort_change(&mut self, query: FeedQuery, now: Instant) {
        tracing::debug!(keyword = %query.keyword, sort_by = query.sort_by.as_str(), order = query.order.as_str(), "search/sort changed");
        self.debouncer.submit(query, now);
    }

    /// Fires the debounced query if its quiet period has elapsed.
    pub fn poll(&mut self, now: Instant) -> Vec<Action> {
        self.debouncer
            .poll(now)
            .map(|query| vec![self.issue_read(query)])
            .unwrap_or_default()
    }

    /// When [`poll`](Self::poll) next has something to do.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.debouncer.deadline()
    }

    /// Re-issues the active query immediately, bypassing the debounce.
    pub fn refresh(&mut self) -> Action {
        self.issue_read(self.active_query.clone())
    }

    fn issue_read(&mut self, query: FeedQuery) -> Action {
        let seq = self.sequencer.issue();
        tracing::debug!(seq, keyword = %query.keyword, "issuing read");
        self.active_query = query.clone();
        Action::Dispatch(RemoteRequest::search(seq, query))
    }

    // ---- writes -----------------------------------------------------------

    /// # Errors
    ///
    /// [`FeedError::Validation`] for blank text.
    pub fn create_post(&mut self, text: &str) -> Result<Action> {
        self.mutator.create_post(text, &self.user).map(Action::Dispatch)
    }

    /// Opens an edit draft seeded with the post's current text.
    ///
    /// # Errors
    ///
    /// Unknown post or not the author.
    pub fn begin_edit(&mut self, id: &PostId) -> Result<String> {
        self.mutator
            .begin_edit(&self.store, id, &self.user)
            .map(ToString::to_string)
    }

    /// Stores what the user typed into the edit box of `id`.
    pub fn update_draft(&mut self, id: &PostId, text: impl Into<String>) {
        self.mutator.update_draft(id, text);
    }

    /// Closes the edit box of `id` without saving.
    pub fn discard_draft(&mut self, id: &PostId) -> Option<String> {
        self.mutator.discard_draft(id)
    }

    /// Puts `text` in the draft for `id` and saves it.
    ///
    /// # Errors
    ///
    /// Unknown post, not the author, blank text, or a save already pending.
    pub fn edit_post(&mut self, id: &PostId, text: impl Into<String>) -> Result<Action> {
        self.mutator.update_draft(id, text);
        self.save_edit(id)
    }

    /// Saves the current draft for `id`.
    ///
    /// # Errors
    ///
    /// See [`edit_post`](Self::edit_post).
    pub fn save_edit(&mut self, id: &PostId) -> Result<Action> {
        self.mutator
            .save_edit(&mut self.store, id, &self.user)
            .map(Action::Dispatch)
    }

    /// # Errors
    ///
    /// Unknown post, not the author, or a delete already pending.
    pub fn delete_post(&mut self, id: &PostId) -> Result<Action> {
        self.mutator
            .delete_post(&mut self.store, id, &self.user)
            .map(Action::Dispatch)
    }

    /// # Errors
    ///
    /// Unknown post or a toggle already pending.
    pub fn toggle_vote(&mut self, id: &PostId) -> Result<Action> {
        self.mutator
            .toggle_vote(&mut self.store, id, &self.user)
            .map(Action::Dispatch)
    }

    // ---- responses --------------------------------------------------------

    /// Applies a completed remote call. Failures become notices.
    pub fn on_response(&mut self, response: RemoteResponse) -> Vec<Action> {
        let result = match response {
            RemoteResponse::Searched {
                seq,
                query,
                outcome,
            } => self.on_read(seq, &query, outcome),
            RemoteResponse::Created {
                request_id,
                outcome,
            } => self
                .mutator
                .on_create_result(&mut self.store, request_id, outcome)
                .map_err(|e| Notice::new("Failed to create post", e)),
            RemoteResponse::Edited { id, outcome } => self
                .mutator
                .on_edit_result(&mut self.store, &id, outcome)
                .map_err(|e| Notice::new("Failed to save post", e)),
            RemoteResponse::Deleted { id, outcome } => self
                .mutator
                .on_delete_result(&mut self.store, &id, outcome)
                .map_err(|e| Notice::new("Failed to delete post", e)),
            RemoteResponse::VoteToggled { id, outcome } => self
                .mutator
                .on_vote_result(&mut self.store, &id, outcome)
                .map_err(|e| Notice::new("Error updating vote", e)),
        };

        match result {
            Ok(()) => vec![],
            Err(notice) if notice.error.is_user_visible() => vec![Action::Notify(notice)],
            Err(_) => vec![],
        }
    }

    fn on_read(&mut self, seq: u64, query: &FeedQuery, outcome: Outcome<Vec<Post>>) -> std::result::Result<(), Notice> {
        if let Err(stale) = self.sequencer.admit(seq) {
            return Err(Notice::new("Discarded response", stale));
        }
        match outcome {
            Ok(posts) => {
                tracing::debug!(seq, count = posts.len(), "applying read result");
                self.store.replace_all(posts, query);
                Ok(())
            }
            Err(err) => {
                tracing::warn!(seq, error = %err, "read failed, keeping previous snapshot");
                Err(Notice::new("Failed to fetch posts", err))
            }
        }
    }

    // ---- queries ----------------------------------------------------------

    /// The posts to render right now.
    #[must_use]
    pub fn snapshot(&self) -> FeedSnapshot {
        self.store.snapshot()
    }

    /// Store version; changes whenever the visible posts change.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.store.version()
    }

    /// Whether the newest read has not answered yet.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.sequencer.is_loading()
    }

    /// Whether the vote control for `id` should be disabled.
    #[must_use]
    pub fn is_vote_pending(&self, id: &PostId) -> bool {
        self.store.is_pending(id, MutationKind::Vote)
    }

    /// Whether a write of `kind` on `id` is awaiting the server.
    #[must_use]
    pub fn is_pending(&self, id: &PostId, kind: MutationKind) -> bool {
        self.store.is_pending(id, kind)
    }

    /// Open edit draft of `id`.
    #[must_use]
    pub fn draft(&self, id: &PostId) -> Option<&str> {
        self.mutator.draft(id)
    }

    /// Text of the compose box: kept after a failed create.
    #[must_use]
    pub fn compose_draft(&self) -> &str {
        self.mutator.compose()
    }

    pub fn set_compose_draft(&mut self, text: impl Into<String>) {
        self.mutator.set_compose(text);
    }

    /// The signed-in user writes are made as.
    #[must_use]
    pub const fn user(&self) -> &Identity {
        &self.user
    }

    /// Most recently issued query, which may still be loading.
    #[must_use]
    pub const fn active_query(&self) -> &FeedQuery {
        &self.active_query
    }

    #[must_use]
    pub const fn store(&self) -> &FeedStore {
        &self.store
    }
}

/// Validation errors never reach the server, so callers can tell them apart.
#[must_use]
pub const fn rejected_before_dispatch(err: &FeedError) -> bool {
    matches!(
        err,
        FeedError::Validation(_) | FeedError::MutationPending { .. } | FeedError::UnknownPost(_)
    )
}
