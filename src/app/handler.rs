//! Event handling entry point.
//!
//! Everything that can change feed state arrives as an [`Event`]: user intents
//! forwarded by the view, timer ticks, and completed remote calls.
//! [`handle_event`] routes each one to the [`FeedController`] and reports
//! whether the view should re-render plus the actions to execute.
//!
//! # Example
//!
//! ```rust
//! use feedsync::app::{handle_event, Event, FeedController};
//! use feedsync::domain::Identity;
//! use std::time::{Duration, Instant};
//!
//! let mut feed = FeedController::new(Identity::new("me@x", "me"), Duration::from_millis(300));
//! let (should_render, actions) = handle_event(&mut feed, Event::Refresh, Instant::now())?;
//! assert!(should_render); // loading indicator turned on
//! assert_eq!(actions.len(), 1);
//! # Ok::<(), feedsync::FeedError>(())
//! ```

use super::actions::Action;
use super::controller::FeedController;
use crate::domain::{FeedQuery, PostId, Result};
use crate::worker::messages::RemoteResponse;
use std::time::Instant;

/// Inputs to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Keyword, sort key or order changed. Debounced.
    SearchSortChanged(FeedQuery),
    /// Re-fetch the active query now.
    Refresh,
    /// Time passed; fires a due debounced query.
    Tick,
    /// Publish a new post.
    CreatePost { text: String },
    /// Open the edit draft for a post.
    BeginEdit { id: PostId },
    /// The user typed into an edit draft.
    UpdateDraft { id: PostId, text: String },
    /// Close an edit draft without saving.
    DiscardDraft { id: PostId },
    /// Replace the draft with `text` and save.
    EditPost { id: PostId, text: String },
    /// Save the current draft.
    SaveEdit { id: PostId },
    DeletePost { id: PostId },
    ToggleVote { id: PostId },
    /// A remote call finished.
    Response(RemoteResponse),
}

/// Processes one event against the controller.
///
/// Returns `(should_render, actions)`. Render is requested when the snapshot
/// version or the loading indicator changed, or a notice was produced.
///
/// # Errors
///
/// Write intents rejected before dispatch (validation, pending same-kind
/// write, unknown post). State is unchanged in that case.
pub fn handle_event(feed: &mut FeedController, event: Event, now: Instant) -> Result<(bool, Vec<Action>)> {
    let _span = tracing::debug_span!("handle_event", event = event_name(&event)).entered();

    let version = feed.version();
    let loading = feed.is_loading();

    let actions = match event {
        Event::SearchSortChanged(query) => {
            feed.on_search_sort_change(query, now);
            feed.poll(now)
        }
        Event::Refresh => vec![feed.refresh()],
        Event::Tick => feed.poll(now),
        Event::CreatePost { text } => vec![feed.create_post(&text)?],
        Event::BeginEdit { id } => {
            feed.begin_edit(&id)?;
            vec![]
        }
        Event::UpdateDraft { id, text } => {
            feed.update_draft(&id, text);
            vec![]
        }
        Event::DiscardDraft { id } => {
            feed.discard_draft(&id);
            vec![]
        }
        Event::EditPost { id, text } => vec![feed.edit_post(&id, text)?],
        Event::SaveEdit { id } => vec![feed.save_edit(&id)?],
        Event::DeletePost { id } => vec![feed.delete_post(&id)?],
        Event::ToggleVote { id } => vec![feed.toggle_vote(&id)?],
        Event::Response(response) => feed.on_response(response),
    };

    let notified = actions.iter().any(|a| matches!(a, Action::Notify(_)));
    let should_render = notified || feed.version() != version || feed.is_loading() != loading;

    tracing::debug!(
        action_count = actions.len(),
        should_render,
        "event handled"
    );
    Ok((should_render, actions))
}

const fn event_name(event: &Event) -> &'static str {
    match event {
        Event::SearchSortChanged(_) => "search_sort_changed",
        Event::Refresh => "refresh",
        Event::Tick => "tick",
        Event::CreatePost { .. } => "create_post",
        Event::BeginEdit { .. } => "begin_edit",
        Event::UpdateDraft { .. } => "update_draft",
        Event::DiscardDraft { .. } => "discard_draft",
        Event::EditPost { .. } => "edit_post",
        Event::SaveEdit { .. } => "save_edit",
        Event::DeletePost { .. } => "delete_post",
        Event::ToggleVote { .. } => "toggle_vote",
        Event::Response(_) => "response",
    }
}
