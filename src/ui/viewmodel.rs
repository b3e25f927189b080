//! View model types representing renderable feed state.
//!
//! A [`FeedViewModel`] is computed from the controller after every change and
//! holds display-ready data only: formatted timestamps, keyword highlight
//! ranges, and per-post control state (voted, pending, owned).
//!
//! # Example
//!
//! ```rust
//! use feedsync::app::FeedController;
//! use feedsync::domain::Identity;
//! use feedsync::ui::FeedViewModel;
//! use std::time::Duration;
//!
//! let feed = FeedController::new(Identity::new("me@x", "me"), Duration::from_millis(300));
//! let vm = FeedViewModel::compute(&feed, chrono::Utc::now());
//! assert!(vm.cards.is_empty());
//! assert_eq!(vm.empty_state.unwrap().message, "No posts found.");
//! ```

use crate::app::FeedController;
use crate::domain::{MutationKind, Post, PostId};
use chrono::{DateTime, Utc};
use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;

const SECONDS_PER_MINUTE: i64 = 60;
const SECONDS_PER_HOUR: i64 = 3600;
const SECONDS_PER_DAY: i64 = 86400;

/// Everything a view needs to draw the feed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedViewModel {
    /// Display name of the signed-in user.
    pub user: String,

    pub search_bar: SearchBarInfo,

    /// Posts in snapshot order.
    pub cards: Vec<PostCard>,

    /// A read for the newest query is in flight.
    pub loading: bool,

    /// Set when there is nothing to show.
    pub empty_state: Option<EmptyState>,

    /// Text of the compose box.
    pub compose: String,

    /// Snapshot version this model was computed from.
    pub version: u64,
}

/// One rendered post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostCard {
    pub id: PostId,
    pub author: String,
    /// `YYYY-MM-DD HH:MM` in UTC.
    pub created_at: String,
    /// Relative age, e.g. `5m ago`.
    pub age: String,
    pub body: String,

    /// Character ranges of `body` matching the keyword, `(start, end)` with
    /// exclusive end.
    pub highlight_ranges: Vec<(usize, usize)>,

    pub vote_count: usize,
    pub has_voted: bool,
    /// Vote control is disabled while a toggle is outstanding.
    pub vote_pending: bool,
    /// Edit and delete controls are offered to the author only.
    pub is_owner: bool,
    /// An edit is being saved.
    pub saving: bool,
    /// Open edit draft, if any.
    pub draft: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchBarInfo {
    pub keyword: String,
    pub sort_by: &'static str,
    pub order: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmptyState {
    pub message: String,
}

impl FeedViewModel {
    /// Computes the view model from the controller's current state.
    #[must_use]
    pub fn compute(feed: &FeedController, now: DateTime<Utc>) -> Self {
        let snapshot = feed.snapshot();
        let query = feed.active_query();
        let user = feed.user();
        // Cards belong to the last applied read; highlight with its keyword.
        let shown_keyword = &feed.store().ordering().keyword;

        let matcher = if shown_keyword.trim().is_empty() {
            None
        } else {
            Some(SkimMatcherV2::default())
        };

        let cards: Vec<PostCard> = snapshot
            .posts()
            .iter()
            .map(|post| PostCard {
                id: post.id.clone(),
                author: post.author.username.clone(),
                created_at: post.created_at.format("%Y-%m-%d %H:%M").to_string(),
                age: time_ago(post.created_at, now),
                body: post.body.clone(),
                highlight_ranges: matcher
                    .as_ref()
                    .map(|m| highlight_ranges(m, post, shown_keyword))
                    .unwrap_or_default(),
                vote_count: post.vote_count(),
                has_voted: post.has_voted(&user.email),
                vote_pending: feed.is_vote_pending(&post.id),
                is_owner: post.is_owned_by(&user.email),
                saving: feed.is_pending(&post.id, MutationKind::Edit),
                draft: feed.draft(&post.id).map(ToString::to_string),
            })
            .collect();

        let empty_state = (cards.is_empty() && !feed.is_loading()).then(|| EmptyState {
            message: "No posts found.".to_string(),
        });

        Self {
            user: user.username.clone(),
            search_bar: SearchBarInfo {
                keyword: query.keyword.clone(),
                sort_by: query.sort_by.as_str(),
                order: query.order.as_str(),
            },
            cards,
            loading: feed.is_loading(),
            empty_state,
            compose: feed.compose_draft().to_string(),
            version: snapshot.version(),
        }
    }
}

/// Collapses matched character indices into contiguous ranges.
fn highlight_ranges(matcher: &SkimMatcherV2, post: &Post, keyword: &str) -> Vec<(usize, usize)> {
    let Some((_, indices)) = matcher.fuzzy_indices(&post.body, keyword.trim()) else {
        return vec![];
    };

    let mut ranges: Vec<(usize, usize)> = Vec::new();
    for index in indices {
        match ranges.last_mut() {
            Some((_, end)) if *end == index => *end += 1,
            _ => ranges.push((index, index + 1)),
        }
    }
    ranges
}

fn time_ago(created_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = (now - created_at).num_seconds();

    if diff < SECONDS_PER_MINUTE {
        "just now".to_string()
    } else if diff < SECONDS_PER_HOUR {
        format!("{}m ago", diff / SECONDS_PER_MINUTE)
    } else if diff < SECONDS_PER_DAY {
        format!("{}h ago", diff / SECONDS_PER_HOUR)
    } else {
        format!("{}d ago", diff / SECONDS_PER_DAY)
    }
}
