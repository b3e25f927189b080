//! Search and sort query model.
//!
//! A [`FeedQuery`] is an immutable value: every change of keyword, sort key or
//! order produces a new query rather than mutating one already issued.

use crate::domain::error::FeedError;
use crate::domain::post::Post;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;

/// Field the server sorts results by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortKey {
    #[default]
    #[serde(rename = "createdAt")]
    CreatedAt,
    #[serde(rename = "votes")]
    Votes,
}

impl SortKey {
    /// Wire name used in the `sortBy` query parameter.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreatedAt => "createdAt",
            Self::Votes => "votes",
        }
    }
}

impl FromStr for SortKey {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "createdAt" => Ok(Self::CreatedAt),
            "votes" => Ok(Self::Votes),
            other => Err(FeedError::Validation(format!("unknown sort key '{other}'"))),
        }
    }
}

/// Direction of the sort. Newest or most voted first by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    /// Wire name used in the `order` query parameter.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl FromStr for SortOrder {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(FeedError::Validation(format!("unknown sort order '{other}'"))),
        }
    }
}

/// Keyword plus sort settings for one read of the feed.
///
/// The default query matches everything, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FeedQuery {
    /// Case-insensitive text filter. Empty matches every post.
    pub keyword: String,
    pub sort_by: SortKey,
    pub order: SortOrder,
}

impl FeedQuery {
    #[must_use]
    pub fn new(keyword: impl Into<String>, sort_by: SortKey, order: SortOrder) -> Self {
        Self {
            keyword: keyword.into(),
            sort_by,
            order,
        }
    }

    /// Parses the raw `{keyword, sortBy, order}` triple a search form emits.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Validation`] for an unknown sort key or order.
    pub fn from_params(keyword: &str, sort_by: &str, order: &str) -> crate::domain::Result<Self> {
        Ok(Self::new(keyword, sort_by.parse()?, order.parse()?))
    }

    /// Orders two posts the way this query would have the server order them.
    ///
    /// Used only for posts the client inserts itself; server results keep
    /// their server order.
    #[must_use]
    pub fn compare(&self, a: &Post, b: &Post) -> Ordering {
        let ascending = match self.sort_by {
            SortKey::CreatedAt => a.created_at.cmp(&b.created_at),
            SortKey::Votes => a
                .vote_count()
                .cmp(&b.vote_count())
                .then_with(|| a.created_at.cmp(&b.created_at)),
        };
        match self.order {
            SortOrder::Asc => ascending,
            SortOrder::Desc => ascending.reverse(),
        }
    }
}
