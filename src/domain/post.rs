//! Post domain model.
//!
//! A [`Post`] is a short text published by an author and voted on by other
//! users. Identities are keyed by email; the voter list is an insertion-ordered
//! set so membership checks are O(1) and a voter can never appear twice.

use chrono::{DateTime, Utc};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// Server-assigned post identifier. Opaque to the client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(String);

impl PostId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PostId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PostId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// The signed-in user as resolved by the auth collaborator.
///
/// Email is the stable identity key; username is display-only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    /// Stable key for ownership and votes.
    pub email: String,
    /// Shown on cards and in the prompt.
    pub username: String,
}

impl Identity {
    #[must_use]
    pub fn new(email: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            username: username.into(),
        }
    }
}

/// A post's author. Same shape as the signed-in identity so ownership is an
/// email comparison.
pub type Author = Identity;

/// Ordered set of voter emails.
///
/// Duplicates collapse on construction and insertion; the first occurrence
/// keeps its position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoterSet(IndexSet<String>);

impl VoterSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `email` has voted.
    #[must_use]
    pub fn contains(&self, email: &str) -> bool {
        self.0.contains(email)
    }

    /// Number of distinct voters, i.e. the vote count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Adds a voter. Returns `false` if already present.
    pub fn insert(&mut self, email: impl Into<String>) -> bool {
        self.0.insert(email.into())
    }

    /// Removes a voter, preserving the order of the others.
    pub fn remove(&mut self, email: &str) -> bool {
        self.0.shift_remove(email)
    }

    /// Flips membership of `email`. Returns whether it is a member afterwards.
    pub fn toggle(&mut self, email: &str) -> bool {
        if self.remove(email) {
            false
        } else {
            self.insert(email);
            true
        }
    }

    /// Voter emails in first-vote order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for VoterSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// A post as known to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub author: Author,
    /// Post text.
    pub body: String,
    /// Who voted. The vote count is its length.
    pub voters: VoterSet,
    /// Server creation time; the `createdAt` sort key.
    pub created_at: DateTime<Utc>,
}

impl Post {
    /// Number of votes.
    #[must_use]
    pub fn vote_count(&self) -> usize {
        self.voters.len()
    }

    /// Whether `email` is among the voters.
    #[must_use]
    pub fn has_voted(&self, email: &str) -> bool {
        self.voters.contains(email)
    }

    /// Whether `email` authored this post.
    #[must_use]
    pub fn is_owned_by(&self, email: &str) -> bool {
        self.author.email == email
    }
}
