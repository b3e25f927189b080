//! Wire models for the remote JSON API.
//!
//! These types mirror the server's field names (`_id`, `data`, `votes`,
//! `createAt`) and are converted into domain [`Post`]s at the boundary so the
//! rest of the crate never sees the wire spelling.

use crate::domain::{Identity, Post, PostId, VoterSet};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A post as the server serializes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub username: Option<String>,
    pub data: String,
    #[serde(default)]
    pub votes: Vec<String>,
    /// ISO-8601 timestamp.
    #[serde(rename = "createAt", alias = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl From<PostRecord> for Post {
    fn from(record: PostRecord) -> Self {
        let username = record
            .username
            .unwrap_or_else(|| display_name(&record.email));
        Self {
            id: PostId::new(record.id),
            author: Identity::new(record.email, username),
            body: record.data,
            voters: record.votes.into_iter().collect(),
            created_at: record.created_at,
        }
    }
}

/// Body of `POST /metadata/post`.
#[derive(Debug, Clone, Serialize)]
pub struct NewPostBody<'a> {
    pub data: &'a str,
    pub email: &'a str,
    pub username: &'a str,
}

/// Body of `PATCH /metadata/{id}`.
#[derive(Debug, Clone, Serialize)]
pub struct EditPostBody<'a> {
    pub data: &'a str,
}

/// Response of `POST /metadata/{id}/vote`.
#[derive(Debug, Clone, Deserialize)]
pub struct VoteResponse {
    pub voters: Vec<String>,
}

impl From<VoteResponse> for VoterSet {
    fn from(response: VoteResponse) -> Self {
        response.voters.into_iter().collect()
    }
}

/// Response of `GET auth/me`.
#[derive(Debug, Clone, Deserialize)]
pub struct MeResponse {
    pub user: UserRecord,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserRecord {
    pub email: String,
    #[serde(default)]
    pub username: Option<String>,
}

impl From<UserRecord> for Identity {
    fn from(user: UserRecord) -> Self {
        let username = user.username.unwrap_or_else(|| display_name(&user.email));
        Self::new(user.email, username)
    }
}

/// Falls back to the local part of an email when no username is known.
fn display_name(email: &str) -> String {
    email.split('@').next().unwrap_or(email).to_string()
}
