//! Remote store abstraction.
//!
//! The [`RemoteStore`] trait is the seam between the network worker and
//! whatever actually answers the calls: [`HttpRemote`](super::HttpRemote) in
//! production, scripted fakes in tests. Each method maps to one endpoint and
//! knows nothing about sequencing or rollback.

use crate::domain::{FeedQuery, Identity, Post, PostId, Result, VoterSet};
use async_trait::async_trait;

/// Calls the feed engine makes against the server.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// `GET /metadata/search?keyword=&sortBy=&order=`. Results in server order.
    async fn search(&self, query: &FeedQuery) -> Result<Vec<Post>>;

    /// `POST /metadata/post`. Returns the canonical post with its server id.
    async fn create_post(&self, text: &str, author: &Identity) -> Result<Post>;

    /// `PATCH /metadata/{id}`. Returns the updated post if the server echoes it.
    async fn edit_post(&self, id: &PostId, text: &str) -> Result<Option<Post>>;

    /// `DELETE /metadata/{id}`.
    async fn delete_post(&self, id: &PostId) -> Result<()>;

    /// `POST /metadata/{id}/vote`. Returns the authoritative voter set.
    async fn toggle_vote(&self, id: &PostId) -> Result<VoterSet>;
}

/// Resolves the signed-in user.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// # Errors
    ///
    /// [`FeedError::Unauthenticated`](crate::FeedError::Unauthenticated) when
    /// there is no valid session.
    async fn current_user(&self) -> Result<Identity>;
}

/// Supplies session credentials for each outbound request.
pub trait CredentialProvider: Send + Sync + std::fmt::Debug {
    /// Value of the `Cookie` header, if any.
    fn cookie(&self) -> Option<String>;
}

/// A fixed session cookie, e.g. from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    cookie: Option<String>,
}

impl StaticCredentials {
    #[must_use]
    pub const fn new(cookie: Option<String>) -> Self {
        Self { cookie }
    }
}

impl CredentialProvider for StaticCredentials {
    fn cookie(&self) -> Option<String> {
        self.cookie.clone()
    }
}
