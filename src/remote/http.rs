//! HTTP implementation of the remote store.
//!
//! [`HttpRemote`] talks to the JSON API with `reqwest`. Every request carries
//! the session cookie from the configured [`CredentialProvider`] and is bounded
//! by the configured timeout.
//!
//! Error mapping:
//!
//! - transport errors and timeouts → [`FeedError::NetworkFailure`]
//! - non-2xx statuses → [`FeedError::ServerRejected`] with the response body
//! - undecodable bodies → [`FeedError::Decode`]

use super::backend::{AuthProvider, CredentialProvider, RemoteStore};
use super::models::{EditPostBody, MeResponse, NewPostBody, PostRecord, VoteResponse};
use crate::domain::{FeedError, FeedQuery, Identity, Post, PostId, Result, VoterSet};
use crate::Config;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, Url};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HttpRemote {
    client: Client,
    base_url: Url,
    credentials: Arc<dyn CredentialProvider>,
}

impl HttpRemote {
    /// Creates a client rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// [`FeedError::Config`] if the URL is not absolute or the client cannot
    /// be built.
    pub fn new(base_url: &str, credentials: Arc<dyn CredentialProvider>, timeout: Duration) -> Result<Self> {
        let mut base_url =
            Url::parse(base_url).map_err(|e| FeedError::Config(format!("invalid base_url '{base_url}': {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(FeedError::Config(format!("base_url '{base_url}' cannot be a base")));
        }
        // `Url::join` replaces the last segment unless the path ends with '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FeedError::Config(format!("failed to build HTTP client: {e}")))?;

        tracing::debug!(base_url = %base_url, timeout_ms = timeout.as_millis() as u64, "http remote ready");
        Ok(Self {
            client,
            base_url,
            credentials,
        })
    }

    /// Builds the client from configuration.
    ///
    /// # Errors
    ///
    /// See [`HttpRemote::new`].
    pub fn from_config(config: &Config, credentials: Arc<dyn CredentialProvider>) -> Result<Self> {
        Self::new(&config.base_url, credentials, config.request_timeout())
    }

    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| FeedError::Config(format!("invalid endpoint '{path}': {e}")))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.credentials.cookie() {
            Some(cookie) => request.header(reqwest::header::COOKIE, cookie),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = self.authorize(request).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = if body.trim().is_empty() {
            status.canonical_reason().unwrap_or_default().to_string()
        } else {
            body
        };
        Err(FeedError::ServerRejected {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl RemoteStore for HttpRemote {
    async fn search(&self, query: &FeedQuery) -> Result<Vec<Post>> {
        let url = self.url("metadata/search")?;
        let request = self.client.get(url).query(&[
            ("keyword", query.keyword.as_str()),
            ("sortBy", query.sort_by.as_str()),
            ("order", query.order.as_str()),
        ]);
        let records: Vec<PostRecord> = self.send(request).await?.json().await?;
        Ok(records.into_iter().map(Post::from).collect())
    }

    async fn create_post(&self, text: &str, author: &Identity) -> Result<Post> {
        let url = self.url("metadata/post")?;
        let body = NewPostBody {
            data: text,
            email: &author.email,
            username: &author.username,
        };
        let record: PostRecord = self.send(self.client.post(url).json(&body)).await?.json().await?;
        Ok(record.into())
    }

    async fn edit_post(&self, id: &PostId, text: &str) -> Result<Option<Post>> {
        let url = self.url(&format!("metadata/{id}"))?;
        let body = EditPostBody { data: text };
        let response = self.send(self.client.patch(url).json(&body)).await?;
        let text = response.text().await?;
        // Confirmation bodies vary; only a full record is used.
        Ok(serde_json::from_str::<PostRecord>(&text).ok().map(Post::from))
    }

    async fn delete_post(&self, id: &PostId) -> Result<()> {
        let url = self.url(&format!("metadata/{id}"))?;
        self.send(self.client.delete(url)).await?;
        Ok(())
    }

    async fn toggle_vote(&self, id: &PostId) -> Result<VoterSet> {
        let url = self.url(&format!("metadata/{id}/vote"))?;
        let response: VoteResponse = self.send(self.client.post(url)).await?.json().await?;
        Ok(response.into())
    }
}

#[async_trait]
impl AuthProvider for HttpRemote {
    async fn current_user(&self) -> Result<Identity> {
        let url = self.url("auth/me")?;
        match self.send(self.client.get(url)).await {
            Ok(response) => {
                let me: MeResponse = response.json().await?;
                Ok(me.user.into())
            }
            Err(FeedError::ServerRejected { status, .. }) => {
                tracing::debug!(status, "session rejected");
                Err(FeedError::Unauthenticated)
            }
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::backend::StaticCredentials;
    use crate::domain::{SortKey, SortOrder};
    use mockito::{Matcher, Server};

    fn remote(server: &mockito::ServerGuard) -> HttpRemote {
        let credentials = Arc::new(StaticCredentials::new(Some("sid=abc".to_string())));
        HttpRemote::new(&server.url(), credentials, Duration::from_secs(5)).unwrap()
    }

    const POST_JSON: &str = r#"{"_id":"p1","email":"a@x","username":"a","data":"hello","votes":["b@x"],"createAt":"2024-05-01T12:00:00Z"}"#;

    #[tokio::test]
    async fn search_sends_query_and_cookie() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/metadata/search")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("keyword".into(), "cat".into()),
                Matcher::UrlEncoded("sortBy".into(), "votes".into()),
                Matcher::UrlEncoded("order".into(), "asc".into()),
            ]))
            .match_header("cookie", "sid=abc")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(format!("[{POST_JSON}]"))
            .create_async()
            .await;

        let posts = remote(&server)
            .search(&FeedQuery::new("cat", SortKey::Votes, SortOrder::Asc))
            .await
            .unwrap();

        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].id.as_str(), "p1");
        assert!(posts[0].has_voted("b@x"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn create_posts_author_fields() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/metadata/post")
            .match_body(Matcher::Json(serde_json::json!({
                "data": "hello", "email": "a@x", "username": "a"
            })))
            .with_status(201)
            .with_body(POST_JSON)
            .create_async()
            .await;

        let post = remote(&server)
            .create_post("hello", &Identity::new("a@x", "a"))
            .await
            .unwrap();
        assert_eq!(post.body, "hello");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn edit_accepts_bare_confirmation() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("PATCH", "/metadata/p1")
            .match_body(Matcher::Json(serde_json::json!({"data": "new"})))
            .with_status(200)
            .with_body(r#"{"message":"updated"}"#)
            .create_async()
            .await;

        let echoed = remote(&server).edit_post(&"p1".into(), "new").await.unwrap();
        assert!(echoed.is_none());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_success_status_is_server_rejected() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("DELETE", "/metadata/p1")
            .with_status(403)
            .with_body("not your post")
            .create_async()
            .await;

        let err = remote(&server).delete_post(&"p1".into()).await.unwrap_err();
        assert_eq!(
            err,
            FeedError::ServerRejected {
                status: 403,
                message: "not your post".into()
            }
        );
    }

    #[tokio::test]
    async fn vote_returns_normalized_voter_set() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/metadata/p1/vote")
            .with_status(200)
            .with_body(r#"{"voters":["a@x","b@x","a@x"]}"#)
            .create_async()
            .await;

        let voters = remote(&server).toggle_vote(&"p1".into()).await.unwrap();
        assert_eq!(voters.iter().collect::<Vec<_>>(), vec!["a@x", "b@x"]);
    }

    #[tokio::test]
    async fn malformed_body_is_decode_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/metadata/search")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let err = remote(&server).search(&FeedQuery::default()).await.unwrap_err();
        assert!(matches!(err, FeedError::Decode(_)), "{err:?}");
    }

    #[tokio::test]
    async fn current_user_maps_rejection_to_unauthenticated() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/auth/me")
            .with_status(401)
            .create_async()
            .await;

        let err = remote(&server).current_user().await.unwrap_err();
        assert_eq!(err, FeedError::Unauthenticated);
    }

    #[tokio::test]
    async fn current_user_decodes_identity() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/auth/me")
            .with_status(200)
            .with_body(r#"{"user":{"email":"a@x","username":"alice"}}"#)
            .create_async()
            .await;

        let me = remote(&server).current_user().await.unwrap();
        assert_eq!(me, Identity::new("a@x", "alice"));
    }

    #[test]
    fn relative_base_url_is_a_config_error() {
        let credentials = Arc::new(StaticCredentials::default());
        let err = HttpRemote::new("localhost:3333", credentials, Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, FeedError::Config(_)));
    }

    #[test]
    fn base_url_without_trailing_slash_keeps_its_path() {
        let credentials = Arc::new(StaticCredentials::default());
        let remote = HttpRemote::new("http://localhost:3333/api", credentials, Duration::from_secs(1)).unwrap();
        assert_eq!(
            remote.url("metadata/search").unwrap().as_str(),
            "http://localhost:3333/api/metadata/search"
        );
    }
}
