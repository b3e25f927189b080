//! In-memory remote store for tests.

use super::backend::RemoteStore;
use crate::domain::{FeedError, FeedQuery, Identity, Post, PostId, Result, VoterSet};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// Answers like the server would, with scripted latency and failures.
#[derive(Debug, Default)]
pub struct ScriptedRemote {
    /// Email the fake session belongs to; used for votes.
    user: String,
    posts: Mutex<Vec<Post>>,
    search_delays: Mutex<HashMap<String, Duration>>,
    delays: Mutex<HashMap<&'static str, Duration>>,
    failures: Mutex<HashMap<&'static str, FeedError>>,
    calls: Mutex<Vec<String>>,
    next_id: Mutex<u32>,
}

impl ScriptedRemote {
    pub fn new(user: &str, posts: Vec<Post>) -> Self {
        Self {
            user: user.to_string(),
            posts: Mutex::new(posts),
            ..Self::default()
        }
    }

    /// Delays searches for `keyword` by `delay`.
    pub fn delay_search(&self, keyword: &str, delay: Duration) {
        self.search_delays.lock().unwrap().insert(keyword.to_string(), delay);
    }

    /// Delays every call to `operation`.
    pub fn delay(&self, operation: &'static str, delay: Duration) {
        self.delays.lock().unwrap().insert(operation, delay);
    }

    /// Makes the next call to `operation` fail with `error`.
    pub fn fail_next(&self, operation: &'static str, error: FeedError) {
        self.failures.lock().unwrap().insert(operation, error);
    }

    /// Calls made so far, e.g. `search:cat` or `delete_post:p1`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn post_count(&self) -> usize {
        self.posts.lock().unwrap().len()
    }

    async fn enter(&self, operation: &'static str, detail: &str) -> Result<()> {
        self.calls.lock().unwrap().push(format!("{operation}:{detail}"));
        let delay = self.delays.lock().unwrap().get(operation).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match self.failures.lock().unwrap().remove(operation) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RemoteStore for ScriptedRemote {
    async fn search(&self, query: &FeedQuery) -> Result<Vec<Post>> {
        let delay = self.search_delays.lock().unwrap().get(&query.keyword).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.enter("search", &query.keyword).await?;

        let needle = query.keyword.to_lowercase();
        let mut posts: Vec<Post> = self
            .posts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.body.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        posts.sort_by(|a, b| query.compare(a, b));
        Ok(posts)
    }

    async fn create_post(&self, text: &str, author: &Identity) -> Result<Post> {
        self.enter("create_post", text).await?;
        let n = {
            let mut next = self.next_id.lock().unwrap();
            *next += 1;
            *next
        };
        let post = Post {
            id: PostId::new(format!("srv-{n}")),
            author: author.clone(),
            body: text.to_string(),
            voters: VoterSet::new(),
            created_at: Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap() + chrono::Duration::minutes(i64::from(n)),
        };
        self.posts.lock().unwrap().push(post.clone());
        Ok(post)
    }

    async fn edit_post(&self, id: &PostId, text: &str) -> Result<Option<Post>> {
        self.enter("edit_post", id.as_str()).await?;
        let mut posts = self.posts.lock().unwrap();
        let post = posts
            .iter_mut()
            .find(|p| &p.id == id)
            .ok_or_else(|| FeedError::ServerRejected {
                status: 404,
                message: "not found".into(),
            })?;
        post.body = text.to_string();
        Ok(Some(post.clone()))
    }

    async fn delete_post(&self, id: &PostId) -> Result<()> {
        self.enter("delete_post", id.as_str()).await?;
        self.posts.lock().unwrap().retain(|p| &p.id != id);
        Ok(())
    }

    async fn toggle_vote(&self, id: &PostId) -> Result<VoterSet> {
        self.enter("toggle_vote", id.as_str()).await?;
        let mut posts = self.posts.lock().unwrap();
        let post = posts
            .iter_mut()
            .find(|p| &p.id == id)
            .ok_or_else(|| FeedError::ServerRejected {
                status: 404,
                message: "not found".into(),
            })?;
        post.voters.toggle(&self.user);
        Ok(post.voters.clone())
    }
}
