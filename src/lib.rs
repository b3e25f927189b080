//! Feedsync: client-side state reconciliation for a social post feed.
//!
//! Feedsync keeps a locally rendered feed consistent with a remote store
//! while the user searches, sorts, posts, edits, deletes and votes:
//! - Debounced search/sort with stale-response suppression
//! - Optimistic writes with precise rollback on failure
//! - Vote toggles reconciled against the server's voter set
//! - A tokio runtime that publishes view models for any front end
//! - Span export to JSON lines for offline debugging

#![allow(clippy::multiple_crate_versions)]

//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │  Terminal client (main.rs)                          │  ← Entry point
//! └─────────────────────────────────────────────────────┘
//!                        │
//! ┌─────────────────────────────────────────────────────┐
//! │  Runtime (runtime.rs)                               │  ← tokio task
//! │  - Commands, responses, debounce deadline           │
//! │  - View model publishing                            │
//! └─────────────────────────────────────────────────────┘
//!         │                    │                    │
//! ┌───────────────┐   ┌───────────────┐   ┌───────────────┐
//! │ Engine        │   │ Worker        │   │ UI            │
//! │ (app/)        │   │ (worker/)     │   │ (ui/)         │
//! │ - Debouncer   │   │ - Requests    │   │ - View model  │
//! │ - Sequencer   │   │ - Trace ctx   │   │ - Renderer    │
//! │ - Store       │   └───────────────┘   └───────────────┘
//! │ - Mutator     │           │
//! └───────────────┘   ┌───────────────┐
//!                     │ Remote        │
//!                     │ (remote/)     │
//!                     │ - HTTP client │
//!                     └───────────────┘
//!                        │
//! ┌─────────────────────────────────────────────────────┐
//! │  Domain, infrastructure, observability              │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`app`]: The sans-I/O engine with its event/action model
//! - [`domain`]: Posts, queries and errors
//! - [`remote`]: Remote store traits and the HTTP implementation
//! - [`worker`]: Executes remote requests
//! - [`runtime`]: Async driver and client handle
//! - [`ui`]: View model and text rendering
//! - [`infrastructure`]: Platform paths
//! - [`observability`]: Tracing setup and span export
//!
//! # Configuration
//!
//! ```toml
//! # ~/.config/feedsync/config.toml
//! base_url = "http://localhost:3333/"
//! session_cookie = "connect.sid=..."
//! debounce_ms = 300
//! request_timeout_secs = 10
//! trace_level = "debug"
//! trace_file = "~/.local/share/feedsync/feedsync-trace.jsonl"
//! ```
//!
//! # Example
//!
//! ```rust
//! use feedsync::{handle_event, initialize, Config, Event};
//! use feedsync::domain::Identity;
//! use std::time::Instant;
//!
//! let config = Config::default();
//! let mut feed = initialize(&config, Identity::new("me@x", "me"));
//!
//! let (should_render, actions) = handle_event(&mut feed, Event::Refresh, Instant::now())?;
//! assert!(should_render);
//! assert_eq!(actions.len(), 1);
//! # Ok::<(), feedsync::FeedError>(())
//! ```

pub mod app;
pub mod domain;
pub mod infrastructure;
pub mod remote;
pub mod runtime;
pub mod worker;

pub mod ui;

pub mod observability;

pub use app::{handle_event, Action, Event, FeedController, Notice};
pub use domain::{FeedError, FeedQuery, Identity, Post, PostId, Result};
pub use runtime::{FeedHandle, FeedRuntime};

use remote::{AuthProvider, HttpRemote, StaticCredentials};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use worker::FeedWorker;

const DEFAULT_BASE_URL: &str = "http://localhost:3333/";
const DEFAULT_DEBOUNCE_MS: u64 = 300;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Client configuration.
///
/// Built from a TOML file ([`Config::from_file`]), a string map such as
/// environment variables ([`Config::from_map`]), or [`Default`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root of the JSON API. Endpoints such as `metadata/search` resolve
    /// against it. Default: `http://localhost:3333/`
    pub base_url: String,

    /// `Cookie` header value identifying the session.
    pub session_cookie: Option<String>,

    /// Quiet period before a search/sort change is sent. Default: 300
    pub debounce_ms: u64,

    /// Upper bound on any remote call. Default: 10
    pub request_timeout_secs: u64,

    /// Options: `trace`, `debug`, `info`, `warn`, `error`. Default: `"info"`
    pub trace_level: Option<String>,

    /// Path of the JSON-lines span export. Export is off when unset.
    pub trace_file: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            session_cookie: None,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            trace_level: None,
            trace_file: None,
        }
    }
}

impl Config {
    /// Parses configuration from a string map.
    ///
    /// Unknown keys are ignored. Numbers that fail to parse fall back to their
    /// defaults.
    ///
    /// ```rust
    /// use std::collections::BTreeMap;
    /// use feedsync::Config;
    ///
    /// let mut map = BTreeMap::new();
    /// map.insert("base_url".to_string(), "https://feed.example/api/".to_string());
    /// map.insert("debounce_ms".to_string(), "150".to_string());
    ///
    /// let config = Config::from_map(&map);
    /// assert_eq!(config.base_url, "https://feed.example/api/");
    /// assert_eq!(config.debounce_ms, 150);
    /// assert_eq!(config.request_timeout_secs, 10);
    /// ```
    #[must_use]
    pub fn from_map(map: &BTreeMap<String, String>) -> Self {
        let non_empty = |key: &str| map.get(key).map(|v| v.trim()).filter(|v| !v.is_empty()).map(String::from);

        Self {
            base_url: non_empty("base_url").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            session_cookie: non_empty("session_cookie"),
            debounce_ms: map
                .get("debounce_ms")
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(DEFAULT_DEBOUNCE_MS),
            request_timeout_secs: map
                .get("request_timeout_secs")
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            trace_level: non_empty("trace_level"),
            trace_file: non_empty("trace_file"),
        }
    }

    /// Reads `FEEDSYNC_*` environment variables, e.g. `FEEDSYNC_BASE_URL`.
    #[must_use]
    pub fn from_env() -> Self {
        let map: BTreeMap<String, String> = std::env::vars()
            .filter_map(|(key, value)| {
                key.strip_prefix("FEEDSYNC_")
                    .map(|name| (name.to_ascii_lowercase(), value))
            })
            .collect();
        Self::from_map(&map)
    }

    /// Loads a TOML file. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// [`FeedError::Io`] if the file cannot be read, [`FeedError::Config`] if
    /// it is not valid TOML or fails [`validate`](Self::validate).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)
            .map_err(|e| FeedError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// [`FeedError::Config`] if `base_url` is not an absolute URL or a
    /// duration is zero.
    pub fn validate(&self) -> Result<()> {
        let url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| FeedError::Config(format!("invalid base_url '{}': {e}", self.base_url)))?;
        if url.cannot_be_a_base() {
            return Err(FeedError::Config(format!("base_url '{}' cannot be a base", self.base_url)));
        }
        if self.request_timeout_secs == 0 {
            return Err(FeedError::Config("request_timeout_secs must be positive".to_string()));
        }
        Ok(())
    }

    #[must_use]
    pub const fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Creates an engine for `user` with the configured debounce.
#[must_use]
pub fn initialize(config: &Config, user: Identity) -> FeedController {
    tracing::debug!(user = %user.email, debounce_ms = config.debounce_ms, "initializing feed");
    FeedController::new(user, config.debounce())
}

/// Connects to the server, resolves the signed-in user and starts the
/// runtime.
///
/// # Errors
///
/// Invalid configuration, or [`FeedError::Unauthenticated`] /
/// [`FeedError::NetworkFailure`] from resolving the user.
pub async fn connect(config: &Config) -> Result<(Identity, FeedHandle, JoinHandle<()>)> {
    config.validate()?;
    let credentials = Arc::new(StaticCredentials::new(config.session_cookie.clone()));
    let remote = Arc::new(HttpRemote::from_config(config, credentials)?);

    let user = remote.current_user().await?;
    tracing::info!(user = %user.email, base_url = %remote.base_url(), "signed in");

    let controller = initialize(config, user.clone());
    let (handle, task) = FeedRuntime::spawn(controller, FeedWorker::new(remote));
    Ok((user, handle, task))
}
