//! Error types for the feed synchronizer.
//!
//! This module defines the centralized error type [`FeedError`] and a type alias
//! [`Result`] used throughout the engine, the remote layer and the runtime. All
//! errors are implemented using the `thiserror` crate.
//!
//! The first four variants form the failure taxonomy the engine reasons about:
//! network failures, server rejections, stale responses and validation
//! failures. The rest describe local precondition and infrastructure problems.

use crate::domain::post::PostId;
use thiserror::Error;

/// The kind of write a [`FeedError::MutationPending`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum MutationKind {
    Edit,
    Delete,
    Vote,
}

impl std::fmt::Display for MutationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Edit => "edit",
            Self::Delete => "delete",
            Self::Vote => "vote",
        };
        f.write_str(name)
    }
}

/// The main error type for feed operations.
///
/// # Examples
///
/// ```
/// use feedsync::FeedError;
///
/// let err = FeedError::Validation("post text is empty".to_string());
/// assert!(err.is_user_visible());
/// assert_eq!(err.to_string(), "Validation failed: post text is empty");
/// ```
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FeedError {
    /// The request did not complete (connection refused, timeout, reset).
    #[error("Network failure: {0}")]
    NetworkFailure(String),

    /// The server answered with a non-success status.
    #[error("Server rejected request ({status}): {message}")]
    ServerRejected {
        /// HTTP status code.
        status: u16,
        /// Body or reason phrase returned by the server.
        message: String,
    },

    /// The response belongs to a read that has been superseded.
    ///
    /// Absorbed by the request sequencer, never shown to the user.
    #[error("Stale response for read #{seq}")]
    StaleResponse {
        /// Sequence number of the superseded read.
        seq: u64,
    },

    /// The operation was rejected before dispatch.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The auth collaborator could not resolve a current user.
    #[error("Not authenticated")]
    Unauthenticated,

    /// A write of the same kind on the same post is still outstanding.
    #[error("A {kind} is already pending for post {id}")]
    MutationPending {
        /// Target post.
        id: PostId,
        /// Kind of the outstanding write.
        kind: MutationKind,
    },

    /// The post is not in the current snapshot.
    #[error("Unknown post {0}")]
    UnknownPost(PostId),

    /// A response body could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Configuration is invalid or missing.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Filesystem or terminal I/O failed.
    #[error("IO error: {0}")]
    Io(String),
}

impl FeedError {
    /// Whether this error should be surfaced to the user as a notice.
    ///
    /// Only stale responses are silently absorbed.
    #[must_use]
    pub const fn is_user_visible(&self) -> bool {
        !matches!(self, Self::StaleResponse { .. })
    }
}

impl From<std::io::Error> for FeedError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<reqwest::Error> for FeedError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return Self::Decode(err.to_string());
        }
        if let Some(status) = err.status() {
            return Self::ServerRejected {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or_default().to_string(),
            };
        }
        Self::NetworkFailure(err.to_string())
    }
}

impl From<serde_json::Error> for FeedError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// A specialized `Result` type for feed operations.
pub type Result<T> = std::result::Result<T, FeedError>;
