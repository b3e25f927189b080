//! Side effects requested by the engine.
//!
//! The engine is pure state: handling an event mutates the controller and
//! returns a `Vec<Action>` for the runtime to execute in order. Network calls
//! and user-facing notices both leave the engine this way.

use crate::domain::FeedError;
use crate::worker::messages::RemoteRequest;

/// Commands for the runtime to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Hands a request to the network worker. The response comes back as
    /// [`Event::Response`](super::Event::Response).
    Dispatch(RemoteRequest),

    /// Shows a transient message to the user.
    Notify(Notice),
}

/// A transient, user-visible report of a failed operation.
///
/// The message prefix follows the operation, e.g. `Failed to delete post`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub context: &'static str,
    pub error: FeedError,
}

impl Notice {
    #[must_use]
    pub const fn new(context: &'static str, error: FeedError) -> Self {
        Self { context, error }
    }
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.context, self.error)
    }
}
