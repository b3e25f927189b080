//! Network worker executing remote requests.
//!
//! [`FeedWorker`] turns a [`RemoteRequest`] into a [`RemoteResponse`] by
//! calling the [`RemoteStore`]. It never touches feed state. Each call runs in
//! a span parented to the span that issued the request, so a trace shows the
//! user intent and the HTTP call it caused.

use crate::domain::Result;
use crate::remote::RemoteStore;
use crate::worker::messages::{Outcome, RemoteRequest, RemoteResponse, TraceContext};
use std::sync::Arc;
use tracing::Instrument;

/// Executes remote requests on behalf of the runtime.
///
/// Cheap to clone; every spawned call gets its own copy.
#[derive(Clone)]
pub struct FeedWorker {
    remote: Arc<dyn RemoteStore>,
}

impl std::fmt::Debug for FeedWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedWorker").finish_non_exhaustive()
    }
}

impl FeedWorker {
    #[must_use]
    pub fn new(remote: Arc<dyn RemoteStore>) -> Self {
        Self { remote }
    }

    /// Performs one remote call. Failures travel inside the response.
    pub async fn execute(&self, request: RemoteRequest) -> RemoteResponse {
        let span = tracing::debug_span!("worker_execute", request = request.name());
        if let Some(parent) = request.trace_context().and_then(parent_context) {
            use tracing_opentelemetry::OpenTelemetrySpanExt;
            span.set_parent(parent);
        }
        self.dispatch(request).instrument(span).await
    }

    async fn dispatch(&self, request: RemoteRequest) -> RemoteResponse {
        match request {
            RemoteRequest::Search { seq, query, .. } => {
                let outcome = Self::handle_remote_result("search", self.remote.search(&query).await);
                if let Ok(posts) = &outcome {
                    tracing::debug!(seq, count = posts.len(), keyword = %query.keyword, "search returned");
                }
                RemoteResponse::Searched { seq, query, outcome }
            }

            RemoteRequest::CreatePost {
                request_id,
                text,
                author,
                ..
            } => RemoteResponse::Created {
                request_id,
                outcome: Self::handle_remote_result("create post", self.remote.create_post(&text, &author).await),
            },

            RemoteRequest::EditPost { id, text, .. } => {
                let outcome = Self::handle_remote_result("edit post", self.remote.edit_post(&id, &text).await);
                RemoteResponse::Edited { id, outcome }
            }

            RemoteRequest::DeletePost { id, .. } => {
                let outcome = Self::handle_remote_result("delete post", self.remote.delete_post(&id).await);
                RemoteResponse::Deleted { id, outcome }
            }

            RemoteRequest::ToggleVote { id, .. } => {
                let outcome = Self::handle_remote_result("toggle vote", self.remote.toggle_vote(&id).await);
                RemoteResponse::VoteToggled { id, outcome }
            }
        }
    }

    /// Logs a remote result consistently and hands it back as an outcome.
    fn handle_remote_result<T>(operation: &str, result: Result<T>) -> Outcome<T> {
        match &result {
            Ok(_) => tracing::debug!(operation, "remote operation successful"),
            Err(e) => tracing::debug!(operation, error = %e, "remote operation failed"),
        }
        result
    }
}

/// Rebuilds the OpenTelemetry context of the span that issued a request.
fn parent_context(trace_context: &TraceContext) -> Option<opentelemetry::Context> {
    use opentelemetry::trace::{SpanContext, SpanId, TraceContextExt, TraceFlags, TraceId, TraceState};

    let trace_id = TraceId::from_hex(&trace_context.trace_id).ok()?;
    let span_id = SpanId::from_hex(&trace_context.parent_span_id).ok()?;

    let span_context = SpanContext::new(trace_id, span_id, TraceFlags::SAMPLED, true, TraceState::default());
    Some(opentelemetry::Context::current().with_remote_span_context(span_context))
}
