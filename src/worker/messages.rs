//! Request/response protocol between the engine and the network worker.
//!
//! The engine never performs I/O itself: it emits [`RemoteRequest`]s and later
//! receives the matching [`RemoteResponse`]s as events. Each request carries
//! the correlation data the engine needs to reconcile the response (read
//! sequence number, post id, create request id) plus an optional trace context
//! so worker spans link back to the span that issued the request.

use crate::app::sequencer::Seq;
use crate::domain::{FeedError, FeedQuery, Identity, Post, PostId, VoterSet};

/// Outcome of a remote call as seen by the engine.
pub type Outcome<T> = std::result::Result<T, FeedError>;

/// Distributed tracing context for linking worker spans to their origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceContext {
    /// OpenTelemetry trace ID as a hex string.
    pub trace_id: String,

    /// Span that issued the request.
    pub parent_span_id: String,
}

impl TraceContext {
    /// Captures the trace and span IDs of the current tracing span.
    ///
    /// Returns `None` when no OpenTelemetry layer is installed or the span
    /// context is not valid.
    pub fn from_current() -> Option<Self> {
        use opentelemetry::trace::TraceContextExt;
        use tracing_opentelemetry::OpenTelemetrySpanExt;

        let otel_context = tracing::Span::current().context();
        let span_ref = otel_context.span();
        let span_context = span_ref.span_context();

        if span_context.is_valid() {
            Some(Self {
                trace_id: format!("{:032x}", span_context.trace_id()),
                parent_span_id: format!("{:016x}", span_context.span_id()),
            })
        } else {
            None
        }
    }
}

/// Generates constructors that attach the current trace context.
macro_rules! remote_request_builders {
    (
        $(
            $builder_name:ident($variant:ident { $($field:ident: $ty:ty),* $(,)? })
        ),* $(,)?
    ) => {
        impl RemoteRequest {
            $(
                #[doc = concat!("Create a ", stringify!($variant), " request with current trace context")]
                #[must_use]
                pub fn $builder_name($($field: $ty),*) -> Self {
                    Self::$variant {
                        $($field,)*
                        trace_context: TraceContext::from_current(),
                    }
                }
            )*
        }
    };
}

remote_request_builders! {
    search(Search { seq: Seq, query: FeedQuery }),
    create_post(CreatePost { request_id: u64, text: String, author: Identity }),
    edit_post(EditPost { id: PostId, text: String }),
    delete_post(DeletePost { id: PostId }),
    toggle_vote(ToggleVote { id: PostId }),
}

/// Calls the engine asks the worker to make against the remote store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteRequest {
    /// `GET /metadata/search` for one issued query.
    Search {
        seq: Seq,
        query: FeedQuery,
        trace_context: Option<TraceContext>,
    },

    /// `POST /metadata/post`.
    CreatePost {
        /// Client-side correlation id; the server assigns the post id.
        request_id: u64,
        text: String,
        author: Identity,
        trace_context: Option<TraceContext>,
    },

    /// `PATCH /metadata/{id}`.
    EditPost {
        id: PostId,
        text: String,
        trace_context: Option<TraceContext>,
    },

    /// `DELETE /metadata/{id}`.
    DeletePost {
        id: PostId,
        trace_context: Option<TraceContext>,
    },

    /// `POST /metadata/{id}/vote`.
    ToggleVote {
        id: PostId,
        trace_context: Option<TraceContext>,
    },
}

impl RemoteRequest {
    /// Short operation name for logging.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Search { .. } => "search",
            Self::CreatePost { .. } => "create_post",
            Self::EditPost { .. } => "edit_post",
            Self::DeletePost { .. } => "delete_post",
            Self::ToggleVote { .. } => "toggle_vote",
        }
    }

    #[must_use]
    pub const fn trace_context(&self) -> Option<&TraceContext> {
        match self {
            Self::Search { trace_context, .. }
            | Self::CreatePost { trace_context, .. }
            | Self::EditPost { trace_context, .. }
            | Self::DeletePost { trace_context, .. }
            | Self::ToggleVote { trace_context, .. } => trace_context.as_ref(),
        }
    }
}

/// Completed remote calls, each carrying its request's correlation data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteResponse {
    Searched {
        seq: Seq,
        query: FeedQuery,
        outcome: Outcome<Vec<Post>>,
    },

    Created {
        request_id: u64,
        outcome: Outcome<Post>,
    },

    /// The server may echo the updated post; `None` means a bare confirmation.
    Edited {
        id: PostId,
        outcome: Outcome<Option<Post>>,
    },

    Deleted {
        id: PostId,
        outcome: Outcome<()>,
    },

    /// Carries the server's authoritative voter set.
    VoteToggled {
        id: PostId,
        outcome: Outcome<VoterSet>,
    },
}

impl RemoteResponse {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        match self {
            Self::Searched { outcome, .. } => outcome.is_ok(),
            Self::Created { outcome, .. } => outcome.is_ok(),
            Self::Edited { outcome, .. } => outcome.is_ok(),
            Self::Deleted { outcome, .. } => outcome.is_ok(),
            Self::VoteToggled { outcome, .. } => outcome.is_ok(),
        }
    }
}
