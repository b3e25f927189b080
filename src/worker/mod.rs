//! Network worker for remote calls.
//!
//! The engine describes calls as messages; the worker performs them against a
//! [`RemoteStore`](crate::remote::RemoteStore) and reports back. Requests carry
//! a trace context so worker spans link to the span that issued them.
//!
//! - `messages`: Request/response protocol with trace context propagation
//! - `handler`: Execution and result logging

pub mod handler;
pub mod messages;

pub use handler::FeedWorker;
pub use messages::{Outcome, RemoteRequest, RemoteResponse, TraceContext};
