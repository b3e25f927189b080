//! The feed state reconciliation engine.
//!
//! This layer decides, from user intents and server responses, which posts
//! are visible at any instant. It performs no I/O: network calls leave as
//! [`Action::Dispatch`] and come back as [`Event::Response`].
//!
//! # Architecture
//!
//! ```text
//! View intent → Event → handle_event → FeedController ─┬─ QueryDebouncer (reads)
//!                                                       └─ OptimisticMutator (writes)
//!                                                                │
//!        Actions ← ─ ─ ─ ─ ─ ─ ─ ─ ─ ─ ─ ─ ─ ─ ─ ─ ─ ─ ─ ─ ─ ─ ─ ┘
//!           │
//!           └→ runtime → worker → remote store
//!                                     │
//! Event::Response → RequestSequencer (reads) → FeedStore → snapshot → view
//! ```
//!
//! # Modules
//!
//! - [`actions`]: Side effects the runtime executes
//! - [`controller`]: The façade views talk to
//! - [`debouncer`]: Quiet-period coalescing of search input
//! - [`handler`]: Event routing
//! - [`mutator`]: Optimistic writes and rollback
//! - [`sequencer`]: Stale read suppression
//! - [`store`]: Canonical post list and pending writes

pub mod actions;
pub mod controller;
pub mod debouncer;
pub mod handler;
pub mod mutator;
pub mod sequencer;
pub mod store;

pub use actions::{Action, Notice};
pub use controller::{rejected_before_dispatch, FeedController};
pub use debouncer::{QueryDebouncer, DEFAULT_QUIET_PERIOD};
pub use handler::{handle_event, Event};
pub use mutator::OptimisticMutator;
pub use sequencer::{RequestSequencer, Seq};
pub use store::{FeedSnapshot, FeedStore, MutationPayload, PendingMutation};
