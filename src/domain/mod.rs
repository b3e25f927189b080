//! Domain layer for the feed synchronizer.
//!
//! Core types shared by the engine, the remote layer and the view model,
//! independent of HTTP or any runtime.
//!
//! # Organization
//!
//! - [`error`]: Error taxonomy and result alias
//! - [`post`]: Post, identity and voter set
//! - [`query`]: Search/sort query values

pub mod error;
pub mod post;
pub mod query;

pub use error::{FeedError, MutationKind, Result};
pub use post::{Author, Identity, Post, PostId, VoterSet};
pub use query::{FeedQuery, SortKey, SortOrder};
