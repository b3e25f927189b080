//! Presentation of the feed.
//!
//! ```text
//! FeedController → FeedViewModel::compute → FeedViewModel → render → text
//! ```
//!
//! - [`viewmodel`]: Display-ready feed state
//! - [`renderer`]: Plain-text output with optional keyword highlighting

pub mod renderer;
pub mod viewmodel;

pub use renderer::render;
pub use viewmodel::{EmptyState, FeedViewModel, PostCard, SearchBarInfo};
