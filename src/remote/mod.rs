//! Server access.
//!
//! - [`backend`]: The [`RemoteStore`], [`AuthProvider`] and
//!   [`CredentialProvider`] seams
//! - [`http`]: `reqwest` implementation against the JSON API
//! - [`models`]: Wire types and their conversion into domain types

pub mod backend;
pub mod http;
pub mod models;

pub use backend::{AuthProvider, CredentialProvider, RemoteStore, StaticCredentials};
pub use http::HttpRemote;

#[cfg(test)]
pub(crate) mod testing;
