//! # DeployAja API client
//!
//! Talks to the DeployAja backend on behalf of the `aja` CLI: keeps the
//! bearer token fresh, dispatches JSON requests with uniform error decoding,
//! and follows deployment logs over server-sent events.
//!
//! Modules:
//! - `auth`: token claims, session state, refresh and persistence
//! - `client`: request dispatch and typed endpoint wrappers
//! - `stream`: event stream reader and consumer loop
//! - `config`: CLI settings and deployment descriptors

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod helpers;
pub mod observability;
pub mod stream;
pub mod utils;

#[cfg(test)]
mod tests;

pub use crate::auth::{Claims, FileTokenStore, Session, TokenStore};
pub use crate::client::ApiClient;
pub use crate::error::{ApiError, AuthError, RefreshError, StreamError};
pub use crate::stream::{consume_stream, LogStream};
