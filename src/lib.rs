//! # netsuite-client
//!
//! Async client library for the NetSuite REST and RESTlet APIs with OAuth
//! 1.0a Token-Based Authentication.
//!
//! ## Overview
//!
//! The crate wraps the plumbing every NetSuite integration ends up
//! rebuilding: request signing, retries with exponential backoff, a
//! middleware chain for cross-cutting concerns, and the RESTlet URL
//! conventions. Around the client it ships self-contained utilities for
//! response caching, client-side rate limiting and request batching.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use netsuite_client::{ClientConfig, NetSuiteClient, OAuthConfig, RestletParams};
//!
//! #[tokio::main]
//! async fn main() -> netsuite_client::Result<()> {
//!     let config = ClientConfig::new(
//!         OAuthConfig::new(
//!             "consumer-key",
//!             "consumer-secret",
//!             "token-key",
//!             "token-secret",
//!             "1234567",
//!         ),
//!         "1234567",
//!     );
//!     let client = NetSuiteClient::new(config)?;
//!
//!     let response = client
//!         .restlet(RestletParams::new("123", "1").with_param("action", "list"))
//!         .await?;
//!     println!("{}", response.data);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | Client façade, request/response types, middleware chain |
//! | [`auth`] | OAuth 1.0a request signing |
//! | [`config`] | Configuration and validation |
//! | [`retry`] | Retry controller with exponential backoff |
//! | [`transport`] | HTTP transport over `reqwest` |
//! | [`cache`] | TTL response cache |
//! | [`rate_limit`] | Sliding-window rate limiter |
//! | [`batch`] | Keyed request batching |
//! | [`utils`] | Date helpers |

pub mod auth;
pub mod batch;
pub mod cache;
pub mod client;
pub mod config;
pub mod rate_limit;
pub mod retry;
pub mod transport;
pub mod utils;

// Re-export main types for convenience
pub use client::{
    ClientResponse, Middleware, NetSuiteClient, Next, RequestContext, RequestOptions,
    RestletParams,
};
pub use config::{validate_config, ClientConfig, OAuthConfig};
pub use retry::{RetryController, RetryPolicy};

/// Re-exported so callers can name HTTP verbs without depending on
/// `reqwest` directly.
pub use reqwest::Method;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::Error;
