//! Client façade and its supporting pieces.
//!
//! The public surface stays small: construct a [`NetSuiteClient`], issue
//! requests, optionally hang [`Middleware`] layers on it. Implementation
//! details are split into submodules under `src/client/`.

pub mod core;
pub mod middleware;
pub mod options;

pub use self::core::NetSuiteClient;
pub use middleware::{Middleware, Next};
pub use options::{ClientResponse, RequestContext, RequestOptions, RestletParams};
