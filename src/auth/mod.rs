//! OAuth 1.0a request signing for Token-Based Authentication.

mod signer;

pub use signer::RequestSigner;
