//! Middleware chain wrapped around request dispatch.
//!
//! Middleware compose as an onion: each layer sees the request context on
//! the way in, decides whether to call the rest of the chain through
//! [`Next`], and sees the response (or failure) on the way out. The
//! innermost layer is the terminal handler, which performs the actual
//! transport call under the retry controller.
//!
//! [`Next::run`] takes `self` by value, so a layer can invoke the
//! remainder of the chain at most once; calling it twice does not
//! compile. A layer that never calls it short-circuits the request.

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;

use crate::client::options::{ClientResponse, RequestContext};
use crate::Result;

/// Innermost handler of the chain.
pub(crate) type Terminal<'a> =
    dyn Fn(RequestContext) -> BoxFuture<'a, Result<ClientResponse<Value>>> + Send + Sync + 'a;

/// Identity helper that pins a closure's inferred signature to the
/// [`Terminal`] shape so it coerces cleanly to a trait object.
pub(crate) fn terminal_fn<'a, F>(f: F) -> F
where
    F: Fn(RequestContext) -> BoxFuture<'a, Result<ClientResponse<Value>>> + Send + Sync + 'a,
{
    f
}

/// One layer of the request-processing onion.
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Handle `ctx`, usually by forwarding it through `next` and
    /// post-processing the result.
    async fn handle(
        &self,
        ctx: RequestContext,
        next: Next<'_>,
    ) -> Result<ClientResponse<Value>>;
}

/// Handle onto the remainder of the chain, ending at the terminal.
pub struct Next<'a> {
    chain: &'a [std::sync::Arc<dyn Middleware>],
    terminal: &'a Terminal<'a>,
}

impl<'a> Next<'a> {
    pub(crate) fn new(
        chain: &'a [std::sync::Arc<dyn Middleware>],
        terminal: &'a Terminal<'a>,
    ) -> Self {
        Self { chain, terminal }
    }

    /// Run the remaining layers and the terminal handler.
    pub async fn run(self, ctx: RequestContext) -> Result<ClientResponse<Value>> {
        match self.chain.split_first() {
            Some((first, rest)) => {
                let next = Next {
                    chain: rest,
                    terminal: self.terminal,
                };
                first.handle(ctx, next).await
            }
            None => (self.terminal)(ctx).await,
        }
    }
}

impl std::fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Next")
            .field("remaining", &self.chain.len())
            .finish()
    }
}
