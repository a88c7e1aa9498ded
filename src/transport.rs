//! HTTP transport: a thin wrapper over a shared `reqwest` client.
//!
//! The transport performs exactly one attempt per call and never treats a
//! status code as an error; callers inspect [`RawResponse::status`] so
//! that 4xx bodies stay readable. Retries, status policy and response
//! shaping all live above this layer.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::trace;

use crate::client::options::RequestContext;
use crate::error::Error;
use crate::Result;

/// One HTTP response, body fully read.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
}

/// Shared connection pool for all requests issued by one client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    default_timeout: Duration,
}

impl HttpTransport {
    pub fn new(default_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(default_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .user_agent(concat!("netsuite-client/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            default_timeout,
        })
    }

    /// Send the request described by `ctx` once.
    pub async fn execute(&self, ctx: &RequestContext) -> Result<RawResponse> {
        let options = &ctx.options;
        let timeout = options.timeout.unwrap_or(self.default_timeout);

        let mut request = self
            .client
            .request(options.method.clone(), &options.url)
            .headers(self.build_headers(ctx)?)
            .timeout(timeout);
        if !options.query.is_empty() {
            request = request.query(&options.query);
        }
        if let Some(body) = &options.body {
            request = request.json(body);
        }

        trace!(method = %options.method, url = %options.url, "sending request");
        let response = request
            .send()
            .await
            .map_err(|e| Error::from_transport(e, timeout))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .text()
            .await
            .map_err(|e| Error::from_transport(e, timeout))?;

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }

    /// Merge auth headers over per-request headers; on a name collision
    /// the computed auth value wins.
    fn build_headers(&self, ctx: &RequestContext) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        for (name, value) in ctx.options.headers.iter().chain(ctx.auth_headers.iter()) {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::api(format!("invalid header name {name:?}: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| Error::api(format!("invalid value for header {name}: {e}")))?;
            headers.insert(name, value);
        }
        Ok(headers)
    }
}
