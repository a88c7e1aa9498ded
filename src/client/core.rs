//! NetSuite client façade.
//!
//! Dispatch pipeline for every request:
//!
//! 1. sign the URL and method with OAuth 1.0a
//! 2. merge client-level default headers under per-request ones
//! 3. run the middleware chain; its terminal performs the transport call
//!    under the retry controller, converting non-2xx statuses into typed
//!    failures before the retry predicate sees them
//! 4. stamp the total duration on the way out
//!
//! Construction validates the configuration eagerly and refuses to build
//! a client that could not sign requests.

use std::sync::{Arc, RwLock};
use std::time::Instant;

use reqwest::Method;
use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use crate::auth::RequestSigner;
use crate::client::middleware::{terminal_fn, Middleware, Next};
use crate::client::options::{ClientResponse, RequestContext, RequestOptions, RestletParams};
use crate::config::ClientConfig;
use crate::error::Error;
use crate::retry::{RetryController, RetryPolicy};
use crate::transport::HttpTransport;
use crate::Result;

/// Async client for NetSuite RESTlets and REST endpoints.
pub struct NetSuiteClient {
    config: ClientConfig,
    signer: RequestSigner,
    transport: HttpTransport,
    retry: RetryController,
    middlewares: RwLock<Vec<Arc<dyn Middleware>>>,
}

impl NetSuiteClient {
    /// Build a client with the default retry behavior: `config.retries`
    /// attempts after the first, no retry on 4xx, a warning logged per
    /// retry.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let retry = RetryController::new(RetryPolicy::default().with_max_retries(config.retries))
            .with_predicate(Error::is_retryable)
            .with_observer(|attempt, err| {
                warn!(attempt, error = %err, "retrying request after failure");
            });
        Self::with_retry(config, retry)
    }

    /// Build a client around a caller-supplied retry controller. The
    /// controller's own predicate and observer are used as given.
    pub fn with_retry(config: ClientConfig, retry: RetryController) -> Result<Self> {
        let errors = config.validate();
        if !errors.is_empty() {
            return Err(Error::Config { errors });
        }
        let oauth = config.oauth.clone().ok_or_else(|| Error::Config {
            errors: vec!["OAuth configuration is required".to_string()],
        })?;
        let transport = HttpTransport::new(config.timeout)?;
        info!(account_id = %config.account_id, "NetSuite client initialized");
        Ok(Self {
            signer: RequestSigner::new(oauth),
            transport,
            retry,
            middlewares: RwLock::new(Vec::new()),
            config,
        })
    }

    /// Build from `NETSUITE_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env())
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Append a middleware layer. Requests already in flight keep the
    /// chain they started with.
    pub fn use_middleware(&self, middleware: Arc<dyn Middleware>) {
        self.middlewares.write().unwrap().push(middleware);
    }

    /// Dispatch a fully-described request through the middleware chain.
    pub async fn request(&self, options: RequestOptions) -> Result<ClientResponse<Value>> {
        let started = Instant::now();
        let request_id = Uuid::new_v4().to_string();
        let retries_override = options.retries;

        let mut options = options;
        // Query parameters must live in the URL before signing; anything
        // appended later would escape the OAuth signature.
        if !options.query.is_empty() {
            let mut url = Url::parse(&options.url)?;
            url.query_pairs_mut().extend_pairs(options.query.drain());
            options.url = url.into();
        }
        let auth_headers = self.signer.sign(&options.url, &options.method)?;
        self.apply_default_headers(&mut options);
        debug!(
            %request_id,
            method = %options.method,
            url = %options.url,
            "dispatching request"
        );

        let ctx = RequestContext {
            options,
            auth_headers,
            request_id: request_id.clone(),
            started_at: started,
        };

        let chain = self.middlewares.read().unwrap().clone();
        let retry = match retries_override {
            Some(max) => self.retry.clone().with_max_retries(max),
            None => self.retry.clone(),
        };
        let transport = &self.transport;
        let terminal = terminal_fn(move |ctx: RequestContext| {
            let retry = retry.clone();
            Box::pin(async move {
                let ctx = Arc::new(ctx);
                retry
                    .run(|| {
                        let ctx = Arc::clone(&ctx);
                        async move { Self::send_once(transport, &ctx).await }
                    })
                    .await
            })
        });

        let result = Next::new(&chain, &terminal).run(ctx).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(mut response) => {
                response.duration_ms = duration_ms;
                debug!(%request_id, status = response.status, duration_ms, "request completed");
                if self.config.enable_performance_logging {
                    info!(%request_id, duration_ms, "request performance");
                }
                Ok(response)
            }
            Err(err) => {
                warn!(%request_id, duration_ms, error = %err, "request failed");
                Err(err)
            }
        }
    }

    pub async fn get(&self, url: impl Into<String>) -> Result<ClientResponse<Value>> {
        self.request(RequestOptions::new(Method::GET, url)).await
    }

    pub async fn post(
        &self,
        url: impl Into<String>,
        body: Value,
    ) -> Result<ClientResponse<Value>> {
        self.request(RequestOptions::new(Method::POST, url).with_body(body))
            .await
    }

    pub async fn put(&self, url: impl Into<String>, body: Value) -> Result<ClientResponse<Value>> {
        self.request(RequestOptions::new(Method::PUT, url).with_body(body))
            .await
    }

    pub async fn patch(
        &self,
        url: impl Into<String>,
        body: Value,
    ) -> Result<ClientResponse<Value>> {
        self.request(RequestOptions::new(Method::PATCH, url).with_body(body))
            .await
    }

    pub async fn delete(&self, url: impl Into<String>) -> Result<ClientResponse<Value>> {
        self.request(RequestOptions::new(Method::DELETE, url)).await
    }

    /// Call a RESTlet with `GET` and default options.
    pub async fn restlet(&self, params: RestletParams) -> Result<ClientResponse<Value>> {
        self.restlet_with(params, RequestOptions::default()).await
    }

    /// Call a RESTlet with explicit options; `options.url` is replaced by
    /// the URL derived from `params`.
    pub async fn restlet_with(
        &self,
        params: RestletParams,
        mut options: RequestOptions,
    ) -> Result<ClientResponse<Value>> {
        options.url = self.restlet_url(&params)?;
        self.request(options).await
    }

    /// Full RESTlet URL for `params`, honoring the `base_url` override.
    pub fn restlet_url(&self, params: &RestletParams) -> Result<String> {
        let mut url = Url::parse(&self.restlet_base())?;
        url.query_pairs_mut()
            .append_pair("script", &params.script)
            .append_pair("deploy", &params.deploy)
            .extend_pairs(params.params.iter());
        Ok(url.into())
    }

    // The RESTlet domain embeds the account id lowercased with `_` turned
    // into `-` (sandbox ids like `123456_SB1` become `123456-sb1`). The
    // OAuth realm keeps the raw id.
    fn restlet_base(&self) -> String {
        match &self.config.base_url {
            Some(base) => format!("{}/app/site/hosting/restlet.nl", base.trim_end_matches('/')),
            None => {
                let account = self.config.account_id.to_lowercase().replace('_', "-");
                format!("https://{account}.restlets.api.netsuite.com/app/site/hosting/restlet.nl")
            }
        }
    }

    fn apply_default_headers(&self, options: &mut RequestOptions) {
        for (name, value) in &self.config.headers {
            options
                .headers
                .entry(name.clone())
                .or_insert_with(|| value.clone());
        }
    }

    /// One transport attempt: send, read, enforce the 2xx policy.
    async fn send_once(
        transport: &HttpTransport,
        ctx: &RequestContext,
    ) -> Result<ClientResponse<Value>> {
        let raw = transport.execute(ctx).await?;
        let data = parse_body(&raw.body);
        if !(200..300).contains(&raw.status) {
            return Err(Error::http_failure(raw.status, data));
        }
        Ok(ClientResponse {
            data,
            status: raw.status,
            headers: raw.headers,
            duration_ms: 0,
        })
    }
}

impl std::fmt::Debug for NetSuiteClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetSuiteClient")
            .field("account_id", &self.config.account_id)
            .field("retry", &self.retry)
            .field("middlewares", &self.middlewares.read().unwrap().len())
            .finish()
    }
}

/// Response bodies are JSON in the normal case, but error pages and empty
/// bodies must stay representable.
fn parse_body(body: &str) -> Value {
    if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
    }
}
