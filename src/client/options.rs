//! Request and response types shared by the client, its middleware chain
//! and the transport.

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::Result;

/// Everything describing one outgoing request.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub url: String,
    pub method: Method,
    /// Per-request headers; these win over client-level defaults.
    pub headers: HashMap<String, String>,
    pub query: HashMap<String, String>,
    /// JSON body, sent with `Content-Type: application/json`.
    pub body: Option<Value>,
    /// Overrides the client-level retry budget for this request.
    pub retries: Option<u32>,
    /// Overrides the client-level timeout for this request.
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = Some(retries);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Addressing for a RESTlet call: which script, which deployment, plus
/// extra query parameters.
#[derive(Debug, Clone, Default)]
pub struct RestletParams {
    pub script: String,
    pub deploy: String,
    pub params: HashMap<String, String>,
}

impl RestletParams {
    pub fn new(script: impl Into<String>, deploy: impl Into<String>) -> Self {
        Self {
            script: script.into(),
            deploy: deploy.into(),
            params: HashMap::new(),
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }
}

/// A request in flight: the options after defaults were merged, the
/// computed auth headers, and bookkeeping for logs and timing.
///
/// Middleware receives this by value and may rewrite any of it before
/// passing it along.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub options: RequestOptions,
    pub auth_headers: HashMap<String, String>,
    /// Correlates log lines for one logical request across retries.
    pub request_id: String,
    pub started_at: Instant,
}

/// Successful response as seen by callers.
#[derive(Debug, Clone)]
pub struct ClientResponse<T = Value> {
    pub data: T,
    pub status: u16,
    pub headers: HashMap<String, String>,
    /// Wall-clock time for the whole operation, retries included.
    pub duration_ms: u64,
}

impl ClientResponse<Value> {
    /// Deserialize the JSON payload into a typed value, keeping status,
    /// headers and timing.
    pub fn decode<T: DeserializeOwned>(self) -> Result<ClientResponse<T>> {
        Ok(ClientResponse {
            data: serde_json::from_value(self.data)?,
            status: self.status,
            headers: self.headers,
            duration_ms: self.duration_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[test]
    fn test_request_options_builder() {
        let options = RequestOptions::new(Method::POST, "https://example.com/api")
            .with_header("X-Trace", "on")
            .with_query("limit", "10")
            .with_body(json!({"name": "widget"}))
            .with_retries(1)
            .with_timeout(Duration::from_secs(5));
        assert_eq!(options.method, Method::POST);
        assert_eq!(options.url, "https://example.com/api");
        assert_eq!(options.headers.get("X-Trace"), Some(&"on".to_string()));
        assert_eq!(options.query.get("limit"), Some(&"10".to_string()));
        assert_eq!(options.body, Some(json!({"name": "widget"})));
        assert_eq!(options.retries, Some(1));
        assert_eq!(options.timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_default_method_is_get() {
        assert_eq!(RequestOptions::default().method, Method::GET);
    }

    #[test]
    fn test_restlet_params_builder() {
        let params = RestletParams::new("123", "1").with_param("action", "list");
        assert_eq!(params.script, "123");
        assert_eq!(params.deploy, "1");
        assert_eq!(params.params.get("action"), Some(&"list".to_string()));
    }

    #[test]
    fn test_decode_typed_payload() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Item {
            id: u32,
        }

        let response = ClientResponse {
            data: json!({"id": 7}),
            status: 200,
            headers: HashMap::new(),
            duration_ms: 12,
        };
        let typed = response.decode::<Item>().unwrap();
        assert_eq!(typed.data, Item { id: 7 });
        assert_eq!(typed.status, 200);
        assert_eq!(typed.duration_ms, 12);
    }

    #[test]
    fn test_decode_mismatch_is_an_error() {
        #[derive(Debug, Deserialize)]
        struct Item {
            #[allow(dead_code)]
            id: u32,
        }

        let response = ClientResponse {
            data: json!({"id": "not a number"}),
            status: 200,
            headers: HashMap::new(),
            duration_ms: 0,
        };
        assert!(response.decode::<Item>().is_err());
    }
}
