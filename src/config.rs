//! Client configuration: OAuth credentials, account identity, and request
//! defaults, with validation that reports every problem at once.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

/// Default request timeout applied when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(15_000);

/// Default number of retries after a failed attempt.
pub const DEFAULT_RETRIES: u32 = 3;

/// OAuth 1.0a credential set for Token-Based Authentication.
#[derive(Clone, Serialize, Deserialize)]
pub struct OAuthConfig {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub token_key: String,
    pub token_secret: String,
    /// Realm sent verbatim in the `Authorization` header, typically the
    /// NetSuite account ID in its original casing.
    pub realm: String,
}

impl OAuthConfig {
    pub fn new(
        consumer_key: impl Into<String>,
        consumer_secret: impl Into<String>,
        token_key: impl Into<String>,
        token_secret: impl Into<String>,
        realm: impl Into<String>,
    ) -> Self {
        Self {
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
            token_key: token_key.into(),
            token_secret: token_secret.into(),
            realm: realm.into(),
        }
    }
}

// Secrets stay out of logs; Debug prints identifiers only.
impl fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"<redacted>")
            .field("token_key", &self.token_key)
            .field("token_secret", &"<redacted>")
            .field("realm", &self.realm)
            .finish()
    }
}

/// Full client configuration.
///
/// Build one with [`ClientConfig::new`] plus the `with_*` methods, or
/// deserialize it from a config file; unknown fields fall back to defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// OAuth credentials. Required; [`ClientConfig::validate`] reports its
    /// absence rather than panicking.
    pub oauth: Option<OAuthConfig>,
    /// NetSuite account ID, e.g. `1234567` or `1234567_SB1` for sandboxes.
    pub account_id: String,
    /// Overrides the account-derived RESTlet domain. Primarily for testing
    /// against local mock servers.
    pub base_url: Option<String>,
    pub timeout: Duration,
    /// Retries after the first failed attempt; `3` means up to 4 attempts.
    pub retries: u32,
    /// Headers applied to every request. Per-request headers win on conflict.
    pub headers: HashMap<String, String>,
    /// Emits an extra per-request timing log line when enabled.
    pub enable_performance_logging: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            oauth: None,
            account_id: String::new(),
            base_url: None,
            timeout: DEFAULT_TIMEOUT,
            retries: DEFAULT_RETRIES,
            headers: HashMap::new(),
            enable_performance_logging: false,
        }
    }
}

impl ClientConfig {
    pub fn new(oauth: OAuthConfig, account_id: impl Into<String>) -> Self {
        Self {
            oauth: Some(oauth),
            account_id: account_id.into(),
            ..Self::default()
        }
    }

    /// Read configuration from `NETSUITE_*` environment variables.
    ///
    /// Recognized: `NETSUITE_ACCOUNT_ID`, `NETSUITE_CONSUMER_KEY`,
    /// `NETSUITE_CONSUMER_SECRET`, `NETSUITE_TOKEN_KEY`,
    /// `NETSUITE_TOKEN_SECRET`, `NETSUITE_REALM` (defaults to the account
    /// ID), `NETSUITE_BASE_URL`, `NETSUITE_TIMEOUT_MS`, `NETSUITE_RETRIES`.
    /// Missing credentials surface through [`ClientConfig::validate`].
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).unwrap_or_default();
        let account_id = var("NETSUITE_ACCOUNT_ID");
        let oauth = OAuthConfig {
            consumer_key: var("NETSUITE_CONSUMER_KEY"),
            consumer_secret: var("NETSUITE_CONSUMER_SECRET"),
            token_key: var("NETSUITE_TOKEN_KEY"),
            token_secret: var("NETSUITE_TOKEN_SECRET"),
            realm: std::env::var("NETSUITE_REALM").unwrap_or_else(|_| account_id.clone()),
        };
        let mut config = Self {
            oauth: Some(oauth),
            account_id,
            base_url: std::env::var("NETSUITE_BASE_URL").ok(),
            ..Self::default()
        };
        if let Some(ms) = std::env::var("NETSUITE_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            config.timeout = Duration::from_millis(ms);
        }
        if let Some(n) = std::env::var("NETSUITE_RETRIES")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
        {
            config.retries = n;
        }
        config
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_performance_logging(mut self, enabled: bool) -> Self {
        self.enable_performance_logging = enabled;
        self
    }

    /// Collect every configuration problem as a human-readable message.
    ///
    /// An empty vector means the configuration is usable. The client
    /// constructor calls this and refuses to build on a non-empty result.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        match &self.oauth {
            None => errors.push("OAuth configuration is required".to_string()),
            Some(oauth) => {
                if oauth.consumer_key.is_empty() {
                    errors.push("OAuth consumer key is required".to_string());
                }
                if oauth.consumer_secret.is_empty() {
                    errors.push("OAuth consumer secret is required".to_string());
                }
                if oauth.token_key.is_empty() {
                    errors.push("OAuth token key is required".to_string());
                }
                if oauth.token_secret.is_empty() {
                    errors.push("OAuth token secret is required".to_string());
                }
            }
        }
        if self.account_id.is_empty() {
            errors.push("Account ID is required".to_string());
        }
        errors
    }
}

/// Standalone validation entry point; see [`ClientConfig::validate`].
pub fn validate_config(config: &ClientConfig) -> Vec<String> {
    config.validate()
}
