//! OAuth 1.0a signer producing `Authorization` headers with HMAC-SHA256
//! signatures, as required by NetSuite Token-Based Authentication.
//!
//! The signature covers the request method, the base URL, the URL query
//! parameters and the `oauth_*` protocol parameters. JSON request bodies
//! are not part of the base string.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hmac::{Hmac, Mac};
use reqwest::Method;
use sha2::Sha256;
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};
use url::Url;
use uuid::Uuid;

use crate::config::OAuthConfig;
use crate::error::Error;
use crate::Result;

type HmacSha256 = Hmac<Sha256>;

/// Characters left unescaped by OAuth percent-encoding: the RFC 3986
/// unreserved set (ALPHA / DIGIT / `-` / `.` / `_` / `~`).
const OAUTH_ENCODE_SET: &percent_encoding::AsciiSet = &percent_encoding::NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

fn oauth_encode(input: &str) -> String {
    percent_encoding::utf8_percent_encode(input, OAUTH_ENCODE_SET).to_string()
}

/// Signs outgoing requests with the configured OAuth 1.0a credentials.
///
/// Each call to [`RequestSigner::sign`] generates a fresh timestamp and
/// nonce, so signed headers are single-use.
#[derive(Debug, Clone)]
pub struct RequestSigner {
    oauth: OAuthConfig,
}

impl RequestSigner {
    pub fn new(oauth: OAuthConfig) -> Self {
        Self { oauth }
    }

    /// Produce the headers that authenticate `method url`, currently a
    /// single `Authorization` entry.
    pub fn sign(&self, url: &str, method: &Method) -> Result<HashMap<String, String>> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| Error::Signing(format!("system clock before epoch: {e}")))?
            .as_secs();
        let nonce = Uuid::new_v4().simple().to_string();
        self.sign_at(url, method, timestamp, &nonce)
    }

    /// Deterministic core of [`RequestSigner::sign`]; timestamp and nonce
    /// are injected so tests can pin the full signature.
    fn sign_at(
        &self,
        url: &str,
        method: &Method,
        timestamp: u64,
        nonce: &str,
    ) -> Result<HashMap<String, String>> {
        let parsed = Url::parse(url)?;
        let base_url = Self::signature_base_url(&parsed)?;

        let timestamp = timestamp.to_string();
        let mut params: Vec<(String, String)> = parsed
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        params.push(("oauth_consumer_key".into(), self.oauth.consumer_key.clone()));
        params.push(("oauth_nonce".into(), nonce.to_string()));
        params.push(("oauth_signature_method".into(), "HMAC-SHA256".into()));
        params.push(("oauth_timestamp".into(), timestamp.clone()));
        params.push(("oauth_token".into(), self.oauth.token_key.clone()));
        params.push(("oauth_version".into(), "1.0".into()));

        // Parameters are percent-encoded first, then sorted by encoded
        // key and value, per RFC 5849 section 3.4.1.3.2.
        let mut encoded: Vec<(String, String)> = params
            .iter()
            .map(|(k, v)| (oauth_encode(k), oauth_encode(v)))
            .collect();
        encoded.sort();
        let param_string = encoded
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");

        let base_string = format!(
            "{}&{}&{}",
            method.as_str(),
            oauth_encode(&base_url),
            oauth_encode(&param_string)
        );
        let signing_key = format!(
            "{}&{}",
            oauth_encode(&self.oauth.consumer_secret),
            oauth_encode(&self.oauth.token_secret)
        );

        let mut mac = HmacSha256::new_from_slice(signing_key.as_bytes())
            .map_err(|e| Error::Signing(format!("invalid HMAC key: {e}")))?;
        mac.update(base_string.as_bytes());
        let signature = BASE64.encode(mac.finalize().into_bytes());

        let header_params = [
            ("oauth_consumer_key", self.oauth.consumer_key.as_str()),
            ("oauth_nonce", nonce),
            ("oauth_signature_method", "HMAC-SHA256"),
            ("oauth_timestamp", timestamp.as_str()),
            ("oauth_token", self.oauth.token_key.as_str()),
            ("oauth_version", "1.0"),
            ("oauth_signature", signature.as_str()),
        ];
        let mut header = format!("OAuth realm=\"{}\"", self.oauth.realm);
        for (name, value) in header_params {
            header.push_str(&format!(", {name}=\"{}\"", oauth_encode(value)));
        }

        let mut headers = HashMap::new();
        headers.insert("Authorization".to_string(), header);
        Ok(headers)
    }

    /// Base string URI: scheme, host, optional non-default port and path.
    /// The query is carried by the parameter string instead.
    fn signature_base_url(url: &Url) -> Result<String> {
        let host = url
            .host_str()
            .ok_or_else(|| Error::Signing(format!("URL has no host: {url}")))?;
        let mut base = format!("{}://{}", url.scheme(), host);
        if let Some(port) = url.port() {
            base.push_str(&format!(":{port}"));
        }
        base.push_str(url.path());
        Ok(base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> RequestSigner {
        RequestSigner::new(OAuthConfig::new("ck", "cs", "tk", "ts", "123456"))
    }

    const RESTLET_URL: &str =
        "https://123456.restlets.api.netsuite.com/app/site/hosting/restlet.nl?deploy=1&script=42";

    #[test]
    fn test_signature_matches_known_vector() {
        // Independently computed with a reference HMAC-SHA256 implementation
        // over the RFC 5849 base string for these exact inputs.
        let headers = signer()
            .sign_at(RESTLET_URL, &Method::GET, 1_700_000_000, "abc123")
            .unwrap();
        let auth = headers.get("Authorization").unwrap();
        assert!(
            auth.contains("oauth_signature=\"%2F9YUz2N0yWJdjlOaJSlRdUenZwKzQ06sOV0aFsD8VWs%3D\""),
            "unexpected signature in {auth}"
        );
    }

    #[test]
    fn test_header_shape() {
        let headers = signer().sign(RESTLET_URL, &Method::POST).unwrap();
        assert_eq!(headers.len(), 1);
        let auth = headers.get("Authorization").unwrap();
        assert!(auth.starts_with("OAuth realm=\"123456\""));
        for field in [
            "oauth_consumer_key=\"ck\"",
            "oauth_signature_method=\"HMAC-SHA256\"",
            "oauth_token=\"tk\"",
            "oauth_version=\"1.0\"",
            "oauth_nonce=",
            "oauth_timestamp=",
            "oauth_signature=",
        ] {
            assert!(auth.contains(field), "missing {field} in {auth}");
        }
    }

    #[test]
    fn test_query_order_does_not_change_signature() {
        let s = signer();
        let a = s
            .sign_at(RESTLET_URL, &Method::GET, 1_700_000_000, "n1")
            .unwrap();
        let b = s
            .sign_at(
                "https://123456.restlets.api.netsuite.com/app/site/hosting/restlet.nl?script=42&deploy=1",
                &Method::GET,
                1_700_000_000,
                "n1",
            )
            .unwrap();
        assert_eq!(a.get("Authorization"), b.get("Authorization"));
    }

    #[test]
    fn test_nonce_and_timestamp_vary_between_calls() {
        let s = signer();
        let a = s.sign(RESTLET_URL, &Method::GET).unwrap();
        let b = s.sign(RESTLET_URL, &Method::GET).unwrap();
        // Same instant is possible, same nonce is not.
        assert_ne!(a.get("Authorization"), b.get("Authorization"));
    }

    #[test]
    fn test_method_changes_signature() {
        let s = signer();
        let get = s
            .sign_at(RESTLET_URL, &Method::GET, 1_700_000_000, "n1")
            .unwrap();
        let post = s
            .sign_at(RESTLET_URL, &Method::POST, 1_700_000_000, "n1")
            .unwrap();
        assert_ne!(get.get("Authorization"), post.get("Authorization"));
    }

    #[test]
    fn test_oauth_percent_encoding() {
        assert_eq!(oauth_encode("a b+c~d-e_f.g/h"), "a%20b%2Bc~d-e_f.g%2Fh");
        assert_eq!(oauth_encode("100%"), "100%25");
        assert_eq!(oauth_encode("unreserved-._~"), "unreserved-._~");
    }

    #[test]
    fn test_base_url_strips_query_and_default_port() {
        let url = Url::parse("https://example.com:443/path/to/it?x=1").unwrap();
        assert_eq!(
            RequestSigner::signature_base_url(&url).unwrap(),
            "https://example.com/path/to/it"
        );
        let url = Url::parse("http://localhost:8080/restlet").unwrap();
        assert_eq!(
            RequestSigner::signature_base_url(&url).unwrap(),
            "http://localhost:8080/restlet"
        );
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        let err = signer().sign("not a url", &Method::GET).unwrap_err();
        assert!(matches!(err, Error::Url(_)));
    }
}
