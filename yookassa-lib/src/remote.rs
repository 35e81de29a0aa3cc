//! Remote verification client.
//!
//! Talks to the application's own backend, whose wire protocol is
//! configurable: callers either pass full [`RequestDescriptor`]s or a base
//! server URL from which the default requests are derived:
//!
//! - `POST {server}/subscriptions/check` with `{app_id, user_id?, device_id?}`
//! - `GET {server}/payments/{paymentId}`
//!
//! Every request is bounded by a hard timeout. On expiry the in-flight
//! future is dropped, which cancels the request; no timer outlives the call.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::subscription::{parse_expires_at, PaymentStatus};

/// Default timeout for backend calls.
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Placeholder substituted with the percent-encoded payment id.
pub const PAYMENT_ID_PLACEHOLDER: &str = "{paymentId}";

/// Errors that make the backend count as unreachable.
#[derive(Debug, Clone, thiserror::Error)]
pub enum VerificationError {
    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    #[error("invalid response from {url}: {reason}")]
    InvalidResponse { url: String, reason: String },

    #[error("invalid request descriptor: {0}")]
    InvalidRequest(String),

    /// Remote verification was requested but nothing could be sent.
    #[error("subscription check request configuration is missing")]
    NotConfigured,
}

/// Error codes for FFI and mobile integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum VerificationErrorCode {
    Timeout = 1000,
    Transport = 2000,
    InvalidResponse = 3000,
    InvalidRequest = 4000,
    NotConfigured = 5000,
}

impl VerificationError {
    pub fn code(&self) -> VerificationErrorCode {
        match self {
            Self::Timeout { .. } => VerificationErrorCode::Timeout,
            Self::Transport { .. } => VerificationErrorCode::Transport,
            Self::InvalidResponse { .. } => VerificationErrorCode::InvalidResponse,
            Self::InvalidRequest(_) => VerificationErrorCode::InvalidRequest,
            Self::NotConfigured => VerificationErrorCode::NotConfigured,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// HTTP method of a request descriptor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    fn to_reqwest(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post => reqwest::Method::POST,
            Self::Put => reqwest::Method::PUT,
            Self::Patch => reqwest::Method::PATCH,
            Self::Delete => reqwest::Method::DELETE,
        }
    }
}

/// A fully specified backend request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestDescriptor {
    pub url: String,
    #[serde(default)]
    pub method: HttpMethod,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl RequestDescriptor {
    /// A GET request to `url`.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// A POST request to `url` with a JSON body.
    pub fn post_json(url: impl Into<String>, body: &Value) -> Self {
        Self {
            url: url.into(),
            method: HttpMethod::Post,
            body: Some(body.to_string()),
            ..Default::default()
        }
        .with_header("Content-Type", "application/json")
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Default status-check request for `server_url`.
    pub fn status_check(
        server_url: &str,
        app_id: i64,
        user_id: Option<&str>,
        device_id: Option<&str>,
    ) -> Self {
        let mut body = serde_json::Map::new();
        body.insert("app_id".into(), Value::from(app_id));
        if let Some(user_id) = user_id {
            body.insert("user_id".into(), Value::from(user_id));
        }
        if let Some(device_id) = device_id {
            body.insert("device_id".into(), Value::from(device_id));
        }
        Self::post_json(
            format!("{}/subscriptions/check", base_url(server_url)),
            &Value::Object(body),
        )
    }

    /// Default payment lookup request for `server_url`.
    pub fn payment_lookup(server_url: &str, payment_id: &str) -> Self {
        Self::get(format!(
            "{}/payments/{}",
            base_url(server_url),
            urlencoding::encode(payment_id)
        ))
        .with_header("Content-Type", "application/json")
    }

    /// Substitute `{paymentId}` in the URL with the percent-encoded id.
    pub fn with_payment_id(mut self, payment_id: &str) -> Self {
        if self.url.contains(PAYMENT_ID_PLACEHOLDER) {
            self.url = self
                .url
                .replacen(PAYMENT_ID_PLACEHOLDER, &urlencoding::encode(payment_id), 1);
        }
        self
    }
}

fn base_url(server_url: &str) -> &str {
    server_url.trim_end_matches('/')
}

/// Classified HTTP reply.
#[derive(Clone, Debug, PartialEq)]
pub enum RemoteReply {
    /// 2xx with a JSON body.
    Ok(Value),
    /// 400 or 403: authoritative "no subscription". Body kept if it was JSON.
    Rejected { status: u16, body: Option<Value> },
    /// Any other non-success status.
    Failed { status: u16 },
}

/// Subscription object inside a status-check reply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerSubscription {
    pub id: Option<String>,
    pub expires_at: Option<i64>,
}

/// Interpretation of a 2xx status-check body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StatusVerdict {
    /// `active` is exactly `false`.
    Denied,
    /// `active` is exactly `true` and a `subscription` object is present.
    Active(ServerSubscription),
    /// Any other shape.
    Ambiguous,
}

impl StatusVerdict {
    pub fn from_body(body: &Value) -> Self {
        match body.get("active").and_then(Value::as_bool) {
            Some(false) => Self::Denied,
            Some(true) => match body.get("subscription").filter(|s| s.is_object()) {
                Some(subscription) => Self::Active(ServerSubscription {
                    id: subscription.get("id").and_then(scalar_to_string),
                    expires_at: subscription
                        .get("expires_at")
                        .and_then(Value::as_str)
                        .and_then(parse_expires_at),
                }),
                None => Self::Ambiguous,
            },
            None => Self::Ambiguous,
        }
    }
}

/// Interpretation of a 2xx payment lookup body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaymentLookup {
    /// `None` when the status is missing or not one we know.
    pub status: Option<PaymentStatus>,
    pub subscription_id: Option<String>,
    pub expires_at: Option<i64>,
    pub server_signature: Option<String>,
    pub recovery_code: Option<String>,
}

impl PaymentLookup {
    pub fn from_body(body: &Value) -> Self {
        let string_field = |name: &str| body.get(name).and_then(Value::as_str).map(str::to_string);
        Self {
            status: body
                .get("status")
                .and_then(Value::as_str)
                .and_then(PaymentStatus::from_wire),
            subscription_id: body
                .get("subscription_id")
                .and_then(scalar_to_string)
                .filter(|id| !id.is_empty()),
            expires_at: body
                .get("expires_at")
                .and_then(Value::as_str)
                .and_then(parse_expires_at),
            server_signature: string_field("server_signature"),
            recovery_code: string_field("recovery_code"),
        }
    }
}

/// Ids may arrive as JSON strings or numbers.
fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// HTTP client for the subscription backend.
#[derive(Clone, Debug)]
pub struct VerificationClient {
    client: reqwest::Client,
    timeout: Duration,
}

impl VerificationClient {
    /// Create a client with the given per-request timeout.
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout,
        }
    }

    /// Create a client sharing an existing `reqwest` connection pool.
    pub fn with_client(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send `request` and classify the reply.
    ///
    /// Fails on transport errors, timeouts and 2xx bodies that are not JSON.
    #[tracing::instrument(skip(self, request), fields(url = %request.url, method = ?request.method))]
    pub async fn send(&self, request: &RequestDescriptor) -> Result<RemoteReply, VerificationError> {
        let timeout_ms = self.timeout.as_millis() as u64;
        match tokio::time::timeout(self.timeout, self.exchange(request)).await {
            Ok(result) => result,
            Err(_) => Err(VerificationError::Timeout {
                operation: format!("{:?} {}", request.method, request.url),
                timeout_ms,
            }),
        }
    }

    async fn exchange(&self, request: &RequestDescriptor) -> Result<RemoteReply, VerificationError> {
        let url = reqwest::Url::parse(&request.url)
            .map_err(|e| VerificationError::InvalidRequest(format!("{}: {}", request.url, e)))?;

        let mut builder = self.client.request(request.method.to_reqwest(), url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(|e| VerificationError::Transport {
            url: request.url.clone(),
            reason: e.to_string(),
        })?;
        let status = response.status().as_u16();
        tracing::debug!(status, "backend replied");

        let text = response
            .text()
            .await
            .map_err(|e| VerificationError::Transport {
                url: request.url.clone(),
                reason: e.to_string(),
            })?;

        match status {
            200..=299 => serde_json::from_str(&text)
                .map(RemoteReply::Ok)
                .map_err(|e| VerificationError::InvalidResponse {
                    url: request.url.clone(),
                    reason: e.to_string(),
                }),
            400 | 403 => Ok(RemoteReply::Rejected {
                status,
                body: serde_json::from_str(&text).ok(),
            }),
            _ => Ok(RemoteReply::Failed { status }),
        }
    }
}

impl Default for VerificationClient {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_TIMEOUT_MS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_check_descriptor() {
        let request = RequestDescriptor::status_check("https://api.example.com/", 42, Some("u1"), None);

        assert_eq!(request.url, "https://api.example.com/subscriptions/check");
        assert_eq!(request.method, HttpMethod::Post);
        assert_eq!(
            request.headers.get("Content-Type").map(String::as_str),
            Some("application/json")
        );
        let body: Value = serde_json::from_str(request.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({"app_id": 42, "user_id": "u1"}));
    }

    #[test]
    fn test_payment_lookup_encodes_id() {
        let request = RequestDescriptor::payment_lookup("https://api.example.com", "pay/1 2");
        assert_eq!(request.url, "https://api.example.com/payments/pay%2F1%202");
        assert_eq!(request.method, HttpMethod::Get);
    }

    #[test]
    fn test_payment_placeholder() {
        let request = RequestDescriptor::get("https://x.test/p/{paymentId}/status").with_payment_id("a b");
        assert_eq!(request.url, "https://x.test/p/a%20b/status");

        let untouched = RequestDescriptor::get("https://x.test/latest").with_payment_id("p1");
        assert_eq!(untouched.url, "https://x.test/latest");
    }

    #[test]
    fn test_status_verdicts() {
        assert_eq!(StatusVerdict::from_body(&json!({"active": false})), StatusVerdict::Denied);
        assert_eq!(StatusVerdict::from_body(&json!({"active": true})), StatusVerdict::Ambiguous);
        assert_eq!(StatusVerdict::from_body(&json!({"active": "false"})), StatusVerdict::Ambiguous);
        assert_eq!(StatusVerdict::from_body(&json!([])), StatusVerdict::Ambiguous);

        let verdict = StatusVerdict::from_body(&json!({
            "active": true,
            "subscription": {"id": 17, "expires_at": "1970-01-01T00:00:02Z"}
        }));
        assert_eq!(
            verdict,
            StatusVerdict::Active(ServerSubscription {
                id: Some("17".into()),
                expires_at: Some(2000),
            })
        );
    }

    #[test]
    fn test_unparsable_expiry_is_absent() {
        let verdict = StatusVerdict::from_body(&json!({
            "active": true,
            "subscription": {"id": "s1", "expires_at": "soon"}
        }));
        assert_eq!(
            verdict,
            StatusVerdict::Active(ServerSubscription {
                id: Some("s1".into()),
                expires_at: None,
            })
        );
    }

    #[test]
    fn test_payment_lookup_body() {
        let lookup = PaymentLookup::from_body(&json!({
            "status": "succeeded",
            "subscription_id": "s9",
            "expires_at": "1970-01-01T00:00:01Z",
            "server_signature": "sig",
            "recovery_code": 12
        }));
        assert_eq!(lookup.status, Some(PaymentStatus::Succeeded));
        assert_eq!(lookup.subscription_id.as_deref(), Some("s9"));
        assert_eq!(lookup.expires_at, Some(1000));
        assert_eq!(lookup.server_signature.as_deref(), Some("sig"));
        // non-string recovery codes are dropped
        assert_eq!(lookup.recovery_code, None);

        let unknown = PaymentLookup::from_body(&json!({"status": "waiting_for_capture"}));
        assert_eq!(unknown.status, None);
    }

    #[test]
    fn test_descriptor_json_defaults() {
        let request: RequestDescriptor =
            serde_json::from_str(r#"{"url":"https://x.test/check"}"#).unwrap();
        assert_eq!(request.method, HttpMethod::Get);
        assert!(request.headers.is_empty());
        assert!(request.body.is_none());
    }

    #[tokio::test]
    async fn test_invalid_url_is_an_error() {
        let client = VerificationClient::default();
        let err = client.send(&RequestDescriptor::get("not a url")).await.unwrap_err();
        assert!(matches!(err, VerificationError::InvalidRequest(_)));
    }
}
