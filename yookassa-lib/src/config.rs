//! Configuration types for the checkout client and subscription verification.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::remote::{RequestDescriptor, DEFAULT_TIMEOUT_MS};

/// Currency used when tokenization parameters omit one.
pub const DEFAULT_CURRENCY: &str = "RUB";

/// Grace period written into locally cached subscription records.
pub const DEFAULT_GRACE_PERIOD_DAYS: u32 = 7;

/// Client-wide configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutConfig {
    /// Client id used when a call does not pass one.
    #[serde(default)]
    pub client_id: Option<String>,

    /// Shop id used when a call does not pass one.
    #[serde(default)]
    pub shop_id: Option<String>,

    /// Currency applied when tokenization parameters omit one.
    #[serde(default = "default_currency")]
    pub default_currency: String,

    /// Hard timeout for each backend request, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub verification_timeout_ms: u64,

    /// Test mode applied when a call does not specify one.
    #[serde(default)]
    pub test_mode: bool,
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            shop_id: None,
            default_currency: default_currency(),
            verification_timeout_ms: default_timeout_ms(),
            test_mode: false,
        }
    }
}

impl CheckoutConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set default credentials.
    pub fn with_credentials(mut self, client_id: impl Into<String>, shop_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self.shop_id = Some(shop_id.into());
        self
    }

    pub fn with_default_currency(mut self, currency: impl Into<String>) -> Self {
        self.default_currency = currency.into();
        self
    }

    pub fn with_verification_timeout(mut self, timeout: Duration) -> Self {
        self.verification_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_test_mode(mut self, test_mode: bool) -> Self {
        self.test_mode = test_mode;
        self
    }

    /// Backend request timeout.
    pub fn verification_timeout(&self) -> Duration {
        Duration::from_millis(self.verification_timeout_ms)
    }
}

/// Options for a single subscription verification pass.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyOptions {
    /// Base URL of the subscription backend.
    #[serde(default)]
    pub server_url: Option<String>,

    /// Application id reported to the backend.
    #[serde(default)]
    pub app_id: i64,

    #[serde(default)]
    pub user_id: Option<String>,

    #[serde(default)]
    pub device_id: Option<String>,

    /// Grace period stored with records confirmed by the server.
    #[serde(default = "default_grace_period_days")]
    pub grace_period_days: u32,

    /// Return "none" immediately when no identity has been saved.
    #[serde(default = "default_require_stored_identity")]
    pub require_stored_identity: bool,

    /// Replaces the default status-check request.
    #[serde(default)]
    pub check_request: Option<RequestDescriptor>,

    /// Replaces the default payment lookup. The URL may contain `{paymentId}`.
    #[serde(default)]
    pub payments_request: Option<RequestDescriptor>,
}

fn default_grace_period_days() -> u32 {
    DEFAULT_GRACE_PERIOD_DAYS
}

fn default_require_stored_identity() -> bool {
    true
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            server_url: None,
            app_id: 0,
            user_id: None,
            device_id: None,
            grace_period_days: default_grace_period_days(),
            require_stored_identity: default_require_stored_identity(),
            check_request: None,
            payments_request: None,
        }
    }
}

impl VerifyOptions {
    pub fn new(app_id: i64) -> Self {
        Self {
            app_id,
            ..Default::default()
        }
    }

    pub fn with_server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = Some(url.into());
        self
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_device_id(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    pub fn with_grace_period_days(mut self, days: u32) -> Self {
        self.grace_period_days = days;
        self
    }

    pub fn with_require_stored_identity(mut self, required: bool) -> Self {
        self.require_stored_identity = required;
        self
    }

    pub fn with_check_request(mut self, request: RequestDescriptor) -> Self {
        self.check_request = Some(request);
        self
    }

    pub fn with_payments_request(mut self, request: RequestDescriptor) -> Self {
        self.payments_request = Some(request);
        self
    }

    /// Server URL, ignoring empty strings.
    pub fn server_url(&self) -> Option<&str> {
        self.server_url.as_deref().filter(|url| !url.is_empty())
    }

    /// True when any backend call could be made.
    pub fn has_remote(&self) -> bool {
        self.server_url().is_some() || self.check_request.is_some() || self.payments_request.is_some()
    }
}
