//! Subscription data model.
//!
//! [`LocalSubscriptionData`] is the record persisted per identity;
//! [`SubscriptionInfo`] is the value handed back to the application. All
//! JSON uses camelCase field names, the shape the JavaScript side expects.
//! Records stored under the older `<slot>_<id>` key scheme are not migrated;
//! the first server check after an upgrade repopulates the cache.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current time in epoch milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Parse a server-provided expiry into epoch milliseconds.
///
/// Accepts RFC 3339 timestamps, offset-less `YYYY-MM-DDTHH:MM:SS[.fff]`
/// (read as UTC) and bare `YYYY-MM-DD` dates (UTC midnight). Anything else,
/// including an empty string, yields `None`.
pub fn parse_expires_at(value: &str) -> Option<i64> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.timestamp_millis());
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc().timestamp_millis());
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().timestamp_millis())
}

/// Cached subscription record, persisted per identity.
///
/// `expires_at` alone decides whether the record is usable offline. The
/// grace period is carried for the backend's benefit and never shortens an
/// unexpired record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalSubscriptionData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
    /// Expiry, epoch milliseconds.
    pub expires_at: i64,
    /// When the server last confirmed this record, epoch milliseconds.
    pub last_server_check: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recovery_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grace_period_days: Option<u32>,
}

impl LocalSubscriptionData {
    /// Create a record confirmed at `last_server_check`.
    pub fn new(subscription_id: Option<String>, expires_at: i64, last_server_check: i64) -> Self {
        Self {
            subscription_id,
            expires_at,
            last_server_check,
            server_signature: None,
            recovery_code: None,
            grace_period_days: None,
        }
    }

    pub fn with_server_signature(mut self, signature: Option<String>) -> Self {
        self.server_signature = signature;
        self
    }

    pub fn with_recovery_code(mut self, code: Option<String>) -> Self {
        self.recovery_code = code;
        self
    }

    pub fn with_grace_period_days(mut self, days: u32) -> Self {
        self.grace_period_days = Some(days);
        self
    }

    /// Whether the record is still usable at `now` (epoch ms).
    pub fn is_valid_at(&self, now: i64) -> bool {
        self.expires_at > now
    }
}

/// Status of a payment as reported by the backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Succeeded,
    Canceled,
}

impl PaymentStatus {
    /// Parse the backend's wire value.
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "succeeded" => Some(Self::Succeeded),
            "canceled" => Some(Self::Canceled),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Succeeded => "succeeded",
            Self::Canceled => "canceled",
        }
    }
}

/// Where a [`SubscriptionInfo`] verdict came from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationSource {
    /// Fresh answer from the backend.
    Server,
    /// Cached record, server unreachable or not configured.
    Local,
    /// Nothing known.
    #[default]
    None,
}

/// Result of subscription verification.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_status: Option<PaymentStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recovery_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_renewal_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_server_check: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_signature: Option<String>,
    pub source: VerificationSource,
    /// Raw backend body, when the verdict came from the network.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_response: Option<serde_json::Value>,
}

impl SubscriptionInfo {
    /// Inactive verdict from the given source.
    pub fn inactive(source: VerificationSource) -> Self {
        Self {
            is_active: false,
            source,
            ..Default::default()
        }
    }

    /// Nothing known about the subscription.
    pub fn none() -> Self {
        Self::inactive(VerificationSource::None)
    }

    /// Active verdict built from a still-valid cached record.
    pub fn from_local(data: &LocalSubscriptionData) -> Self {
        Self {
            subscription_id: data.subscription_id.clone(),
            is_active: true,
            expires_at: Some(data.expires_at),
            auto_renewal_enabled: Some(true),
            last_server_check: Some(data.last_server_check),
            server_signature: data.server_signature.clone(),
            recovery_code: data.recovery_code.clone(),
            source: VerificationSource::Local,
            ..Default::default()
        }
    }

    pub fn with_server_response(mut self, response: Option<serde_json::Value>) -> Self {
        self.server_response = response;
        self
    }
}

/// Subscription status reported by the native SDK or derived from the
/// stored subscription id.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStatus {
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_renewal_enabled: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rfc3339() {
        assert_eq!(parse_expires_at("1970-01-01T00:00:01Z"), Some(1000));
        assert_eq!(parse_expires_at("1970-01-01T03:00:01+03:00"), Some(1000));
        assert_eq!(parse_expires_at("1970-01-01T00:00:00.250Z"), Some(250));
    }

    #[test]
    fn test_parse_without_offset_is_utc() {
        assert_eq!(parse_expires_at("1970-01-02T00:00:00"), Some(86_400_000));
        assert_eq!(parse_expires_at("1970-01-02"), Some(86_400_000));
    }

    #[test]
    fn test_parse_garbage() {
        assert_eq!(parse_expires_at(""), None);
        assert_eq!(parse_expires_at("next tuesday"), None);
        assert_eq!(parse_expires_at("2025-13-45"), None);
    }

    #[test]
    fn test_local_record_uses_camel_case() {
        let data = LocalSubscriptionData::new(Some("sub_1".into()), 2_000, 1_000)
            .with_grace_period_days(7);
        let json = serde_json::to_value(&data).unwrap();

        assert_eq!(json["subscriptionId"], "sub_1");
        assert_eq!(json["expiresAt"], 2_000);
        assert_eq!(json["lastServerCheck"], 1_000);
        assert_eq!(json["gracePeriodDays"], 7);
        assert!(json.get("serverSignature").is_none());
    }

    #[test]
    fn test_reads_legacy_record() {
        let raw = r#"{"subscriptionId":"s","expiresAt":1700000000000,"lastServerCheck":1690000000000,"gracePeriodDays":7}"#;
        let data: LocalSubscriptionData = serde_json::from_str(raw).unwrap();
        assert_eq!(data.subscription_id.as_deref(), Some("s"));
        assert_eq!(data.grace_period_days, Some(7));
        assert!(data.is_valid_at(1_699_999_999_999));
        assert!(!data.is_valid_at(1_700_000_000_000));
    }

    #[test]
    fn test_info_from_local() {
        let data = LocalSubscriptionData::new(Some("sub".into()), 10, 5)
            .with_server_signature(Some("sig".into()))
            .with_recovery_code(Some("rc".into()));
        let info = SubscriptionInfo::from_local(&data);

        assert!(info.is_active);
        assert_eq!(info.source, VerificationSource::Local);
        assert_eq!(info.expires_at, Some(10));
        assert_eq!(info.auto_renewal_enabled, Some(true));
        assert_eq!(info.server_signature.as_deref(), Some("sig"));
        assert_eq!(info.recovery_code.as_deref(), Some("rc"));
    }

    #[test]
    fn test_info_serialization() {
        let info = SubscriptionInfo {
            payment_status: Some(PaymentStatus::Pending),
            ..SubscriptionInfo::inactive(VerificationSource::Server)
        };
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["isActive"], false);
        assert_eq!(json["source"], "server");
        assert_eq!(json["paymentStatus"], "pending");
        assert!(json.get("expiresAt").is_none());
    }

    #[test]
    fn test_payment_status_wire() {
        assert_eq!(PaymentStatus::from_wire("succeeded"), Some(PaymentStatus::Succeeded));
        assert_eq!(PaymentStatus::from_wire("waiting_for_capture"), None);
        assert_eq!(PaymentStatus::Canceled.as_str(), "canceled");
    }
}
