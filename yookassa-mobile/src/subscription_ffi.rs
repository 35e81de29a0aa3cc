//! Subscription records exchanged with the host app.

use std::collections::HashMap;

use yookassa_lib::{
    HttpMethod, PaymentStatus, RequestDescriptor, SubscriptionIdentity, SubscriptionInfo,
    VerificationSource, VerifyOptions,
};

#[derive(Clone, Debug, PartialEq, Eq, uniffi::Record)]
pub struct SubscriptionIdentityFFI {
    pub user_id: Option<String>,
    pub device_id: Option<String>,
}

impl From<SubscriptionIdentity> for SubscriptionIdentityFFI {
    fn from(identity: SubscriptionIdentity) -> Self {
        Self {
            user_id: identity.user_id,
            device_id: identity.device_id,
        }
    }
}

impl From<SubscriptionIdentityFFI> for SubscriptionIdentity {
    fn from(identity: SubscriptionIdentityFFI) -> Self {
        SubscriptionIdentity::new(identity.user_id, identity.device_id)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, uniffi::Enum)]
pub enum PaymentStatusFFI {
    Pending,
    Succeeded,
    Canceled,
}

impl From<PaymentStatus> for PaymentStatusFFI {
    fn from(status: PaymentStatus) -> Self {
        match status {
            PaymentStatus::Pending => Self::Pending,
            PaymentStatus::Succeeded => Self::Succeeded,
            PaymentStatus::Canceled => Self::Canceled,
        }
    }
}

/// Where a verification verdict came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, uniffi::Enum)]
pub enum VerificationSourceFFI {
    Server,
    Local,
    None,
}

impl From<VerificationSource> for VerificationSourceFFI {
    fn from(source: VerificationSource) -> Self {
        match source {
            VerificationSource::Server => Self::Server,
            VerificationSource::Local => Self::Local,
            VerificationSource::None => Self::None,
        }
    }
}

/// Outcome of a verification pass. `server_response_json` is the raw body
/// the verdict was based on.
#[derive(Clone, Debug, PartialEq, uniffi::Record)]
pub struct SubscriptionInfoFFI {
    pub subscription_id: Option<String>,
    pub payment_id: Option<String>,
    pub is_active: bool,
    pub payment_status: Option<PaymentStatusFFI>,
    pub recovery_code: Option<String>,
    pub expires_at: Option<i64>,
    pub auto_renewal_enabled: Option<bool>,
    pub last_server_check: Option<i64>,
    pub server_signature: Option<String>,
    pub source: VerificationSourceFFI,
    pub server_response_json: Option<String>,
}

impl From<SubscriptionInfo> for SubscriptionInfoFFI {
    fn from(info: SubscriptionInfo) -> Self {
        Self {
            subscription_id: info.subscription_id,
            payment_id: info.payment_id,
            is_active: info.is_active,
            payment_status: info.payment_status.map(Into::into),
            recovery_code: info.recovery_code,
            expires_at: info.expires_at,
            auto_renewal_enabled: info.auto_renewal_enabled,
            last_server_check: info.last_server_check,
            server_signature: info.server_signature,
            source: info.source.into(),
            server_response_json: info.server_response.map(|body| body.to_string()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, uniffi::Enum)]
pub enum HttpMethodFFI {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl From<HttpMethodFFI> for HttpMethod {
    fn from(method: HttpMethodFFI) -> Self {
        match method {
            HttpMethodFFI::Get => Self::Get,
            HttpMethodFFI::Post => Self::Post,
            HttpMethodFFI::Put => Self::Put,
            HttpMethodFFI::Patch => Self::Patch,
            HttpMethodFFI::Delete => Self::Delete,
        }
    }
}

/// Backend request supplied by the host instead of the default one.
#[derive(Clone, Debug, uniffi::Record)]
pub struct RequestDescriptorFFI {
    pub url: String,
    pub method: HttpMethodFFI,
    pub headers: HashMap<String, String>,
    pub body: Option<String>,
}

impl From<RequestDescriptorFFI> for RequestDescriptor {
    fn from(request: RequestDescriptorFFI) -> Self {
        Self {
            url: request.url,
            method: request.method.into(),
            headers: request.headers.into_iter().collect(),
            body: request.body,
        }
    }
}

/// Options of a verification pass. Unset optionals take the library defaults.
#[derive(Clone, Debug, uniffi::Record)]
pub struct VerifyOptionsFFI {
    pub server_url: Option<String>,
    pub app_id: i64,
    pub user_id: Option<String>,
    pub device_id: Option<String>,
    pub grace_period_days: Option<u32>,
    pub require_stored_identity: Option<bool>,
    pub check_request: Option<RequestDescriptorFFI>,
    pub payments_request: Option<RequestDescriptorFFI>,
}

impl From<VerifyOptionsFFI> for VerifyOptions {
    fn from(options: VerifyOptionsFFI) -> Self {
        let defaults = VerifyOptions::new(options.app_id);
        Self {
            server_url: options.server_url,
            user_id: options.user_id,
            device_id: options.device_id,
            grace_period_days: options.grace_period_days.unwrap_or(defaults.grace_period_days),
            require_stored_identity: options
                .require_stored_identity
                .unwrap_or(defaults.require_stored_identity),
            check_request: options.check_request.map(Into::into),
            payments_request: options.payments_request.map(Into::into),
            ..defaults
        }
    }
}
