//! Checkout request and result types.
//!
//! Field names serialize in camelCase and enum values in SCREAMING_SNAKE_CASE,
//! the shapes the native SDK wrappers exchange.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Payment method offered by the checkout UI.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethodType {
    BankCard,
    Sberbank,
    Sbp,
    YooMoney,
    ApplePay,
    GooglePay,
}

impl PaymentMethodType {
    /// Methods shown when the caller does not choose.
    pub const DEFAULT_SET: [PaymentMethodType; 3] = [Self::BankCard, Self::Sberbank, Self::Sbp];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BankCard => "BANK_CARD",
            Self::Sberbank => "SBERBANK",
            Self::Sbp => "SBP",
            Self::YooMoney => "YOO_MONEY",
            Self::ApplePay => "APPLE_PAY",
            Self::GooglePay => "GOOGLE_PAY",
        }
    }

    /// Parse the wire name.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "BANK_CARD" => Some(Self::BankCard),
            "SBERBANK" => Some(Self::Sberbank),
            "SBP" => Some(Self::Sbp),
            "YOO_MONEY" => Some(Self::YooMoney),
            "APPLE_PAY" => Some(Self::ApplePay),
            "GOOGLE_PAY" => Some(Self::GooglePay),
            _ => None,
        }
    }
}

impl std::fmt::Display for PaymentMethodType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the SDK should save the payment method for later charges.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SavePaymentMethod {
    On,
    Off,
    UserSelects,
}

/// Parameters of a tokenization flow.
///
/// Optional fields left empty are filled from [`crate::CheckoutConfig`] and
/// the flow's defaults before the native SDK sees them.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenizationParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shop_id: Option<String>,
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_payment_method: Option<SavePaymentMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method_types: Option<Vec<PaymentMethodType>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway_id: Option<String>,
    /// Buyer id in the merchant's own system.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_recurring: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_mode: Option<bool>,
    /// Signed-in user; scopes ids persisted by subscription purchases.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl TokenizationParams {
    pub fn new(amount: f64, title: impl Into<String>) -> Self {
        Self {
            amount,
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_credentials(mut self, client_id: impl Into<String>, shop_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self.shop_id = Some(shop_id.into());
        self
    }

    pub fn with_subscription_id(mut self, subscription_id: impl Into<String>) -> Self {
        self.subscription_id = Some(subscription_id.into());
        self
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

/// Parameters for charging a previously saved card.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedCardTokenizationParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shop_id: Option<String>,
    pub payment_method_id: String,
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_payment_method: Option<SavePaymentMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_mode: Option<bool>,
}

/// Token produced by the native SDK.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenizationResult {
    pub token: String,
    #[serde(rename = "type")]
    pub method_type: PaymentMethodType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
}

impl TokenizationResult {
    pub fn new(token: impl Into<String>, method_type: PaymentMethodType) -> Self {
        Self {
            token: token.into(),
            method_type,
            payment_method_id: None,
            payment_id: None,
            subscription_id: None,
        }
    }
}

/// Parameters for confirming a payment (SBP, SberPay, 3-D Secure).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationParams {
    pub confirmation_url: String,
    pub payment_method_type: PaymentMethodType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_application_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shop_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_mode: Option<bool>,
}

impl ConfirmationParams {
    pub fn new(confirmation_url: impl Into<String>, payment_method_type: PaymentMethodType) -> Self {
        Self {
            confirmation_url: confirmation_url.into(),
            payment_method_type,
            client_id: None,
            client_application_key: None,
            shop_id: None,
            test_mode: None,
        }
    }
}

/// Outcome reported by the confirmation screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConfirmationStatus {
    Ok,
    Canceled,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationResult {
    pub status: ConfirmationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failing_url: Option<String>,
}

impl ConfirmationResult {
    pub fn ok() -> Self {
        Self::with_status(ConfirmationStatus::Ok)
    }

    pub fn canceled() -> Self {
        Self::with_status(ConfirmationStatus::Canceled)
    }

    fn with_status(status: ConfirmationStatus) -> Self {
        Self {
            status,
            error_code: None,
            error_description: None,
            failing_url: None,
        }
    }
}

/// Payload of a tokenization error event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PaymentError {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl PaymentError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }
}
