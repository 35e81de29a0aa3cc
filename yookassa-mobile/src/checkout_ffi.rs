//! Native checkout bridge.
//!
//! The host app implements [`CheckoutFFI`] on top of the YooKassa mobile SDK
//! and hands it to [`crate::YookassaMobileClient`]. [`CheckoutBridge`] adapts
//! it to the core [`CheckoutCapability`] trait.
//!
//! Callback interfaces cannot have default methods, so every capability must
//! be implemented. A host whose SDK lacks a feature returns
//! [`YookassaMobileError::Unsupported`] and the client falls back the same
//! way it does for any other platform.

use std::sync::Arc;

use async_trait::async_trait;
use yookassa_lib::{
    CheckoutCapability, ConfirmationParams, ConfirmationResult, ConfirmationStatus, PaymentError,
    PaymentMethodType, SavePaymentMethod, SavedCardTokenizationParams, SubscriptionStatus,
    TokenizationParams, TokenizationResult,
};

use crate::YookassaMobileError;

// ============================================================================
// Records
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, uniffi::Enum)]
pub enum PaymentMethodTypeFFI {
    BankCard,
    Sberbank,
    Sbp,
    YooMoney,
    ApplePay,
    GooglePay,
}

impl From<PaymentMethodType> for PaymentMethodTypeFFI {
    fn from(value: PaymentMethodType) -> Self {
        match value {
            PaymentMethodType::BankCard => Self::BankCard,
            PaymentMethodType::Sberbank => Self::Sberbank,
            PaymentMethodType::Sbp => Self::Sbp,
            PaymentMethodType::YooMoney => Self::YooMoney,
            PaymentMethodType::ApplePay => Self::ApplePay,
            PaymentMethodType::GooglePay => Self::GooglePay,
        }
    }
}

impl From<PaymentMethodTypeFFI> for PaymentMethodType {
    fn from(value: PaymentMethodTypeFFI) -> Self {
        match value {
            PaymentMethodTypeFFI::BankCard => Self::BankCard,
            PaymentMethodTypeFFI::Sberbank => Self::Sberbank,
            PaymentMethodTypeFFI::Sbp => Self::Sbp,
            PaymentMethodTypeFFI::YooMoney => Self::YooMoney,
            PaymentMethodTypeFFI::ApplePay => Self::ApplePay,
            PaymentMethodTypeFFI::GooglePay => Self::GooglePay,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, uniffi::Enum)]
pub enum SavePaymentMethodFFI {
    On,
    Off,
    UserSelects,
}

impl From<SavePaymentMethod> for SavePaymentMethodFFI {
    fn from(value: SavePaymentMethod) -> Self {
        match value {
            SavePaymentMethod::On => Self::On,
            SavePaymentMethod::Off => Self::Off,
            SavePaymentMethod::UserSelects => Self::UserSelects,
        }
    }
}

impl From<SavePaymentMethodFFI> for SavePaymentMethod {
    fn from(value: SavePaymentMethodFFI) -> Self {
        match value {
            SavePaymentMethodFFI::On => Self::On,
            SavePaymentMethodFFI::Off => Self::Off,
            SavePaymentMethodFFI::UserSelects => Self::UserSelects,
        }
    }
}

fn methods_to_ffi(methods: &Option<Vec<PaymentMethodType>>) -> Option<Vec<PaymentMethodTypeFFI>> {
    methods
        .as_ref()
        .map(|list| list.iter().copied().map(Into::into).collect())
}

/// Tokenization parameters as seen by the host.
#[derive(Clone, Debug, uniffi::Record)]
pub struct TokenizationParamsFFI {
    pub client_id: Option<String>,
    pub shop_id: Option<String>,
    pub amount: f64,
    pub currency: Option<String>,
    pub title: String,
    pub subtitle: Option<String>,
    pub save_payment_method: Option<SavePaymentMethodFFI>,
    pub payment_method_types: Option<Vec<PaymentMethodTypeFFI>>,
    pub return_url: Option<String>,
    pub gateway_id: Option<String>,
    pub customer_id: Option<String>,
    pub is_recurring: Option<bool>,
    pub subscription_id: Option<String>,
    pub test_mode: Option<bool>,
    pub user_id: Option<String>,
}

impl From<&TokenizationParams> for TokenizationParamsFFI {
    fn from(params: &TokenizationParams) -> Self {
        Self {
            client_id: params.client_id.clone(),
            shop_id: params.shop_id.clone(),
            amount: params.amount,
            currency: params.currency.clone(),
            title: params.title.clone(),
            subtitle: params.subtitle.clone(),
            save_payment_method: params.save_payment_method.map(Into::into),
            payment_method_types: methods_to_ffi(&params.payment_method_types),
            return_url: params.return_url.clone(),
            gateway_id: params.gateway_id.clone(),
            customer_id: params.customer_id.clone(),
            is_recurring: params.is_recurring,
            subscription_id: params.subscription_id.clone(),
            test_mode: params.test_mode,
            user_id: params.user_id.clone(),
        }
    }
}

impl From<TokenizationParamsFFI> for TokenizationParams {
    fn from(params: TokenizationParamsFFI) -> Self {
        Self {
            client_id: params.client_id,
            shop_id: params.shop_id,
            amount: params.amount,
            currency: params.currency,
            title: params.title,
            subtitle: params.subtitle,
            save_payment_method: params.save_payment_method.map(Into::into),
            payment_method_types: params
                .payment_method_types
                .map(|list| list.into_iter().map(Into::into).collect()),
            return_url: params.return_url,
            gateway_id: params.gateway_id,
            customer_id: params.customer_id,
            is_recurring: params.is_recurring,
            subscription_id: params.subscription_id,
            test_mode: params.test_mode,
            user_id: params.user_id,
        }
    }
}

#[derive(Clone, Debug, uniffi::Record)]
pub struct SavedCardTokenizationParamsFFI {
    pub client_id: Option<String>,
    pub shop_id: Option<String>,
    pub payment_method_id: String,
    pub amount: f64,
    pub currency: Option<String>,
    pub title: String,
    pub subtitle: Option<String>,
    pub save_payment_method: Option<SavePaymentMethodFFI>,
    pub gateway_id: Option<String>,
    pub test_mode: Option<bool>,
}

impl From<&SavedCardTokenizationParams> for SavedCardTokenizationParamsFFI {
    fn from(params: &SavedCardTokenizationParams) -> Self {
        Self {
            client_id: params.client_id.clone(),
            shop_id: params.shop_id.clone(),
            payment_method_id: params.payment_method_id.clone(),
            amount: params.amount,
            currency: params.currency.clone(),
            title: params.title.clone(),
            subtitle: params.subtitle.clone(),
            save_payment_method: params.save_payment_method.map(Into::into),
            gateway_id: params.gateway_id.clone(),
            test_mode: params.test_mode,
        }
    }
}

impl From<SavedCardTokenizationParamsFFI> for SavedCardTokenizationParams {
    fn from(params: SavedCardTokenizationParamsFFI) -> Self {
        Self {
            client_id: params.client_id,
            shop_id: params.shop_id,
            payment_method_id: params.payment_method_id,
            amount: params.amount,
            currency: params.currency,
            title: params.title,
            subtitle: params.subtitle,
            save_payment_method: params.save_payment_method.map(Into::into),
            gateway_id: params.gateway_id,
            test_mode: params.test_mode,
        }
    }
}

#[derive(Clone, Debug, PartialEq, uniffi::Record)]
pub struct TokenizationResultFFI {
    pub token: String,
    pub method_type: PaymentMethodTypeFFI,
    pub payment_method_id: Option<String>,
    pub payment_id: Option<String>,
    pub subscription_id: Option<String>,
}

impl From<TokenizationResult> for TokenizationResultFFI {
    fn from(result: TokenizationResult) -> Self {
        Self {
            token: result.token,
            method_type: result.method_type.into(),
            payment_method_id: result.payment_method_id,
            payment_id: result.payment_id,
            subscription_id: result.subscription_id,
        }
    }
}

impl From<TokenizationResultFFI> for TokenizationResult {
    fn from(result: TokenizationResultFFI) -> Self {
        Self {
            token: result.token,
            method_type: result.method_type.into(),
            payment_method_id: result.payment_method_id,
            payment_id: result.payment_id,
            subscription_id: result.subscription_id,
        }
    }
}

#[derive(Clone, Debug, uniffi::Record)]
pub struct ConfirmationParamsFFI {
    pub confirmation_url: String,
    pub payment_method_type: PaymentMethodTypeFFI,
    pub client_id: Option<String>,
    pub client_application_key: Option<String>,
    pub shop_id: Option<String>,
    pub test_mode: Option<bool>,
}

impl From<&ConfirmationParams> for ConfirmationParamsFFI {
    fn from(params: &ConfirmationParams) -> Self {
        Self {
            confirmation_url: params.confirmation_url.clone(),
            payment_method_type: params.payment_method_type.into(),
            client_id: params.client_id.clone(),
            client_application_key: params.client_application_key.clone(),
            shop_id: params.shop_id.clone(),
            test_mode: params.test_mode,
        }
    }
}

impl From<ConfirmationParamsFFI> for ConfirmationParams {
    fn from(params: ConfirmationParamsFFI) -> Self {
        Self {
            confirmation_url: params.confirmation_url,
            payment_method_type: params.payment_method_type.into(),
            client_id: params.client_id,
            client_application_key: params.client_application_key,
            shop_id: params.shop_id,
            test_mode: params.test_mode,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, uniffi::Enum)]
pub enum ConfirmationStatusFFI {
    Ok,
    Canceled,
    Error,
}

#[derive(Clone, Debug, PartialEq, uniffi::Record)]
pub struct ConfirmationResultFFI {
    pub status: ConfirmationStatusFFI,
    pub error_code: Option<String>,
    pub error_description: Option<String>,
    pub failing_url: Option<String>,
}

impl From<ConfirmationResult> for ConfirmationResultFFI {
    fn from(result: ConfirmationResult) -> Self {
        let status = match result.status {
            ConfirmationStatus::Ok => ConfirmationStatusFFI::Ok,
            ConfirmationStatus::Canceled => ConfirmationStatusFFI::Canceled,
            ConfirmationStatus::Error => ConfirmationStatusFFI::Error,
        };
        Self {
            status,
            error_code: result.error_code,
            error_description: result.error_description,
            failing_url: result.failing_url,
        }
    }
}

impl From<ConfirmationResultFFI> for ConfirmationResult {
    fn from(result: ConfirmationResultFFI) -> Self {
        let status = match result.status {
            ConfirmationStatusFFI::Ok => ConfirmationStatus::Ok,
            ConfirmationStatusFFI::Canceled => ConfirmationStatus::Canceled,
            ConfirmationStatusFFI::Error => ConfirmationStatus::Error,
        };
        Self {
            status,
            error_code: result.error_code,
            error_description: result.error_description,
            failing_url: result.failing_url,
        }
    }
}

/// Subscription status reported by the native SDK.
#[derive(Clone, Debug, PartialEq, Eq, uniffi::Record)]
pub struct SubscriptionStatusFFI {
    pub is_active: bool,
    pub subscription_id: Option<String>,
    pub expires_at: Option<i64>,
    pub auto_renewal_enabled: Option<bool>,
}

impl From<SubscriptionStatus> for SubscriptionStatusFFI {
    fn from(status: SubscriptionStatus) -> Self {
        Self {
            is_active: status.is_active,
            subscription_id: status.subscription_id,
            expires_at: status.expires_at,
            auto_renewal_enabled: status.auto_renewal_enabled,
        }
    }
}

impl From<SubscriptionStatusFFI> for SubscriptionStatus {
    fn from(status: SubscriptionStatusFFI) -> Self {
        Self {
            is_active: status.is_active,
            subscription_id: status.subscription_id,
            expires_at: status.expires_at,
            auto_renewal_enabled: status.auto_renewal_enabled,
        }
    }
}

/// Payload of a tokenization error event. `details_json` is the raw native
/// payload, when the SDK attached one.
#[derive(Clone, Debug, PartialEq, Eq, uniffi::Record)]
pub struct PaymentErrorFFI {
    pub code: String,
    pub message: String,
    pub details_json: Option<String>,
}

impl From<&PaymentError> for PaymentErrorFFI {
    fn from(error: &PaymentError) -> Self {
        Self {
            code: error.code.clone(),
            message: error.message.clone(),
            details_json: error.details.as_ref().map(|details| details.to_string()),
        }
    }
}

// ============================================================================
// Callback Interface
// ============================================================================

/// Native checkout SDK, implemented by the host app.
///
/// Failures should be reported as [`YookassaMobileError::Native`] carrying
/// the SDK's error code. Tokenization cancellation uses the code
/// `TOKENIZATION_CANCELED`.
#[uniffi::export(callback_interface)]
pub trait CheckoutFFI: Send + Sync {
    fn initialize(&self, client_id: String, shop_id: String) -> Result<(), YookassaMobileError>;

    fn start_tokenization(
        &self,
        params: TokenizationParamsFFI,
    ) -> Result<TokenizationResultFFI, YookassaMobileError>;

    fn start_saved_card_tokenization(
        &self,
        params: SavedCardTokenizationParamsFFI,
    ) -> Result<TokenizationResultFFI, YookassaMobileError>;

    fn start_confirmation(
        &self,
        params: ConfirmationParamsFFI,
    ) -> Result<ConfirmationResultFFI, YookassaMobileError>;

    fn confirm_3ds(
        &self,
        confirmation_url: String,
        method: PaymentMethodTypeFFI,
    ) -> Result<bool, YookassaMobileError>;

    fn is_payment_method_available(
        &self,
        method: PaymentMethodTypeFFI,
    ) -> Result<bool, YookassaMobileError>;

    fn start_subscription(
        &self,
        params: TokenizationParamsFFI,
    ) -> Result<TokenizationResultFFI, YookassaMobileError>;

    fn cancel_subscription(&self, subscription_id: String) -> Result<bool, YookassaMobileError>;

    fn check_subscription_status(
        &self,
        subscription_id: String,
    ) -> Result<SubscriptionStatusFFI, YookassaMobileError>;
}

// ============================================================================
// Bridge
// ============================================================================

/// Adapts a host [`CheckoutFFI`] to [`CheckoutCapability`].
pub struct CheckoutBridge {
    inner: Arc<dyn CheckoutFFI>,
}

impl CheckoutBridge {
    pub fn new(inner: Arc<dyn CheckoutFFI>) -> Self {
        Self { inner }
    }
}

impl std::fmt::Debug for CheckoutBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckoutBridge").finish_non_exhaustive()
    }
}

#[async_trait]
impl CheckoutCapability for CheckoutBridge {
    async fn initialize(&self, client_id: &str, shop_id: &str) -> yookassa_lib::Result<()> {
        self.inner
            .initialize(client_id.to_string(), shop_id.to_string())
            .map_err(|e| e.into_checkout_error("initialization"))
    }

    async fn start_tokenization(
        &self,
        params: &TokenizationParams,
    ) -> yookassa_lib::Result<TokenizationResult> {
        self.inner
            .start_tokenization(params.into())
            .map(Into::into)
            .map_err(|e| e.into_checkout_error("tokenization"))
    }

    async fn start_saved_card_tokenization(
        &self,
        params: &SavedCardTokenizationParams,
    ) -> yookassa_lib::Result<TokenizationResult> {
        self.inner
            .start_saved_card_tokenization(params.into())
            .map(Into::into)
            .map_err(|e| e.into_checkout_error("saved card tokenization"))
    }

    async fn start_confirmation(
        &self,
        params: &ConfirmationParams,
    ) -> yookassa_lib::Result<ConfirmationResult> {
        self.inner
            .start_confirmation(params.into())
            .map(Into::into)
            .map_err(|e| e.into_checkout_error("confirmation"))
    }

    async fn confirm_3ds(
        &self,
        confirmation_url: &str,
        method: PaymentMethodType,
    ) -> yookassa_lib::Result<bool> {
        self.inner
            .confirm_3ds(confirmation_url.to_string(), method.into())
            .map_err(|e| e.into_checkout_error("3-D Secure confirmation"))
    }

    async fn is_payment_method_available(
        &self,
        method: PaymentMethodType,
    ) -> yookassa_lib::Result<bool> {
        match self.inner.is_payment_method_available(method.into()) {
            Err(YookassaMobileError::Unsupported { .. }) => Ok(true),
            other => other.map_err(|e| e.into_checkout_error("availability check")),
        }
    }

    async fn start_subscription(
        &self,
        params: &TokenizationParams,
    ) -> yookassa_lib::Result<TokenizationResult> {
        self.inner
            .start_subscription(params.into())
            .map(Into::into)
            .map_err(|e| e.into_checkout_error("subscription purchase"))
    }

    async fn cancel_subscription(&self, subscription_id: &str) -> yookassa_lib::Result<bool> {
        self.inner
            .cancel_subscription(subscription_id.to_string())
            .map_err(|e| e.into_checkout_error("subscription cancellation"))
    }

    async fn check_subscription_status(
        &self,
        subscription_id: &str,
    ) -> yookassa_lib::Result<SubscriptionStatus> {
        self.inner
            .check_subscription_status(subscription_id.to_string())
            .map(Into::into)
            .map_err(|e| e.into_checkout_error("subscription status"))
    }
}
