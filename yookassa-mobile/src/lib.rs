//! YooKassa Mobile FFI Bindings
//!
//! UniFFI bindings for the YooKassa checkout bridge, for use from iOS
//! (Swift) and Android (Kotlin).
//!
//! # Architecture
//!
//! The host app supplies two callback interfaces:
//! - [`CheckoutFFI`] wrapping the native YooKassa SDK
//! - [`SecureStoreFFI`] wrapping Keychain / EncryptedSharedPreferences
//!
//! [`YookassaMobileClient`] wires them into the core
//! [`yookassa_lib::YookassaClient`] and exposes its operations as blocking
//! calls.
//!
//! # Thread Safety
//!
//! All exposed types are thread-safe. Blocking calls run on the client's own
//! Tokio runtime and must not be made from inside another async runtime.

pub mod checkout_ffi;
pub mod events_ffi;
pub mod storage_ffi;
pub mod subscription_ffi;

pub use checkout_ffi::{
    CheckoutBridge, CheckoutFFI, ConfirmationParamsFFI, ConfirmationResultFFI,
    ConfirmationStatusFFI, PaymentErrorFFI, PaymentMethodTypeFFI, SavePaymentMethodFFI,
    SavedCardTokenizationParamsFFI, SubscriptionStatusFFI, TokenizationParamsFFI,
    TokenizationResultFFI,
};
pub use events_ffi::{CheckoutEventListenerFFI, EventSubscriptionFFI};
pub use storage_ffi::{SecureStoreBridge, SecureStoreFFI};
pub use subscription_ffi::{
    HttpMethodFFI, PaymentStatusFFI, RequestDescriptorFFI, SubscriptionIdentityFFI,
    SubscriptionInfoFFI, VerificationSourceFFI, VerifyOptionsFFI,
};

use std::sync::Arc;
use std::time::Duration;

use yookassa_lib::{
    CheckoutConfig, CheckoutError, ConfirmationParams, PaymentMethodType,
    SavedCardTokenizationParams, SubscriptionIdentity, TokenizationParams, VerifyOptions,
    YookassaClient,
};

// UniFFI scaffolding
uniffi::setup_scaffolding!();

// ============================================================================
// Error Types
// ============================================================================

/// Mobile-friendly error type.
#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum YookassaMobileError {
    /// Invalid or missing input.
    #[error("Validation error: {msg}")]
    Validation { msg: String },

    /// The SDK was used before initialization.
    #[error("Not initialized: {msg}")]
    NotInitialized { msg: String },

    /// The user closed the payment UI.
    #[error("Canceled: {msg}")]
    Canceled { msg: String },

    /// Tokenization failed.
    #[error("Payment failed: {msg}")]
    PaymentFailed { msg: String },

    /// Native SDK error with its own code.
    #[error("Native error {code}: {msg}")]
    Native { code: String, msg: String },

    /// Capability missing on this platform.
    #[error("Unsupported: {msg}")]
    Unsupported { msg: String },

    /// Secure storage failure.
    #[error("Storage error: {msg}")]
    Storage { msg: String },

    /// Backend request failure.
    #[error("Network error: {msg}")]
    Network { msg: String },

    /// Serialization error.
    #[error("Serialization error: {msg}")]
    Serialization { msg: String },

    /// Internal error.
    #[error("Internal error: {msg}")]
    Internal { msg: String },
}

impl From<CheckoutError> for YookassaMobileError {
    fn from(e: CheckoutError) -> Self {
        let msg = e.to_string();
        match e {
            CheckoutError::Unsupported(_) => Self::Unsupported { msg },
            CheckoutError::NotInitialized(_) => Self::NotInitialized { msg },
            CheckoutError::Canceled => Self::Canceled { msg },
            CheckoutError::PaymentFailed(reason) => Self::PaymentFailed { msg: reason },
            CheckoutError::Native { code, message } => Self::Native { code, msg: message },
            CheckoutError::InvalidData { .. } => Self::Validation { msg },
            CheckoutError::Serialization(_) => Self::Serialization { msg },
            CheckoutError::Storage(_) => Self::Storage { msg },
            CheckoutError::Internal(_) => Self::Internal { msg },
        }
    }
}

impl From<uniffi::UnexpectedUniFFICallbackError> for YookassaMobileError {
    fn from(e: uniffi::UnexpectedUniFFICallbackError) -> Self {
        Self::Internal { msg: e.reason }
    }
}

impl YookassaMobileError {
    /// Convert an error raised by a host callback into the core error type.
    pub(crate) fn into_checkout_error(self, operation: &'static str) -> CheckoutError {
        tracing::debug!(operation, error = %self, "native checkout reported an error");
        match self {
            Self::Native { code, msg } => CheckoutError::native(code, msg),
            Self::Canceled { .. } => CheckoutError::Canceled,
            Self::PaymentFailed { msg } => CheckoutError::PaymentFailed(msg),
            Self::Unsupported { .. } => CheckoutError::Unsupported(operation),
            Self::NotInitialized { msg } => CheckoutError::NotInitialized(msg),
            Self::Validation { msg } => CheckoutError::invalid_data(operation, msg),
            Self::Serialization { msg } => CheckoutError::Serialization(msg),
            Self::Storage { msg } | Self::Network { msg } | Self::Internal { msg } => {
                CheckoutError::Internal(msg)
            }
        }
    }
}

/// Result type for mobile operations.
pub type Result<T> = std::result::Result<T, YookassaMobileError>;

// ============================================================================
// Configuration
// ============================================================================

/// Client configuration. Unset optionals take the library defaults.
#[derive(Clone, Debug, Default, uniffi::Record)]
pub struct CheckoutConfigFFI {
    pub client_id: Option<String>,
    pub shop_id: Option<String>,
    pub default_currency: Option<String>,
    pub verification_timeout_ms: Option<u64>,
    pub test_mode: Option<bool>,
}

impl From<CheckoutConfigFFI> for CheckoutConfig {
    fn from(config: CheckoutConfigFFI) -> Self {
        let mut out = CheckoutConfig::new();
        out.client_id = config.client_id;
        out.shop_id = config.shop_id;
        if let Some(currency) = config.default_currency {
            out = out.with_default_currency(currency);
        }
        if let Some(ms) = config.verification_timeout_ms {
            out = out.with_verification_timeout(Duration::from_millis(ms));
        }
        if let Some(test_mode) = config.test_mode {
            out = out.with_test_mode(test_mode);
        }
        out
    }
}

// ============================================================================
// Logging
// ============================================================================

/// Install a global `tracing` subscriber writing to stderr.
///
/// `filter` uses `EnvFilter` syntax, e.g. `"yookassa_lib=debug"`. Returns
/// false if a subscriber was already installed.
#[cfg(feature = "logging")]
#[uniffi::export]
pub fn init_logging(filter: String) -> bool {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .try_init()
        .is_ok()
}

// ============================================================================
// Main Client
// ============================================================================

/// Checkout client for mobile applications.
#[derive(uniffi::Object)]
pub struct YookassaMobileClient {
    inner: YookassaClient,
    /// Tokio runtime for async operations.
    runtime: tokio::runtime::Runtime,
}

#[uniffi::export]
impl YookassaMobileClient {
    /// Create a client with default configuration.
    #[uniffi::constructor]
    pub fn new(checkout: Box<dyn CheckoutFFI>, store: Box<dyn SecureStoreFFI>) -> Result<Arc<Self>> {
        Self::new_with_config(checkout, store, CheckoutConfigFFI::default())
    }

    /// Create a client with explicit configuration.
    #[uniffi::constructor]
    pub fn new_with_config(
        checkout: Box<dyn CheckoutFFI>,
        store: Box<dyn SecureStoreFFI>,
        config: CheckoutConfigFFI,
    ) -> Result<Arc<Self>> {
        let runtime = tokio::runtime::Runtime::new().map_err(|e| YookassaMobileError::Internal {
            msg: e.to_string(),
        })?;

        let checkout = Arc::new(CheckoutBridge::new(Arc::from(checkout)));
        let store = Arc::new(SecureStoreBridge::new(Arc::from(store)));
        let inner = YookassaClient::new(config.into(), checkout, store);

        Ok(Arc::new(Self { inner, runtime }))
    }

    // ------------------------------------------------------------------
    // Payments
    // ------------------------------------------------------------------

    pub fn initialize(&self, client_id: String, shop_id: String) -> Result<()> {
        Ok(self.runtime.block_on(self.inner.initialize(&client_id, &shop_id))?)
    }

    pub fn start_tokenization(&self, params: TokenizationParamsFFI) -> Result<TokenizationResultFFI> {
        let params = TokenizationParams::from(params);
        let result = self.runtime.block_on(self.inner.start_tokenization(&params))?;
        Ok(result.into())
    }

    pub fn start_saved_card_tokenization(
        &self,
        params: SavedCardTokenizationParamsFFI,
    ) -> Result<TokenizationResultFFI> {
        let params = SavedCardTokenizationParams::from(params);
        let result = self
            .runtime
            .block_on(self.inner.start_saved_card_tokenization(&params))?;
        Ok(result.into())
    }

    pub fn start_confirmation(&self, params: ConfirmationParamsFFI) -> Result<ConfirmationResultFFI> {
        let params = ConfirmationParams::from(params);
        let result = self.runtime.block_on(self.inner.start_confirmation(&params))?;
        Ok(result.into())
    }

    /// Legacy SBP confirmation. Prefer `start_confirmation`.
    pub fn start_sbp_confirmation(&self, confirmation_url: String) -> Result<ConfirmationResultFFI> {
        self.confirm_with(confirmation_url, PaymentMethodType::Sbp)
    }

    /// Legacy SberPay confirmation. Prefer `start_confirmation`.
    pub fn start_sber_pay_confirmation(&self, confirmation_url: String) -> Result<ConfirmationResultFFI> {
        self.confirm_with(confirmation_url, PaymentMethodType::Sberbank)
    }

    /// Legacy 3-D Secure confirmation. Prefer `start_confirmation`.
    pub fn start_3ds_confirmation(&self, confirmation_url: String) -> Result<ConfirmationResultFFI> {
        self.confirm_with(confirmation_url, PaymentMethodType::BankCard)
    }

    /// Present a 3-D Secure challenge. Prefer `start_confirmation`.
    pub fn confirm_3ds(&self, confirmation_url: String, method: PaymentMethodTypeFFI) -> Result<bool> {
        #[allow(deprecated)]
        let challenge = self.inner.confirm_3ds(&confirmation_url, method.into());
        Ok(self.runtime.block_on(challenge)?)
    }

    pub fn is_payment_method_available(&self, method: PaymentMethodTypeFFI) -> Result<bool> {
        Ok(self
            .runtime
            .block_on(self.inner.is_payment_method_available(method.into()))?)
    }

    // ------------------------------------------------------------------
    // Subscriptions
    // ------------------------------------------------------------------

    pub fn start_subscription(&self, params: TokenizationParamsFFI) -> Result<TokenizationResultFFI> {
        let params = TokenizationParams::from(params);
        let result = self.runtime.block_on(self.inner.start_subscription(&params))?;
        Ok(result.into())
    }

    pub fn cancel_subscription(
        &self,
        subscription_id: Option<String>,
        user_id: Option<String>,
    ) -> Result<bool> {
        Ok(self.runtime.block_on(
            self.inner
                .cancel_subscription(subscription_id.as_deref(), user_id.as_deref()),
        )?)
    }

    pub fn check_subscription_status(
        &self,
        subscription_id: Option<String>,
        user_id: Option<String>,
    ) -> Result<SubscriptionStatusFFI> {
        let status = self.runtime.block_on(
            self.inner
                .check_subscription_status(subscription_id.as_deref(), user_id.as_deref()),
        )?;
        Ok(status.into())
    }

    pub fn save_subscription_identity(&self, identity: SubscriptionIdentityFFI) -> Result<()> {
        let identity = SubscriptionIdentity::from(identity);
        Ok(self
            .runtime
            .block_on(self.inner.save_subscription_identity(&identity))?)
    }

    pub fn get_subscription_identity(&self) -> Option<SubscriptionIdentityFFI> {
        self.runtime
            .block_on(self.inner.get_subscription_identity())
            .map(Into::into)
    }

    pub fn save_subscription_id(
        &self,
        subscription_id: String,
        payment_id: Option<String>,
        user_id: Option<String>,
        expires_at: Option<i64>,
        server_signature: Option<String>,
    ) -> Result<()> {
        Ok(self.runtime.block_on(self.inner.save_subscription_id(
            &subscription_id,
            payment_id.as_deref(),
            user_id.as_deref(),
            expires_at,
            server_signature.as_deref(),
        ))?)
    }

    pub fn get_subscription_id(&self, user_id: Option<String>) -> Option<String> {
        self.runtime
            .block_on(self.inner.get_subscription_id(user_id.as_deref()))
    }

    pub fn get_payment_id(&self, user_id: Option<String>) -> Option<String> {
        self.runtime
            .block_on(self.inner.get_payment_id(user_id.as_deref()))
    }

    pub fn clear_subscription_data(&self, identity: Option<String>) {
        self.runtime
            .block_on(self.inner.clear_subscription_data(identity.as_deref()))
    }

    /// Decide whether the subscription is active. Never fails.
    pub fn verify_subscription_on_start(&self, options: VerifyOptionsFFI) -> SubscriptionInfoFFI {
        let options = VerifyOptions::from(options);
        self.runtime
            .block_on(self.inner.verify_subscription_on_start(&options))
            .into()
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    /// Subscribe to tokenization success, error and cancel events.
    pub fn add_event_listener(
        &self,
        listener: Box<dyn CheckoutEventListenerFFI>,
    ) -> Arc<EventSubscriptionFFI> {
        Arc::new(EventSubscriptionFFI::register(
            self.inner.events(),
            Arc::from(listener),
        ))
    }
}

impl YookassaMobileClient {
    fn confirm_with(
        &self,
        confirmation_url: String,
        method: PaymentMethodType,
    ) -> Result<ConfirmationResultFFI> {
        let params = ConfirmationParams::new(confirmation_url, method);
        let result = self.runtime.block_on(self.inner.start_confirmation(&params))?;
        Ok(result.into())
    }
}
