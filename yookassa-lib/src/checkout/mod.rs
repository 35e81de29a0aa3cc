//! Native checkout capability.
//!
//! The vendor payment SDK lives on the host platform. The library reaches it
//! through [`CheckoutCapability`], implemented by the platform glue (see the
//! mobile bindings) or by [`crate::test_utils::MockCheckout`] in tests.
//!
//! Only initialization and tokenization are mandatory. Every other method
//! has a default that reports [`CheckoutError::Unsupported`] (or, for
//! availability checks, `true`), so a host may implement just what its SDK
//! offers. [`crate::YookassaClient`] supplies fallbacks where one exists.

mod types;

pub use types::{
    ConfirmationParams, ConfirmationResult, ConfirmationStatus, PaymentError, PaymentMethodType,
    SavePaymentMethod, SavedCardTokenizationParams, TokenizationParams, TokenizationResult,
};

use async_trait::async_trait;

use crate::subscription::SubscriptionStatus;
use crate::{CheckoutError, Result};

/// Operations provided by the native checkout SDK.
///
/// Failures carry the SDK's native code via [`CheckoutError::Native`];
/// tokenization cancellation uses `TOKENIZATION_CANCELED`.
#[async_trait]
pub trait CheckoutCapability: Send + Sync {
    /// Configure the SDK with merchant credentials.
    async fn initialize(&self, client_id: &str, shop_id: &str) -> Result<()>;

    /// Show the payment form and produce a token.
    async fn start_tokenization(&self, params: &TokenizationParams) -> Result<TokenizationResult>;

    /// Tokenize a previously saved card.
    async fn start_saved_card_tokenization(
        &self,
        _params: &SavedCardTokenizationParams,
    ) -> Result<TokenizationResult> {
        Err(CheckoutError::Unsupported("saved card tokenization"))
    }

    /// Run a confirmation screen (SBP, SberPay, 3-D Secure).
    async fn start_confirmation(&self, _params: &ConfirmationParams) -> Result<ConfirmationResult> {
        Err(CheckoutError::Unsupported("confirmation"))
    }

    /// Present a 3-D Secure challenge for `confirmation_url`.
    async fn confirm_3ds(
        &self,
        _confirmation_url: &str,
        _method: PaymentMethodType,
    ) -> Result<bool> {
        Err(CheckoutError::Unsupported("3-D Secure confirmation"))
    }

    /// Whether `method` can be offered on this device.
    async fn is_payment_method_available(&self, _method: PaymentMethodType) -> Result<bool> {
        Ok(true)
    }

    /// Purchase a subscription through a dedicated SDK flow.
    async fn start_subscription(&self, _params: &TokenizationParams) -> Result<TokenizationResult> {
        Err(CheckoutError::Unsupported("subscription purchase"))
    }

    /// Disable auto-renewal of `subscription_id`.
    async fn cancel_subscription(&self, _subscription_id: &str) -> Result<bool> {
        Err(CheckoutError::Unsupported("subscription cancellation"))
    }

    /// Ask the SDK for the status of `subscription_id`.
    async fn check_subscription_status(&self, _subscription_id: &str) -> Result<SubscriptionStatus> {
        Err(CheckoutError::Unsupported("subscription status"))
    }
}
