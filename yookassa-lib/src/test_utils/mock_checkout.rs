//! Scripted native checkout.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::checkout::{
    CheckoutCapability, ConfirmationParams, ConfirmationResult, PaymentMethodType,
    SavedCardTokenizationParams, TokenizationParams, TokenizationResult,
};
use crate::subscription::SubscriptionStatus;
use crate::{CheckoutError, Result};

/// [`CheckoutCapability`] with canned answers.
///
/// Optional capabilities are unsupported until configured with the
/// corresponding `with_*` method.
pub struct MockCheckout {
    tokenization: Result<TokenizationResult>,
    subscription: Option<Result<TokenizationResult>>,
    saved_card: Option<Result<TokenizationResult>>,
    confirmation: Option<ConfirmationResult>,
    cancel: Option<bool>,
    status: Option<SubscriptionStatus>,
    unavailable: Vec<PaymentMethodType>,
    calls: Mutex<Vec<&'static str>>,
    initialized: Mutex<Option<(String, String)>>,
    last_tokenization: Mutex<Option<TokenizationParams>>,
    last_confirmation: Mutex<Option<ConfirmationParams>>,
}

impl Default for MockCheckout {
    fn default() -> Self {
        Self {
            tokenization: Ok(TokenizationResult::new("mock_token", PaymentMethodType::BankCard)),
            subscription: None,
            saved_card: None,
            confirmation: None,
            cancel: None,
            status: None,
            unavailable: Vec::new(),
            calls: Mutex::new(Vec::new()),
            initialized: Mutex::new(None),
            last_tokenization: Mutex::new(None),
            last_confirmation: Mutex::new(None),
        }
    }
}

impl MockCheckout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tokenization(mut self, result: Result<TokenizationResult>) -> Self {
        self.tokenization = result;
        self
    }

    /// Support the dedicated subscription flow.
    pub fn with_subscription(mut self, result: Result<TokenizationResult>) -> Self {
        self.subscription = Some(result);
        self
    }

    pub fn with_saved_card(mut self, result: Result<TokenizationResult>) -> Self {
        self.saved_card = Some(result);
        self
    }

    pub fn with_confirmation(mut self, result: ConfirmationResult) -> Self {
        self.confirmation = Some(result);
        self
    }

    pub fn with_cancel_subscription(mut self, result: bool) -> Self {
        self.cancel = Some(result);
        self
    }

    pub fn with_subscription_status(mut self, status: SubscriptionStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_unavailable_method(mut self, method: PaymentMethodType) -> Self {
        self.unavailable.push(method);
        self
    }

    /// Names of the capability methods called so far, in order.
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    /// Credentials passed to the last `initialize`.
    pub fn initialized_with(&self) -> Option<(String, String)> {
        self.initialized.lock().ok().and_then(|value| value.clone())
    }

    /// Parameters of the last tokenization or subscription call.
    pub fn last_tokenization(&self) -> Option<TokenizationParams> {
        self.last_tokenization.lock().ok().and_then(|value| value.clone())
    }

    pub fn last_confirmation(&self) -> Option<ConfirmationParams> {
        self.last_confirmation.lock().ok().and_then(|value| value.clone())
    }

    fn record(&self, call: &'static str) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }

    fn remember<T: Clone>(slot: &Mutex<Option<T>>, value: &T) {
        if let Ok(mut slot) = slot.lock() {
            *slot = Some(value.clone());
        }
    }
}

#[async_trait]
impl CheckoutCapability for MockCheckout {
    async fn initialize(&self, client_id: &str, shop_id: &str) -> Result<()> {
        self.record("initialize");
        Self::remember(&self.initialized, &(client_id.to_string(), shop_id.to_string()));
        Ok(())
    }

    async fn start_tokenization(&self, params: &TokenizationParams) -> Result<TokenizationResult> {
        self.record("start_tokenization");
        Self::remember(&self.last_tokenization, params);
        self.tokenization.clone()
    }

    async fn start_saved_card_tokenization(
        &self,
        _params: &SavedCardTokenizationParams,
    ) -> Result<TokenizationResult> {
        self.record("start_saved_card_tokenization");
        self.saved_card
            .clone()
            .unwrap_or(Err(CheckoutError::Unsupported("saved card tokenization")))
    }

    async fn start_confirmation(&self, params: &ConfirmationParams) -> Result<ConfirmationResult> {
        self.record("start_confirmation");
        Self::remember(&self.last_confirmation, params);
        self.confirmation
            .clone()
            .ok_or(CheckoutError::Unsupported("confirmation"))
    }

    async fn is_payment_method_available(&self, method: PaymentMethodType) -> Result<bool> {
        self.record("is_payment_method_available");
        Ok(!self.unavailable.contains(&method))
    }

    async fn start_subscription(&self, params: &TokenizationParams) -> Result<TokenizationResult> {
        self.record("start_subscription");
        Self::remember(&self.last_tokenization, params);
        self.subscription
            .clone()
            .unwrap_or(Err(CheckoutError::Unsupported("subscription purchase")))
    }

    async fn cancel_subscription(&self, _subscription_id: &str) -> Result<bool> {
        self.record("cancel_subscription");
        self.cancel
            .ok_or(CheckoutError::Unsupported("subscription cancellation"))
    }

    async fn check_subscription_status(&self, _subscription_id: &str) -> Result<SubscriptionStatus> {
        self.record("check_subscription_status");
        self.status
            .clone()
            .ok_or(CheckoutError::Unsupported("subscription status"))
    }
}
