//! Checkout client.
//!
//! [`YookassaClient`] is the public face of the bridge. It fills request
//! defaults before handing them to the native [`CheckoutCapability`],
//! normalizes native failures, notifies tokenization listeners, keeps
//! subscription and payment ids in the secure store and runs subscription
//! verification.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::cache::SubscriptionCache;
use crate::checkout::{
    CheckoutCapability, ConfirmationParams, ConfirmationResult, PaymentError, PaymentMethodType,
    SavePaymentMethod, SavedCardTokenizationParams, TokenizationParams, TokenizationResult,
};
use crate::config::{CheckoutConfig, VerifyOptions, DEFAULT_GRACE_PERIOD_DAYS};
use crate::events::{EventHub, ListenerHandle};
use crate::identity::{IdentityKey, SubscriptionIdentity};
use crate::reconcile::ReconciliationEngine;
use crate::remote::VerificationClient;
use crate::secure_store::SecureStore;
use crate::subscription::{now_millis, LocalSubscriptionData, SubscriptionInfo, SubscriptionStatus};
use crate::{CheckoutError, Result};

/// Checkout bridge client.
pub struct YookassaClient {
    config: RwLock<CheckoutConfig>,
    checkout: Arc<dyn CheckoutCapability>,
    cache: SubscriptionCache,
    engine: ReconciliationEngine,
    events: EventHub,
}

impl YookassaClient {
    /// Create a client over a native checkout and a secure store.
    pub fn new(
        config: CheckoutConfig,
        checkout: Arc<dyn CheckoutCapability>,
        store: Arc<dyn SecureStore>,
    ) -> Self {
        let remote = VerificationClient::new(config.verification_timeout());
        Self::with_verification_client(config, checkout, store, remote)
    }

    /// Create a client with a preconfigured backend client.
    pub fn with_verification_client(
        config: CheckoutConfig,
        checkout: Arc<dyn CheckoutCapability>,
        store: Arc<dyn SecureStore>,
        remote: VerificationClient,
    ) -> Self {
        let cache = SubscriptionCache::new(store);
        let engine = ReconciliationEngine::new(cache.clone(), remote);
        Self {
            config: RwLock::new(config),
            checkout,
            cache,
            engine,
            events: EventHub::new(),
        }
    }

    /// Snapshot of the current configuration.
    pub async fn config(&self) -> CheckoutConfig {
        self.config.read().await.clone()
    }

    pub fn events(&self) -> &EventHub {
        &self.events
    }

    // ------------------------------------------------------------------
    // Payments
    // ------------------------------------------------------------------

    /// Initialize the native SDK and remember the credentials as defaults.
    #[tracing::instrument(skip(self))]
    pub async fn initialize(&self, client_id: &str, shop_id: &str) -> Result<()> {
        if client_id.is_empty() {
            return Err(CheckoutError::missing("clientId"));
        }
        if shop_id.is_empty() {
            return Err(CheckoutError::missing("shopId"));
        }

        self.checkout.initialize(client_id, shop_id).await?;

        let mut config = self.config.write().await;
        config.client_id = Some(client_id.to_string());
        config.shop_id = Some(shop_id.to_string());
        Ok(())
    }

    /// Run the tokenization flow.
    ///
    /// Defaults: configured credentials and currency, `savePaymentMethod`
    /// OFF, bank card / Sberbank / SBP methods, configured test mode.
    #[tracing::instrument(skip(self, params), fields(amount = params.amount))]
    pub async fn start_tokenization(&self, params: &TokenizationParams) -> Result<TokenizationResult> {
        let prepared = self.prepare_tokenization(params, SavePaymentMethod::Off).await?;
        let outcome = self.checkout.start_tokenization(&prepared).await;
        self.finish_tokenization(outcome)
    }

    /// Tokenize a saved card.
    #[tracing::instrument(skip(self, params))]
    pub async fn start_saved_card_tokenization(
        &self,
        params: &SavedCardTokenizationParams,
    ) -> Result<TokenizationResult> {
        if params.payment_method_id.is_empty() {
            return Err(CheckoutError::missing("paymentMethodId"));
        }

        let config = self.config.read().await.clone();
        let (client_id, shop_id) =
            resolve_credentials(&config, params.client_id.as_deref(), params.shop_id.as_deref())?;
        let prepared = SavedCardTokenizationParams {
            client_id: Some(client_id),
            shop_id: Some(shop_id),
            currency: params.currency.clone().or(Some(config.default_currency)),
            save_payment_method: params.save_payment_method.or(Some(SavePaymentMethod::Off)),
            test_mode: params.test_mode.or(Some(config.test_mode)),
            ..params.clone()
        };

        let outcome = self.checkout.start_saved_card_tokenization(&prepared).await;
        self.finish_tokenization(outcome)
    }

    /// Run a payment confirmation screen.
    #[tracing::instrument(skip(self, params), fields(method = %params.payment_method_type))]
    pub async fn start_confirmation(&self, params: &ConfirmationParams) -> Result<ConfirmationResult> {
        if params.confirmation_url.is_empty() {
            return Err(CheckoutError::missing("confirmationUrl"));
        }

        let test_mode = self.config.read().await.test_mode;
        let prepared = ConfirmationParams {
            test_mode: params.test_mode.or(Some(test_mode)),
            ..params.clone()
        };
        self.checkout.start_confirmation(&prepared).await
    }

    #[deprecated(note = "use start_confirmation with PaymentMethodType::Sbp")]
    pub async fn start_sbp_confirmation(&self, confirmation_url: &str) -> Result<ConfirmationResult> {
        self.start_confirmation(&ConfirmationParams::new(confirmation_url, PaymentMethodType::Sbp))
            .await
    }

    #[deprecated(note = "use start_confirmation with PaymentMethodType::Sberbank")]
    pub async fn start_sber_pay_confirmation(&self, confirmation_url: &str) -> Result<ConfirmationResult> {
        self.start_confirmation(&ConfirmationParams::new(
            confirmation_url,
            PaymentMethodType::Sberbank,
        ))
        .await
    }

    #[deprecated(note = "use start_confirmation with PaymentMethodType::BankCard")]
    pub async fn start_3ds_confirmation(&self, confirmation_url: &str) -> Result<ConfirmationResult> {
        self.start_confirmation(&ConfirmationParams::new(
            confirmation_url,
            PaymentMethodType::BankCard,
        ))
        .await
    }

    #[deprecated(note = "use start_confirmation")]
    pub async fn confirm_3ds(&self, confirmation_url: &str, method: PaymentMethodType) -> Result<bool> {
        if confirmation_url.is_empty() {
            return Err(CheckoutError::missing("confirmationUrl"));
        }
        self.checkout.confirm_3ds(confirmation_url, method).await
    }

    pub async fn is_payment_method_available(&self, method: PaymentMethodType) -> Result<bool> {
        self.checkout.is_payment_method_available(method).await
    }

    // ------------------------------------------------------------------
    // Subscriptions
    // ------------------------------------------------------------------

    /// Purchase a subscription.
    ///
    /// Uses the native subscription flow when available, otherwise a
    /// recurring tokenization. The subscription id (from the result, else
    /// the request) and any payment id are stored under `params.user_id`.
    #[tracing::instrument(skip(self, params))]
    pub async fn start_subscription(&self, params: &TokenizationParams) -> Result<TokenizationResult> {
        let requested_id = params
            .subscription_id
            .clone()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| CheckoutError::missing("subscriptionId"))?;

        let mut prepared = self.prepare_tokenization(params, SavePaymentMethod::On).await?;
        prepared.is_recurring = Some(true);

        let outcome = match self.checkout.start_subscription(&prepared).await {
            Err(CheckoutError::Unsupported(_)) => {
                tracing::debug!("no native subscription flow, using recurring tokenization");
                self.checkout.start_tokenization(&prepared).await
            }
            other => other,
        };
        let result = self.finish_tokenization(outcome)?;

        let scope = scope(params.user_id.as_deref());
        let subscription_id = result
            .subscription_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .unwrap_or(&requested_id);
        self.cache
            .set_subscription_id(scope.as_ref(), subscription_id)
            .await?;
        if let Some(payment_id) = result.payment_id.as_deref().filter(|id| !id.is_empty()) {
            self.cache.set_payment_id(scope.as_ref(), payment_id).await?;
        }

        Ok(result)
    }

    /// Disable auto-renewal. Without native support this only reports success;
    /// the actual cancellation belongs to the merchant backend.
    pub async fn cancel_subscription(
        &self,
        subscription_id: Option<&str>,
        user_id: Option<&str>,
    ) -> Result<bool> {
        let id = self
            .subscription_id_or_stored(subscription_id, user_id)
            .await
            .ok_or_else(|| CheckoutError::missing("subscriptionId"))?;

        match self.checkout.cancel_subscription(&id).await {
            Err(CheckoutError::Unsupported(_)) => Ok(true),
            other => other,
        }
    }

    /// Subscription status from the native SDK, or from the stored id.
    pub async fn check_subscription_status(
        &self,
        subscription_id: Option<&str>,
        user_id: Option<&str>,
    ) -> Result<SubscriptionStatus> {
        let Some(id) = self.subscription_id_or_stored(subscription_id, user_id).await else {
            return Ok(SubscriptionStatus::default());
        };

        match self.checkout.check_subscription_status(&id).await {
            Err(CheckoutError::Unsupported(_)) => Ok(SubscriptionStatus {
                is_active: true,
                subscription_id: Some(id),
                ..Default::default()
            }),
            other => other,
        }
    }

    pub async fn save_subscription_identity(&self, identity: &SubscriptionIdentity) -> Result<()> {
        self.cache.save_identity(identity).await?;
        Ok(())
    }

    pub async fn get_subscription_identity(&self) -> Option<SubscriptionIdentity> {
        self.cache.identity().await
    }

    /// Store a subscription id, optionally with its payment id and expiry.
    ///
    /// A known expiry also writes a local record, so the subscription stays
    /// usable offline until it expires.
    pub async fn save_subscription_id(
        &self,
        subscription_id: &str,
        payment_id: Option<&str>,
        user_id: Option<&str>,
        expires_at: Option<i64>,
        server_signature: Option<&str>,
    ) -> Result<()> {
        if subscription_id.is_empty() {
            return Err(CheckoutError::missing("subscriptionId"));
        }

        let scope = scope(user_id);
        self.cache
            .set_subscription_id(scope.as_ref(), subscription_id)
            .await?;

        if let Some(payment_id) = payment_id.filter(|id| !id.is_empty()) {
            self.cache.set_payment_id(scope.as_ref(), payment_id).await?;
        }

        if let Some(expires_at) = expires_at.filter(|at| *at > 0) {
            let record = LocalSubscriptionData::new(
                Some(subscription_id.to_string()),
                expires_at,
                now_millis(),
            )
            .with_server_signature(server_signature.map(str::to_string))
            .with_grace_period_days(DEFAULT_GRACE_PERIOD_DAYS);
            self.cache
                .set_subscription_data(scope.as_ref(), &record)
                .await?;
        }
        Ok(())
    }

    pub async fn get_subscription_id(&self, user_id: Option<&str>) -> Option<String> {
        self.cache.subscription_id(scope(user_id).as_ref()).await
    }

    pub async fn get_payment_id(&self, user_id: Option<&str>) -> Option<String> {
        self.cache.payment_id(scope(user_id).as_ref()).await
    }

    /// Remove stored ids and the local record for one identity. Never fails.
    pub async fn clear_subscription_data(&self, identity: Option<&str>) {
        self.cache.clear(scope(identity).as_ref()).await;
    }

    /// Decide whether the subscription is active. Never fails.
    pub async fn verify_subscription_on_start(&self, options: &VerifyOptions) -> SubscriptionInfo {
        self.engine.verify(options).await
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    pub fn add_tokenization_success_listener(
        &self,
        listener: impl Fn(&TokenizationResult) + Send + Sync + 'static,
    ) -> ListenerHandle {
        self.events.on_tokenization_success(listener)
    }

    pub fn add_tokenization_error_listener(
        &self,
        listener: impl Fn(&PaymentError) + Send + Sync + 'static,
    ) -> ListenerHandle {
        self.events.on_tokenization_error(listener)
    }

    pub fn add_tokenization_cancel_listener(
        &self,
        listener: impl Fn() + Send + Sync + 'static,
    ) -> ListenerHandle {
        self.events.on_tokenization_cancel(listener)
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    async fn prepare_tokenization(
        &self,
        params: &TokenizationParams,
        save_payment_method: SavePaymentMethod,
    ) -> Result<TokenizationParams> {
        let config = self.config.read().await.clone();
        let (client_id, shop_id) =
            resolve_credentials(&config, params.client_id.as_deref(), params.shop_id.as_deref())?;

        Ok(TokenizationParams {
            client_id: Some(client_id),
            shop_id: Some(shop_id),
            currency: params.currency.clone().or(Some(config.default_currency)),
            save_payment_method: params.save_payment_method.or(Some(save_payment_method)),
            payment_method_types: params
                .payment_method_types
                .clone()
                .or_else(|| Some(PaymentMethodType::DEFAULT_SET.to_vec())),
            test_mode: params.test_mode.or(Some(config.test_mode)),
            ..params.clone()
        })
    }

    fn finish_tokenization(&self, outcome: Result<TokenizationResult>) -> Result<TokenizationResult> {
        match outcome.map_err(CheckoutError::normalize_tokenization) {
            Ok(result) => {
                self.events.emit_success(&result);
                Ok(result)
            }
            Err(e) if e.is_canceled() => {
                tracing::debug!("tokenization canceled by user");
                self.events.emit_cancel();
                Err(e)
            }
            Err(e) => {
                tracing::warn!(error = %e, "tokenization failed");
                self.events.emit_error(&payment_error(&e));
                Err(e)
            }
        }
    }

    async fn subscription_id_or_stored(
        &self,
        subscription_id: Option<&str>,
        user_id: Option<&str>,
    ) -> Option<String> {
        match subscription_id.filter(|id| !id.is_empty()) {
            Some(id) => Some(id.to_string()),
            None => self.get_subscription_id(user_id).await,
        }
    }
}

fn scope(identity: Option<&str>) -> Option<IdentityKey> {
    identity.and_then(IdentityKey::new)
}

/// Explicit credentials, else the configured ones.
fn resolve_credentials(
    config: &CheckoutConfig,
    client_id: Option<&str>,
    shop_id: Option<&str>,
) -> Result<(String, String)> {
    let pick = |explicit: Option<&str>, fallback: &Option<String>, field: &str| {
        explicit
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .or_else(|| fallback.clone().filter(|value| !value.is_empty()))
            .ok_or_else(|| CheckoutError::missing(field))
    };
    Ok((
        pick(client_id, &config.client_id, "clientId")?,
        pick(shop_id, &config.shop_id, "shopId")?,
    ))
}

fn payment_error(error: &CheckoutError) -> PaymentError {
    let code = match error {
        CheckoutError::Native { code, .. } => code.clone(),
        CheckoutError::PaymentFailed(_) => CheckoutError::TOKENIZATION_FAILED.to_string(),
        other => format!("{:?}", other.code()),
    };
    PaymentError::new(code, error.message())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_credentials_win() {
        let config = CheckoutConfig::new().with_credentials("cfg_client", "cfg_shop");
        let (client, shop) = resolve_credentials(&config, Some("c"), None).unwrap();
        assert_eq!(client, "c");
        assert_eq!(shop, "cfg_shop");
    }

    #[test]
    fn test_missing_credentials() {
        let err = resolve_credentials(&CheckoutConfig::default(), None, Some("s")).unwrap_err();
        assert_eq!(err.to_string(), "invalid clientId: is required");

        let err = resolve_credentials(&CheckoutConfig::default(), Some("c"), Some("")).unwrap_err();
        assert_eq!(err.to_string(), "invalid shopId: is required");
    }

    #[test]
    fn test_payment_error_codes() {
        let native = payment_error(&CheckoutError::native("E_SDK", "boom"));
        assert_eq!(native.code, "E_SDK");

        let failed = payment_error(&CheckoutError::PaymentFailed("declined".into()));
        assert_eq!(failed.code, "TOKENIZATION_FAILED");
        assert_eq!(failed.message, "payment failed: declined");

        let other = payment_error(&CheckoutError::Internal("x".into()));
        assert_eq!(other.code, "Internal");
    }
}
