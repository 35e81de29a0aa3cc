//! Mobile client integration tests.
//!
//! These tests drive `YookassaMobileClient` through mock callback
//! implementations, the way a Swift or Kotlin host would.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::json;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};
use yookassa_mobile::*;

const DAY_MS: i64 = 86_400_000;

fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

// ============================================================================
// Mock Implementations
// ============================================================================

#[derive(Default)]
struct CheckoutState {
    tokenize_count: AtomicU32,
    subscription_supported: AtomicBool,
    cancel_next: AtomicBool,
    last_params: Mutex<Option<TokenizationParamsFFI>>,
}

/// Native SDK stand-in sharing its state with the test.
#[derive(Clone, Default)]
struct MockCheckoutFFI {
    state: Arc<CheckoutState>,
}

impl MockCheckoutFFI {
    fn token(&self, params: TokenizationParamsFFI) -> Result<TokenizationResultFFI> {
        self.state.tokenize_count.fetch_add(1, Ordering::SeqCst);
        if self.state.cancel_next.swap(false, Ordering::SeqCst) {
            return Err(YookassaMobileError::Native {
                code: "TOKENIZATION_CANCELED".into(),
                msg: "closed".into(),
            });
        }
        *self.state.last_params.lock().unwrap() = Some(params);
        Ok(TokenizationResultFFI {
            token: "tok_1".into(),
            method_type: PaymentMethodTypeFFI::BankCard,
            payment_method_id: Some("pm_1".into()),
            payment_id: Some("pay_1".into()),
            subscription_id: None,
        })
    }

    fn last_params(&self) -> TokenizationParamsFFI {
        self.state.last_params.lock().unwrap().clone().unwrap()
    }
}

fn unsupported() -> YookassaMobileError {
    YookassaMobileError::Unsupported {
        msg: "not available in this SDK".into(),
    }
}

impl CheckoutFFI for MockCheckoutFFI {
    fn initialize(&self, _client_id: String, _shop_id: String) -> Result<()> {
        Ok(())
    }

    fn start_tokenization(&self, params: TokenizationParamsFFI) -> Result<TokenizationResultFFI> {
        self.token(params)
    }

    fn start_saved_card_tokenization(
        &self,
        _params: SavedCardTokenizationParamsFFI,
    ) -> Result<TokenizationResultFFI> {
        Err(unsupported())
    }

    fn start_confirmation(&self, _params: ConfirmationParamsFFI) -> Result<ConfirmationResultFFI> {
        Ok(ConfirmationResultFFI {
            status: ConfirmationStatusFFI::Ok,
            error_code: None,
            error_description: None,
            failing_url: None,
        })
    }

    fn confirm_3ds(&self, _confirmation_url: String, _method: PaymentMethodTypeFFI) -> Result<bool> {
        Err(unsupported())
    }

    fn is_payment_method_available(&self, method: PaymentMethodTypeFFI) -> Result<bool> {
        match method {
            PaymentMethodTypeFFI::ApplePay => Ok(false),
            PaymentMethodTypeFFI::GooglePay => Err(unsupported()),
            _ => Ok(true),
        }
    }

    fn start_subscription(&self, params: TokenizationParamsFFI) -> Result<TokenizationResultFFI> {
        if !self.state.subscription_supported.load(Ordering::SeqCst) {
            return Err(unsupported());
        }
        let mut result = self.token(params)?;
        result.subscription_id = Some("native_sub".into());
        Ok(result)
    }

    fn cancel_subscription(&self, _subscription_id: String) -> Result<bool> {
        Err(unsupported())
    }

    fn check_subscription_status(&self, _subscription_id: String) -> Result<SubscriptionStatusFFI> {
        Err(unsupported())
    }
}

/// In-memory stand-in for Keychain / EncryptedSharedPreferences.
#[derive(Clone, Default)]
struct MemoryStoreFFI {
    values: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStoreFFI {
    fn len(&self) -> usize {
        self.values.lock().unwrap().len()
    }
}

impl SecureStoreFFI for MemoryStoreFFI {
    fn get(&self, key: String) -> Result<Option<String>> {
        Ok(self.values.lock().unwrap().get(&key).cloned())
    }

    fn set(&self, key: String, value: String) -> Result<()> {
        self.values.lock().unwrap().insert(key, value);
        Ok(())
    }

    fn delete(&self, key: String) -> Result<()> {
        self.values.lock().unwrap().remove(&key);
        Ok(())
    }
}

/// Store whose every call fails, like a locked keychain.
struct LockedStoreFFI;

impl SecureStoreFFI for LockedStoreFFI {
    fn get(&self, _key: String) -> Result<Option<String>> {
        Err(YookassaMobileError::Storage { msg: "locked".into() })
    }

    fn set(&self, _key: String, _value: String) -> Result<()> {
        Err(YookassaMobileError::Storage { msg: "locked".into() })
    }

    fn delete(&self, _key: String) -> Result<()> {
        Err(YookassaMobileError::Storage { msg: "locked".into() })
    }
}

#[derive(Clone, Default)]
struct CountingListener {
    successes: Arc<AtomicU32>,
    errors: Arc<AtomicU32>,
    cancels: Arc<AtomicU32>,
}

impl CheckoutEventListenerFFI for CountingListener {
    fn on_tokenization_success(&self, _result: TokenizationResultFFI) {
        self.successes.fetch_add(1, Ordering::SeqCst);
    }

    fn on_tokenization_error(&self, _error: PaymentErrorFFI) {
        self.errors.fetch_add(1, Ordering::SeqCst);
    }

    fn on_tokenization_cancel(&self) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn params() -> TokenizationParamsFFI {
    TokenizationParamsFFI {
        client_id: None,
        shop_id: None,
        amount: 199.0,
        currency: None,
        title: "Premium".into(),
        subtitle: None,
        save_payment_method: None,
        payment_method_types: None,
        return_url: None,
        gateway_id: None,
        customer_id: None,
        is_recurring: None,
        subscription_id: None,
        test_mode: None,
        user_id: None,
    }
}

fn options(app_id: i64) -> VerifyOptionsFFI {
    VerifyOptionsFFI {
        server_url: None,
        app_id,
        user_id: None,
        device_id: None,
        grace_period_days: None,
        require_stored_identity: None,
        check_request: None,
        payments_request: None,
    }
}

fn client_with(checkout: &MockCheckoutFFI, store: &MemoryStoreFFI) -> Arc<YookassaMobileClient> {
    let config = CheckoutConfigFFI {
        client_id: Some("client".into()),
        shop_id: Some("shop".into()),
        verification_timeout_ms: Some(500),
        ..Default::default()
    };
    YookassaMobileClient::new_with_config(Box::new(checkout.clone()), Box::new(store.clone()), config)
        .unwrap()
}

// ============================================================================
// Payments
// ============================================================================

#[test]
fn test_tokenization_fills_defaults() {
    let checkout = MockCheckoutFFI::default();
    let client = client_with(&checkout, &MemoryStoreFFI::default());

    let result = client.start_tokenization(params()).unwrap();
    assert_eq!(result.token, "tok_1");

    let sent = checkout.last_params();
    assert_eq!(sent.client_id.as_deref(), Some("client"));
    assert_eq!(sent.currency.as_deref(), Some("RUB"));
    assert_eq!(sent.save_payment_method, Some(SavePaymentMethodFFI::Off));
    assert_eq!(
        sent.payment_method_types,
        Some(vec![
            PaymentMethodTypeFFI::BankCard,
            PaymentMethodTypeFFI::Sberbank,
            PaymentMethodTypeFFI::Sbp,
        ])
    );
}

#[test]
fn test_missing_credentials_is_validation_error() {
    let checkout = MockCheckoutFFI::default();
    let client =
        YookassaMobileClient::new(Box::new(checkout.clone()), Box::new(MemoryStoreFFI::default()))
            .unwrap();

    let err = client.start_tokenization(params()).unwrap_err();
    assert!(matches!(err, YookassaMobileError::Validation { .. }));
    assert_eq!(checkout.state.tokenize_count.load(Ordering::SeqCst), 0);
}

#[test]
fn test_listener_sees_success_and_cancel_until_removed() {
    let checkout = MockCheckoutFFI::default();
    let client = client_with(&checkout, &MemoryStoreFFI::default());
    let listener = CountingListener::default();
    let subscription = client.add_event_listener(Box::new(listener.clone()));

    client.start_tokenization(params()).unwrap();
    checkout.state.cancel_next.store(true, Ordering::SeqCst);
    let err = client.start_tokenization(params()).unwrap_err();
    assert!(matches!(err, YookassaMobileError::Canceled { .. }));

    assert_eq!(listener.successes.load(Ordering::SeqCst), 1);
    assert_eq!(listener.cancels.load(Ordering::SeqCst), 1);
    assert_eq!(listener.errors.load(Ordering::SeqCst), 0);

    assert!(subscription.remove());
    assert!(!subscription.remove());
    client.start_tokenization(params()).unwrap();
    assert_eq!(listener.successes.load(Ordering::SeqCst), 1);
}

#[test]
fn test_unsupported_saved_card_reports_error_event() {
    let checkout = MockCheckoutFFI::default();
    let client = client_with(&checkout, &MemoryStoreFFI::default());
    let listener = CountingListener::default();
    let _subscription = client.add_event_listener(Box::new(listener.clone()));

    let err = client
        .start_saved_card_tokenization(SavedCardTokenizationParamsFFI {
            client_id: None,
            shop_id: None,
            payment_method_id: "pm_1".into(),
            amount: 10.0,
            currency: None,
            title: "Top up".into(),
            subtitle: None,
            save_payment_method: None,
            gateway_id: None,
            test_mode: None,
        })
        .unwrap_err();

    assert!(matches!(err, YookassaMobileError::Unsupported { .. }));
    assert_eq!(listener.errors.load(Ordering::SeqCst), 1);
}

#[test]
fn test_payment_method_availability() {
    let client = client_with(&MockCheckoutFFI::default(), &MemoryStoreFFI::default());

    assert!(client.is_payment_method_available(PaymentMethodTypeFFI::Sbp).unwrap());
    assert!(!client.is_payment_method_available(PaymentMethodTypeFFI::ApplePay).unwrap());
    assert!(client.is_payment_method_available(PaymentMethodTypeFFI::GooglePay).unwrap());
}

#[test]
fn test_confirmation_requires_url() {
    let client = client_with(&MockCheckoutFFI::default(), &MemoryStoreFFI::default());
    let mut confirmation = ConfirmationParamsFFI {
        confirmation_url: String::new(),
        payment_method_type: PaymentMethodTypeFFI::Sbp,
        client_id: None,
        client_application_key: None,
        shop_id: None,
        test_mode: None,
    };

    let err = client.start_confirmation(confirmation.clone()).unwrap_err();
    assert!(matches!(err, YookassaMobileError::Validation { .. }));

    confirmation.confirmation_url = "https://yoomoney.ru/checkout/confirm".into();
    let result = client.start_confirmation(confirmation).unwrap();
    assert_eq!(result.status, ConfirmationStatusFFI::Ok);

    let legacy = client
        .start_sbp_confirmation("https://yoomoney.ru/checkout/confirm".into())
        .unwrap();
    assert_eq!(legacy.status, ConfirmationStatusFFI::Ok);
    assert!(client.start_sber_pay_confirmation(String::new()).is_err());
}

// ============================================================================
// Subscriptions
// ============================================================================

#[test]
fn test_subscription_falls_back_to_tokenization() {
    let checkout = MockCheckoutFFI::default();
    let store = MemoryStoreFFI::default();
    let client = client_with(&checkout, &store);

    let mut request = params();
    request.subscription_id = Some("plan_sub".into());
    request.user_id = Some("user-1".into());
    let result = client.start_subscription(request).unwrap();

    assert_eq!(result.token, "tok_1");
    let sent = checkout.last_params();
    assert_eq!(sent.is_recurring, Some(true));
    assert_eq!(sent.save_payment_method, Some(SavePaymentMethodFFI::On));

    assert_eq!(client.get_subscription_id(Some("user-1".into())).as_deref(), Some("plan_sub"));
    assert_eq!(client.get_payment_id(Some("user-1".into())).as_deref(), Some("pay_1"));
    assert!(client.get_subscription_id(None).is_none());
}

#[test]
fn test_native_subscription_id_is_stored() {
    let checkout = MockCheckoutFFI::default();
    checkout.state.subscription_supported.store(true, Ordering::SeqCst);
    let client = client_with(&checkout, &MemoryStoreFFI::default());

    let mut request = params();
    request.subscription_id = Some("plan_sub".into());
    client.start_subscription(request).unwrap();

    assert_eq!(client.get_subscription_id(None).as_deref(), Some("native_sub"));
}

#[test]
fn test_cancel_and_status_without_native_support() {
    let client = client_with(&MockCheckoutFFI::default(), &MemoryStoreFFI::default());

    let err = client.cancel_subscription(None, None).unwrap_err();
    assert!(matches!(err, YookassaMobileError::Validation { .. }));

    let status = client.check_subscription_status(None, None).unwrap();
    assert!(!status.is_active);

    client
        .save_subscription_id("sub_9".into(), None, None, None, None)
        .unwrap();
    assert!(client.cancel_subscription(None, None).unwrap());
    let status = client.check_subscription_status(None, None).unwrap();
    assert!(status.is_active);
    assert_eq!(status.subscription_id.as_deref(), Some("sub_9"));
}

#[test]
fn test_saved_subscription_is_valid_offline() {
    let store = MemoryStoreFFI::default();
    let client = client_with(&MockCheckoutFFI::default(), &store);

    client
        .save_subscription_identity(SubscriptionIdentityFFI {
            user_id: Some("user-1".into()),
            device_id: None,
        })
        .unwrap();
    client
        .save_subscription_id(
            "sub_1".into(),
            Some("pay_1".into()),
            Some("user-1".into()),
            Some(now_millis() + DAY_MS),
            Some("sig".into()),
        )
        .unwrap();

    let info = client.verify_subscription_on_start(options(1));
    assert!(info.is_active);
    assert_eq!(info.source, VerificationSourceFFI::Local);
    assert_eq!(info.subscription_id.as_deref(), Some("sub_1"));
    assert_eq!(info.server_signature.as_deref(), Some("sig"));

    client.clear_subscription_data(Some("user-1".into()));
    let info = client.verify_subscription_on_start(options(1));
    assert!(!info.is_active);
    assert_eq!(info.source, VerificationSourceFFI::None);
}

#[test]
fn test_verification_without_identity_is_none() {
    let store = MemoryStoreFFI::default();
    let client = client_with(&MockCheckoutFFI::default(), &store);

    let info = client.verify_subscription_on_start(options(1));
    assert!(!info.is_active);
    assert_eq!(info.source, VerificationSourceFFI::None);
    assert!(client.get_subscription_identity().is_none());
    assert_eq!(store.len(), 0);
}

#[test]
fn test_server_denial_wipes_cached_subscription() {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let server = rt.block_on(MockServer::start());
    rt.block_on(
        Mock::given(method("POST"))
            .and(path("/subscriptions/check"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"active": false})))
            .expect(1)
            .mount(&server),
    );

    let client = client_with(&MockCheckoutFFI::default(), &MemoryStoreFFI::default());
    client
        .save_subscription_identity(SubscriptionIdentityFFI {
            user_id: Some("user-1".into()),
            device_id: Some("device-1".into()),
        })
        .unwrap();
    client
        .save_subscription_id(
            "sub_1".into(),
            None,
            Some("user-1".into()),
            Some(now_millis() + DAY_MS),
            None,
        )
        .unwrap();

    let mut verify = options(7);
    verify.server_url = Some(server.uri());
    let info = client.verify_subscription_on_start(verify);

    assert!(!info.is_active);
    assert_eq!(info.source, VerificationSourceFFI::Server);
    assert_eq!(info.server_response_json.as_deref(), Some(r#"{"active":false}"#));
    assert!(client.get_subscription_id(Some("user-1".into())).is_none());
}

#[test]
fn test_locked_store_surfaces_storage_error() {
    let client = YookassaMobileClient::new(Box::new(MockCheckoutFFI::default()), Box::new(LockedStoreFFI))
        .unwrap();

    let err = client
        .save_subscription_identity(SubscriptionIdentityFFI {
            user_id: Some("user-1".into()),
            device_id: None,
        })
        .unwrap_err();
    assert!(matches!(err, YookassaMobileError::Storage { .. }));

    assert!(client.get_subscription_identity().is_none());
    let info = client.verify_subscription_on_start(options(1));
    assert!(!info.is_active);
}
