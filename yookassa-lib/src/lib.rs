//! YooKassa checkout bridge.
//!
//! Exposes a native mobile payment SDK (tokenization, saved-card charges,
//! SBP/SberPay/3-D Secure confirmation) through [`YookassaClient`], and keeps
//! a local subscription cache that is reconciled against the merchant's own
//! backend when the app starts.
//!
//! The native SDK and the platform secure store are injected through the
//! [`CheckoutCapability`] and [`SecureStore`] traits.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use yookassa_lib::{CheckoutConfig, InMemorySecureStore, VerifyOptions, YookassaClient};
//!
//! let client = YookassaClient::new(CheckoutConfig::default(), native_checkout, Arc::new(InMemorySecureStore::new()));
//! client.initialize("client_id", "shop_id").await?;
//!
//! client.save_subscription_identity(&SubscriptionIdentity::user("user-42")).await?;
//! let info = client
//!     .verify_subscription_on_start(&VerifyOptions::new(1).with_server_url("https://api.example.com"))
//!     .await;
//! if info.is_active {
//!     // unlock premium features
//! }
//! ```

pub mod cache;
pub mod checkout;
pub mod client;
pub mod config;
pub mod errors;
pub mod events;
pub mod identity;
pub mod reconcile;
pub mod remote;
pub mod secure_store;
pub mod subscription;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use cache::{StorageKey, StorageSlot, SubscriptionCache};
pub use checkout::{
    CheckoutCapability, ConfirmationParams, ConfirmationResult, ConfirmationStatus, PaymentError,
    PaymentMethodType, SavePaymentMethod, SavedCardTokenizationParams, TokenizationParams,
    TokenizationResult,
};
pub use client::YookassaClient;
pub use config::{CheckoutConfig, VerifyOptions};
pub use errors::{CheckoutError, CheckoutErrorCode};
pub use events::{EventHub, EventKind, ListenerHandle};
pub use identity::{IdentityKey, IdentityResolver, ResolvedIdentity, SubscriptionIdentity};
pub use reconcile::ReconciliationEngine;
pub use remote::{
    HttpMethod, RequestDescriptor, VerificationClient, VerificationError, VerificationErrorCode,
};
pub use secure_store::{FileSecureStore, InMemorySecureStore, SecureStore, StoreError, StoreErrorCode};
pub use subscription::{
    LocalSubscriptionData, PaymentStatus, SubscriptionInfo, SubscriptionStatus, VerificationSource,
};

/// Common result alias for checkout operations.
pub type Result<T> = std::result::Result<T, CheckoutError>;
