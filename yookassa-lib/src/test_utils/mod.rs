//! Test utilities for the checkout bridge.
//!
//! - [`MockCheckout`]: scripted native checkout with call recording
//! - [`RecordingStore`]: in-memory store that counts accesses
//! - [`FailingStore`]: store whose every operation fails
//!
//! ## Usage
//!
//! ```rust,ignore
//! use yookassa_lib::test_utils::{MockCheckout, RecordingStore};
//!
//! let checkout = Arc::new(MockCheckout::new());
//! let store = Arc::new(RecordingStore::new());
//! let client = YookassaClient::new(CheckoutConfig::default(), checkout.clone(), store.clone());
//!
//! client.start_tokenization(params).await?;
//! assert_eq!(checkout.calls(), vec!["start_tokenization"]);
//! ```

mod mock_checkout;
mod stores;

pub use mock_checkout::MockCheckout;
pub use stores::{FailingStore, RecordingStore};
