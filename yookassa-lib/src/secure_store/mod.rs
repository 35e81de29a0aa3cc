//! Secure key-value store abstraction.
//!
//! The bridge persists small string blobs (subscription records, payment
//! pointers, the saved identity) through this trait. Implementations:
//! - In-memory storage (for testing)
//! - File storage (desktop hosts and development)
//! - Platform keychains, supplied by the host app through the mobile bindings
//!
//! ## Usage
//!
//! ```rust,ignore
//! use yookassa_lib::secure_store::{InMemorySecureStore, SecureStore};
//!
//! let store = InMemorySecureStore::new();
//! store.set("yookassa_subscription_identity", "{\"userId\":\"u1\"}").await?;
//!
//! if let Some(raw) = store.get("yookassa_subscription_identity").await? {
//!     // ...
//! }
//!
//! // Deleting a missing key is not an error
//! store.delete("yookassa_subscription_identity").await?;
//! ```

mod file;
mod memory;
mod traits;

pub use file::FileSecureStore;
pub use memory::InMemorySecureStore;
pub use traits::{SecureStore, StoreError, StoreErrorCode, StoreResult};
