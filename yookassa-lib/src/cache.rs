//! Local subscription cache.
//!
//! Typed, identity-scoped access to the secure store. Reads are best effort:
//! a missing value, corrupt JSON or a store failure all come back as `None`
//! (failures are logged). Clearing never fails.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::identity::{IdentityKey, SubscriptionIdentity};
use crate::secure_store::{SecureStore, StoreError, StoreResult};
use crate::subscription::LocalSubscriptionData;

/// Kind of value held under a storage key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StorageSlot {
    /// Pointer to the last known subscription id.
    SubscriptionId,
    /// Pointer to an in-flight or last known payment id.
    PaymentId,
    /// JSON [`LocalSubscriptionData`] record.
    SubscriptionData,
    /// JSON [`SubscriptionIdentity`] record. Never identity-scoped.
    Identity,
}

impl StorageSlot {
    /// Base key of the slot. Bases never contain `.`.
    pub fn base(&self) -> &'static str {
        match self {
            Self::SubscriptionId => "yookassa_subscription_id",
            Self::PaymentId => "yookassa_payment_id",
            Self::SubscriptionData => "yookassa_subscription_data",
            Self::Identity => "yookassa_subscription_identity",
        }
    }
}

/// Composite storage key: slot × optional identity.
///
/// Renders as `<base>` or `<base>.<hex(identity)>`. Hex encoding keeps the
/// rendered key within the character set mobile keychains accept and makes
/// rendering injective, so identities containing `_` or `.` cannot collide.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StorageKey {
    pub slot: StorageSlot,
    pub identity: Option<IdentityKey>,
}

impl StorageKey {
    pub fn new(slot: StorageSlot, identity: Option<&IdentityKey>) -> Self {
        Self {
            slot,
            identity: identity.cloned(),
        }
    }

    /// String key handed to the secure store.
    pub fn render(&self) -> String {
        match &self.identity {
            Some(identity) => format!(
                "{}.{}",
                self.slot.base(),
                hex::encode(identity.as_str().as_bytes())
            ),
            None => self.slot.base().to_string(),
        }
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Identity-scoped cache over a [`SecureStore`].
#[derive(Clone)]
pub struct SubscriptionCache {
    store: Arc<dyn SecureStore>,
}

impl SubscriptionCache {
    pub fn new(store: Arc<dyn SecureStore>) -> Self {
        Self { store }
    }

    /// Underlying store.
    pub fn store(&self) -> &Arc<dyn SecureStore> {
        &self.store
    }

    // ------------------------------------------------------------------
    // Identity record
    // ------------------------------------------------------------------

    /// Saved identity, if any.
    pub async fn identity(&self) -> Option<SubscriptionIdentity> {
        self.read_json(&StorageKey::new(StorageSlot::Identity, None))
            .await
    }

    pub async fn save_identity(&self, identity: &SubscriptionIdentity) -> StoreResult<()> {
        self.write_json(&StorageKey::new(StorageSlot::Identity, None), identity)
            .await
    }

    // ------------------------------------------------------------------
    // Subscription record
    // ------------------------------------------------------------------

    pub async fn subscription_data(
        &self,
        identity: Option<&IdentityKey>,
    ) -> Option<LocalSubscriptionData> {
        self.read_json(&StorageKey::new(StorageSlot::SubscriptionData, identity))
            .await
    }

    pub async fn set_subscription_data(
        &self,
        identity: Option<&IdentityKey>,
        data: &LocalSubscriptionData,
    ) -> StoreResult<()> {
        self.write_json(&StorageKey::new(StorageSlot::SubscriptionData, identity), data)
            .await
    }

    // ------------------------------------------------------------------
    // Id pointers
    // ------------------------------------------------------------------

    pub async fn subscription_id(&self, identity: Option<&IdentityKey>) -> Option<String> {
        self.read_string(&StorageKey::new(StorageSlot::SubscriptionId, identity))
            .await
    }

    pub async fn set_subscription_id(
        &self,
        identity: Option<&IdentityKey>,
        subscription_id: &str,
    ) -> StoreResult<()> {
        let key = StorageKey::new(StorageSlot::SubscriptionId, identity);
        self.store.set(&key.render(), subscription_id).await
    }

    pub async fn payment_id(&self, identity: Option<&IdentityKey>) -> Option<String> {
        self.read_string(&StorageKey::new(StorageSlot::PaymentId, identity))
            .await
    }

    pub async fn set_payment_id(
        &self,
        identity: Option<&IdentityKey>,
        payment_id: &str,
    ) -> StoreResult<()> {
        let key = StorageKey::new(StorageSlot::PaymentId, identity);
        self.store.set(&key.render(), payment_id).await
    }

    pub async fn clear_payment_id(&self, identity: Option<&IdentityKey>) {
        self.delete_quietly(&StorageKey::new(StorageSlot::PaymentId, identity))
            .await;
    }

    // ------------------------------------------------------------------
    // Clearing
    // ------------------------------------------------------------------

    /// Remove the subscription id, payment id and record for one identity.
    pub async fn clear(&self, identity: Option<&IdentityKey>) {
        for slot in [
            StorageSlot::SubscriptionId,
            StorageSlot::PaymentId,
            StorageSlot::SubscriptionData,
        ] {
            self.delete_quietly(&StorageKey::new(slot, identity)).await;
        }
    }

    /// [`clear`](Self::clear) every alias in turn.
    pub async fn clear_all(&self, aliases: &[IdentityKey]) {
        for alias in aliases {
            self.clear(Some(alias)).await;
        }
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    async fn read_string(&self, key: &StorageKey) -> Option<String> {
        match self.store.get(&key.render()).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key = %key, "secure store read failed: {e}");
                None
            }
        }
    }

    async fn read_json<T: DeserializeOwned>(&self, key: &StorageKey) -> Option<T> {
        let raw = self.read_string(key).await?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key = %key, "ignoring corrupted cache entry: {e}");
                None
            }
        }
    }

    async fn write_json<T: Serialize + ?Sized>(&self, key: &StorageKey, value: &T) -> StoreResult<()> {
        let rendered = key.render();
        let json = serde_json::to_string(value).map_err(|e| StoreError::corrupted(&rendered, e))?;
        self.store.set(&rendered, &json).await
    }

    async fn delete_quietly(&self, key: &StorageKey) {
        if let Err(e) = self.store.delete(&key.render()).await {
            tracing::warn!(key = %key, "secure store delete failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secure_store::InMemorySecureStore;
    use crate::test_utils::FailingStore;

    fn key(value: &str) -> IdentityKey {
        IdentityKey::new(value).unwrap()
    }

    #[test]
    fn test_render_keys() {
        assert_eq!(
            StorageKey::new(StorageSlot::PaymentId, None).render(),
            "yookassa_payment_id"
        );
        assert_eq!(
            StorageKey::new(StorageSlot::SubscriptionData, Some(&key("u1"))).render(),
            "yookassa_subscription_data.7531"
        );
    }

    #[test]
    fn test_separator_identities_do_not_collide() {
        let slots = [
            StorageSlot::SubscriptionId,
            StorageSlot::PaymentId,
            StorageSlot::SubscriptionData,
        ];
        let identities = ["u1", "u_1", "u.1", "1", "data_u1", "7531"];

        let mut rendered: Vec<String> = slots
            .iter()
            .flat_map(|slot| {
                identities
                    .iter()
                    .map(move |id| StorageKey::new(*slot, Some(&key(id))).render())
            })
            .collect();
        let total = rendered.len();
        rendered.sort();
        rendered.dedup();
        assert_eq!(rendered.len(), total);
    }

    #[tokio::test]
    async fn test_record_roundtrip() {
        let cache = SubscriptionCache::new(Arc::new(InMemorySecureStore::new()));
        let data = LocalSubscriptionData::new(Some("sub".into()), 100, 50);

        cache.set_subscription_data(Some(&key("u1")), &data).await.unwrap();

        assert_eq!(cache.subscription_data(Some(&key("u1"))).await, Some(data));
        assert_eq!(cache.subscription_data(Some(&key("u2"))).await, None);
        assert_eq!(cache.subscription_data(None).await, None);
    }

    #[tokio::test]
    async fn test_corrupted_record_reads_as_absent() {
        let store = Arc::new(InMemorySecureStore::new());
        let cache = SubscriptionCache::new(store.clone());
        let k = StorageKey::new(StorageSlot::SubscriptionData, Some(&key("u1")));
        store.set(&k.render(), "{not json").await.unwrap();

        assert_eq!(cache.subscription_data(Some(&key("u1"))).await, None);
    }

    #[tokio::test]
    async fn test_failing_store_reads_as_absent() {
        let cache = SubscriptionCache::new(Arc::new(FailingStore::new()));

        assert_eq!(cache.identity().await, None);
        assert_eq!(cache.payment_id(Some(&key("u1"))).await, None);
        // clearing must not panic or fail
        cache.clear(Some(&key("u1"))).await;
        assert!(cache.set_payment_id(None, "p").await.is_err());
    }

    #[tokio::test]
    async fn test_clear_is_scoped_and_idempotent() {
        let cache = SubscriptionCache::new(Arc::new(InMemorySecureStore::new()));
        let data = LocalSubscriptionData::new(None, 100, 50);
        for id in ["u1", "u2"] {
            cache.set_subscription_data(Some(&key(id)), &data).await.unwrap();
            cache.set_payment_id(Some(&key(id)), "pay").await.unwrap();
            cache.set_subscription_id(Some(&key(id)), "sub").await.unwrap();
        }

        cache.clear(Some(&key("u1"))).await;
        cache.clear(Some(&key("u1"))).await;

        assert_eq!(cache.subscription_data(Some(&key("u1"))).await, None);
        assert_eq!(cache.payment_id(Some(&key("u1"))).await, None);
        assert_eq!(cache.subscription_id(Some(&key("u1"))).await, None);
        assert!(cache.subscription_data(Some(&key("u2"))).await.is_some());
        assert_eq!(cache.payment_id(Some(&key("u2"))).await.as_deref(), Some("pay"));
    }

    #[tokio::test]
    async fn test_identity_roundtrip() {
        let cache = SubscriptionCache::new(Arc::new(InMemorySecureStore::new()));
        assert_eq!(cache.identity().await, None);

        let identity = SubscriptionIdentity::new(Some("u1".into()), Some("d1".into()));
        cache.save_identity(&identity).await.unwrap();
        assert_eq!(cache.identity().await, Some(identity));
    }
}
