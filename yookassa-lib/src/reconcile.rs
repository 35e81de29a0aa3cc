//! Subscription reconciliation.
//!
//! [`ReconciliationEngine::verify`] decides whether the subscription of the
//! current identity is active, combining the local cache with whatever the
//! backend can tell. The rules, in order:
//!
//! 1. Without a usable identity the answer is inactive with source `none`.
//! 2. A definitive backend answer wins over the cache and rewrites it:
//!    `active: false` or a 400/403 wipes every identity alias, an active
//!    subscription with an expiry refreshes the cached record.
//! 3. A stored pending payment is looked up when the status check is not
//!    configured or gave no usable answer.
//! 4. If the backend cannot be reached the cached record is trusted until
//!    its `expiresAt`; an expired record is removed.
//!
//! Verification never fails. Transport errors, timeouts, unreadable bodies
//! and storage failures are logged and absorbed.

use crate::cache::SubscriptionCache;
use crate::config::VerifyOptions;
use crate::identity::{IdentityKey, IdentityResolver, ResolvedIdentity};
use crate::remote::{
    PaymentLookup, RemoteReply, RequestDescriptor, ServerSubscription, StatusVerdict,
    VerificationClient, VerificationError,
};
use crate::subscription::{
    now_millis, LocalSubscriptionData, PaymentStatus, SubscriptionInfo, VerificationSource,
};

/// Decides subscription state from the cache and the backend.
#[derive(Clone)]
pub struct ReconciliationEngine {
    cache: SubscriptionCache,
    remote: VerificationClient,
}

/// Per-pass state shared by the remote branches.
struct Pass<'a> {
    options: &'a VerifyOptions,
    identity: &'a ResolvedIdentity,
    pending_payment: Option<&'a str>,
    now: i64,
}

impl ReconciliationEngine {
    pub fn new(cache: SubscriptionCache, remote: VerificationClient) -> Self {
        Self { cache, remote }
    }

    pub fn cache(&self) -> &SubscriptionCache {
        &self.cache
    }

    /// Verify the subscription for the identity described by `options`.
    #[tracing::instrument(skip(self, options), fields(app_id = options.app_id))]
    pub async fn verify(&self, options: &VerifyOptions) -> SubscriptionInfo {
        let stored = self.cache.identity().await;
        let has_stored = stored.as_ref().is_some_and(|identity| !identity.is_empty());
        if options.require_stored_identity && !has_stored {
            tracing::debug!("no saved identity, skipping verification");
            return SubscriptionInfo::none();
        }

        let Some(identity) = IdentityResolver::resolve(
            options.user_id.as_deref(),
            options.device_id.as_deref(),
            stored.as_ref(),
        ) else {
            tracing::debug!("no identity available");
            return SubscriptionInfo::none();
        };

        let local = self.cache.subscription_data(Some(&identity.key)).await;
        let pending_payment = self.cache.payment_id(Some(&identity.key)).await;
        let now = now_millis();

        if options.has_remote() {
            let pass = Pass {
                options,
                identity: &identity,
                pending_payment: pending_payment.as_deref(),
                now,
            };
            match self.verify_remote(&pass).await {
                Ok(info) => return info,
                Err(e) => {
                    tracing::warn!(error = %e, "subscription backend unavailable, using local data");
                }
            }
        }

        self.verify_local(&identity.key, local, now).await
    }

    async fn verify_remote(&self, pass: &Pass<'_>) -> Result<SubscriptionInfo, VerificationError> {
        let mut ambiguous = None;

        if let Some(request) = status_request(pass) {
            match self.remote.send(&request).await? {
                RemoteReply::Ok(body) => match StatusVerdict::from_body(&body) {
                    StatusVerdict::Denied => {
                        tracing::debug!("backend denied subscription");
                        self.cache.clear_all(&pass.identity.aliases).await;
                        return Ok(server_inactive(Some(body)));
                    }
                    StatusVerdict::Active(subscription) => {
                        return Ok(self.confirm(pass, subscription, body).await);
                    }
                    StatusVerdict::Ambiguous => ambiguous = Some(body),
                },
                RemoteReply::Rejected { status, body } => {
                    tracing::debug!(status, "backend rejected status check");
                    self.cache.clear_all(&pass.identity.aliases).await;
                    return Ok(server_inactive(body));
                }
                RemoteReply::Failed { status } => {
                    tracing::warn!(status, "status check failed");
                    return Ok(server_inactive(None));
                }
            }
        }

        if let Some((payment_id, request)) = payment_request(pass) {
            return self.check_payment(pass, payment_id, &request).await;
        }

        match ambiguous {
            Some(body) => Ok(server_inactive(Some(body))),
            None => Err(VerificationError::NotConfigured),
        }
    }

    async fn confirm(
        &self,
        pass: &Pass<'_>,
        subscription: ServerSubscription,
        body: serde_json::Value,
    ) -> SubscriptionInfo {
        tracing::debug!(subscription_id = ?subscription.id, "backend confirmed subscription");

        if let Some(expires_at) = subscription.expires_at {
            let record = LocalSubscriptionData::new(subscription.id.clone(), expires_at, pass.now)
                .with_grace_period_days(pass.options.grace_period_days);
            self.store_record(&pass.identity.key, &record).await;
        }

        SubscriptionInfo {
            subscription_id: subscription.id,
            is_active: true,
            expires_at: subscription.expires_at,
            auto_renewal_enabled: Some(true),
            last_server_check: Some(pass.now),
            source: VerificationSource::Server,
            server_response: Some(body),
            ..Default::default()
        }
    }

    async fn check_payment(
        &self,
        pass: &Pass<'_>,
        payment_id: &str,
        request: &RequestDescriptor,
    ) -> Result<SubscriptionInfo, VerificationError> {
        let body = match self.remote.send(request).await? {
            RemoteReply::Ok(body) => body,
            RemoteReply::Rejected { status, .. } | RemoteReply::Failed { status } => {
                tracing::warn!(status, "payment lookup failed");
                return Ok(server_inactive(None));
            }
        };

        let lookup = PaymentLookup::from_body(&body);
        let key = &pass.identity.key;
        tracing::debug!(status = ?lookup.status, "payment lookup");

        let info = match lookup.status {
            Some(PaymentStatus::Pending) => SubscriptionInfo {
                payment_id: Some(payment_id.to_string()),
                payment_status: Some(PaymentStatus::Pending),
                ..server_inactive(Some(body))
            },
            Some(PaymentStatus::Canceled) => {
                self.cache.clear_payment_id(Some(key)).await;
                self.cache.clear_all(&pass.identity.aliases).await;
                SubscriptionInfo {
                    payment_status: Some(PaymentStatus::Canceled),
                    ..server_inactive(Some(body))
                }
            }
            Some(PaymentStatus::Succeeded) => {
                self.cache.clear_payment_id(Some(key)).await;

                if let Some(subscription_id) = &lookup.subscription_id {
                    if let Err(e) = self.cache.set_subscription_id(Some(key), subscription_id).await {
                        tracing::warn!(error = %e, "failed to store subscription id");
                    }
                }

                if let Some(expires_at) = lookup.expires_at {
                    let record = LocalSubscriptionData::new(
                        lookup.subscription_id.clone(),
                        expires_at,
                        pass.now,
                    )
                    .with_server_signature(lookup.server_signature.clone())
                    .with_recovery_code(lookup.recovery_code.clone())
                    .with_grace_period_days(pass.options.grace_period_days);
                    self.store_record(key, &record).await;
                }

                SubscriptionInfo {
                    is_active: lookup.subscription_id.is_some() && lookup.expires_at.is_some(),
                    subscription_id: lookup.subscription_id,
                    payment_id: Some(payment_id.to_string()),
                    payment_status: Some(PaymentStatus::Succeeded),
                    recovery_code: lookup.recovery_code,
                    expires_at: lookup.expires_at,
                    auto_renewal_enabled: Some(true),
                    last_server_check: Some(pass.now),
                    server_signature: lookup.server_signature,
                    source: VerificationSource::Server,
                    server_response: Some(body),
                }
            }
            None => server_inactive(None),
        };
        Ok(info)
    }

    async fn verify_local(
        &self,
        key: &IdentityKey,
        local: Option<LocalSubscriptionData>,
        now: i64,
    ) -> SubscriptionInfo {
        match local {
            Some(data) if data.is_valid_at(now) => {
                tracing::debug!(expires_at = data.expires_at, "using cached subscription");
                SubscriptionInfo::from_local(&data)
            }
            Some(data) => {
                tracing::debug!(expires_at = data.expires_at, "cached subscription expired");
                self.cache.clear(Some(key)).await;
                SubscriptionInfo::inactive(VerificationSource::Local)
            }
            None => SubscriptionInfo::none(),
        }
    }

    async fn store_record(&self, key: &IdentityKey, record: &LocalSubscriptionData) {
        if let Err(e) = self.cache.set_subscription_data(Some(key), record).await {
            tracing::warn!(error = %e, "failed to cache subscription record");
        }
    }
}

fn server_inactive(body: Option<serde_json::Value>) -> SubscriptionInfo {
    SubscriptionInfo::inactive(VerificationSource::Server).with_server_response(body)
}

/// Status-check request: explicit descriptor, else derived from the server URL.
fn status_request(pass: &Pass<'_>) -> Option<RequestDescriptor> {
    pass.options.check_request.clone().or_else(|| {
        pass.options.server_url().map(|url| {
            RequestDescriptor::status_check(
                url,
                pass.options.app_id,
                pass.identity.user_id.as_deref(),
                pass.identity.device_id.as_deref(),
            )
        })
    })
}

/// Payment lookup for the stored pending payment, if one applies.
fn payment_request<'a>(pass: &Pass<'a>) -> Option<(&'a str, RequestDescriptor)> {
    let payment_id = pass.pending_payment?;
    let request = match &pass.options.payments_request {
        Some(request) => request.clone().with_payment_id(payment_id),
        None => RequestDescriptor::payment_lookup(pass.options.server_url()?, payment_id),
    };
    Some((payment_id, request))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::SubscriptionIdentity;
    use crate::secure_store::InMemorySecureStore;
    use crate::test_utils::RecordingStore;
    use std::sync::Arc;
    use std::time::Duration;

    const DAY_MS: i64 = 86_400_000;

    fn engine_with(store: Arc<dyn crate::SecureStore>) -> ReconciliationEngine {
        ReconciliationEngine::new(
            SubscriptionCache::new(store),
            VerificationClient::new(Duration::from_millis(200)),
        )
    }

    fn key(value: &str) -> IdentityKey {
        IdentityKey::new(value).unwrap()
    }

    #[tokio::test]
    async fn test_required_identity_reads_store_once() {
        let store = Arc::new(RecordingStore::new());
        let engine = engine_with(store.clone());

        let info = engine
            .verify(&VerifyOptions::new(1).with_user_id("u1").with_server_url("http://127.0.0.1:9"))
            .await;

        assert_eq!(info, SubscriptionInfo::none());
        assert_eq!(store.get_count(), 1);
        assert_eq!(store.set_count() + store.delete_count(), 0);
    }

    #[tokio::test]
    async fn test_no_identity_at_all() {
        let engine = engine_with(Arc::new(InMemorySecureStore::new()));
        let info = engine
            .verify(&VerifyOptions::new(1).with_require_stored_identity(false))
            .await;
        assert_eq!(info, SubscriptionInfo::none());
    }

    #[tokio::test]
    async fn test_local_valid_record() {
        let engine = engine_with(Arc::new(InMemorySecureStore::new()));
        let expires_at = now_millis() + DAY_MS;
        let record = LocalSubscriptionData::new(Some("sub".into()), expires_at, 1)
            .with_recovery_code(Some("rc".into()));
        engine
            .cache()
            .set_subscription_data(Some(&key("u1")), &record)
            .await
            .unwrap();

        let info = engine
            .verify(&VerifyOptions::new(1).with_user_id("u1").with_require_stored_identity(false))
            .await;

        assert!(info.is_active);
        assert_eq!(info.source, VerificationSource::Local);
        assert_eq!(info.expires_at, Some(expires_at));
        assert_eq!(info.recovery_code.as_deref(), Some("rc"));
    }

    #[tokio::test]
    async fn test_local_expired_record_is_cleared() {
        let engine = engine_with(Arc::new(InMemorySecureStore::new()));
        let record = LocalSubscriptionData::new(Some("sub".into()), now_millis() - 1, 1);
        let cache = engine.cache().clone();
        cache.save_identity(&SubscriptionIdentity::user("u1")).await.unwrap();
        cache.set_subscription_data(Some(&key("u1")), &record).await.unwrap();
        cache.set_subscription_id(Some(&key("u1")), "sub").await.unwrap();

        let info = engine.verify(&VerifyOptions::new(1)).await;

        assert_eq!(info, SubscriptionInfo::inactive(VerificationSource::Local));
        assert_eq!(cache.subscription_data(Some(&key("u1"))).await, None);
        assert_eq!(cache.subscription_id(Some(&key("u1"))).await, None);
        // identity record survives
        assert!(cache.identity().await.is_some());
    }

    #[tokio::test]
    async fn test_unreachable_backend_falls_back_to_cache() {
        let engine = engine_with(Arc::new(InMemorySecureStore::new()));
        let expires_at = now_millis() + DAY_MS;
        engine
            .cache()
            .set_subscription_data(Some(&key("d1")), &LocalSubscriptionData::new(None, expires_at, 1))
            .await
            .unwrap();

        // nothing listens on the discard port
        let options = VerifyOptions::new(1)
            .with_device_id("d1")
            .with_require_stored_identity(false)
            .with_server_url("http://127.0.0.1:9");
        let info = engine.verify(&options).await;

        assert!(info.is_active);
        assert_eq!(info.source, VerificationSource::Local);
    }

    #[tokio::test]
    async fn test_payments_only_without_pending_payment_uses_cache() {
        let engine = engine_with(Arc::new(InMemorySecureStore::new()));
        let options = VerifyOptions::new(1)
            .with_user_id("u1")
            .with_require_stored_identity(false)
            .with_payments_request(RequestDescriptor::get("http://127.0.0.1:9/p/{paymentId}"));

        let info = engine.verify(&options).await;
        assert_eq!(info, SubscriptionInfo::none());
    }

    #[test]
    fn test_payment_request_prefers_descriptor() {
        let options = VerifyOptions::new(1)
            .with_server_url("https://api.test")
            .with_payments_request(RequestDescriptor::get("https://other.test/p/{paymentId}"));
        let identity = IdentityResolver::resolve(Some("u1"), None, None).unwrap();
        let pass = Pass {
            options: &options,
            identity: &identity,
            pending_payment: Some("p 1"),
            now: 0,
        };

        let (payment_id, request) = payment_request(&pass).unwrap();
        assert_eq!(payment_id, "p 1");
        assert_eq!(request.url, "https://other.test/p/p%201");

        let pass = Pass {
            pending_payment: None,
            ..pass
        };
        assert!(payment_request(&pass).is_none());
    }

    #[test]
    fn test_status_request_uses_resolved_ids() {
        let options = VerifyOptions::new(5).with_server_url("https://api.test/");
        let stored = SubscriptionIdentity::new(Some("su".into()), Some("sd".into()));
        let identity = IdentityResolver::resolve(None, Some("d1"), Some(&stored)).unwrap();
        let pass = Pass {
            options: &options,
            identity: &identity,
            pending_payment: None,
            now: 0,
        };

        let request = status_request(&pass).unwrap();
        assert_eq!(request.url, "https://api.test/subscriptions/check");
        let body: serde_json::Value = serde_json::from_str(request.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, serde_json::json!({"app_id": 5, "user_id": "su", "device_id": "d1"}));
    }
}
