//! Identity resolution.
//!
//! Every persisted subscription value is namespaced by an identity key:
//! the user id when the user is signed in, otherwise a device id. The
//! resolver picks that key from explicit arguments and the stored identity
//! record, and collects every alias seen along the way so an authoritative
//! server denial can wipe all of them.

use serde::{Deserialize, Serialize};

/// Identity under which subscription data is stored.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionIdentity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
}

impl SubscriptionIdentity {
    pub fn new(user_id: Option<String>, device_id: Option<String>) -> Self {
        Self { user_id, device_id }
    }

    /// Identity for a signed-in user.
    pub fn user(user_id: impl Into<String>) -> Self {
        Self::new(Some(user_id.into()), None)
    }

    /// Identity for an anonymous device.
    pub fn device(device_id: impl Into<String>) -> Self {
        Self::new(None, Some(device_id.into()))
    }

    /// User id, ignoring empty strings.
    pub fn user_id(&self) -> Option<&str> {
        non_empty(self.user_id.as_deref())
    }

    /// Device id, ignoring empty strings.
    pub fn device_id(&self) -> Option<&str> {
        non_empty(self.device_id.as_deref())
    }

    /// True when neither field carries a value.
    pub fn is_empty(&self) -> bool {
        self.user_id().is_none() && self.device_id().is_none()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Key namespacing all per-identity storage.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentityKey(String);

impl IdentityKey {
    /// Wrap a raw identity string. Returns `None` for an empty string.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        if value.is_empty() {
            None
        } else {
            Some(Self(value))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of identity resolution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedIdentity {
    /// Key used for reads and writes during this pass.
    pub key: IdentityKey,
    /// Every distinct identity string seen, in priority order. Includes `key`.
    pub aliases: Vec<IdentityKey>,
    /// User id reported to the backend (explicit, else stored).
    pub user_id: Option<String>,
    /// Device id reported to the backend (explicit, else stored).
    pub device_id: Option<String>,
}

/// Picks the identity key for a verification pass.
pub struct IdentityResolver;

impl IdentityResolver {
    /// Resolve the identity key.
    ///
    /// Priority: explicit user id, explicit device id, stored user id,
    /// stored device id. Returns `None` when all four are absent.
    pub fn resolve(
        user_id: Option<&str>,
        device_id: Option<&str>,
        stored: Option<&SubscriptionIdentity>,
    ) -> Option<ResolvedIdentity> {
        let user_id = non_empty(user_id);
        let device_id = non_empty(device_id);
        let stored_user = stored.and_then(SubscriptionIdentity::user_id);
        let stored_device = stored.and_then(SubscriptionIdentity::device_id);

        let mut aliases: Vec<IdentityKey> = Vec::with_capacity(4);
        for candidate in [user_id, device_id, stored_user, stored_device]
            .into_iter()
            .flatten()
        {
            if let Some(key) = IdentityKey::new(candidate) {
                if !aliases.contains(&key) {
                    aliases.push(key);
                }
            }
        }

        let key = aliases.first()?.clone();
        Some(ResolvedIdentity {
            key,
            aliases,
            user_id: user_id.or(stored_user).map(str::to_string),
            device_id: device_id.or(stored_device).map(str::to_string),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_user_wins() {
        let stored = SubscriptionIdentity::new(Some("stored_u".into()), Some("stored_d".into()));
        let resolved = IdentityResolver::resolve(Some("u1"), Some("d1"), Some(&stored)).unwrap();

        assert_eq!(resolved.key.as_str(), "u1");
        assert_eq!(resolved.user_id.as_deref(), Some("u1"));
        assert_eq!(resolved.device_id.as_deref(), Some("d1"));
        let aliases: Vec<&str> = resolved.aliases.iter().map(IdentityKey::as_str).collect();
        assert_eq!(aliases, vec!["u1", "d1", "stored_u", "stored_d"]);
    }

    #[test]
    fn test_explicit_device_before_stored_user() {
        let stored = SubscriptionIdentity::user("stored_u");
        let resolved = IdentityResolver::resolve(None, Some("d1"), Some(&stored)).unwrap();

        assert_eq!(resolved.key.as_str(), "d1");
        // backend still learns the stored user id
        assert_eq!(resolved.user_id.as_deref(), Some("stored_u"));
    }

    #[test]
    fn test_falls_back_to_stored() {
        let stored = SubscriptionIdentity::device("stored_d");
        let resolved = IdentityResolver::resolve(None, None, Some(&stored)).unwrap();
        assert_eq!(resolved.key.as_str(), "stored_d");
        assert_eq!(resolved.user_id, None);
    }

    #[test]
    fn test_aliases_deduplicated() {
        let stored = SubscriptionIdentity::new(Some("u1".into()), Some("d1".into()));
        let resolved = IdentityResolver::resolve(Some("u1"), None, Some(&stored)).unwrap();
        assert_eq!(resolved.aliases.len(), 2);
    }

    #[test]
    fn test_empty_strings_are_absent() {
        let stored = SubscriptionIdentity::new(Some(String::new()), None);
        assert!(stored.is_empty());
        assert!(IdentityResolver::resolve(Some(""), Some(""), Some(&stored)).is_none());
        assert!(IdentityResolver::resolve(None, None, None).is_none());
    }

    #[test]
    fn test_identity_json_shape() {
        let identity = SubscriptionIdentity::user("u1");
        assert_eq!(serde_json::to_string(&identity).unwrap(), r#"{"userId":"u1"}"#);
    }
}
