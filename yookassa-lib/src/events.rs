//! Tokenization event listeners.
//!
//! [`EventHub`] keeps one registry per event kind. Registering returns a
//! [`ListenerHandle`]; calling [`ListenerHandle::remove`] unregisters the
//! listener. Dropping the handle leaves the listener registered.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, Weak};

use crate::checkout::{PaymentError, TokenizationResult};

pub type SuccessListener = Arc<dyn Fn(&TokenizationResult) + Send + Sync>;
pub type ErrorListener = Arc<dyn Fn(&PaymentError) + Send + Sync>;
pub type CancelListener = Arc<dyn Fn() + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventKind {
    TokenizationSuccess,
    TokenizationError,
    TokenizationCancel,
}

#[derive(Default)]
struct Registries {
    success: RwLock<BTreeMap<u64, SuccessListener>>,
    error: RwLock<BTreeMap<u64, ErrorListener>>,
    cancel: RwLock<BTreeMap<u64, CancelListener>>,
    next_id: AtomicU64,
}

impl Registries {
    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn remove(&self, kind: EventKind, id: u64) -> bool {
        match kind {
            EventKind::TokenizationSuccess => remove_from(&self.success, id),
            EventKind::TokenizationError => remove_from(&self.error, id),
            EventKind::TokenizationCancel => remove_from(&self.cancel, id),
        }
    }
}

fn remove_from<T>(registry: &RwLock<BTreeMap<u64, T>>, id: u64) -> bool {
    match registry.write() {
        Ok(mut listeners) => listeners.remove(&id).is_some(),
        Err(_) => {
            tracing::error!("event listener registry lock poisoned");
            false
        }
    }
}

fn insert_into<T>(registry: &RwLock<BTreeMap<u64, T>>, id: u64, listener: T) {
    match registry.write() {
        Ok(mut listeners) => {
            listeners.insert(id, listener);
        }
        Err(_) => tracing::error!("event listener registry lock poisoned"),
    }
}

fn len_of<T>(registry: &RwLock<BTreeMap<u64, T>>) -> usize {
    registry.read().map(|listeners| listeners.len()).unwrap_or(0)
}

/// Snapshot listeners so callbacks run without holding the lock.
fn snapshot<T: Clone>(registry: &RwLock<BTreeMap<u64, T>>) -> Vec<T> {
    registry
        .read()
        .map(|listeners| listeners.values().cloned().collect())
        .unwrap_or_default()
}

/// Registry of tokenization listeners.
#[derive(Clone, Default)]
pub struct EventHub {
    inner: Arc<Registries>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_tokenization_success(
        &self,
        listener: impl Fn(&TokenizationResult) + Send + Sync + 'static,
    ) -> ListenerHandle {
        let id = self.inner.next_id();
        insert_into(&self.inner.success, id, Arc::new(listener) as SuccessListener);
        self.handle(EventKind::TokenizationSuccess, id)
    }

    pub fn on_tokenization_error(
        &self,
        listener: impl Fn(&PaymentError) + Send + Sync + 'static,
    ) -> ListenerHandle {
        let id = self.inner.next_id();
        insert_into(&self.inner.error, id, Arc::new(listener) as ErrorListener);
        self.handle(EventKind::TokenizationError, id)
    }

    pub fn on_tokenization_cancel(&self, listener: impl Fn() + Send + Sync + 'static) -> ListenerHandle {
        let id = self.inner.next_id();
        insert_into(&self.inner.cancel, id, Arc::new(listener) as CancelListener);
        self.handle(EventKind::TokenizationCancel, id)
    }

    pub fn emit_success(&self, result: &TokenizationResult) {
        for listener in snapshot(&self.inner.success) {
            listener(result);
        }
    }

    pub fn emit_error(&self, error: &PaymentError) {
        for listener in snapshot(&self.inner.error) {
            listener(error);
        }
    }

    pub fn emit_cancel(&self) {
        for listener in snapshot(&self.inner.cancel) {
            listener();
        }
    }

    /// Number of registered listeners of `kind`.
    pub fn listener_count(&self, kind: EventKind) -> usize {
        match kind {
            EventKind::TokenizationSuccess => len_of(&self.inner.success),
            EventKind::TokenizationError => len_of(&self.inner.error),
            EventKind::TokenizationCancel => len_of(&self.inner.cancel),
        }
    }

    fn handle(&self, kind: EventKind, id: u64) -> ListenerHandle {
        ListenerHandle {
            kind,
            id,
            hub: Arc::downgrade(&self.inner),
        }
    }
}

/// Registration of a single listener.
#[derive(Debug)]
pub struct ListenerHandle {
    kind: EventKind,
    id: u64,
    hub: Weak<Registries>,
}

impl ListenerHandle {
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Unregister the listener. Returns false if it was already gone.
    pub fn remove(&self) -> bool {
        self.hub
            .upgrade()
            .map(|hub| hub.remove(self.kind, self.id))
            .unwrap_or(false)
    }
}

impl std::fmt::Debug for Registries {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registries").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkout::PaymentMethodType;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_emit_reaches_registered_listeners() {
        let hub = EventHub::new();
        let seen = Arc::new(AtomicUsize::new(0));

        let counter = seen.clone();
        let _handle = hub.on_tokenization_success(move |result| {
            assert_eq!(result.token, "tok");
            counter.fetch_add(1, Ordering::SeqCst);
        });

        hub.emit_success(&TokenizationResult::new("tok", PaymentMethodType::Sbp));
        hub.emit_cancel();
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_removed_listener_is_silent() {
        let hub = EventHub::new();
        let seen = Arc::new(AtomicUsize::new(0));

        let counter = seen.clone();
        let handle = hub.on_tokenization_cancel(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(hub.listener_count(EventKind::TokenizationCancel), 1);

        assert!(handle.remove());
        assert!(!handle.remove());
        hub.emit_cancel();

        assert_eq!(seen.load(Ordering::SeqCst), 0);
        assert_eq!(hub.listener_count(EventKind::TokenizationCancel), 0);
    }

    #[test]
    fn test_handle_outliving_hub() {
        let hub = EventHub::new();
        let handle = hub.on_tokenization_error(|_| {});
        drop(hub);
        assert!(!handle.remove());
    }
}
