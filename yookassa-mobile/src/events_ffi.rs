//! Tokenization event listeners.

use std::sync::{Arc, Mutex};

use yookassa_lib::{EventHub, ListenerHandle};

use crate::checkout_ffi::{PaymentErrorFFI, TokenizationResultFFI};

/// Receives tokenization outcomes. Called on the thread that ran the flow.
#[uniffi::export(callback_interface)]
pub trait CheckoutEventListenerFFI: Send + Sync {
    fn on_tokenization_success(&self, result: TokenizationResultFFI);

    fn on_tokenization_error(&self, error: PaymentErrorFFI);

    fn on_tokenization_cancel(&self);
}

/// Registration returned by [`crate::YookassaMobileClient::add_event_listener`].
#[derive(uniffi::Object)]
pub struct EventSubscriptionFFI {
    handles: Mutex<Vec<ListenerHandle>>,
}

impl EventSubscriptionFFI {
    pub(crate) fn register(hub: &EventHub, listener: Arc<dyn CheckoutEventListenerFFI>) -> Self {
        let on_success = Arc::clone(&listener);
        let on_error = Arc::clone(&listener);
        let handles = vec![
            hub.on_tokenization_success(move |result| {
                on_success.on_tokenization_success(result.clone().into())
            }),
            hub.on_tokenization_error(move |error| on_error.on_tokenization_error(error.into())),
            hub.on_tokenization_cancel(move || listener.on_tokenization_cancel()),
        ];
        Self {
            handles: Mutex::new(handles),
        }
    }
}

#[uniffi::export]
impl EventSubscriptionFFI {
    /// Stop receiving events. Returns false if already removed.
    pub fn remove(&self) -> bool {
        let handles = match self.handles.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };
        handles
            .iter()
            .fold(false, |removed, handle| handle.remove() || removed)
    }
}
