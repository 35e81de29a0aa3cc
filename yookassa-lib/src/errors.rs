//! Error types for checkout operations.
//!
//! Only the thin wrapper operations of the client (initialization,
//! tokenization, confirmation, explicit id/identity setters) surface these
//! errors. Subscription verification never fails; see [`crate::reconcile`].

use crate::secure_store::StoreError;

/// Error codes for FFI and mobile integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum CheckoutErrorCode {
    /// Operation not supported by the native checkout implementation
    Unsupported = 1000,
    /// SDK has not been initialized with client credentials
    NotInitialized = 1001,
    /// Payment flow was cancelled by the user
    Canceled = 2000,
    /// Payment flow failed inside the native SDK
    PaymentFailed = 2001,
    /// Native SDK reported an unclassified error
    Native = 2002,
    /// Invalid request/data
    InvalidData = 5000,
    /// Serialization error
    Serialization = 5002,
    /// Storage error
    Storage = 7000,
    /// Internal/unexpected error
    Internal = 9999,
}

/// Error type for checkout bridge operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CheckoutError {
    /// The native implementation does not provide this capability.
    #[error("{0} is not supported by the native checkout module")]
    Unsupported(&'static str),

    /// No client credentials were passed and `initialize` was never called.
    #[error("checkout is not initialized: {0}")]
    NotInitialized(String),

    /// The user closed the payment UI.
    #[error("payment was canceled by user")]
    Canceled,

    /// The native SDK reported a payment failure.
    #[error("payment failed: {0}")]
    PaymentFailed(String),

    /// Any other native SDK error, with its opaque code.
    #[error("native checkout error {code}: {message}")]
    Native {
        /// Native error code (e.g. `E_INIT`)
        code: String,
        /// Native error message
        message: String,
    },

    /// A required field is missing or malformed.
    #[error("invalid {field}: {reason}")]
    InvalidData {
        /// Field or parameter name
        field: String,
        /// Reason for invalidity
        reason: String,
    },

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Secure store operation failed.
    #[error(transparent)]
    Storage(#[from] StoreError),

    /// Internal/unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CheckoutError {
    /// Native code reported when the user cancels tokenization.
    pub const TOKENIZATION_CANCELED: &'static str = "TOKENIZATION_CANCELED";
    /// Native code reported when tokenization fails.
    pub const TOKENIZATION_FAILED: &'static str = "TOKENIZATION_FAILED";

    /// Get the error code for FFI/mobile integration.
    pub fn code(&self) -> CheckoutErrorCode {
        match self {
            Self::Unsupported(_) => CheckoutErrorCode::Unsupported,
            Self::NotInitialized(_) => CheckoutErrorCode::NotInitialized,
            Self::Canceled => CheckoutErrorCode::Canceled,
            Self::PaymentFailed(_) => CheckoutErrorCode::PaymentFailed,
            Self::Native { .. } => CheckoutErrorCode::Native,
            Self::InvalidData { .. } => CheckoutErrorCode::InvalidData,
            Self::Serialization(_) => CheckoutErrorCode::Serialization,
            Self::Storage(_) => CheckoutErrorCode::Storage,
            Self::Internal(_) => CheckoutErrorCode::Internal,
        }
    }

    /// Get the error message as an owned String (useful for FFI).
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Returns true if the user cancelled the flow.
    ///
    /// Cancellation is a normal outcome, not a failure.
    pub fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled)
    }

    /// Returns true if the native side lacks the requested capability.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported(_))
    }

    /// Create a native error from a code and message.
    pub fn native(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Native {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Create an invalid data error.
    pub fn invalid_data(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidData {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a "missing required field" error.
    pub fn missing(field: impl Into<String>) -> Self {
        Self::invalid_data(field, "is required")
    }

    /// Normalize a tokenization failure reported by the native SDK.
    ///
    /// `TOKENIZATION_CANCELED` becomes [`CheckoutError::Canceled`] and
    /// `TOKENIZATION_FAILED` becomes [`CheckoutError::PaymentFailed`]; other
    /// errors pass through unchanged.
    pub fn normalize_tokenization(self) -> Self {
        match self {
            Self::Native { code, .. } if code == Self::TOKENIZATION_CANCELED => Self::Canceled,
            Self::Native { code, message } if code == Self::TOKENIZATION_FAILED => {
                Self::PaymentFailed(message)
            }
            other => other,
        }
    }
}

impl From<serde_json::Error> for CheckoutError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}
