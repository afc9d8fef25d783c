//! Error taxonomy for the session layer.
//!
//! Every failure that can happen between the login form and the gateway is
//! one of these kinds. The controller is the boundary: it converts them into
//! either a user-facing message (`AuthError::user_message`) or a logged,
//! silent degrade (storage failures).

use reqwest::StatusCode;

/// Failure of the local key/value store backing the persisted session.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Storage is switched off or unavailable (quota exhausted, read-only media).
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    /// The backing file exists but is not a valid key/value document.
    #[error("storage contents unreadable: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Errors produced by login, logout, restore and authenticated requests.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Empty username or password; no network call was issued.
    #[error("validation failed: {0}")]
    Validation(&'static str),

    /// The gateway rejected the credentials (or answered with a non-success
    /// status to the identity check).
    #[error("identity check failed (status {status})")]
    Authentication { status: StatusCode },

    /// The gateway could not be reached, or the request timed out.
    #[error("gateway unreachable: {0}")]
    Network(#[source] reqwest::Error),

    /// An admin-only operation was attempted without an admin session.
    #[error("operation requires an administrator session")]
    Forbidden,

    /// A newer login, logout or cancellation overtook this login while it
    /// was waiting on the gateway. The result was discarded.
    #[error("login superseded by a newer session change")]
    Superseded,

    /// Persistence failed. Never returned by the controller itself; it only
    /// logs these and carries on with the in-memory session.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Stored session data could not be parsed. Treated as "no session".
    #[error("stored session is corrupt: {0}")]
    CorruptState(String),
}

impl AuthError {
    /// Text suitable for showing to the person at the keyboard.
    ///
    /// Rejected credentials and an unreachable gateway get different
    /// messages so a network outage is not mistaken for a typo.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(_) => "Please fill in both username and password.".into(),
            Self::Authentication { status } if status.is_server_error() => {
                "The city gateway is having trouble. Please try again later.".into()
            }
            Self::Authentication { .. } => "Invalid credentials.".into(),
            Self::Network(_) => {
                "Cannot reach the city gateway. Check your connection and try again.".into()
            }
            Self::Forbidden => {
                "This feature is reserved for administrators. Log in with an admin account.".into()
            }
            Self::Superseded => "Login cancelled.".into(),
            Self::Storage(_) | Self::CorruptState(_) => {
                "Your session could not be saved on this device.".into()
            }
        }
    }

    /// Whether the gateway positively refused the token: 401 or 403 from the
    /// identity check. Unreachable or failing gateways (5xx) are not refusals.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::Authentication { status }
                if *status == StatusCode::UNAUTHORIZED || *status == StatusCode::FORBIDDEN
        )
    }
}
