//! Credential encoding for HTTP Basic authorization.
//!
//! The token is `base64("username:password")`. This is an encoding, not a
//! digest: anyone holding the token holds the password. Only send it over a
//! transport the deployment already trusts (TLS to the gateway).

use std::fmt;

use base64::Engine;
use serde::{Deserialize, Serialize};

use super::error::AuthError;

/// Separator between username and password inside the encoded token.
///
/// A username containing `:` cannot be decoded unambiguously by the server.
/// This is a property of the Basic scheme and is not checked here.
pub const CREDENTIAL_DELIMITER: char = ':';

/// Username/password pair typed into the login form.
///
/// Lives only long enough to produce an [`AuthToken`]; it is never persisted.
#[derive(Clone)]
pub struct Credential {
    pub username: String,
    pub password: String,
}

impl Credential {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Reject empty fields before anything touches the network.
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.username.is_empty() {
            return Err(AuthError::Validation("username is empty"));
        }
        if self.password.is_empty() {
            return Err(AuthError::Validation("password is empty"));
        }
        Ok(())
    }

    pub fn encode(&self) -> AuthToken {
        encode(&self.username, &self.password)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Opaque bearer secret attached to authenticated requests.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthToken(String);

impl AuthToken {
    /// Wrap a token read back from storage.
    pub fn from_stored(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Value for the `Authorization` header.
    pub fn authorization_header(&self) -> String {
        format!("Basic {}", self.0)
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(<redacted>)")
    }
}

/// Encode a username/password pair into a Basic token.
///
/// Pure and deterministic. Callers validate non-emptiness first.
pub fn encode(username: &str, password: &str) -> AuthToken {
    let joined = format!("{username}{CREDENTIAL_DELIMITER}{password}");
    AuthToken(base64::engine::general_purpose::STANDARD.encode(joined.as_bytes()))
}
