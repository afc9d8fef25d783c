//! Session data model: roles, user profiles and the session state machine's
//! states.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::codec::AuthToken;

// ── Role ─────────────────────────────────────────────────────────

/// Closed set of roles the client understands.
///
/// The gateway may send other role strings (it currently uses `"user"` for
/// ordinary accounts). Anything that is not exactly `"admin"` maps to
/// `Citizen`, so unknown roles can never grant privileges. The raw string is
/// kept so the profile serializes back to what the server sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    Citizen { raw: String },
    Admin,
}

impl Role {
    pub fn citizen() -> Self {
        Self::Citizen {
            raw: "citizen".into(),
        }
    }

    /// Map a server role string onto the closed set.
    pub fn from_server(raw: &str) -> Self {
        if raw == "admin" {
            Self::Admin
        } else {
            Self::Citizen { raw: raw.into() }
        }
    }

    /// The role string as the gateway sent it.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Admin => "admin",
            Self::Citizen { raw } => raw,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }

    /// Human-readable label for display.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Admin => "Administrator",
            Self::Citizen { .. } => "Citizen",
        }
    }
}

impl Serialize for Role {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from_server(&raw))
    }
}

// ── UserProfile ──────────────────────────────────────────────────

/// Profile returned by `GET /api/auth/me`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub full_name: String,
    pub role: Role,
    /// Server-defined fields the client does not interpret (username, ...).
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl UserProfile {
    pub fn new(full_name: impl Into<String>, role: Role) -> Self {
        Self {
            full_name: full_name.into(),
            role,
            extra: serde_json::Map::new(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

// ── Session ──────────────────────────────────────────────────────

/// A token together with the profile it authenticates.
///
/// Never mutated in place; every login builds a fresh value.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub token: AuthToken,
    pub profile: UserProfile,
}

/// The controller's two states. There is no terminal state.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum SessionState {
    #[default]
    Unauthenticated,
    Authenticated(Session),
}

impl SessionState {
    pub fn session(&self) -> Option<&Session> {
        match self {
            Self::Authenticated(session) => Some(session),
            Self::Unauthenticated => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }
}

/// Notifications delivered to subscribers whenever the session changes.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    LoggedIn { full_name: String, role: Role },
    Restored { full_name: String, role: Role },
    /// Re-verification returned a different profile for the same token.
    Refreshed { full_name: String, role: Role },
    LoggedOut,
    /// A restored session failed re-verification and was dropped.
    Revoked,
}
