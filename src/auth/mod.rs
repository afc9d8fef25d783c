//! Credentials, tokens and persisted sessions.
//!
//! Provides:
//! - Basic-scheme token encoding (`codec`)
//! - Profile/role model with a closed role set (`types`)
//! - Durable session persistence over a pluggable key/value store (`store`)
//! - The HTTP identity check and authenticated request path (`gateway`)
//!
//! ## Design Decisions
//! - The token is `base64(username:password)`, i.e. the password in thin
//!   disguise. It is treated as a bearer secret: redacted from `Debug`, never
//!   logged, and only meant for a trusted (TLS) channel to the gateway.
//! - Unknown server roles collapse to `Citizen`.

pub mod codec;
pub mod error;
pub mod gateway;
pub mod store;
pub mod types;

pub use codec::{encode, AuthToken, Credential};
pub use error::{AuthError, StorageError};
pub use gateway::{ApiRequest, AuthGateway, HttpAuthGateway};
pub use store::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore, SessionStore};
pub use types::{Role, Session, SessionEvent, SessionState, UserProfile};
