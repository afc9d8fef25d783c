//! Smart city dashboard client.
//!
//! Talks to a single API gateway that fronts the city's transport, tourism,
//! air quality and emergency services. The crate owns the client-side
//! session: credential encoding, persistence across restarts, the login /
//! logout / restore state machine, and the authenticated request path every
//! service call goes through.

#![forbid(unsafe_code)]

pub mod auth;
pub mod config;
pub mod services;
pub mod session;

pub use auth::{AuthError, Role, SessionEvent, UserProfile};
pub use config::ClientConfig;
pub use services::{CityClient, ServiceError};
pub use session::SessionController;
