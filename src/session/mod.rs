//! Session lifecycle: login, logout, restore-on-start and the single
//! authenticated request path the rest of the client uses.

pub mod controller;

pub use controller::SessionController;
