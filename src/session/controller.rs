//! Process-wide session state machine.
//!
//! States: `Unauthenticated` and `Authenticated(Session)`.
//! - `login`: validate → encode → verify with the gateway → commit + persist
//! - `logout`: drop the session, clear storage, always succeeds
//! - `restore`: adopt the persisted session without a network round trip
//! - `revalidate`: re-check a restored token; revoke it if the gateway refuses
//!
//! Every state change happens under one write lock together with its
//! storage write, so memory and storage never disagree. A generation counter
//! is bumped whenever a login starts, a logout happens, a session is
//! restored, or a pending login is cancelled. A login only commits if the
//! generation it took at the start is still current when the gateway
//! answers, so a late response can never resurrect a session the user has
//! since logged out of.

use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::auth::{
    ApiRequest, AuthError, AuthGateway, AuthToken, Credential, FileKeyValueStore, HttpAuthGateway,
    Session, SessionEvent, SessionState, SessionStore, UserProfile,
};
use crate::config::ClientConfig;

/// Capacity of the session event channel. Slow subscribers lag rather than
/// block the controller.
const EVENT_CHANNEL_CAPACITY: usize = 16;

struct Inner {
    state: SessionState,
    generation: u64,
}

/// Owner of the live session. Share it behind an `Arc`.
pub struct SessionController {
    gateway: Arc<dyn AuthGateway>,
    store: SessionStore,
    inner: RwLock<Inner>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionController {
    /// Starts `Unauthenticated`; call [`init`](Self::init) to pick up a
    /// persisted session.
    pub fn new(gateway: Arc<dyn AuthGateway>, store: SessionStore) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            gateway,
            store,
            inner: RwLock::new(Inner {
                state: SessionState::Unauthenticated,
                generation: 0,
            }),
            events,
        }
    }

    /// Build a controller talking HTTP to the configured gateway and
    /// persisting to the configured session file.
    pub fn from_config(config: &ClientConfig) -> anyhow::Result<Self> {
        let gateway = HttpAuthGateway::new(&config.gateway_url, config.request_timeout())?;
        let store = SessionStore::new(FileKeyValueStore::new(config.session_file()?));
        Ok(Self::new(Arc::new(gateway), store))
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Application start: restore a persisted session if there is one.
    /// Returns whether a session was restored.
    pub fn init(&self) -> bool {
        self.restore()
    }

    /// Application shutdown: forget the in-memory session (storage is left
    /// alone so the next start can restore it) and discard any in-flight
    /// login.
    pub fn teardown(&self) {
        let mut inner = self.inner.write();
        inner.generation += 1;
        inner.state = SessionState::Unauthenticated;
    }

    /// Receive a [`SessionEvent`] for every login, logout, restore and
    /// revocation from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    // ── Transitions ──────────────────────────────────────────────────

    /// Log in with a username and password.
    ///
    /// On success the session is replaced as a whole, persisted (a storage
    /// failure is logged and the session stays in memory), and subscribers
    /// get `LoggedIn`. On failure nothing changes.
    pub async fn login(&self, username: &str, password: &str) -> Result<UserProfile, AuthError> {
        let credential = Credential::new(username, password);
        credential.validate()?;
        let token = credential.encode();

        let generation = {
            let mut inner = self.inner.write();
            inner.generation += 1;
            inner.generation
        };

        tracing::debug!(user = %username, "Verifying credentials with gateway");
        let profile = match self.gateway.verify(&token).await {
            Ok(profile) => profile,
            Err(e) => {
                tracing::warn!(user = %username, error = %e, "Login failed");
                return Err(e);
            }
        };

        {
            let mut inner = self.inner.write();
            if inner.generation != generation {
                tracing::info!(user = %username, "Discarding login overtaken by a newer session change");
                return Err(AuthError::Superseded);
            }
            self.persist(&token, &profile);
            inner.state = SessionState::Authenticated(Session {
                token,
                profile: profile.clone(),
            });
        }

        tracing::info!(
            user = %username,
            role = profile.role.as_str(),
            "Logged in"
        );
        self.notify(SessionEvent::LoggedIn {
            full_name: profile.full_name.clone(),
            role: profile.role.clone(),
        });
        Ok(profile)
    }

    /// Log out. Cannot fail: the in-memory session is always dropped, even
    /// if clearing storage does not work.
    pub fn logout(&self) {
        {
            let mut inner = self.inner.write();
            inner.generation += 1;
            inner.state = SessionState::Unauthenticated;
            if let Err(e) = self.store.clear() {
                tracing::warn!(error = %e, "Failed to clear persisted session");
            }
        }

        tracing::info!("Logged out");
        self.notify(SessionEvent::LoggedOut);
    }

    /// Adopt the persisted session, trusting local storage without asking
    /// the gateway. Use [`revalidate`](Self::revalidate) afterwards to
    /// confirm it. Returns whether a session was restored.
    pub fn restore(&self) -> bool {
        let mut inner = self.inner.write();
        if inner.state.is_authenticated() {
            return true;
        }
        let Some(session) = self.store.load() else {
            tracing::debug!("No persisted session to restore");
            return false;
        };

        let event = SessionEvent::Restored {
            full_name: session.profile.full_name.clone(),
            role: session.profile.role.clone(),
        };
        inner.generation += 1;
        inner.state = SessionState::Authenticated(session);
        drop(inner);

        tracing::info!("Restored persisted session");
        self.notify(event);
        true
    }

    /// Discard the result of any login currently waiting on the gateway.
    /// The session itself is untouched.
    pub fn cancel_pending_login(&self) {
        self.inner.write().generation += 1;
    }

    /// Re-verify the current token with the gateway.
    ///
    /// - Accepted: the profile is refreshed if the server's copy changed.
    /// - Refused: the session is revoked (memory and storage) and
    ///   subscribers get `Revoked`.
    /// - Unreachable: the session is kept and the network error returned.
    ///
    /// If the session changed while the check was in flight the result is
    /// ignored. Without a session this is a no-op.
    pub async fn revalidate(&self) -> Result<(), AuthError> {
        let (token, generation) = {
            let inner = self.inner.read();
            match inner.state.session() {
                Some(session) => (session.token.clone(), inner.generation),
                None => return Ok(()),
            }
        };

        match self.gateway.verify(&token).await {
            Ok(profile) => {
                let refreshed = {
                    let mut inner = self.inner.write();
                    let changed = inner.generation == generation
                        && inner.state.session().is_some_and(|s| s.profile != profile);
                    if changed {
                        self.persist(&token, &profile);
                        inner.state = SessionState::Authenticated(Session {
                            token,
                            profile: profile.clone(),
                        });
                    }
                    changed
                };
                if refreshed {
                    tracing::info!(role = profile.role.as_str(), "Session profile refreshed");
                    self.notify(SessionEvent::Refreshed {
                        full_name: profile.full_name,
                        role: profile.role,
                    });
                }
                Ok(())
            }
            Err(e) if e.is_rejection() => {
                let revoked = {
                    let mut inner = self.inner.write();
                    let current = inner.generation == generation;
                    if current {
                        inner.state = SessionState::Unauthenticated;
                        if let Err(clear_err) = self.store.clear() {
                            tracing::warn!(error = %clear_err, "Failed to clear revoked session");
                        }
                    }
                    current
                };
                if revoked {
                    tracing::warn!(error = %e, "Persisted session refused by gateway, revoked");
                    self.notify(SessionEvent::Revoked);
                }
                Err(e)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not re-verify session, keeping it");
                Err(e)
            }
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// True iff authenticated with the admin role.
    pub fn is_privileged(&self) -> bool {
        self.inner
            .read()
            .state
            .session()
            .is_some_and(|s| s.profile.is_admin())
    }

    /// `Ok` when [`is_privileged`](Self::is_privileged), `Forbidden` otherwise.
    pub fn require_privileged(&self) -> Result<(), AuthError> {
        if self.is_privileged() {
            Ok(())
        } else {
            Err(AuthError::Forbidden)
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.read().state.is_authenticated()
    }

    pub fn current_profile(&self) -> Option<UserProfile> {
        self.inner
            .read()
            .state
            .session()
            .map(|s| s.profile.clone())
    }

    // ── Requests ─────────────────────────────────────────────────────

    /// Send `request` through the gateway with the current session's
    /// credentials, or without any when logged out.
    ///
    /// This is the only place credentials are attached to outgoing requests.
    pub async fn wrap(&self, request: ApiRequest) -> Result<reqwest::Response, AuthError> {
        let token = self.current_token();
        if token.is_none() {
            tracing::debug!(path = %request.path, "Sending request without credentials");
        }
        self.gateway.send(token.as_ref(), request).await
    }

    fn current_token(&self) -> Option<AuthToken> {
        self.inner
            .read()
            .state
            .session()
            .map(|s| s.token.clone())
    }

    // ── Helpers ──────────────────────────────────────────────────────

    fn persist(&self, token: &AuthToken, profile: &UserProfile) {
        if let Err(e) = self.store.save(token, profile) {
            tracing::warn!(error = %e, "Session kept in memory only, persisting failed");
        }
    }

    fn notify(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

// ── Tests ────────────────────────────────────────────────────────────
