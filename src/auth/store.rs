//! Durable session persistence.
//!
//! The session survives restarts as two entries in a local key/value store:
//! - `authCredentials`: the encoded token
//! - `currentUser`: the JSON-serialized profile
//!
//! `KeyValueStore` abstracts the medium. `FileKeyValueStore` is the on-disk
//! store used by the CLI; `MemoryKeyValueStore` backs tests and ephemeral
//! sessions.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::codec::AuthToken;
use super::error::{AuthError, StorageError};
use super::types::{Session, UserProfile};

/// Storage key for the encoded token.
pub const TOKEN_KEY: &str = "authCredentials";

/// Storage key for the serialized profile.
pub const PROFILE_KEY: &str = "currentUser";

// ── Key/value medium ────────────────────────────────────────────────

/// String-to-string store with overwrite semantics.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// In-process store. Can be disabled to behave like storage that refuses
/// every operation (quota exhausted, private browsing, read-only disk).
#[derive(Default)]
pub struct MemoryKeyValueStore {
    entries: Mutex<BTreeMap<String, String>>,
    disabled: Mutex<bool>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent operation fail with `StorageError::Unavailable`.
    pub fn set_disabled(&self, disabled: bool) {
        *self.disabled.lock() = disabled;
    }

    /// Number of stored entries (ignores the disabled flag).
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_enabled(&self) -> Result<(), StorageError> {
        if *self.disabled.lock() {
            return Err(StorageError::Unavailable("storage disabled".into()));
        }
        Ok(())
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.check_enabled()?;
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.check_enabled()?;
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.check_enabled()?;
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// Key/value store persisted as one JSON object on disk.
///
/// Writes go to a sibling temp file which is then renamed over the target,
/// so readers never observe a half-written document.
pub struct FileKeyValueStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl FileKeyValueStore {
    /// Use (or lazily create) the store at `path`. Parent directories are
    /// created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(entries)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self.lock.lock();
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock();
        // A corrupt document is replaced rather than blocking every write.
        let mut entries = match self.read_all() {
            Ok(entries) => entries,
            Err(StorageError::Malformed(_)) => BTreeMap::new(),
            Err(e) => return Err(e),
        };
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock();
        if !self.path.exists() {
            return Ok(());
        }
        let mut entries = match self.read_all() {
            Ok(entries) => entries,
            Err(StorageError::Malformed(_)) => BTreeMap::new(),
            Err(e) => return Err(e),
        };
        entries.remove(key);
        self.write_all(&entries)
    }
}

// ── Session store ───────────────────────────────────────────────────

/// Reads and writes the persisted session over any [`KeyValueStore`].
pub struct SessionStore {
    backend: Box<dyn KeyValueStore>,
}

impl SessionStore {
    pub fn new(backend: impl KeyValueStore + 'static) -> Self {
        Self {
            backend: Box::new(backend),
        }
    }

    /// In-memory store, lost on exit.
    pub fn ephemeral() -> Self {
        Self::new(MemoryKeyValueStore::new())
    }

    /// Persist token and profile, overwriting any previous session.
    ///
    /// The two entries are written separately. If either write fails the
    /// store is cleared, so a token is never left paired with another
    /// user's profile.
    pub fn save(&self, token: &AuthToken, profile: &UserProfile) -> Result<(), StorageError> {
        let profile_json = serde_json::to_string(profile)?;
        let written = self
            .backend
            .set(TOKEN_KEY, token.as_str())
            .and_then(|()| self.backend.set(PROFILE_KEY, &profile_json));

        if written.is_err() {
            if let Err(e) = self.clear() {
                tracing::warn!(error = %e, "Failed to clear half-written session");
            }
        }
        written
    }

    /// Read back a persisted session.
    ///
    /// Missing entries, unreadable storage and a corrupt profile all yield
    /// `None`; the last two are logged.
    pub fn load(&self) -> Option<Session> {
        match self.try_load() {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring persisted session");
                None
            }
        }
    }

    fn try_load(&self) -> Result<Option<Session>, AuthError> {
        let token = self.backend.get(TOKEN_KEY)?.filter(|t| !t.is_empty());
        let profile = self.backend.get(PROFILE_KEY)?.filter(|p| !p.is_empty());

        let (Some(token), Some(profile)) = (token, profile) else {
            return Ok(None);
        };

        let profile: UserProfile = serde_json::from_str(&profile)
            .map_err(|e| AuthError::CorruptState(e.to_string()))?;

        Ok(Some(Session {
            token: AuthToken::from_stored(token),
            profile,
        }))
    }

    /// Remove both entries. Idempotent; both removals are attempted even if
    /// the first fails, and the first error is returned.
    pub fn clear(&self) -> Result<(), StorageError> {
        let token = self.backend.remove(TOKEN_KEY);
        let profile = self.backend.remove(PROFILE_KEY);
        token.and(profile)
    }
}

// ── Tests ───────────────────────────────────────────────────────────
