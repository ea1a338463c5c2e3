use std::sync::Arc;

use parking_lot::RwLock;

use crate::storage::DurableStorage;
use crate::types::Credential;

/// Default storage key for the bearer token.
pub const DEFAULT_TOKEN_KEY: &str = "token";

/// Single owner of the bearer credential.
///
/// The in-memory value is authoritative for the life of the process. It is
/// read from durable storage once, in [`TokenStore::load`], and every change
/// is written through on a best-effort basis.
pub struct TokenStore {
    storage: Arc<dyn DurableStorage>,
    key: String,
    token: RwLock<Option<Credential>>,
}

impl TokenStore {
    /// Builds the store and populates it from durable storage.
    ///
    /// An unreadable or empty persisted token is treated as absent.
    pub fn load(storage: Arc<dyn DurableStorage>, key: impl Into<String>) -> Self {
        let key = key.into();
        let token = match storage.get(&key) {
            Ok(Some(raw)) => Credential::new(raw).ok(),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, key = %key, "Failed to read persisted token");
                None
            }
        };
        Self {
            storage,
            key,
            token: RwLock::new(token),
        }
    }

    /// Stores `token`, replacing any previous one.
    pub fn set_token(&self, token: Credential) {
        if let Err(e) = self.storage.set(&self.key, token.as_str()) {
            tracing::warn!(error = %e, "Failed to persist token; keeping it in memory only");
        }
        *self.token.write() = Some(token);
    }

    #[must_use]
    pub fn token(&self) -> Option<Credential> {
        self.token.read().clone()
    }

    /// Removes the token from memory and storage.
    pub fn clear_token(&self) {
        *self.token.write() = None;
        if let Err(e) = self.storage.remove(&self.key) {
            tracing::warn!(error = %e, "Failed to remove persisted token");
        }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.token.read().is_some()
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("key", &self.key)
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}
