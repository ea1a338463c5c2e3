use std::sync::Arc;

use parking_lot::RwLock;

use crate::storage::DurableStorage;
use crate::types::UserProfile;

/// Default storage key for the persisted profile.
pub const DEFAULT_PROFILE_KEY: &str = "user";

/// Last known profile of the signed-in user, readable synchronously.
///
/// Backed by durable storage so a reload can show the user before
/// `restore_session` has re-validated them. `UserProfile` can only carry a
/// known [`Role`](crate::Role), so the cache cannot hold an unmapped role.
pub struct ProfileCache {
    storage: Arc<dyn DurableStorage>,
    key: String,
    profile: RwLock<Option<UserProfile>>,
}

impl ProfileCache {
    /// Builds the cache from durable storage.
    ///
    /// A persisted profile that fails to parse (including one with a role
    /// outside the known set) is dropped and removed from storage.
    pub fn load(storage: Arc<dyn DurableStorage>, key: impl Into<String>) -> Self {
        let key = key.into();
        let profile = match storage.get(&key) {
            Ok(Some(raw)) => match serde_json::from_str::<UserProfile>(&raw) {
                Ok(profile) => Some(profile),
                Err(e) => {
                    tracing::warn!(error = %e, "Discarding unreadable persisted profile");
                    if let Err(e) = storage.remove(&key) {
                        tracing::warn!(error = %e, "Failed to remove persisted profile");
                    }
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, key = %key, "Failed to read persisted profile");
                None
            }
        };
        Self {
            storage,
            key,
            profile: RwLock::new(profile),
        }
    }

    #[must_use]
    pub fn get(&self) -> Option<UserProfile> {
        self.profile.read().clone()
    }

    /// Replaces the cached profile and persists it.
    pub fn set(&self, profile: UserProfile) {
        match serde_json::to_string(&profile) {
            Ok(json) => {
                if let Err(e) = self.storage.set(&self.key, &json) {
                    tracing::warn!(error = %e, "Failed to persist profile; keeping it in memory only");
                }
            }
            Err(e) => tracing::warn!(error = %e, "Failed to serialize profile"),
        }
        *self.profile.write() = Some(profile);
    }

    pub fn clear(&self) {
        *self.profile.write() = None;
        if let Err(e) = self.storage.remove(&self.key) {
            tracing::warn!(error = %e, "Failed to remove persisted profile");
        }
    }
}

impl std::fmt::Debug for ProfileCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileCache")
            .field("key", &self.key)
            .field("profile", &*self.profile.read())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::role::Role;
    use crate::storage::MemoryStorage;

    fn profile(role: Role) -> UserProfile {
        UserProfile {
            id: "42".into(),
            email: "v@example.org".into(),
            display_name: "Val".into(),
            role,
        }
    }

    #[test]
    fn set_persists_and_clear_removes() {
        let storage = MemoryStorage::new();
        let cache = ProfileCache::load(Arc::new(storage.clone()), DEFAULT_PROFILE_KEY);
        assert!(cache.get().is_none());

        cache.set(profile(Role::Volunteer));
        assert_eq!(cache.get().unwrap().role, Role::Volunteer);
        let raw = storage.get("user").unwrap().unwrap();
        assert!(raw.contains("\"volunteer\""));

        cache.clear();
        assert!(cache.get().is_none());
        assert_eq!(storage.get("user").unwrap(), None);
    }

    #[test]
    fn reload_restores_profile() {
        let storage = MemoryStorage::new();
        ProfileCache::load(Arc::new(storage.clone()), DEFAULT_PROFILE_KEY)
            .set(profile(Role::Organization));

        let reloaded = ProfileCache::load(Arc::new(storage), DEFAULT_PROFILE_KEY);
        assert_eq!(reloaded.get(), Some(profile(Role::Organization)));
    }

    #[test]
    fn unknown_persisted_role_is_discarded() {
        let storage = MemoryStorage::new();
        storage
            .set("user", r#"{"id":"1","email":"a@b.com","name":"A","role":"superuser"}"#)
            .unwrap();

        let cache = ProfileCache::load(Arc::new(storage.clone()), DEFAULT_PROFILE_KEY);
        assert!(cache.get().is_none());
        assert_eq!(storage.get("user").unwrap(), None);
    }

    #[test]
    fn malformed_persisted_profile_is_discarded() {
        let storage = MemoryStorage::new();
        storage.set("user", "{not json").unwrap();
        let cache = ProfileCache::load(Arc::new(storage), DEFAULT_PROFILE_KEY);
        assert!(cache.get().is_none());
    }
}
