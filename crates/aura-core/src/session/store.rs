//! Session store.
//!
//! The session store is the single source of truth for authentication state.
//! Components read it on every navigation decision instead of caching it, so
//! a write is visible to the next reader immediately.

use super::model::{Profile, Session};
use crate::error::Result;
use std::sync::{Arc, Mutex};

/// Storage key for the bearer token.
pub const TOKEN_KEY: &str = "token";
/// Storage key for the cached profile blob.
pub const PROFILE_KEY: &str = "user_info";

/// A string key/value storage tier.
///
/// Two tiers back the session: a durable one that survives restarts and an
/// ephemeral one scoped to the running client.
pub trait KeyValueStore: Send + Sync {
    /// Reads a value. Missing keys yield `Ok(None)`.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Writes a value, replacing any previous one.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removes a value. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}

/// Access to the authentication session.
///
/// Injected into routers and controllers so tests can substitute a fake.
pub trait SessionStore: Send + Sync {
    /// Replaces the whole session.
    ///
    /// The token always goes to durable storage; the profile goes to durable
    /// storage when `persistent` is set and to ephemeral storage otherwise.
    fn set_session(&self, token: &str, profile: &Profile, persistent: bool) -> Result<()>;

    /// Reads the current session. Storage failures read as unauthenticated.
    fn get_session(&self) -> Session;

    /// Removes token and profile from both tiers.
    fn clear_session(&self) -> Result<()>;

    /// Replaces only the token (token rotation after an identity change).
    fn replace_token(&self, token: &str) -> Result<()>;

    /// Replaces only the cached profile, keeping the tier it currently lives in.
    fn update_profile(&self, profile: &Profile) -> Result<()>;
}

/// [`SessionStore`] over a durable and an ephemeral [`KeyValueStore`].
///
/// A mutex serializes every read and write so no caller can observe a token
/// from one session next to the profile of another.
pub struct TieredSessionStore {
    durable: Arc<dyn KeyValueStore>,
    ephemeral: Arc<dyn KeyValueStore>,
    guard: Mutex<()>,
}

impl TieredSessionStore {
    pub fn new(durable: Arc<dyn KeyValueStore>, ephemeral: Arc<dyn KeyValueStore>) -> Self {
        Self {
            durable,
            ephemeral,
            guard: Mutex::new(()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ()> {
        self.guard.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Reads the profile blob, preferring the ephemeral tier.
    fn read_profile_blob(&self) -> Result<Option<(String, bool)>> {
        if let Some(blob) = self.ephemeral.get(PROFILE_KEY)? {
            return Ok(Some((blob, false)));
        }
        Ok(self.durable.get(PROFILE_KEY)?.map(|blob| (blob, true)))
    }

    fn parse_profile(blob: &str) -> Option<Profile> {
        match serde_json::from_str::<Profile>(blob) {
            Ok(profile) => Some(profile),
            Err(e) => {
                // Degrade to role-absent instead of failing the read.
                tracing::warn!("[SessionStore] Ignoring unparsable cached profile: {}", e);
                None
            }
        }
    }
}

impl SessionStore for TieredSessionStore {
    fn set_session(&self, token: &str, profile: &Profile, persistent: bool) -> Result<()> {
        let blob = serde_json::to_string(profile)?;
        let _guard = self.lock();

        self.durable.set(TOKEN_KEY, token)?;
        if persistent {
            self.durable.set(PROFILE_KEY, &blob)?;
            self.ephemeral.remove(PROFILE_KEY)?;
        } else {
            self.ephemeral.set(PROFILE_KEY, &blob)?;
            self.durable.remove(PROFILE_KEY)?;
        }

        tracing::info!(
            "[SessionStore] Session stored: user={}, persistent={}",
            profile.id,
            persistent
        );
        Ok(())
    }

    fn get_session(&self) -> Session {
        let _guard = self.lock();

        let token = match self.durable.get(TOKEN_KEY) {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!("[SessionStore] Failed to read token: {}", e);
                return Session::unauthenticated();
            }
        };

        let profile = match self.read_profile_blob() {
            Ok(Some((blob, _))) => Self::parse_profile(&blob),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("[SessionStore] Failed to read profile: {}", e);
                None
            }
        };

        Session { token, profile }
    }

    fn clear_session(&self) -> Result<()> {
        let _guard = self.lock();
        for tier in [&self.durable, &self.ephemeral] {
            tier.remove(TOKEN_KEY)?;
            tier.remove(PROFILE_KEY)?;
        }
        tracing::info!("[SessionStore] Session cleared");
        Ok(())
    }

    fn replace_token(&self, token: &str) -> Result<()> {
        let _guard = self.lock();
        self.durable.set(TOKEN_KEY, token)?;
        tracing::info!("[SessionStore] Token rotated");
        Ok(())
    }

    fn update_profile(&self, profile: &Profile) -> Result<()> {
        let blob = serde_json::to_string(profile)?;
        let _guard = self.lock();
        match self.read_profile_blob()? {
            Some((_, true)) => self.durable.set(PROFILE_KEY, &blob),
            _ => self.ephemeral.set(PROFILE_KEY, &blob),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Role;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MapStore {
        values: Mutex<HashMap<String, String>>,
    }

    impl KeyValueStore for MapStore {
        fn get(&self, key: &str) -> Result<Option<String>> {
            Ok(self.values.lock().unwrap().get(key).cloned())
        }

        fn set(&self, key: &str, value: &str) -> Result<()> {
            self.values
                .lock()
                .unwrap()
                .insert(key.to_string(), value.to_string());
            Ok(())
        }

        fn remove(&self, key: &str) -> Result<()> {
            self.values.lock().unwrap().remove(key);
            Ok(())
        }
    }

    fn fixture() -> (Arc<MapStore>, Arc<MapStore>, TieredSessionStore) {
        let durable = Arc::new(MapStore::default());
        let ephemeral = Arc::new(MapStore::default());
        let store = TieredSessionStore::new(durable.clone(), ephemeral.clone());
        (durable, ephemeral, store)
    }

    fn doctor() -> Profile {
        Profile::new("d1", "Dr. Lan", Some(Role::Doctor))
    }

    #[test]
    fn test_persistent_session_goes_to_durable_tier() {
        let (durable, ephemeral, store) = fixture();
        store.set_session("tok", &doctor(), true).unwrap();

        assert_eq!(durable.get(TOKEN_KEY).unwrap().as_deref(), Some("tok"));
        assert!(durable.get(PROFILE_KEY).unwrap().is_some());
        assert!(ephemeral.get(PROFILE_KEY).unwrap().is_none());

        let session = store.get_session();
        assert!(session.is_authenticated());
        assert_eq!(session.role(), Some(Role::Doctor));
    }

    #[test]
    fn test_non_persistent_profile_goes_to_ephemeral_tier() {
        let (durable, ephemeral, store) = fixture();
        store.set_session("tok", &doctor(), true).unwrap();
        store.set_session("tok2", &doctor(), false).unwrap();

        assert_eq!(durable.get(TOKEN_KEY).unwrap().as_deref(), Some("tok2"));
        assert!(durable.get(PROFILE_KEY).unwrap().is_none());
        assert!(ephemeral.get(PROFILE_KEY).unwrap().is_some());
        assert_eq!(store.get_session().display_name(), Some("Dr. Lan"));
    }

    #[test]
    fn test_clear_removes_both_tiers() {
        let (durable, ephemeral, store) = fixture();
        store.set_session("tok", &doctor(), false).unwrap();
        durable.set(PROFILE_KEY, "{}").unwrap();

        store.clear_session().unwrap();

        assert_eq!(store.get_session(), Session::unauthenticated());
        assert!(durable.get(PROFILE_KEY).unwrap().is_none());
        assert!(ephemeral.get(PROFILE_KEY).unwrap().is_none());
    }

    #[test]
    fn test_malformed_profile_reads_as_role_absent() {
        let (durable, _ephemeral, store) = fixture();
        durable.set(TOKEN_KEY, "tok").unwrap();
        durable.set(PROFILE_KEY, "{not json").unwrap();

        let session = store.get_session();
        assert!(session.is_authenticated());
        assert_eq!(session.profile, None);
        assert_eq!(session.role(), None);
    }

    #[test]
    fn test_token_without_profile_is_still_authenticated() {
        let (durable, _ephemeral, store) = fixture();
        durable.set(TOKEN_KEY, "tok").unwrap();
        assert!(store.get_session().is_authenticated());
    }

    #[test]
    fn test_replace_token_keeps_profile() {
        let (_durable, _ephemeral, store) = fixture();
        store.set_session("old", &doctor(), false).unwrap();
        store.replace_token("new").unwrap();

        let session = store.get_session();
        assert_eq!(session.token.as_deref(), Some("new"));
        assert_eq!(session.role(), Some(Role::Doctor));
    }

    #[test]
    fn test_update_profile_keeps_tier() {
        let (durable, ephemeral, store) = fixture();
        store.set_session("tok", &doctor(), true).unwrap();

        let mut renamed = doctor();
        renamed.display_name = "Dr. Lan Anh".into();
        store.update_profile(&renamed).unwrap();

        assert!(ephemeral.get(PROFILE_KEY).unwrap().is_none());
        assert!(durable.get(PROFILE_KEY).unwrap().unwrap().contains("Lan Anh"));
    }
}
