//! Wiring of the tiered session store onto concrete storage.

use crate::storage::{FileKeyValueStore, MemoryKeyValueStore};
use aura_core::error::Result;
use aura_core::session::TieredSessionStore;
use std::path::PathBuf;
use std::sync::Arc;

/// Session store with the durable tier at `path` and a fresh in-memory tier.
pub fn session_store_at(path: PathBuf) -> TieredSessionStore {
    TieredSessionStore::new(
        Arc::new(FileKeyValueStore::new(path)),
        Arc::new(MemoryKeyValueStore::new()),
    )
}

/// Session store at the platform default location.
pub fn default_session_store() -> Result<TieredSessionStore> {
    Ok(session_store_at(crate::paths::AuraPaths::session_file()?))
}
