//! Key/value storage tiers for the session store.

mod atomic_json;
mod file_kv_store;
mod memory_kv_store;

pub use atomic_json::{AtomicJsonError, AtomicJsonFile};
pub use file_kv_store::FileKeyValueStore;
pub use memory_kv_store::MemoryKeyValueStore;
