//! Session domain module.
//!
//! This module contains the authentication session model and the store
//! contract every other component reads it through.
//!
//! # Module Structure
//!
//! - `model`: Session, profile and role types
//! - `store`: Storage tier trait, session store trait and the tiered implementation

pub(crate) mod model;
mod store;

// Re-export public API
pub use model::{Profile, Role, Session};
pub use store::{KeyValueStore, PROFILE_KEY, SessionStore, TOKEN_KEY, TieredSessionStore};
