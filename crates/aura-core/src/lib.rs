pub mod access;
pub mod admin;
pub mod api;
pub mod chat;
pub mod config;
pub mod error;
pub mod reconcile;
pub mod record;
pub mod roster;
pub mod session;
pub mod user;

// Re-export common error type
pub use error::AuraError;
