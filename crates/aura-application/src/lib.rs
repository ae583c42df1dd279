//! Application layer for AURA.
//!
//! This crate drives the client's screens: a controller per view, built on
//! a fixed-rate snapshot poller whose cancellation is scoped to the session.
//! It depends on `aura-core` only; the HTTP backend and the storage tiers are
//! injected through [`AppContext`].

pub mod context;
pub mod controllers;
pub mod poller;

pub use context::AppContext;
pub use controllers::{
    AdminDashboardController, AnalysisResultController, AuthController, DoctorDashboardController,
    InboxController, ProfileController, UserDashboardController, ViewUpdate,
};
pub use poller::{PollEvent, PollHandle, PollScope, start_polling};
