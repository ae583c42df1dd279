//! View controllers.
//!
//! One controller per screen. A controller guards its entry, starts the
//! pollers its screen needs, folds their events into reconcilers and exposes
//! a plain view struct for rendering. Pollers stop when the controller is
//! unmounted or dropped.
//!
//! # Module Structure
//!
//! - `auth`: Login, registration, social login, username selection, logout
//! - `user_dashboard`: Analysis history of the signed-in patient
//! - `analysis`: A single analysis result, polled until terminal
//! - `inbox`: Conversation list and the active thread, with optimistic sends
//! - `doctor_dashboard`: Patient roster and pending reviews
//! - `admin_dashboard`: User management and doctor assignment
//! - `profile`: Profile details with optimistic edits
//! - `ui`: Presentational toggles

mod admin_dashboard;
mod analysis;
mod auth;
mod doctor_dashboard;
mod inbox;
mod profile;
mod ui;
mod user_dashboard;

pub use admin_dashboard::{AdminDashboardController, AdminDashboardView};
pub use analysis::{AnalysisResultController, AnalysisView};
pub use auth::{AuthController, MIN_USERNAME_CHARS};
pub use doctor_dashboard::{DoctorDashboardController, DoctorDashboardView};
pub use inbox::{InboxController, InboxView};
pub use profile::{ProfileController, ProfileView};
pub use ui::{DoctorTab, DoctorUiState, Toggle};
pub use user_dashboard::{UserDashboardController, UserDashboardView};

use crate::context::AppContext;
use aura_core::access::ViewId;
use aura_core::error::{AuraError, Result};
use tokio::sync::mpsc::UnboundedReceiver;

/// Effect of one processed event on a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewUpdate {
    /// Rendered state changed.
    Changed,
    /// Nothing visible changed (stale snapshot, suppressed echo, ...).
    Unchanged,
    /// The view must be left for another one.
    Redirect(ViewId),
}

/// Waits for the next value of an optional channel.
///
/// Yields `None` for an empty slot, and empties the slot once the channel
/// has closed.
pub(crate) async fn next_event<T>(slot: &mut Option<UnboundedReceiver<T>>) -> Option<T> {
    let event = slot.as_mut()?.recv().await;
    if event.is_none() {
        *slot = None;
    }
    event
}

/// Ends the session when an action was rejected for authentication.
pub(crate) fn settle<T>(ctx: &AppContext, result: Result<T>) -> Result<T> {
    if let Err(err) = &result
        && err.is_auth()
    {
        ctx.end_session();
    }
    result
}

/// Folds a failed poll into the view's inline notice.
///
/// Malformed bodies only count towards the malformed streak; anything else
/// replaces the notice with the user-facing message.
pub(crate) fn note_poll_failure(
    err: &AuraError,
    record_malformed: impl FnOnce(String) -> bool,
    notice: &mut Option<String>,
) -> ViewUpdate {
    if err.is_malformed() {
        return if record_malformed(err.to_string()) {
            ViewUpdate::Changed
        } else {
            ViewUpdate::Unchanged
        };
    }
    let message = err.user_message();
    if notice.as_deref() == Some(message.as_str()) {
        return ViewUpdate::Unchanged;
    }
    *notice = Some(message);
    ViewUpdate::Changed
}
