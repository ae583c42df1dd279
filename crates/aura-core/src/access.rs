//! Role-based access routing.
//!
//! Maps the current session to the view a user may enter and guards every
//! navigation attempt. Decisions are computed from a fresh session read each
//! time; nothing here caches an earlier verdict.

use crate::session::{Role, Session, SessionStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Every screen of the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ViewId {
    Login,
    Register,
    ChooseUsername,
    UserDashboard,
    DoctorDashboard,
    AdminDashboard,
    Upload,
    AnalysisResult,
    Inbox,
    Profile,
}

/// Who may enter a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Anyone, signed in or not.
    Public,
    /// Any authenticated user.
    Authenticated,
    /// Authenticated users with exactly this role.
    Role(Role),
}

impl ViewId {
    pub fn access(self) -> Access {
        match self {
            ViewId::Login | ViewId::Register => Access::Public,
            ViewId::DoctorDashboard => Access::Role(Role::Doctor),
            ViewId::AdminDashboard => Access::Role(Role::Admin),
            _ => Access::Authenticated,
        }
    }
}

/// Outcome of a navigation guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect(ViewId),
}

/// Resolves the landing view for a session.
///
/// | token   | role          | view              |
/// |---------|---------------|-------------------|
/// | absent  | any           | `Login`           |
/// | present | `Admin`       | `AdminDashboard`  |
/// | present | `Doctor`      | `DoctorDashboard` |
/// | present | other/absent  | `UserDashboard`   |
pub fn resolve_entry_view(session: &Session) -> ViewId {
    if !session.is_authenticated() {
        return ViewId::Login;
    }
    match session.role() {
        Some(Role::Admin) => ViewId::AdminDashboard,
        Some(Role::Doctor) => ViewId::DoctorDashboard,
        _ => ViewId::UserDashboard,
    }
}

/// Decides whether `view` may be entered with `session`.
///
/// Unauthenticated access to a protected view redirects to `Login`; an
/// authenticated user hitting another role's dashboard is sent to their own
/// entry view.
pub fn guard(view: ViewId, session: &Session) -> GuardDecision {
    match view.access() {
        Access::Public => GuardDecision::Allow,
        _ if !session.is_authenticated() => GuardDecision::Redirect(ViewId::Login),
        Access::Authenticated => GuardDecision::Allow,
        Access::Role(required) if session.role() == Some(required) => GuardDecision::Allow,
        Access::Role(_) => GuardDecision::Redirect(resolve_entry_view(session)),
    }
}

/// Access router bound to a session store.
///
/// Also carries the transient "new user must pick a name" signal raised by a
/// first social login. The signal is not a stored role; it preempts the role
/// table exactly once.
pub struct AccessRouter {
    store: Arc<dyn SessionStore>,
    pending_name: AtomicBool,
}

impl AccessRouter {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            store,
            pending_name: AtomicBool::new(false),
        }
    }

    /// Raises the one-shot username-selection signal.
    pub fn mark_new_user_pending_name(&self) {
        self.pending_name.store(true, Ordering::SeqCst);
    }

    /// Drops the username-selection signal without consuming it through routing.
    pub fn clear_pending_name(&self) {
        self.pending_name.store(false, Ordering::SeqCst);
    }

    pub fn has_pending_name(&self) -> bool {
        self.pending_name.load(Ordering::SeqCst)
    }

    /// Resolves the entry view from a fresh session read.
    pub fn resolve_entry_view(&self) -> ViewId {
        let session = self.store.get_session();
        if session.is_authenticated() && self.pending_name.swap(false, Ordering::SeqCst) {
            tracing::info!("[AccessRouter] New social user, routing to username selection");
            return ViewId::ChooseUsername;
        }
        resolve_entry_view(&session)
    }

    /// Guards a navigation attempt from a fresh session read.
    pub fn guard(&self, view: ViewId) -> GuardDecision {
        let decision = guard(view, &self.store.get_session());
        if let GuardDecision::Redirect(target) = decision {
            tracing::debug!("[AccessRouter] {} denied, redirecting to {}", view, target);
        }
        decision
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }
}
