//! Shared dependencies of every view controller.

use crate::poller::PollScope;
use aura_core::access::{AccessRouter, GuardDecision, ViewId};
use aura_core::api::AuraApi;
use aura_core::config::ClientConfig;
use aura_core::error::{AuraError, Result};
use aura_core::session::{Session, SessionStore};
use std::sync::Arc;

/// Dependencies injected into controllers.
///
/// Holds no session state itself: every read goes through the session store.
pub struct AppContext {
    api: Arc<dyn AuraApi>,
    router: Arc<AccessRouter>,
    scope: PollScope,
    config: ClientConfig,
}

impl AppContext {
    /// Any poller that sees the session rejected clears the store through
    /// the scope's expiry hook, before the other pollers are cancelled.
    pub fn new(api: Arc<dyn AuraApi>, store: Arc<dyn SessionStore>, config: ClientConfig) -> Self {
        let router = Arc::new(AccessRouter::new(store));
        let expired = router.clone();
        Self {
            api,
            scope: PollScope::with_expiry_hook(move || {
                clear_session(&expired);
                tracing::info!("[AppContext] Session rejected by the server");
            }),
            router,
            config,
        }
    }

    pub fn api(&self) -> &Arc<dyn AuraApi> {
        &self.api
    }

    pub fn router(&self) -> &AccessRouter {
        &self.router
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        self.router.store()
    }

    pub fn scope(&self) -> &PollScope {
        &self.scope
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> Session {
        self.store().get_session()
    }

    /// Bearer token of the current session.
    pub fn token(&self) -> Result<String> {
        self.session()
            .token
            .filter(|t| !t.is_empty())
            .ok_or(AuraError::SessionExpired)
    }

    /// Guards entry to `view`; `Err` carries the redirect target.
    pub fn enter(&self, view: ViewId) -> std::result::Result<(), ViewId> {
        match self.router.guard(view) {
            GuardDecision::Allow => Ok(()),
            GuardDecision::Redirect(target) => Err(target),
        }
    }

    /// Ends the session after an authentication failure or logout.
    ///
    /// Cancels every poller, clears both storage tiers and returns `Login`.
    pub fn end_session(&self) -> ViewId {
        self.scope.cancel_all();
        clear_session(&self.router);
        tracing::info!("[AppContext] Session ended");
        ViewId::Login
    }

    /// Where a view goes once all of its event sources have ended.
    ///
    /// `None` while the session is still valid.
    pub fn redirect_if_signed_out(&self) -> Option<ViewId> {
        (!self.session().is_authenticated()).then_some(ViewId::Login)
    }
}

fn clear_session(router: &AccessRouter) {
    router.clear_pending_name();
    if let Err(e) = router.store().clear_session() {
        tracing::error!("[AppContext] Failed to clear session: {}", e);
    }
}
