//! Authentication flows.

use super::settle;
use crate::context::AppContext;
use aura_core::access::ViewId;
use aura_core::api::{Credentials, LoginOutcome, RegisterRequest};
use aura_core::error::{AuraError, Result};
use aura_core::session::Profile;
use std::sync::Arc;

/// Shortest accepted username, in characters.
pub const MIN_USERNAME_CHARS: usize = 3;

/// Drives login, registration, username selection and logout.
///
/// Every successful flow returns the view to navigate to.
pub struct AuthController {
    ctx: Arc<AppContext>,
}

impl AuthController {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        Self { ctx }
    }

    pub async fn login(&self, username: &str, password: &str, remember: bool) -> Result<ViewId> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(AuraError::validation("Please enter your username and password"));
        }
        let outcome = self
            .ctx
            .api()
            .login(&Credentials::new(username, password))
            .await?;
        self.complete_login(outcome, remember)
    }

    pub async fn google_login(&self, credential: &str, remember: bool) -> Result<ViewId> {
        let outcome = self.ctx.api().google_login(credential).await?;
        self.complete_login(outcome, remember)
    }

    pub async fn facebook_login(&self, access_token: &str, remember: bool) -> Result<ViewId> {
        let outcome = self.ctx.api().facebook_login(access_token).await?;
        self.complete_login(outcome, remember)
    }

    fn complete_login(&self, outcome: LoginOutcome, remember: bool) -> Result<ViewId> {
        self.ctx
            .store()
            .set_session(&outcome.token, &outcome.profile, remember)?;
        if outcome.is_new_user {
            self.ctx.router().mark_new_user_pending_name();
        }
        let view = self.ctx.router().resolve_entry_view();
        tracing::info!(
            "[AuthController] Signed in as {} (role {:?}), entering {}",
            outcome.profile.display_name,
            outcome.profile.role,
            view
        );
        Ok(view)
    }

    /// Creates an account. Success leads back to the login view.
    pub async fn register(
        &self,
        username: &str,
        password: &str,
        confirm_password: &str,
        email: Option<&str>,
    ) -> Result<ViewId> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(AuraError::validation("Please enter a username and password"));
        }
        if password != confirm_password {
            return Err(AuraError::validation("Passwords do not match"));
        }
        let request = RegisterRequest {
            username: username.to_string(),
            password: password.to_string(),
            email: email.map(str::trim).filter(|e| !e.is_empty()).map(String::from),
        };
        self.ctx.api().register(&request).await?;
        tracing::info!("[AuthController] Registered {}", username);
        Ok(ViewId::Login)
    }

    /// Picks the display name of a new social account.
    ///
    /// The server answers with a rotated token, which replaces the stored one
    /// before anything else reads the session.
    pub async fn set_username(&self, name: &str) -> Result<ViewId> {
        let Ok(token) = self.ctx.token() else {
            return Ok(ViewId::Login);
        };
        let name = name.trim();
        if name.chars().count() < MIN_USERNAME_CHARS {
            return Err(AuraError::validation(format!(
                "Username must be at least {} characters",
                MIN_USERNAME_CHARS
            )));
        }

        let new_token = settle(&self.ctx, self.ctx.api().set_username(&token, name).await)?;
        let store = self.ctx.store();
        store.replace_token(&new_token)?;

        let mut profile = self
            .ctx
            .session()
            .profile
            .unwrap_or_else(|| Profile::new("", "", None));
        profile.display_name = name.to_string();
        store.update_profile(&profile)?;

        self.ctx.router().clear_pending_name();
        tracing::info!("[AuthController] Username set to {}", name);
        Ok(ViewId::UserDashboard)
    }

    /// Stops every poller and clears the session.
    pub fn logout(&self) -> ViewId {
        self.ctx.end_session()
    }
}
