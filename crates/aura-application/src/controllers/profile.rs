//! Profile view with optimistic edits.

use super::settle;
use crate::context::AppContext;
use aura_core::access::ViewId;
use aura_core::error::{AuraError, ErrorClass, Result};
use aura_core::reconcile::{Observation, Reconciler};
use aura_core::user::{ProfileDetails, ProfileUpdate};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileView {
    pub profile: Option<ProfileDetails>,
    /// Fields edited but not yet saved.
    pub staged: ProfileUpdate,
    /// A saved change the server has not echoed yet.
    pub saving: bool,
    pub error: Option<String>,
}

pub struct ProfileController {
    ctx: Arc<AppContext>,
    profile: Reconciler<ProfileDetails>,
    staged: ProfileUpdate,
    notice: Option<String>,
}

impl ProfileController {
    pub async fn mount(ctx: Arc<AppContext>) -> std::result::Result<Self, ViewId> {
        ctx.enter(ViewId::Profile)?;
        let mut controller = Self {
            profile: Reconciler::with_threshold("me", ctx.config().malformed_threshold),
            ctx,
            staged: ProfileUpdate::default(),
            notice: None,
        };
        match controller.reload().await {
            Err(err) if err.is_auth() => Err(ViewId::Login),
            _ => Ok(controller),
        }
    }

    /// Fetches `GET /users/me` and reconciles it.
    pub async fn reload(&mut self) -> Result<Observation> {
        let token = settle(&self.ctx, self.ctx.token())?;
        let result = settle(&self.ctx, self.ctx.api().me(&token).await);
        match result {
            Ok(details) => {
                let observation = self.profile.observe(details);
                if !matches!(observation, Observation::Discarded { .. }) {
                    self.notice = None;
                }
                Ok(observation)
            }
            Err(err) if err.is_malformed() => {
                self.profile.record_malformed(err.to_string());
                Err(err)
            }
            Err(err) => {
                self.notice = Some(err.user_message());
                Err(err)
            }
        }
    }

    /// Stages one field for the next save.
    pub fn edit(&mut self, field: &str, value: &str) -> Result<()> {
        self.staged
            .set(field, value.trim())
            .map_err(AuraError::validation)
    }

    pub fn discard_edits(&mut self) {
        self.staged = ProfileUpdate::default();
    }

    /// Saves the staged fields.
    ///
    /// The edit renders immediately. A validation rejection rolls it back and
    /// surfaces the server's message; a connectivity failure keeps it on screen.
    pub async fn save(&mut self) -> Result<()> {
        if self.staged.is_empty() {
            return Ok(());
        }
        let token = settle(&self.ctx, self.ctx.token())?;
        let update = std::mem::take(&mut self.staged);
        self.profile.mutate(update.clone());

        let result = settle(
            &self.ctx,
            self.ctx.api().update_profile(&token, &update).await,
        );
        match result {
            Ok(Some(details)) => {
                self.profile.observe(details);
                self.notice = None;
                tracing::info!("[Profile] Saved {} field(s)", update.fields().len());
                Ok(())
            }
            Ok(None) => {
                // No echo; the override stays until a reload reflects it.
                self.notice = None;
                let _ = self.reload().await;
                Ok(())
            }
            Err(err) => {
                match err.class() {
                    ErrorClass::Validation => {
                        tracing::warn!("[Profile] Update rejected: {}", err);
                        self.profile.rollback();
                        // Back into the form so the user can correct it.
                        self.staged = update;
                    }
                    ErrorClass::Auth => {}
                    _ => tracing::warn!("[Profile] Update not confirmed: {}", err),
                }
                self.notice = Some(err.user_message());
                Err(err)
            }
        }
    }

    pub fn view(&self) -> ProfileView {
        ProfileView {
            profile: self.profile.render(),
            staged: self.staged.clone(),
            saving: self.profile.has_pending(),
            error: self
                .profile
                .malformed_error()
                .map(String::from)
                .or_else(|| self.notice.clone()),
        }
    }
}
