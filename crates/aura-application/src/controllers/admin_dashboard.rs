//! Admin dashboard: account status and doctor assignment.

use super::{ViewUpdate, settle};
use crate::context::AppContext;
use aura_core::access::ViewId;
use aura_core::admin::{
    AccountStatus, AssignDoctorRequest, AssignmentReceipt, ManagedUser, partition_users,
};
use aura_core::error::{AuraError, ErrorClass, Result};
use aura_core::reconcile::ReconcilerMap;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminDashboardView {
    pub display_name: String,
    /// Every non-admin account.
    pub users: Vec<ManagedUser>,
    /// Accounts a patient can be assigned to.
    pub doctors: Vec<ManagedUser>,
    pub error: Option<String>,
}

#[derive(Debug)]
struct StatusOutcome {
    user_id: String,
    result: Result<()>,
}

/// The user list is loaded on demand, not polled.
pub struct AdminDashboardController {
    ctx: Arc<AppContext>,
    users: ReconcilerMap<ManagedUser>,
    notice: Option<String>,
    status_tx: UnboundedSender<StatusOutcome>,
    status_rx: UnboundedReceiver<StatusOutcome>,
    in_flight: usize,
}

impl AdminDashboardController {
    /// Enters the view and loads the user list.
    ///
    /// A backend that refuses the list (403) sends the user to their own dashboard.
    pub async fn mount(ctx: Arc<AppContext>) -> std::result::Result<Self, ViewId> {
        ctx.enter(ViewId::AdminDashboard)?;
        let (status_tx, status_rx) = mpsc::unbounded_channel();
        let mut controller = Self {
            users: ReconcilerMap::with_threshold(ctx.config().malformed_threshold),
            ctx,
            notice: None,
            status_tx,
            status_rx,
            in_flight: 0,
        };
        match controller.refresh().await {
            ViewUpdate::Redirect(view) => Err(view),
            _ => Ok(controller),
        }
    }

    /// Reloads the user list.
    pub async fn refresh(&mut self) -> ViewUpdate {
        let result = match self.ctx.token() {
            Ok(token) => self.ctx.api().admin_users(&token).await,
            Err(err) => Err(err),
        };
        match result {
            Ok(users) => {
                self.users.observe_all(users);
                self.notice = None;
                ViewUpdate::Changed
            }
            Err(AuraError::Forbidden { detail }) => {
                tracing::warn!("[AdminDashboard] User list refused: {}", detail);
                ViewUpdate::Redirect(ViewId::UserDashboard)
            }
            Err(err) if err.is_auth() => ViewUpdate::Redirect(self.ctx.end_session()),
            Err(err) if err.is_malformed() => {
                if self.users.record_malformed(err.to_string()) {
                    ViewUpdate::Changed
                } else {
                    ViewUpdate::Unchanged
                }
            }
            Err(err) => {
                self.notice = Some(err.user_message());
                ViewUpdate::Changed
            }
        }
    }

    /// Assigns a patient to a doctor, then reloads the list.
    pub async fn assign_doctor(
        &mut self,
        patient_id: &str,
        doctor_id: &str,
    ) -> Result<AssignmentReceipt> {
        if patient_id.trim().is_empty() || doctor_id.trim().is_empty() {
            return Err(AuraError::validation("Please choose a patient and a doctor"));
        }
        let token = settle(&self.ctx, self.ctx.token())?;
        let request = AssignDoctorRequest {
            patient_id: patient_id.to_string(),
            doctor_id: doctor_id.to_string(),
        };
        let receipt = settle(
            &self.ctx,
            self.ctx.api().assign_doctor(&token, &request).await,
        )
        .inspect_err(|err| self.notice = Some(err.user_message()))?;

        tracing::info!(
            "[AdminDashboard] Patient {} assigned to {}",
            patient_id,
            receipt.doctor_name.as_deref().unwrap_or(doctor_id)
        );
        self.refresh().await;
        Ok(receipt)
    }

    /// Flips a user between ACTIVE and INACTIVE.
    ///
    /// The new status renders at once; the request completes in the
    /// background and is folded in by [`Self::process_next`].
    pub fn toggle_user_status(&mut self, user_id: &str) -> Result<AccountStatus> {
        let current = self
            .users
            .render(user_id)
            .ok_or_else(|| AuraError::not_found("user", user_id))?;
        let token = settle(&self.ctx, self.ctx.token())?;
        let status = current.status.toggled();
        self.users.mutate(user_id, status);

        let api = self.ctx.api().clone();
        let tx = self.status_tx.clone();
        let user_id = user_id.to_string();
        self.in_flight += 1;
        tokio::spawn(async move {
            let result = api.set_user_status(&token, &user_id, status).await;
            let _ = tx.send(StatusOutcome { user_id, result });
        });
        Ok(status)
    }

    /// Waits for the next status change outcome.
    ///
    /// Returns `None` when nothing is in flight.
    pub async fn process_next(&mut self) -> Option<ViewUpdate> {
        if self.in_flight == 0 {
            return None;
        }
        let StatusOutcome { user_id, result } = self.status_rx.recv().await?;
        self.in_flight -= 1;

        Some(match result {
            Ok(()) => self.refresh().await,
            Err(err) => match err.class() {
                ErrorClass::Auth => ViewUpdate::Redirect(self.ctx.end_session()),
                ErrorClass::Validation => {
                    tracing::warn!("[AdminDashboard] Status change of {} rejected: {}", user_id, err);
                    self.users.rollback(&user_id);
                    self.notice = Some(err.user_message());
                    ViewUpdate::Changed
                }
                _ => {
                    self.notice = Some(err.user_message());
                    ViewUpdate::Changed
                }
            },
        })
    }

    pub fn view(&self) -> AdminDashboardView {
        let (users, doctors) = partition_users(&self.users.render_all());
        AdminDashboardView {
            display_name: self
                .ctx
                .session()
                .display_name()
                .unwrap_or_default()
                .to_string(),
            users,
            doctors,
            error: self
                .users
                .malformed_error()
                .map(String::from)
                .or_else(|| self.notice.clone()),
        }
    }
}
