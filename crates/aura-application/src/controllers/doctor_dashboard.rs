//! Doctor dashboard.

use super::ui::{DoctorTab, DoctorUiState};
use super::{ViewUpdate, next_event, note_poll_failure};
use crate::context::AppContext;
use crate::poller::{PollEvent, PollHandle, start_polling};
use aura_core::access::ViewId;
use aura_core::reconcile::{Observation, Reconciler};
use aura_core::roster::{PatientRoster, PatientSummary, PendingReview};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoctorDashboardView {
    pub display_name: String,
    pub patients: Vec<PatientSummary>,
    pub pending_reviews: Vec<PendingReview>,
    pub ui: DoctorUiState,
    pub error: Option<String>,
}

pub struct DoctorDashboardController {
    ctx: Arc<AppContext>,
    roster: Reconciler<PatientRoster>,
    ui: DoctorUiState,
    notice: Option<String>,
    poll: Option<PollHandle>,
    events: Option<UnboundedReceiver<PollEvent<PatientRoster>>>,
}

impl DoctorDashboardController {
    pub fn mount(ctx: Arc<AppContext>) -> Result<Self, ViewId> {
        ctx.enter(ViewId::DoctorDashboard)?;

        let fetch_ctx = ctx.clone();
        let (handle, events) = start_polling(
            ctx.scope(),
            "roster",
            ctx.config().roster_poll_interval(),
            move || {
                let ctx = fetch_ctx.clone();
                async move {
                    let token = ctx.token()?;
                    ctx.api().my_patients(&token).await
                }
            },
            |_| false,
        );

        Ok(Self {
            roster: Reconciler::with_threshold(PatientRoster::ID, ctx.config().malformed_threshold),
            ctx,
            ui: DoctorUiState::default(),
            notice: None,
            poll: Some(handle),
            events: Some(events),
        })
    }

    pub async fn process_next(&mut self) -> Option<ViewUpdate> {
        let Some(event) = next_event(&mut self.events).await else {
            return self.ctx.redirect_if_signed_out().map(ViewUpdate::Redirect);
        };
        Some(match event {
            PollEvent::Snapshot(roster) => match self.roster.observe(roster) {
                Observation::Discarded { surface: false } => ViewUpdate::Unchanged,
                _ => {
                    self.notice = None;
                    ViewUpdate::Changed
                }
            },
            PollEvent::Failed(err) => {
                let roster = &mut self.roster;
                note_poll_failure(&err, |reason| roster.record_malformed(reason), &mut self.notice)
            }
            PollEvent::SessionExpired => ViewUpdate::Redirect(self.ctx.end_session()),
        })
    }

    pub fn select_tab(&mut self, tab: DoctorTab) {
        self.ui.select_tab(tab);
    }

    pub fn toggle_user_menu(&mut self) {
        self.ui.user_menu.toggle();
    }

    pub fn toggle_fab_menu(&mut self) {
        self.ui.fab_menu.toggle();
    }

    pub fn toggle_notifications(&mut self) {
        self.ui.notifications.toggle();
    }

    pub fn view(&self) -> DoctorDashboardView {
        let roster = self.roster.render().unwrap_or_default();
        DoctorDashboardView {
            display_name: self
                .ctx
                .session()
                .display_name()
                .unwrap_or_default()
                .to_string(),
            pending_reviews: roster.pending_reviews(),
            patients: roster.patients,
            ui: self.ui,
            error: self
                .roster
                .malformed_error()
                .map(String::from)
                .or_else(|| self.notice.clone()),
        }
    }

    pub fn unmount(&mut self) {
        if let Some(handle) = self.poll.take() {
            handle.stop();
        }
        self.events = None;
    }
}
