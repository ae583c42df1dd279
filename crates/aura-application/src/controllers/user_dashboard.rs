//! Patient dashboard: identity and analysis history.

use super::{ViewUpdate, next_event, note_poll_failure};
use crate::context::AppContext;
use crate::poller::{PollEvent, PollHandle, start_polling};
use aura_core::access::ViewId;
use aura_core::reconcile::{Observation, ReconcilerMap, TrackedSnapshot};
use aura_core::record::{MedicalRecord, Severity};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

#[derive(Debug, Clone, PartialEq)]
pub struct UserDashboardView {
    pub display_name: String,
    /// History in server order.
    pub records: Vec<MedicalRecord>,
    /// Severity of the most recent completed analysis.
    pub latest_severity: Option<Severity>,
    pub polling: bool,
    pub error: Option<String>,
}

/// History is polled while any record is still being analysed.
pub struct UserDashboardController {
    ctx: Arc<AppContext>,
    records: ReconcilerMap<MedicalRecord>,
    notice: Option<String>,
    poll: Option<PollHandle>,
    events: Option<UnboundedReceiver<PollEvent<Vec<MedicalRecord>>>>,
}

impl UserDashboardController {
    pub fn mount(ctx: Arc<AppContext>) -> Result<Self, ViewId> {
        ctx.enter(ViewId::UserDashboard)?;
        let mut controller = Self {
            records: ReconcilerMap::with_threshold(ctx.config().malformed_threshold),
            ctx,
            notice: None,
            poll: None,
            events: None,
        };
        controller.refresh();
        Ok(controller)
    }

    /// Restarts the history poller, e.g. after a new upload.
    pub fn refresh(&mut self) {
        let fetch_ctx = self.ctx.clone();
        let (handle, events) = start_polling(
            self.ctx.scope(),
            "history",
            self.ctx.config().history_poll_interval(),
            move || {
                let ctx = fetch_ctx.clone();
                async move {
                    let token = ctx.token()?;
                    ctx.api().list_records(&token).await
                }
            },
            |records: &Vec<MedicalRecord>| {
                records
                    .iter()
                    .all(|r| r.validate().is_ok() && r.is_terminal())
            },
        );
        // Replacing the handle stops the previous poller.
        self.poll = Some(handle);
        self.events = Some(events);
    }

    pub async fn process_next(&mut self) -> Option<ViewUpdate> {
        let Some(event) = next_event(&mut self.events).await else {
            return self.ctx.redirect_if_signed_out().map(ViewUpdate::Redirect);
        };
        Some(self.apply(event))
    }

    fn apply(&mut self, event: PollEvent<Vec<MedicalRecord>>) -> ViewUpdate {
        match event {
            PollEvent::Snapshot(records) => {
                let outcomes = self.records.observe_all(records);
                self.notice = None;
                let changed = outcomes.iter().any(|(_, outcome)| {
                    !matches!(
                        outcome,
                        Observation::Stale | Observation::Discarded { surface: false }
                    )
                });
                if changed {
                    ViewUpdate::Changed
                } else {
                    ViewUpdate::Unchanged
                }
            }
            PollEvent::Failed(err) => {
                let records = &mut self.records;
                note_poll_failure(&err, |reason| records.record_malformed(reason), &mut self.notice)
            }
            PollEvent::SessionExpired => ViewUpdate::Redirect(self.ctx.end_session()),
        }
    }

    pub fn is_polling(&self) -> bool {
        self.poll.as_ref().is_some_and(|handle| !handle.is_stopped())
    }

    pub fn view(&self) -> UserDashboardView {
        let records = self.records.render_all();
        let latest_severity = records
            .iter()
            .find(|r| r.status.is_terminal() && r.result.is_some())
            .map(MedicalRecord::severity);
        UserDashboardView {
            display_name: self
                .ctx
                .session()
                .display_name()
                .unwrap_or_default()
                .to_string(),
            records,
            latest_severity,
            polling: self.is_polling(),
            error: self
                .records
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
