//! Analysis result view.

use super::{ViewUpdate, next_event, note_poll_failure};
use crate::context::AppContext;
use crate::poller::{PollEvent, PollHandle, start_polling};
use aura_core::access::ViewId;
use aura_core::reconcile::{Observation, Reconciler, TrackedSnapshot};
use aura_core::record::{
    AnalysisStatus, Diagnosis, ImageMode, MedicalInsights, MedicalRecord, Severity,
};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

/// What the result screen renders.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisView {
    pub record: Option<MedicalRecord>,
    pub diagnosis: Option<Diagnosis>,
    pub severity: Severity,
    /// Guidance for the patient, once the analysis completed.
    pub advice: Option<String>,
    pub insights: Option<MedicalInsights>,
    pub image_mode: ImageMode,
    pub image_url: Option<String>,
    /// False once the record reached a terminal status.
    pub polling: bool,
    pub error: Option<String>,
}

/// Polls one medical record until its analysis finishes.
pub struct AnalysisResultController {
    ctx: Arc<AppContext>,
    record: Reconciler<MedicalRecord>,
    image_mode: ImageMode,
    notice: Option<String>,
    poll: Option<PollHandle>,
    events: Option<UnboundedReceiver<PollEvent<MedicalRecord>>>,
}

impl AnalysisResultController {
    /// Enters the view and starts polling `record_id`.
    ///
    /// `Err` carries the view to redirect to.
    pub fn mount(ctx: Arc<AppContext>, record_id: &str) -> Result<Self, ViewId> {
        ctx.enter(ViewId::AnalysisResult)?;

        let fetch_ctx = ctx.clone();
        let id = record_id.to_string();
        let (handle, events) = start_polling(
            ctx.scope(),
            format!("record {}", record_id),
            ctx.config().record_poll_interval(),
            move || {
                let ctx = fetch_ctx.clone();
                let id = id.clone();
                async move {
                    let token = ctx.token()?;
                    ctx.api().get_record(&token, &id).await
                }
            },
            |record: &MedicalRecord| record.validate().is_ok() && record.is_terminal(),
        );

        Ok(Self {
            record: Reconciler::with_threshold(record_id, ctx.config().malformed_threshold),
            ctx,
            image_mode: ImageMode::default(),
            notice: None,
            poll: Some(handle),
            events: Some(events),
        })
    }

    /// Waits for the next poll event and applies it.
    ///
    /// Returns `None` once polling has ended and no events remain, or a
    /// redirect when it ended because the session expired.
    pub async fn process_next(&mut self) -> Option<ViewUpdate> {
        let Some(event) = next_event(&mut self.events).await else {
            return self.ctx.redirect_if_signed_out().map(ViewUpdate::Redirect);
        };
        Some(self.apply(event))
    }

    fn apply(&mut self, event: PollEvent<MedicalRecord>) -> ViewUpdate {
        match event {
            PollEvent::Snapshot(record) => {
                if record.id != self.record.id() {
                    let reason = format!("expected record {}, got {}", self.record.id(), record.id);
                    return if self.record.record_malformed(reason) {
                        ViewUpdate::Changed
                    } else {
                        ViewUpdate::Unchanged
                    };
                }
                match self.record.observe(record) {
                    Observation::Discarded { surface: true } => ViewUpdate::Changed,
                    Observation::Stale | Observation::Discarded { .. } => ViewUpdate::Unchanged,
                    _ => {
                        self.notice = None;
                        if self.record.is_terminal() {
                            tracing::info!(
                                "[AnalysisResult] {} finished: {:?}",
                                self.record.id(),
                                self.record.server_snapshot().map(|r| r.status)
                            );
                        }
                        ViewUpdate::Changed
                    }
                }
            }
            PollEvent::Failed(err) => {
                let record = &mut self.record;
                note_poll_failure(&err, |reason| record.record_malformed(reason), &mut self.notice)
            }
            PollEvent::SessionExpired => ViewUpdate::Redirect(self.ctx.end_session()),
        }
    }

    /// Switches between the original and the annotated image.
    ///
    /// Returns false, leaving the original image, while no annotation exists.
    pub fn toggle_image_mode(&mut self) -> bool {
        let annotated = self
            .record
            .render()
            .is_some_and(|record| record.has_annotation());
        if !annotated {
            self.image_mode = ImageMode::Original;
            return false;
        }
        self.image_mode = match self.image_mode {
            ImageMode::Original => ImageMode::Annotated,
            ImageMode::Annotated => ImageMode::Original,
        };
        true
    }

    pub fn is_polling(&self) -> bool {
        self.poll.as_ref().is_some_and(|handle| !handle.is_stopped())
    }

    pub fn view(&self) -> AnalysisView {
        let record = self.record.render();
        let diagnosis = record.as_ref().and_then(MedicalRecord::diagnosis);
        let severity = record
            .as_ref()
            .map(MedicalRecord::severity)
            .unwrap_or(Severity::Unknown);
        let image_url = record
            .as_ref()
            .and_then(|r| r.image_for(self.image_mode))
            .map(String::from);
        let completed = diagnosis
            .as_ref()
            .filter(|_| record.as_ref().is_some_and(|r| r.status == AnalysisStatus::Completed));
        let advice = completed
            .map(Severity::advice)
            .filter(|advice| !advice.is_empty());
        let insights = completed.and_then(MedicalInsights::for_diagnosis);
        AnalysisView {
            diagnosis,
            severity,
            advice,
            insights,
            image_mode: self.image_mode,
            image_url,
            polling: self.is_polling(),
            error: self
                .record
                .malformed_error()
                .map(String::from)
                .or_else(|| self.notice.clone()),
            record,
        }
    }

    /// Leaves the view and stops its poller.
    pub fn unmount(&mut self) {
        if let Some(handle) = self.poll.take() {
            handle.stop();
        }
        self.events = None;
    }
}
