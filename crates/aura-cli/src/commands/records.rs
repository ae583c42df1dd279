use super::{LiveView, redirected, watch};
use anyhow::Result;
use aura_application::{AnalysisResultController, AppContext, UserDashboardController, ViewUpdate};
use aura_core::record::MedicalRecord;
use std::sync::Arc;

fn summary(record: &MedicalRecord) -> String {
    let when = [record.date.as_deref(), record.time.as_deref()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");
    let result = record.result.as_deref().unwrap_or("-");
    format!("{:<12} {:<16} {:<11} {}", record.id, when, record.status, result)
}

impl LiveView for UserDashboardController {
    async fn next_update(&mut self) -> Option<ViewUpdate> {
        self.process_next().await
    }

    fn print(&self) {
        let view = self.view();
        println!("\n{}: {} record(s)", view.display_name, view.records.len());
        for record in &view.records {
            println!("  {}", summary(record));
        }
        if let Some(severity) = view.latest_severity {
            println!("Latest result: {}", severity);
        }
        if let Some(error) = &view.error {
            println!("⚠️  {}", error);
        }
    }
}

pub async fn history(ctx: Arc<AppContext>) -> Result<()> {
    let mut dashboard = UserDashboardController::mount(ctx).map_err(redirected)?;
    watch(&mut dashboard, None).await?;
    if !dashboard.is_polling() {
        println!("Every analysis has finished.");
    }
    dashboard.unmount();
    Ok(())
}

struct ResultWatch {
    controller: AnalysisResultController,
    annotated: bool,
}

impl LiveView for ResultWatch {
    async fn next_update(&mut self) -> Option<ViewUpdate> {
        let update = self.controller.process_next().await;
        if self.annotated && matches!(update, Some(ViewUpdate::Changed)) {
            // Switches once the annotation exists.
            self.annotated = !self.controller.toggle_image_mode();
        }
        update
    }

    fn print(&self) {
        let view = self.controller.view();
        let Some(record) = &view.record else {
            if let Some(error) = &view.error {
                println!("⚠️  {}", error);
            }
            return;
        };
        println!("\n{}", summary(record));
        if let Some(diagnosis) = &view.diagnosis {
            match diagnosis.confidence {
                Some(confidence) => println!("Diagnosis: {} ({:.2}%)", diagnosis.label, confidence),
                None => println!("Diagnosis: {}", diagnosis.label),
            }
            println!("Severity: {}", view.severity);
        }
        if let Some(advice) = &view.advice {
            println!("{}", advice);
        }
        if let Some(insights) = &view.insights {
            println!("Eye risks:");
            for risk in insights.eye_risks {
                println!("  - {}", risk);
            }
            println!("Systemic risks:");
            for risk in insights.systemic_risks {
                println!("  - {}", risk);
            }
            println!("Prognosis: {}", insights.prognosis);
        }
        if let Some(url) = &view.image_url {
            println!("Image: {}", url);
        }
        if let Some(note) = &record.doctor_note {
            println!("Doctor's note: {}", note);
        }
        if let Some(error) = &view.error {
            println!("⚠️  {}", error);
        }
    }
}

pub async fn result(ctx: Arc<AppContext>, record_id: &str, annotated: bool) -> Result<()> {
    let controller = AnalysisResultController::mount(ctx, record_id).map_err(redirected)?;
    let mut result = ResultWatch {
        controller,
        annotated,
    };
    watch(&mut result, None).await?;
    if result.annotated {
        println!("No annotated image for {}.", record_id);
    }
    result.controller.unmount();
    Ok(())
}
