use super::redirected;
use anyhow::Result;
use aura_application::{AppContext, DoctorDashboardController, ViewUpdate};
use std::sync::Arc;

/// Prints the roster once the first snapshot arrives.
pub async fn patients(ctx: Arc<AppContext>, reviews_only: bool) -> Result<()> {
    let mut dashboard = DoctorDashboardController::mount(ctx).map_err(redirected)?;
    loop {
        match dashboard.process_next().await {
            Some(ViewUpdate::Redirect(view)) => return Err(redirected(view)),
            Some(ViewUpdate::Changed) | None => break,
            Some(ViewUpdate::Unchanged) => {}
        }
    }
    dashboard.unmount();

    let view = dashboard.view();
    if let Some(error) = &view.error {
        anyhow::bail!("{}", error);
    }
    if reviews_only {
        println!("{} scan(s) waiting for review", view.pending_reviews.len());
        for review in &view.pending_reviews {
            println!(
                "  {:<12} {:<20} {:<12} {}",
                review.record_id, review.patient_name, review.date, review.ai_result
            );
        }
        return Ok(());
    }
    println!("Dr. {}: {} patient(s)", view.display_name, view.patients.len());
    for patient in &view.patients {
        let scan = &patient.latest_scan;
        println!(
            "  {:<10} {:<20} {:<10} {:<12} {}",
            patient.id, patient.display_name, scan.ai_status, scan.date, scan.result
        );
    }
    Ok(())
}
