use super::redirected;
use anyhow::Result;
use aura_application::{AdminDashboardController, AppContext, ViewUpdate};
use aura_core::admin::ManagedUser;
use std::sync::Arc;

async fn mounted(ctx: Arc<AppContext>) -> Result<AdminDashboardController> {
    AdminDashboardController::mount(ctx).await.map_err(redirected)
}

fn row(user: &ManagedUser) -> String {
    let role = user.role.map(|r| r.to_string()).unwrap_or_default();
    let doctor = user.assigned_doctor_id.as_deref().unwrap_or("-");
    format!(
        "{:<10} {:<20} {:<7} {:<9} doctor: {}",
        user.id, user.display_name, role, user.status, doctor
    )
}

pub async fn users(ctx: Arc<AppContext>) -> Result<()> {
    let admin = mounted(ctx).await?;
    let view = admin.view();
    if let Some(error) = &view.error {
        anyhow::bail!("{}", error);
    }
    println!("{} user(s), {} doctor(s)", view.users.len(), view.doctors.len());
    for user in &view.users {
        println!("  {}", row(user));
    }
    Ok(())
}

pub async fn assign(ctx: Arc<AppContext>, patient_id: &str, doctor_id: &str) -> Result<()> {
    let mut admin = mounted(ctx).await?;
    let receipt = admin.assign_doctor(patient_id, doctor_id).await?;
    println!(
        "✅ {} assigned to {}",
        patient_id,
        receipt.doctor_name.as_deref().unwrap_or(doctor_id)
    );
    Ok(())
}

pub async fn toggle_status(ctx: Arc<AppContext>, user_id: &str) -> Result<()> {
    let mut admin = mounted(ctx).await?;
    let status = admin.toggle_user_status(user_id)?;
    println!("{} -> {} (saving)", user_id, status);

    while let Some(update) = admin.process_next().await {
        if let ViewUpdate::Redirect(view) = update {
            return Err(redirected(view));
        }
    }
    let view = admin.view();
    if let Some(error) = &view.error {
        anyhow::bail!("{}", error);
    }
    if let Some(user) = view.users.iter().find(|u| u.id == user_id) {
        println!("✅ {}", row(user));
    }
    Ok(())
}
