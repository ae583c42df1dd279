use super::redirected;
use anyhow::{Result, anyhow};
use aura_application::{AppContext, ProfileController};
use aura_core::user::PROFILE_FIELDS;
use std::sync::Arc;

fn print(profile: &ProfileController) {
    let view = profile.view();
    let Some(details) = view.profile else {
        println!("Profile not loaded.");
        return;
    };
    let role = details.role.map(|r| r.to_string()).unwrap_or_default();
    println!("{} {}", details.display_name, role);
    for name in PROFILE_FIELDS {
        let value = details.field(name).unwrap_or_default();
        println!("  {:<13} {}", name, if value.is_empty() { "-" } else { value });
    }
    if view.saving {
        println!("(changes not yet confirmed by the server)");
    }
    if let Some(error) = &view.error {
        println!("⚠️  {}", error);
    }
}

pub async fn show(ctx: Arc<AppContext>) -> Result<()> {
    let profile = ProfileController::mount(ctx).await.map_err(redirected)?;
    print(&profile);
    Ok(())
}

/// Applies `field=value` pairs and saves them in one update.
pub async fn set(ctx: Arc<AppContext>, assignments: &[String]) -> Result<()> {
    let mut profile = ProfileController::mount(ctx).await.map_err(redirected)?;
    for assignment in assignments {
        let (field, value) = assignment
            .split_once('=')
            .ok_or_else(|| anyhow!("Expected field=value, got '{}'", assignment))?;
        profile.edit(field.trim(), value)?;
    }
    let saved = profile.save().await;
    print(&profile);
    saved?;
    Ok(())
}
