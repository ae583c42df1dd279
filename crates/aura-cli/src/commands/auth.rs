use anyhow::Result;
use aura_application::{AppContext, AuthController};
use aura_core::access::ViewId;
use std::sync::Arc;

fn landed(view: ViewId) {
    match view {
        ViewId::ChooseUsername => {
            println!("✅ Signed in. Pick a display name with `aura set-username <name>`.")
        }
        view => println!("✅ Signed in ({})", view),
    }
}

pub async fn login(ctx: Arc<AppContext>, username: &str, password: &str, remember: bool) -> Result<()> {
    let view = AuthController::new(ctx)
        .login(username, password, remember)
        .await?;
    landed(view);
    Ok(())
}

pub async fn google(ctx: Arc<AppContext>, credential: &str, remember: bool) -> Result<()> {
    landed(AuthController::new(ctx).google_login(credential, remember).await?);
    Ok(())
}

pub async fn facebook(ctx: Arc<AppContext>, access_token: &str, remember: bool) -> Result<()> {
    landed(
        AuthController::new(ctx)
            .facebook_login(access_token, remember)
            .await?,
    );
    Ok(())
}

pub async fn register(
    ctx: Arc<AppContext>,
    username: &str,
    password: &str,
    confirm: &str,
    email: Option<&str>,
) -> Result<()> {
    AuthController::new(ctx)
        .register(username, password, confirm, email)
        .await?;
    println!("✅ Account created. Sign in with `aura login {}`.", username.trim());
    Ok(())
}

pub async fn set_username(ctx: Arc<AppContext>, name: &str) -> Result<()> {
    match AuthController::new(ctx).set_username(name).await? {
        ViewId::Login => anyhow::bail!("Not signed in. Run `aura login` first."),
        _ => println!("✅ Display name set to {}", name.trim()),
    }
    Ok(())
}

pub fn logout(ctx: Arc<AppContext>) {
    AuthController::new(ctx).logout();
    println!("Signed out.");
}

pub fn whoami(ctx: Arc<AppContext>) {
    let session = ctx.session();
    if !session.is_authenticated() {
        println!("Not signed in.");
        return;
    }
    let role = session
        .role()
        .map(|r| r.to_string())
        .unwrap_or_else(|| "unknown role".to_string());
    println!(
        "{} ({}), lands on {}",
        session.display_name().unwrap_or("(no name)"),
        role,
        ctx.router().resolve_entry_view()
    );
}
