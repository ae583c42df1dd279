pub mod admin;
pub mod auth;
pub mod doctor;
pub mod inbox;
pub mod profile;
pub mod records;

use anyhow::{Context, Result, anyhow};
use aura_application::{AppContext, ViewUpdate};
use aura_core::access::ViewId;
use aura_core::config::ClientConfig;
use aura_infrastructure::{ConfigService, default_session_store};
use aura_interaction::HttpAuraApi;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Loads configuration, installs logging and wires the HTTP backend and
/// the session store into a context.
pub fn app_context() -> Result<Arc<AppContext>> {
    let config = ConfigService::new().get_config();
    init_tracing(&config);

    let api = HttpAuraApi::new(&config).context("Failed to create HTTP client")?;
    tracing::debug!("[aura] Backend at {}", api.base_url());
    let store = default_session_store().context("Failed to open session store")?;
    Ok(Arc::new(AppContext::new(
        Arc::new(api),
        Arc::new(store),
        config,
    )))
}

/// `RUST_LOG` wins over the configured level.
fn init_tracing(config: &ClientConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Error for a view the current session may not enter.
pub fn redirected(view: ViewId) -> anyhow::Error {
    match view {
        ViewId::Login => anyhow!("Not signed in. Run `aura login` first."),
        other => anyhow!("Not available for this account (landing view: {})", other),
    }
}

/// A controller the CLI can follow.
pub(crate) trait LiveView {
    async fn next_update(&mut self) -> Option<ViewUpdate>;

    fn print(&self);
}

/// Follows `view` until its sources run dry, `limit` passes or Ctrl-C,
/// printing after every visible change.
pub(crate) async fn watch<V: LiveView>(view: &mut V, limit: Option<Duration>) -> Result<()> {
    let deadline = tokio::time::sleep(limit.unwrap_or(Duration::MAX));
    tokio::pin!(deadline);
    loop {
        let update = tokio::select! {
            update = view.next_update() => update,
            _ = &mut deadline, if limit.is_some() => return Ok(()),
            _ = tokio::signal::ctrl_c() => return Ok(()),
        };
        match update {
            None => return Ok(()),
            Some(ViewUpdate::Redirect(target)) => return Err(redirected(target)),
            Some(ViewUpdate::Changed) => view.print(),
            Some(ViewUpdate::Unchanged) => {}
        }
    }
}
