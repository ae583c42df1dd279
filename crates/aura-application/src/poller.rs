//! Snapshot poller.
//!
//! A fixed-rate repeating fetch: the fetch function runs once immediately and
//! then on every tick of the interval, regardless of whether earlier fetches
//! have completed. Results are delivered through a channel in arrival order;
//! ordering across overlapping fetches is the reconciler's problem.
//!
//! Every poller is a child of a [`PollScope`]. An authentication failure in
//! any poller cancels the whole scope, so a single 401 silences every poller
//! of the session.

use aura_core::error::{AuraError, Result};
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;

/// What a poller delivers.
#[derive(Debug)]
pub enum PollEvent<S> {
    /// A fetched snapshot. If it was terminal the poller has already stopped.
    Snapshot(S),
    /// A failed fetch; the schedule continues.
    Failed(AuraError),
    /// The server rejected the session. The whole scope has expired.
    SessionExpired,
}

/// Runs when a poller learns that the server rejected the session.
pub type ExpiryHook = Arc<dyn Fn() + Send + Sync>;

/// Session-wide cancellation scope for pollers.
///
/// Cloning shares the scope. After [`PollScope::cancel_all`] the scope
/// starts a new generation, so pollers started by the next login run normally.
#[derive(Clone, Default)]
pub struct PollScope {
    current: Arc<Mutex<CancellationToken>>,
    on_expired: Option<ExpiryHook>,
}

impl std::fmt::Debug for PollScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollScope")
            .field("current", &self.current)
            .field("on_expired", &self.on_expired.is_some())
            .finish()
    }
}

impl PollScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// A scope that runs `hook` before cancelling on session expiry.
    pub fn with_expiry_hook(hook: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            current: Arc::default(),
            on_expired: Some(Arc::new(hook)),
        }
    }

    fn current(&self) -> std::sync::MutexGuard<'_, CancellationToken> {
        self.current.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn child_token(&self) -> CancellationToken {
        self.current().child_token()
    }

    /// Stops every poller started in the current generation.
    pub fn cancel_all(&self) {
        let mut current = self.current();
        current.cancel();
        *current = CancellationToken::new();
        tracing::info!("[SnapshotPoller] All pollers of the session cancelled");
    }

    /// Session expiry: runs the hook, then cancels every poller.
    pub fn expire(&self) {
        if let Some(hook) = &self.on_expired {
            hook();
        }
        self.cancel_all();
    }
}

/// Handle to a running poller.
///
/// Dropping the handle stops the poller.
#[derive(Debug)]
pub struct PollHandle {
    label: String,
    token: CancellationToken,
    gate: Arc<Mutex<()>>,
}

impl PollHandle {
    /// Stops the poller.
    ///
    /// Once this returns the fetch function is not invoked again. Safe to
    /// call any number of times.
    pub fn stop(&self) {
        let _gate = self.gate.lock().unwrap_or_else(|p| p.into_inner());
        if !self.token.is_cancelled() {
            tracing::debug!("[SnapshotPoller] {} stopped", self.label);
        }
        self.token.cancel();
    }

    /// True once stopped, by the caller, a terminal snapshot or session expiry.
    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Starts polling `fetch` every `period`.
///
/// `is_terminal` is evaluated on each successful snapshot; a terminal
/// snapshot stops the schedule before it is delivered.
///
/// Must be called within a tokio runtime.
pub fn start_polling<S, F, Fut, T>(
    scope: &PollScope,
    label: impl Into<String>,
    period: Duration,
    fetch: F,
    is_terminal: T,
) -> (PollHandle, mpsc::UnboundedReceiver<PollEvent<S>>)
where
    S: Send + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<S>> + Send + 'static,
    T: Fn(&S) -> bool + Send + Sync + 'static,
{
    let label = label.into();
    let token = scope.child_token();
    let gate = Arc::new(Mutex::new(()));
    let (tx, rx) = mpsc::unbounded_channel();

    let handle = PollHandle {
        label: label.clone(),
        token: token.clone(),
        gate: gate.clone(),
    };

    let fetch = Arc::new(fetch);
    let is_terminal = Arc::new(is_terminal);
    let scope = scope.clone();
    let period = period.max(Duration::from_millis(1));

    tracing::debug!("[SnapshotPoller] {} started ({:?} interval)", label, period);

    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let pending = {
                let _gate = gate.lock().unwrap_or_else(|p| p.into_inner());
                if token.is_cancelled() {
                    break;
                }
                fetch()
            };
            tracing::debug!("[SnapshotPoller] {} tick", label);

            let token = token.clone();
            let tx = tx.clone();
            let is_terminal = is_terminal.clone();
            let scope = scope.clone();
            let label = label.clone();
            tokio::spawn(async move {
                let result = tokio::select! {
                    biased;
                    _ = token.cancelled() => return,
                    result = pending => result,
                };
                if token.is_cancelled() {
                    return;
                }
                let event = match result {
                    Ok(snapshot) => {
                        if is_terminal(&snapshot) {
                            tracing::debug!("[SnapshotPoller] {} reached a terminal snapshot", label);
                            token.cancel();
                        }
                        PollEvent::Snapshot(snapshot)
                    }
                    Err(err) if err.is_auth() => {
                        tracing::info!("[SnapshotPoller] {} session rejected", label);
                        scope.expire();
                        PollEvent::SessionExpired
                    }
                    Err(err) => {
                        tracing::debug!("[SnapshotPoller] {} fetch failed: {}", label, err);
                        PollEvent::Failed(err)
                    }
                };
                let _ = tx.send(event);
            });
        }
        tracing::debug!("[SnapshotPoller] {} schedule ended", label);
    });

    (handle, rx)
}
