//! The remote controller connection.
//!
//! One instance per process. Drives the `disconnected -> connecting ->
//! connected` state machine, applies the reconnect policy after abnormal
//! closures and withdraws all automation whenever the link goes away.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use tabpilot_config::ConnectionConfig;
use tabpilot_core::ShellContext;
use tabpilot_protocols::ConnectionError;

use crate::policy::ReconnectPolicy;
use crate::session::Session;
use crate::state::{CloseReason, ConnectionState};

/// How long an explicit disconnect waits for the close frame to go out.
const CLOSE_GRACE: Duration = Duration::from_secs(2);

struct ActiveSession {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Mutable lifecycle bookkeeping. State transitions happen under this lock
/// so that a stale session can never overwrite a newer one's state.
#[derive(Default)]
struct Lifecycle {
    /// Bumped for every session start and every explicit disconnect.
    generation: u64,
    token: Option<String>,
    session: Option<ActiveSession>,
    reconnect: Option<JoinHandle<()>>,
}

pub struct RemoteConnection {
    config: ConnectionConfig,
    policy: ReconnectPolicy,
    ctx: Arc<ShellContext>,
    state: watch::Sender<ConnectionState>,
    lifecycle: Mutex<Lifecycle>,
    attempts: AtomicU32,
    user_id: Mutex<Option<String>>,
}

impl RemoteConnection {
    pub fn new(config: ConnectionConfig, ctx: Arc<ShellContext>) -> Arc<Self> {
        let policy = ReconnectPolicy::from(&config.reconnect);
        Self::with_policy(config, policy, ctx)
    }

    pub fn with_policy(
        config: ConnectionConfig,
        policy: ReconnectPolicy,
        ctx: Arc<ShellContext>,
    ) -> Arc<Self> {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Arc::new(Self {
            config,
            policy,
            ctx,
            state,
            lifecycle: Mutex::new(Lifecycle::default()),
            attempts: AtomicU32::new(0),
            user_id: Mutex::new(None),
        })
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Observe state transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Reconnect attempts since the last successful registration or
    /// explicit connect.
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn reconnect_pending(&self) -> bool {
        self.lifecycle
            .lock()
            .reconnect
            .as_ref()
            .is_some_and(|timer| !timer.is_finished())
    }

    pub fn has_credential(&self) -> bool {
        self.lifecycle.lock().token.is_some()
    }

    /// Identity assigned by the controller on registration.
    pub fn user_id(&self) -> Option<String> {
        self.user_id.lock().clone()
    }

    pub fn context(&self) -> &Arc<ShellContext> {
        &self.ctx
    }

    /// Connect with `token`, or disconnect when there is none.
    ///
    /// A no-op while already connecting or connected. Cancels any pending
    /// reconnect timer.
    pub async fn connect(self: &Arc<Self>, token: Option<String>) {
        let Some(token) = token else {
            info!("No credential available, staying disconnected");
            self.disconnect().await;
            return;
        };

        let mut lifecycle = self.lifecycle.lock();
        if self.state().is_active() {
            debug!("Connect ignored: already {}", self.state());
            return;
        }
        if let Some(timer) = lifecycle.reconnect.take() {
            timer.abort();
        }
        lifecycle.token = Some(token.clone());
        self.attempts.store(0, Ordering::SeqCst);
        self.start_locked(&mut lifecycle, token);
    }

    fn start_locked(self: &Arc<Self>, lifecycle: &mut Lifecycle, token: String) {
        lifecycle.generation += 1;
        let generation = lifecycle.generation;
        let cancel = CancellationToken::new();
        self.state.send_replace(ConnectionState::Connecting);

        let this = Arc::clone(self);
        let session_cancel = cancel.clone();
        let task = tokio::spawn(async move {
            let reason = this.run(generation, token, session_cancel).await;
            this.handle_closed(generation, reason).await;
        });
        lifecycle.session = Some(ActiveSession { cancel, task });
    }

    async fn run(&self, generation: u64, token: String, cancel: CancellationToken) -> CloseReason {
        info!("Connecting to {}", self.config.endpoint);
        let connect = tokio::time::timeout(
            self.config.connect_timeout(),
            tokio_tungstenite::connect_async(self.config.endpoint.as_str()),
        );

        let ws = tokio::select! {
            _ = cancel.cancelled() => return CloseReason::Cancelled,
            result = connect => match result {
                Err(_) => {
                    return CloseReason::Failed(ConnectionError::Timeout(
                        self.config.connect_timeout_secs,
                    ));
                }
                Ok(Err(e)) => {
                    return CloseReason::Failed(ConnectionError::ConnectionFailed(e.to_string()));
                }
                Ok(Ok((ws, _response))) => ws,
            },
        };

        if !self.transition(generation, ConnectionState::Connected) {
            return CloseReason::Cancelled;
        }
        info!("Connected to {}", self.config.endpoint);

        let session = Session {
            ctx: self.ctx.clone(),
            token,
            heartbeat: self.config.heartbeat_interval(),
        };
        session
            .run(ws, cancel, |user_id| self.on_registered(user_id))
            .await
    }

    /// Set the state if `generation` is still the live one.
    fn transition(&self, generation: u64, state: ConnectionState) -> bool {
        let lifecycle = self.lifecycle.lock();
        if lifecycle.generation != generation {
            return false;
        }
        self.state.send_replace(state);
        true
    }

    fn on_registered(&self, user_id: Option<String>) {
        self.attempts.store(0, Ordering::SeqCst);
        info!(
            "Registered with controller as {}",
            user_id.as_deref().unwrap_or("<unknown>")
        );
        *self.user_id.lock() = user_id;
    }

    /// React to the end of session `generation`.
    async fn handle_closed(self: &Arc<Self>, generation: u64, reason: CloseReason) {
        {
            let mut lifecycle = self.lifecycle.lock();
            if lifecycle.generation != generation {
                debug!("Stale session ended: {}", reason);
                return;
            }
            lifecycle.session = None;
        }
        *self.user_id.lock() = None;

        debug!("Session {} ended: {}", generation, reason);
        if matches!(reason, CloseReason::Cancelled) {
            return;
        }

        let Some(error) = reason.into_error() else {
            info!("Connection closed normally");
            self.ctx.withdraw_automation().await;
            self.transition(generation, ConnectionState::Disconnected);
            return;
        };

        if !error.is_retryable() {
            warn!(
                "{}; reconnection suspended until a new credential is supplied",
                error
            );
            self.transition(generation, ConnectionState::Error);
            self.ctx.withdraw_automation().await;
            let mut lifecycle = self.lifecycle.lock();
            if lifecycle.generation == generation {
                lifecycle.token = None;
                self.state.send_replace(ConnectionState::Disconnected);
            }
            return;
        }

        warn!("Connection lost: {}", error);
        self.transition(generation, ConnectionState::Error);
        self.ctx.withdraw_automation().await;
        if self.transition(generation, ConnectionState::Disconnected) {
            self.schedule_reconnect(generation);
        }
    }

    /// Arm the single reconnect timer.
    fn schedule_reconnect(self: &Arc<Self>, generation: u64) {
        let mut lifecycle = self.lifecycle.lock();
        if lifecycle.generation != generation || lifecycle.token.is_none() {
            return;
        }
        if lifecycle.reconnect.as_ref().is_some_and(|t| !t.is_finished()) {
            debug!("Reconnect already scheduled");
            return;
        }

        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        let Some(delay) = self.policy.delay_for_attempt(attempt) else {
            warn!("Giving up after {} reconnect attempts", attempt);
            return;
        };
        info!("Reconnecting in {:?} (attempt {})", delay, attempt + 1);

        let this = Arc::clone(self);
        lifecycle.reconnect = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            this.fire_reconnect(generation);
        }));
    }

    fn fire_reconnect(self: &Arc<Self>, generation: u64) {
        let mut lifecycle = self.lifecycle.lock();
        lifecycle.reconnect = None;
        if lifecycle.generation != generation || self.state().is_active() {
            return;
        }
        let Some(token) = lifecycle.token.clone() else {
            return;
        };
        self.start_locked(&mut lifecycle, token);
    }

    /// Close with the normal code, cancel any pending reconnect, detach every
    /// debug session and clear every status.
    pub async fn disconnect(&self) {
        let session = {
            let mut lifecycle = self.lifecycle.lock();
            lifecycle.generation += 1;
            if let Some(timer) = lifecycle.reconnect.take() {
                timer.abort();
            }
            lifecycle.session.take()
        };

        if let Some(session) = session {
            session.cancel.cancel();
            if tokio::time::timeout(CLOSE_GRACE, session.task).await.is_err() {
                debug!("Session did not finish closing within {:?}", CLOSE_GRACE);
            }
        }

        self.ctx.withdraw_automation().await;
        *self.user_id.lock() = None;
        self.state.send_replace(ConnectionState::Disconnected);
        info!("Disconnected");
    }
}

#[cfg(test)]
#[path = "connection_tests.rs"]
mod tests;
