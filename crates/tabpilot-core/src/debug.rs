//! Per-tab debugging sessions.
//!
//! A session is attached lazily on the first command for a tab and stays
//! attached until the tab closes or automation is withdrawn. Commands for
//! the same tab run one at a time in arrival order; different tabs proceed
//! independently.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, info, warn};

use tabpilot_protocols::{DebugChannel, DebugError, TabId};

use crate::tabs::{TabCloseHook, TabRegistry};

struct DebugSession {
    channel: Arc<dyn DebugChannel>,
    attached: AtomicBool,
    /// Serializes commands (and attachment) for one tab.
    lane: tokio::sync::Mutex<()>,
}

impl DebugSession {
    fn new(channel: Arc<dyn DebugChannel>) -> Self {
        Self {
            channel,
            attached: AtomicBool::new(false),
            lane: tokio::sync::Mutex::new(()),
        }
    }
}

pub struct DebugBridge {
    tabs: Arc<TabRegistry>,
    sessions: Mutex<HashMap<TabId, Arc<DebugSession>>>,
}

impl DebugBridge {
    pub fn new(tabs: Arc<TabRegistry>) -> Self {
        Self {
            tabs,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    fn session(&self, tab_id: TabId) -> Result<Arc<DebugSession>, DebugError> {
        let mut sessions = self.sessions.lock();
        if let Some(session) = sessions.get(&tab_id) {
            return Ok(session.clone());
        }
        let channel = self
            .tabs
            .debugger(tab_id)
            .ok_or(DebugError::UnknownTab(tab_id))?;
        let session = Arc::new(DebugSession::new(channel));
        sessions.insert(tab_id, session.clone());
        Ok(session)
    }

    /// Attach if needed. Caller holds the session lane.
    async fn ensure_attached(&self, tab_id: TabId, session: &Arc<DebugSession>) -> Result<(), DebugError> {
        if session.attached.load(Ordering::SeqCst) {
            return Ok(());
        }

        session
            .channel
            .attach()
            .await
            .map_err(|e| DebugError::Channel(e.to_string()))?;
        session.attached.store(true, Ordering::SeqCst);

        // The session may have been dropped during attach, either because
        // the tab closed or because automation was withdrawn.
        let still_registered = self
            .sessions
            .lock()
            .get(&tab_id)
            .is_some_and(|s| Arc::ptr_eq(s, session));
        if !still_registered {
            session.attached.store(false, Ordering::SeqCst);
            if let Err(e) = session.channel.detach().await {
                debug!("Detach after tab {} closed mid-attach failed: {}", tab_id, e);
            }
            return Err(if self.tabs.contains(tab_id) {
                DebugError::SessionWithdrawn(tab_id)
            } else {
                DebugError::UnknownTab(tab_id)
            });
        }

        info!("Debugger attached to tab {}", tab_id);
        Ok(())
    }

    /// Send a debugging-protocol command to a tab and return its raw result.
    pub async fn send(&self, tab_id: TabId, method: &str, params: Value) -> Result<Value, DebugError> {
        let session = self.session(tab_id)?;
        let _lane = session.lane.lock().await;

        self.ensure_attached(tab_id, &session).await?;

        debug!("Tab {} debug command: {}", tab_id, method);
        session
            .channel
            .send_command(method, params)
            .await
            .map_err(|e| DebugError::Channel(e.to_string()))
    }

    /// Detach a tab's session. Returns whether one was attached.
    ///
    /// The session is forgotten even when the engine refuses to detach.
    pub async fn detach(&self, tab_id: TabId) -> bool {
        let Some(session) = self.sessions.lock().remove(&tab_id) else {
            return false;
        };
        if !session.attached.swap(false, Ordering::SeqCst) {
            return false;
        }

        match session.channel.detach().await {
            Ok(()) => info!("Debugger detached from tab {}", tab_id),
            Err(e) => warn!("Failed to detach debugger from tab {}: {}", tab_id, e),
        }
        true
    }

    /// Detach every session. Returns the tabs that were attached, ascending.
    pub async fn detach_all(&self) -> Vec<TabId> {
        let mut ids: Vec<TabId> = self.sessions.lock().keys().copied().collect();
        ids.sort_unstable();
        let mut detached = Vec::new();
        for tab_id in ids {
            if self.detach(tab_id).await {
                detached.push(tab_id);
            }
        }
        detached
    }

    pub fn is_attached(&self, tab_id: TabId) -> bool {
        self.sessions
            .lock()
            .get(&tab_id)
            .is_some_and(|s| s.attached.load(Ordering::SeqCst))
    }
}

#[async_trait]
impl TabCloseHook for DebugBridge {
    async fn on_tab_closed(&self, tab_id: TabId) {
        self.detach(tab_id).await;
    }
}

#[cfg(test)]
#[path = "debug_tests.rs"]
mod tests;
