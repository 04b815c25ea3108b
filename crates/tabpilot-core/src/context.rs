//! The shell context.
//!
//! Owns the registry, status store, debug bridge and dispatcher. Built once
//! at startup and handed to the connection by reference.

use std::sync::Arc;

use tracing::{debug, info, warn};

use tabpilot_protocols::{AnimationFrame, BrowserEngine, CommandError, StatusObserver};

use crate::debug::DebugBridge;
use crate::dispatch::{debug_actions, tab_actions, CommandDispatcher};
use crate::status::AutomationStatusStore;
use crate::tabs::{TabCloseHook, TabRegistry};

/// Construction options for [`ShellContext`].
#[derive(Debug, Clone)]
pub struct ShellOptions {
    /// Whether `newTab` focuses the new tab when the command does not say.
    pub default_focus: bool,
}

impl Default for ShellOptions {
    fn default() -> Self {
        Self {
            default_focus: true,
        }
    }
}

pub struct ShellContext {
    tabs: Arc<TabRegistry>,
    status: Arc<AutomationStatusStore>,
    debug: Arc<DebugBridge>,
    dispatcher: CommandDispatcher,
}

impl ShellContext {
    pub fn new(
        engine: Arc<dyn BrowserEngine>,
        observer: Option<Arc<dyn StatusObserver>>,
        options: ShellOptions,
    ) -> Result<Self, CommandError> {
        let tabs = Arc::new(TabRegistry::new(engine));
        let status = Arc::new(AutomationStatusStore::new(observer));
        let debug = Arc::new(DebugBridge::new(tabs.clone()));

        // Held weakly by the registry; this context keeps them alive.
        let status_hook: Arc<dyn TabCloseHook> = status.clone();
        let debug_hook: Arc<dyn TabCloseHook> = debug.clone();
        tabs.add_close_hook(Arc::downgrade(&status_hook));
        tabs.add_close_hook(Arc::downgrade(&debug_hook));

        let dispatcher = CommandDispatcher::new();
        dispatcher.register_all(tab_actions(tabs.clone(), options.default_focus))?;
        dispatcher.register_all(debug_actions(debug.clone()))?;

        info!(
            "Shell context ready on engine '{}' with actions: {}",
            tabs.engine_name(),
            dispatcher.actions().join(", ")
        );

        Ok(Self {
            tabs,
            status,
            debug,
            dispatcher,
        })
    }

    pub fn tabs(&self) -> &Arc<TabRegistry> {
        &self.tabs
    }

    pub fn status(&self) -> &Arc<AutomationStatusStore> {
        &self.status
    }

    pub fn debug(&self) -> &Arc<DebugBridge> {
        &self.debug
    }

    pub fn dispatcher(&self) -> &CommandDispatcher {
        &self.dispatcher
    }

    /// Apply a status frame. Frames for tabs that do not exist are dropped.
    pub fn apply_status(&self, frame: &AnimationFrame) -> bool {
        if !self.tabs.contains(frame.tab_id) {
            warn!(
                "Dropping {:?} status for unknown tab {}",
                frame.action, frame.tab_id
            );
            return false;
        }
        self.status.apply_frame(frame);

        // A close that ran between the check and the insert has already
        // purged this tab's status; retract the late entry.
        if !self.tabs.contains(frame.tab_id) {
            self.status.clear(frame.tab_id);
            debug!("Tab {} closed while its status was applied", frame.tab_id);
            return false;
        }
        true
    }

    /// No agent is driving any tab any more: release debug sessions and
    /// clear every status.
    pub async fn withdraw_automation(&self) {
        for status in self.status.snapshot() {
            if status.status.is_active() {
                warn!("Automation of tab {} withdrawn while in progress", status.tab_id);
            }
        }

        let detached = self.debug.detach_all().await;
        let cleared = self.status.clear_all();
        if !detached.is_empty() || cleared > 0 {
            info!(
                "Automation withdrawn: debugger detached from tabs {:?}, {} status(es) cleared",
                detached, cleared
            );
        }
    }

    /// Withdraw automation and close every tab.
    pub async fn shutdown(&self) {
        self.withdraw_automation().await;
        self.tabs.close_all().await;
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
