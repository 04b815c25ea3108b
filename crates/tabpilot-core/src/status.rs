//! Per-tab automation status.
//!
//! The store is the single owner of automation state. Every mutation is
//! mirrored to the observer (the overlay) after the store's lock is
//! released, so observers may read the store back.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use tabpilot_protocols::{
    AnimationAction, AnimationFrame, AutomationStatus, StatusKind, StatusObserver, TabId,
};

use crate::tabs::TabCloseHook;

pub struct AutomationStatusStore {
    statuses: RwLock<HashMap<TabId, AutomationStatus>>,
    observer: Option<Arc<dyn StatusObserver>>,
}

impl AutomationStatusStore {
    pub fn new(observer: Option<Arc<dyn StatusObserver>>) -> Self {
        Self {
            statuses: RwLock::new(HashMap::new()),
            observer,
        }
    }

    /// Replace the status of a tab.
    pub fn set_status(
        &self,
        tab_id: TabId,
        status: StatusKind,
        message: Option<String>,
    ) -> AutomationStatus {
        let entry = AutomationStatus::new(tab_id, status, message);
        self.statuses.write().insert(tab_id, entry.clone());
        debug!("Tab {} status: {:?}", tab_id, status);
        self.notify(tab_id, Some(&entry));
        entry
    }

    /// Apply a status frame from the controller.
    ///
    /// `update` without a message keeps the current message.
    pub fn apply_frame(&self, frame: &AnimationFrame) -> AutomationStatus {
        let message = match (frame.action, &frame.message) {
            (AnimationAction::Update, None) => self
                .get_status(frame.tab_id)
                .and_then(|s| s.message),
            (_, message) => message.clone(),
        };
        self.set_status(frame.tab_id, frame.action.status_kind(), message)
    }

    pub fn get_status(&self, tab_id: TabId) -> Option<AutomationStatus> {
        self.statuses.read().get(&tab_id).cloned()
    }

    /// Remove a tab's entry. Returns whether one existed.
    pub fn clear(&self, tab_id: TabId) -> bool {
        let removed = self.statuses.write().remove(&tab_id).is_some();
        if removed {
            debug!("Tab {} status cleared", tab_id);
            self.notify(tab_id, None);
        }
        removed
    }

    /// Remove every entry, notifying once per tab.
    pub fn clear_all(&self) -> usize {
        let drained: Vec<TabId> = self.statuses.write().drain().map(|(id, _)| id).collect();
        for tab_id in &drained {
            self.notify(*tab_id, None);
        }
        drained.len()
    }

    /// All entries, ordered by tab id.
    pub fn snapshot(&self) -> Vec<AutomationStatus> {
        let mut all: Vec<_> = self.statuses.read().values().cloned().collect();
        all.sort_by_key(|s| s.tab_id);
        all
    }

    pub fn len(&self) -> usize {
        self.statuses.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.read().is_empty()
    }

    fn notify(&self, tab_id: TabId, status: Option<&AutomationStatus>) {
        if let Some(observer) = &self.observer {
            observer.on_status_changed(tab_id, status);
        }
    }
}

#[async_trait]
impl TabCloseHook for AutomationStatusStore {
    async fn on_tab_closed(&self, tab_id: TabId) {
        self.clear(tab_id);
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
