//! Tab records and engine event translation.

use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use tabpilot_protocols::{PageView, TabId, TabInfo, ViewEvent, ViewEventReceiver};

pub(super) type TabMap = RwLock<BTreeMap<TabId, TabRecord>>;

/// A live tab.
pub(super) struct TabRecord {
    pub(super) id: TabId,
    pub(super) view: Arc<dyn PageView>,
    pub(super) url: String,
    pub(super) title: Option<String>,
    pub(super) last_error: Option<String>,
    pub(super) pump: Option<JoinHandle<()>>,
}

impl TabRecord {
    pub(super) fn new(id: TabId, view: Arc<dyn PageView>, url: &str) -> Self {
        Self {
            id,
            view,
            url: url.to_string(),
            title: None,
            last_error: None,
            pump: None,
        }
    }

    pub(super) fn info(&self) -> TabInfo {
        TabInfo {
            id: self.id,
            url: self.url.clone(),
            title: self.title.clone(),
            last_error: self.last_error.clone(),
        }
    }

    fn apply(&mut self, event: ViewEvent) {
        match event {
            ViewEvent::TitleChanged(title) => {
                trace!("Tab {} title: {}", self.id, title);
                self.title = (!title.is_empty()).then_some(title);
            }
            ViewEvent::UrlChanged(url) => {
                trace!("Tab {} url: {}", self.id, url);
                self.url = url;
                self.last_error = None;
            }
            ViewEvent::LoadFailed {
                url,
                code,
                description,
            } => {
                warn!("Tab {} failed to load {}: {} ({})", self.id, url, description, code);
                self.last_error = Some(format!("{} ({}) loading {}", description, code, url));
            }
        }
    }
}

impl Drop for TabRecord {
    fn drop(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
    }
}

/// Spawn the task that feeds a view's events into its record.
///
/// Ends when the view drops its sender, the record is removed, or the
/// registry itself is gone.
pub(super) fn spawn_event_pump(
    tab_id: TabId,
    mut events: ViewEventReceiver,
    tabs: Weak<TabMap>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            if !apply_event(&tabs, tab_id, event) {
                break;
            }
        }
        debug!("Event pump for tab {} stopped", tab_id);
    })
}

fn apply_event(tabs: &Weak<TabMap>, tab_id: TabId, event: ViewEvent) -> bool {
    let Some(tabs) = tabs.upgrade() else {
        return false;
    };
    let mut tabs = tabs.write();
    match tabs.get_mut(&tab_id) {
        Some(record) => {
            record.apply(event);
            true
        }
        None => false,
    }
}
