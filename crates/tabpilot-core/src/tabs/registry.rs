//! TabRegistry: tab creation, visibility transfer, close and scripting.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tracing::{debug, info, warn};

use tabpilot_protocols::{BrowserEngine, DebugChannel, PageView, TabError, TabId, TabInfo};

use super::record::{spawn_event_pump, TabMap, TabRecord};

/// Side tables keyed by tab id implement this to be purged when a tab closes.
///
/// Hooks must not block tab destruction; they are held weakly.
#[async_trait]
pub trait TabCloseHook: Send + Sync {
    async fn on_tab_closed(&self, tab_id: TabId);
}

/// Owns the set of live tabs.
pub struct TabRegistry {
    engine: Arc<dyn BrowserEngine>,
    tabs: Arc<TabMap>,
    next_id: AtomicU64,
    current: Mutex<Option<TabId>>,
    /// Serializes visibility transfers so at most one view is shown.
    visibility: tokio::sync::Mutex<()>,
    close_hooks: RwLock<Vec<Weak<dyn TabCloseHook>>>,
}

impl TabRegistry {
    pub fn new(engine: Arc<dyn BrowserEngine>) -> Self {
        Self {
            engine,
            tabs: Arc::new(RwLock::new(BTreeMap::new())),
            next_id: AtomicU64::new(1),
            current: Mutex::new(None),
            visibility: tokio::sync::Mutex::new(()),
            close_hooks: RwLock::new(Vec::new()),
        }
    }

    /// Register a hook run for every closed tab.
    pub fn add_close_hook(&self, hook: Weak<dyn TabCloseHook>) {
        self.close_hooks.write().push(hook);
    }

    /// Create a tab and start loading `url`.
    ///
    /// Returns once the load is issued. The tab is only shown when `focus`
    /// is set.
    pub async fn create_tab(&self, url: &str, focus: bool) -> Result<TabId, TabError> {
        let view = self.engine.create_view().await?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let events = view.subscribe();

        self.tabs
            .write()
            .insert(id, TabRecord::new(id, view.clone(), url));
        let pump = spawn_event_pump(id, events, Arc::downgrade(&self.tabs));
        match self.tabs.write().get_mut(&id) {
            Some(record) => record.pump = Some(pump),
            None => pump.abort(),
        }

        if let Err(e) = view.load_url(url).await {
            warn!("Tab {} could not start loading {}: {}", id, url, e);
            if let Some(record) = self.tabs.write().get_mut(&id) {
                record.last_error = Some(e.to_string());
            }
        }

        info!("Created tab {}: {}", id, url);

        // The tab exists either way; the caller still needs its id.
        if focus {
            if let Err(e) = self.switch_to(id).await {
                warn!("Tab {} created but could not be shown: {}", id, e);
                if let Some(record) = self.tabs.write().get_mut(&id) {
                    record.last_error = Some(e.to_string());
                }
            }
        }
        Ok(id)
    }

    /// Make `tab_id` the only visible tab.
    pub async fn switch_to(&self, tab_id: TabId) -> Result<(), TabError> {
        let _guard = self.visibility.lock().await;
        self.show_exclusive(tab_id).await
    }

    /// Visibility transfer; caller holds the visibility lock.
    ///
    /// The target is shown before anything is hidden, so a failure leaves
    /// the previous tab visible and current.
    async fn show_exclusive(&self, tab_id: TabId) -> Result<(), TabError> {
        let (target, others) = {
            let tabs = self.tabs.read();
            let target = tabs
                .get(&tab_id)
                .ok_or(TabError::UnknownTab(tab_id))?
                .view
                .clone();
            let others: Vec<(TabId, Arc<dyn PageView>)> = tabs
                .iter()
                .filter(|(id, _)| **id != tab_id)
                .map(|(id, record)| (*id, record.view.clone()))
                .collect();
            (target, others)
        };

        target.set_visible(true).await?;

        // The tab may have been closed while the engine was busy.
        if !self.tabs.read().contains_key(&tab_id) {
            return Err(TabError::UnknownTab(tab_id));
        }
        *self.current.lock() = Some(tab_id);

        for (id, view) in others {
            if let Err(e) = view.set_visible(false).await {
                warn!("Failed to hide tab {}: {}", id, e);
            }
        }
        debug!("Switched to tab {}", tab_id);
        Ok(())
    }

    /// Close a tab, release its view and purge side tables.
    ///
    /// Closing the visible tab shows the lowest remaining id.
    pub async fn close_tab(&self, tab_id: TabId) -> Result<(), TabError> {
        let _guard = self.visibility.lock().await;

        let record = self
            .tabs
            .write()
            .remove(&tab_id)
            .ok_or(TabError::UnknownTab(tab_id))?;

        self.run_close_hooks(tab_id).await;

        if let Err(e) = record.view.set_visible(false).await {
            debug!("Failed to hide closing tab {}: {}", tab_id, e);
        }
        if let Err(e) = record.view.destroy().await {
            warn!("Failed to destroy view of tab {}: {}", tab_id, e);
        }
        drop(record);

        let was_current = {
            let mut current = self.current.lock();
            if *current == Some(tab_id) {
                *current = None;
                true
            } else {
                false
            }
        };

        if was_current {
            let next = self.tabs.read().keys().next().copied();
            if let Some(next) = next {
                if let Err(e) = self.show_exclusive(next).await {
                    warn!("Failed to show tab {} after closing {}: {}", next, tab_id, e);
                }
            }
        }

        info!("Closed tab {}", tab_id);
        Ok(())
    }

    /// Close every tab.
    pub async fn close_all(&self) {
        let ids: Vec<TabId> = self.tabs.read().keys().copied().collect();
        for id in ids {
            if let Err(e) = self.close_tab(id).await {
                debug!("Tab {} already gone: {}", id, e);
            }
        }
    }

    async fn run_close_hooks(&self, tab_id: TabId) {
        let hooks: Vec<Arc<dyn TabCloseHook>> = {
            let mut hooks = self.close_hooks.write();
            hooks.retain(|h| h.strong_count() > 0);
            hooks.iter().filter_map(Weak::upgrade).collect()
        };
        for hook in hooks {
            hook.on_tab_closed(tab_id).await;
        }
    }

    /// Run `code` in the tab's page context.
    pub async fn execute_script(&self, tab_id: TabId, code: &str) -> Result<Value, TabError> {
        let view = self.view(tab_id)?;
        view.execute_script(code)
            .await
            .map_err(|e| TabError::from_script_failure(tab_id, e))
    }

    /// Navigate an existing tab.
    pub async fn navigate(&self, tab_id: TabId, url: &str) -> Result<(), TabError> {
        let view = self.view(tab_id)?;
        view.load_url(url).await?;
        if let Some(record) = self.tabs.write().get_mut(&tab_id) {
            record.url = url.to_string();
            record.last_error = None;
        }
        debug!("Navigated tab {} to {}", tab_id, url);
        Ok(())
    }

    pub fn tab_info(&self, tab_id: TabId) -> Result<TabInfo, TabError> {
        self.tabs
            .read()
            .get(&tab_id)
            .map(TabRecord::info)
            .ok_or(TabError::UnknownTab(tab_id))
    }

    /// All tabs, ordered by id.
    pub fn get_tab_info(&self) -> Vec<TabInfo> {
        self.tabs.read().values().map(TabRecord::info).collect()
    }

    pub fn current_tab_id(&self) -> Option<TabId> {
        *self.current.lock()
    }

    pub fn contains(&self, tab_id: TabId) -> bool {
        self.tabs.read().contains_key(&tab_id)
    }

    pub fn len(&self) -> usize {
        self.tabs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.read().is_empty()
    }

    /// Debugging channel of a tab's view.
    pub fn debugger(&self, tab_id: TabId) -> Option<Arc<dyn DebugChannel>> {
        self.tabs.read().get(&tab_id).map(|r| r.view.debugger())
    }

    fn view(&self, tab_id: TabId) -> Result<Arc<dyn PageView>, TabError> {
        self.tabs
            .read()
            .get(&tab_id)
            .map(|r| r.view.clone())
            .ok_or(TabError::UnknownTab(tab_id))
    }

    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }
}
