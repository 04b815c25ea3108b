//! In-memory engine for tests.
//!
//! `MockEngine` hands out `MockView`s that record visibility and
//! destruction, evaluate a tiny subset of scripts (`a+b` on integers, JSON
//! literals, `throw ...`) and carry a `MockDebugChannel` that echoes or
//! returns canned results.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use tabpilot_protocols::{
    AutomationStatus, BrowserEngine, DebugChannel, EngineError, PageView, StatusObserver, TabId,
    ViewEvent, ViewEventReceiver,
};

/// Engine that keeps every view it created.
#[derive(Default)]
pub struct MockEngine {
    views: Mutex<Vec<Arc<MockView>>>,
    fail_create: AtomicBool,
    fail_show: AtomicBool,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `create_view` calls fail.
    pub fn fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    /// Views created from now on refuse to be shown.
    pub fn fail_show(&self, fail: bool) {
        self.fail_show.store(fail, Ordering::SeqCst);
    }

    /// Views in creation order (index 0 is the first tab created).
    pub fn views(&self) -> Vec<Arc<MockView>> {
        self.views.lock().clone()
    }

    pub fn view(&self, index: usize) -> Option<Arc<MockView>> {
        self.views.lock().get(index).cloned()
    }

    /// Number of live views currently shown.
    pub fn visible_count(&self) -> usize {
        self.views
            .lock()
            .iter()
            .filter(|v| v.is_visible() && !v.is_destroyed())
            .count()
    }
}

#[async_trait]
impl BrowserEngine for MockEngine {
    fn name(&self) -> &str {
        "mock"
    }

    async fn create_view(&self) -> Result<Arc<dyn PageView>, EngineError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(EngineError::Unavailable("mock engine offline".to_string()));
        }
        let view = Arc::new(MockView::new());
        view.fail_show(self.fail_show.load(Ordering::SeqCst));
        self.views.lock().push(view.clone());
        Ok(view)
    }
}

/// A fake page view.
pub struct MockView {
    visible: AtomicBool,
    destroyed: AtomicBool,
    fail_show: AtomicBool,
    url: Mutex<String>,
    events: Mutex<Option<mpsc::UnboundedSender<ViewEvent>>>,
    debugger: Arc<MockDebugChannel>,
}

impl MockView {
    fn new() -> Self {
        Self {
            visible: AtomicBool::new(false),
            destroyed: AtomicBool::new(false),
            fail_show: AtomicBool::new(false),
            url: Mutex::new("about:blank".to_string()),
            events: Mutex::new(None),
            debugger: Arc::new(MockDebugChannel::default()),
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::SeqCst)
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    /// Make `set_visible(true)` fail.
    pub fn fail_show(&self, fail: bool) {
        self.fail_show.store(fail, Ordering::SeqCst);
    }

    pub fn url(&self) -> String {
        self.url.lock().clone()
    }

    pub fn debug_channel(&self) -> Arc<MockDebugChannel> {
        self.debugger.clone()
    }

    /// Push an engine notification. Returns false once nobody listens.
    pub fn emit(&self, event: ViewEvent) -> bool {
        match self.events.lock().as_ref() {
            Some(tx) => tx.send(event).is_ok(),
            None => false,
        }
    }
}

#[async_trait]
impl PageView for MockView {
    fn subscribe(&self) -> ViewEventReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.events.lock() = Some(tx);
        rx
    }

    async fn load_url(&self, url: &str) -> Result<(), EngineError> {
        if url.starts_with("bad:") {
            return Err(EngineError::Navigation(format!("unsupported scheme: {}", url)));
        }
        *self.url.lock() = url.to_string();
        self.emit(ViewEvent::UrlChanged(url.to_string()));
        Ok(())
    }

    async fn execute_script(&self, code: &str) -> Result<Value, EngineError> {
        if self.is_destroyed() {
            return Err(EngineError::ViewGone("mock view destroyed".to_string()));
        }
        evaluate(code)
    }

    async fn set_visible(&self, visible: bool) -> Result<(), EngineError> {
        if visible && self.fail_show.load(Ordering::SeqCst) {
            return Err(EngineError::Other("compositor busy".to_string()));
        }
        self.visible.store(visible, Ordering::SeqCst);
        Ok(())
    }

    async fn destroy(&self) -> Result<(), EngineError> {
        self.destroyed.store(true, Ordering::SeqCst);
        self.visible.store(false, Ordering::SeqCst);
        self.events.lock().take();
        Ok(())
    }

    fn debugger(&self) -> Arc<dyn DebugChannel> {
        self.debugger.clone()
    }
}

fn evaluate(code: &str) -> Result<Value, EngineError> {
    let code = code.trim().trim_end_matches(';');
    if let Some(rest) = code.strip_prefix("throw ") {
        return Err(EngineError::ScriptException(format!("Uncaught {}", rest)));
    }
    if let Some((a, b)) = code.split_once('+') {
        if let (Ok(a), Ok(b)) = (a.trim().parse::<i64>(), b.trim().parse::<i64>()) {
            return Ok(json!(a + b));
        }
    }
    Ok(serde_json::from_str(code).unwrap_or(Value::Null))
}

/// Debug channel that records attachment and traffic.
#[derive(Default)]
pub struct MockDebugChannel {
    attached: AtomicBool,
    attach_count: AtomicU32,
    detach_count: AtomicU32,
    fail_detach: AtomicBool,
    in_flight: AtomicU32,
    max_in_flight: AtomicU32,
    delay: Mutex<Option<Duration>>,
    attach_delay: Mutex<Option<Duration>>,
    responses: Mutex<HashMap<String, Result<Value, String>>>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl MockDebugChannel {
    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::SeqCst)
    }

    pub fn attach_count(&self) -> u32 {
        self.attach_count.load(Ordering::SeqCst)
    }

    pub fn detach_count(&self) -> u32 {
        self.detach_count.load(Ordering::SeqCst)
    }

    /// Highest number of concurrent `send_command` calls observed.
    pub fn max_in_flight(&self) -> u32 {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn fail_detach(&self, fail: bool) {
        self.fail_detach.store(fail, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    /// Hold every `attach` for `delay` before it completes.
    pub fn set_attach_delay(&self, delay: Duration) {
        *self.attach_delay.lock() = Some(delay);
    }

    /// Canned result for `method`.
    pub fn respond(&self, method: &str, result: Value) {
        self.responses.lock().insert(method.to_string(), Ok(result));
    }

    /// Canned failure for `method`.
    pub fn fail(&self, method: &str, message: &str) {
        self.responses
            .lock()
            .insert(method.to_string(), Err(message.to_string()));
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl DebugChannel for MockDebugChannel {
    async fn attach(&self) -> Result<(), EngineError> {
        self.attach_count.fetch_add(1, Ordering::SeqCst);
        let delay = *self.attach_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.attached.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn detach(&self) -> Result<(), EngineError> {
        self.detach_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_detach.load(Ordering::SeqCst) {
            return Err(EngineError::DebugChannel("detach refused".to_string()));
        }
        self.attached.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn send_command(&self, method: &str, params: Value) -> Result<Value, EngineError> {
        if !self.is_attached() {
            return Err(EngineError::DebugChannel("Debugger is not attached".to_string()));
        }

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        self.calls.lock().push((method.to_string(), params.clone()));
        match self.responses.lock().get(method) {
            Some(Ok(result)) => Ok(result.clone()),
            Some(Err(message)) => Err(EngineError::DebugChannel(message.clone())),
            None => Ok(json!({ "method": method, "echo": params })),
        }
    }
}

/// Observer that records every notification.
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<(TabId, Option<AutomationStatus>)>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<(TabId, Option<AutomationStatus>)> {
        self.events.lock().clone()
    }
}

impl StatusObserver for RecordingObserver {
    fn on_status_changed(&self, tab_id: TabId, status: Option<&AutomationStatus>) {
        self.events.lock().push((tab_id, status.cloned()));
    }
}

/// Poll `condition` until it holds or a second passes.
pub async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
