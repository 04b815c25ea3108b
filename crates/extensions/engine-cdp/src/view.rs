//! Page view backed by a browser target.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use tabpilot_protocols::{DebugChannel, EngineError, PageView, ViewEvent, ViewEventReceiver};

use crate::client::{CdpClient, CdpEvent, EventReceiver};
use crate::debug::CdpDebugChannel;
use crate::error::CdpError;
use crate::protocol::{
    EvaluateResult, FrameNavigated, LoadingFailed, LoadingFinished, NavigatedWithinDocument,
    RequestWillBeSent, TargetInfoChanged,
};

/// Domains whose events feed the view.
const DOMAINS: [&str; 3] = ["Page.enable", "Runtime.enable", "Network.enable"];

pub struct CdpPageView {
    client: Arc<CdpClient>,
    target_id: String,
    session_id: String,
    events: Mutex<Option<ViewEventReceiver>>,
    translator: Mutex<Option<JoinHandle<()>>>,
    debugger: Arc<CdpDebugChannel>,
    destroyed: AtomicBool,
}

impl CdpPageView {
    /// Attach to an existing page target and start translating its events.
    pub async fn open(client: Arc<CdpClient>, target_id: &str) -> Result<Self, CdpError> {
        let (cdp_tx, cdp_rx) = mpsc::unbounded_channel();
        let session_id = client.attach(target_id, Some(cdp_tx.clone())).await?;
        client.watch_target(target_id, cdp_tx);

        for domain in DOMAINS {
            if let Err(e) = client.call(domain, None, Some(&session_id)).await {
                client.unwatch_target(target_id);
                client.forget_session(&session_id);
                return Err(e);
            }
        }
        debug!("Enabled page domains for session {}", session_id);

        let (view_tx, view_rx) = mpsc::unbounded_channel();
        let translator = tokio::spawn(translate_events(
            EventTranslator::new(target_id),
            cdp_rx,
            view_tx,
        ));

        Ok(Self {
            debugger: Arc::new(CdpDebugChannel::new(client.clone(), target_id)),
            client,
            target_id: target_id.to_string(),
            session_id,
            events: Mutex::new(Some(view_rx)),
            translator: Mutex::new(Some(translator)),
            destroyed: AtomicBool::new(false),
        })
    }

    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    fn ensure_live(&self) -> Result<(), EngineError> {
        if self.destroyed.load(Ordering::SeqCst) {
            return Err(EngineError::ViewGone(self.target_id.clone()));
        }
        Ok(())
    }
}

#[async_trait]
impl PageView for CdpPageView {
    fn subscribe(&self) -> ViewEventReceiver {
        self.events.lock().take().unwrap_or_else(|| {
            warn!("Target {} subscribed twice; second receiver stays empty", self.target_id);
            mpsc::unbounded_channel().1
        })
    }

    async fn load_url(&self, url: &str) -> Result<(), EngineError> {
        self.ensure_live()?;
        let result = self
            .client
            .call("Page.navigate", Some(json!({"url": url})), Some(&self.session_id))
            .await
            .map_err(|e| match e {
                CdpError::Protocol { message, .. } => EngineError::Navigation(message),
                other => other.into(),
            })?;

        match result["errorText"].as_str() {
            Some(error_text) if !error_text.is_empty() => {
                Err(EngineError::Navigation(format!("{}: {}", url, error_text)))
            }
            _ => Ok(()),
        }
    }

    async fn execute_script(&self, code: &str) -> Result<Value, EngineError> {
        self.ensure_live()?;
        let result = self
            .client
            .call(
                "Runtime.evaluate",
                Some(json!({
                    "expression": code,
                    "returnByValue": true,
                    "awaitPromise": true,
                    "userGesture": true,
                })),
                Some(&self.session_id),
            )
            .await
            .map_err(|e| match e {
                CdpError::Protocol { message, .. } => EngineError::ScriptException(message),
                other => other.into(),
            })?;

        let evaluated: EvaluateResult = serde_json::from_value(result)
            .map_err(|e| EngineError::Other(format!("Unexpected evaluate result: {}", e)))?;
        if let Some(details) = evaluated.exception_details {
            return Err(EngineError::ScriptException(details.summary()));
        }
        Ok(evaluated.result.value.unwrap_or(Value::Null))
    }

    /// A shown tab is the activated target. Hiding is implicit: activating
    /// another target puts this one in the background.
    async fn set_visible(&self, visible: bool) -> Result<(), EngineError> {
        self.ensure_live()?;
        if visible {
            self.client.activate_target(&self.target_id).await?;
        }
        Ok(())
    }

    async fn destroy(&self) -> Result<(), EngineError> {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        if let Some(translator) = self.translator.lock().take() {
            translator.abort();
        }
        self.debugger.release();
        self.client.unwatch_target(&self.target_id);
        self.client.forget_session(&self.session_id);
        self.client.close_target(&self.target_id).await?;
        debug!("Closed target {}", self.target_id);
        Ok(())
    }

    fn debugger(&self) -> Arc<dyn DebugChannel> {
        self.debugger.clone()
    }
}

impl Drop for CdpPageView {
    fn drop(&mut self) {
        if let Some(translator) = self.translator.lock().take() {
            translator.abort();
        }
    }
}

async fn translate_events(
    mut translator: EventTranslator,
    mut cdp: EventReceiver,
    view: mpsc::UnboundedSender<ViewEvent>,
) {
    while let Some(event) = cdp.recv().await {
        if let Some(view_event) = translator.translate(&event) {
            if view.send(view_event).is_err() {
                break;
            }
        }
    }
    trace!("Event translation for target {} stopped", translator.main_frame);
}

/// Maps protocol events of one target onto [`ViewEvent`]s.
#[derive(Debug)]
pub(crate) struct EventTranslator {
    /// Chrome gives a page's main frame the target's id.
    main_frame: String,
    title: Option<String>,
    /// Top-level document requests in flight, by request id.
    documents: HashMap<String, String>,
}

impl EventTranslator {
    pub(crate) fn new(target_id: &str) -> Self {
        Self {
            main_frame: target_id.to_string(),
            title: None,
            documents: HashMap::new(),
        }
    }

    pub(crate) fn translate(&mut self, event: &CdpEvent) -> Option<ViewEvent> {
        let params = event.params.clone();
        match event.method.as_str() {
            "Page.frameNavigated" => {
                let navigated: FrameNavigated = parse(event, params)?;
                if navigated.frame.parent_id.is_some() {
                    return None;
                }
                self.main_frame = navigated.frame.id.clone();
                Some(ViewEvent::UrlChanged(navigated.frame.full_url()))
            }
            "Page.navigatedWithinDocument" => {
                let navigated: NavigatedWithinDocument = parse(event, params)?;
                (navigated.frame_id == self.main_frame).then_some(ViewEvent::UrlChanged(navigated.url))
            }
            "Target.targetInfoChanged" => {
                let changed: TargetInfoChanged = parse(event, params)?;
                let title = changed.target_info.title;
                if self.title.as_deref() == Some(title.as_str()) {
                    return None;
                }
                self.title = Some(title.clone());
                Some(ViewEvent::TitleChanged(title))
            }
            "Network.requestWillBeSent" => {
                let request: RequestWillBeSent = parse(event, params)?;
                let is_main_document = request.resource_type.as_deref() == Some("Document")
                    && request.frame_id.as_deref() == Some(self.main_frame.as_str());
                if is_main_document {
                    self.documents.insert(request.request_id, request.request.url);
                }
                None
            }
            "Network.loadingFinished" => {
                let finished: LoadingFinished = parse(event, params)?;
                self.documents.remove(&finished.request_id);
                None
            }
            "Network.loadingFailed" => {
                let failed: LoadingFailed = parse(event, params)?;
                let url = self.documents.remove(&failed.request_id)?;
                if failed.canceled || failed.resource_type.as_deref() != Some("Document") {
                    return None;
                }
                Some(ViewEvent::LoadFailed {
                    url,
                    code: net_error_code(&failed.error_text),
                    description: failed.error_text,
                })
            }
            _ => None,
        }
    }
}

fn parse<T: serde::de::DeserializeOwned>(event: &CdpEvent, params: Value) -> Option<T> {
    match serde_json::from_value(params) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            debug!("Ignoring malformed {} event: {}", event.method, e);
            None
        }
    }
}

/// Chromium net error code for an `errorText` such as
/// `net::ERR_NAME_NOT_RESOLVED`. Unlisted errors report `ERR_FAILED` (-2).
pub(crate) fn net_error_code(error_text: &str) -> i64 {
    let name = error_text.trim().trim_start_matches("net::");
    match name {
        "ERR_FAILED" => -2,
        "ERR_ABORTED" => -3,
        "ERR_TIMED_OUT" => -7,
        "ERR_FILE_NOT_FOUND" => -6,
        "ERR_ACCESS_DENIED" => -10,
        "ERR_BLOCKED_BY_CLIENT" => -20,
        "ERR_BLOCKED_BY_RESPONSE" => -27,
        "ERR_CONNECTION_CLOSED" => -100,
        "ERR_CONNECTION_RESET" => -101,
        "ERR_CONNECTION_REFUSED" => -102,
        "ERR_CONNECTION_ABORTED" => -103,
        "ERR_CONNECTION_FAILED" => -104,
        "ERR_NAME_NOT_RESOLVED" => -105,
        "ERR_INTERNET_DISCONNECTED" => -106,
        "ERR_SSL_PROTOCOL_ERROR" => -107,
        "ERR_ADDRESS_UNREACHABLE" => -109,
        "ERR_CONNECTION_TIMED_OUT" => -118,
        "ERR_CERT_COMMON_NAME_INVALID" => -200,
        "ERR_CERT_DATE_INVALID" => -201,
        "ERR_CERT_AUTHORITY_INVALID" => -202,
        "ERR_INVALID_URL" => -300,
        "ERR_DISALLOWED_URL_SCHEME" => -301,
        "ERR_UNKNOWN_URL_SCHEME" => -302,
        "ERR_TOO_MANY_REDIRECTS" => -310,
        "ERR_EMPTY_RESPONSE" => -324,
        "ERR_HTTP_RESPONSE_CODE_FAILURE" => -379,
        _ => -2,
    }
}

#[cfg(test)]
#[path = "view_tests.rs"]
mod tests;
