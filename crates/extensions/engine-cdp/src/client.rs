//! DevTools WebSocket client.
//!
//! One browser-level connection carries every call. Flattened target
//! sessions are addressed with `sessionId`, and their events are routed back
//! to whoever attached them. Browser-level `Target.*` events are routed by
//! target id.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, trace, warn};

use crate::error::CdpError;
use crate::protocol::{BrowserVersion, CdpRequest, CdpResponse};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// Transport-level limit for a single call.
const CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// A protocol event.
#[derive(Debug, Clone)]
pub struct CdpEvent {
    pub method: String,
    pub params: Value,
}

pub type EventSender = mpsc::UnboundedSender<CdpEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<CdpEvent>;

struct PendingRequest {
    tx: oneshot::Sender<Result<Value, CdpError>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Route {
    Session(String),
    Target(String),
}

impl Route {
    /// Where an event belongs: its session, or for browser-level target
    /// events, the target it describes.
    fn of(resp: &CdpResponse) -> Option<Route> {
        if let Some(session_id) = &resp.session_id {
            return Some(Route::Session(session_id.clone()));
        }
        let method = resp.method.as_deref()?;
        if !method.starts_with("Target.") {
            return None;
        }
        let params = resp.params.as_ref()?;
        params["targetInfo"]["targetId"]
            .as_str()
            .or_else(|| params["targetId"].as_str())
            .map(|id| Route::Target(id.to_string()))
    }
}

type Pending = Arc<Mutex<HashMap<u64, PendingRequest>>>;
type Routes = Arc<Mutex<HashMap<Route, EventSender>>>;

/// Browser-level DevTools connection.
pub struct CdpClient {
    browser_ws_url: String,
    ws_tx: tokio::sync::Mutex<WsSink>,
    request_id: AtomicU64,
    pending: Pending,
    routes: Routes,
    closed: Arc<AtomicBool>,
    recv_task: JoinHandle<()>,
}

impl CdpClient {
    /// Discover the browser WebSocket URL from an HTTP debugging endpoint
    /// (e.g. `http://127.0.0.1:9222`) and connect to it.
    pub async fn connect(endpoint: &str) -> Result<Self, CdpError> {
        let http_endpoint = endpoint.trim_end_matches('/');
        let version_url = format!("{}/json/version", http_endpoint);
        debug!("Fetching browser version from {}", version_url);

        let version: BrowserVersion = reqwest::get(&version_url)
            .await
            .map_err(|e| CdpError::BrowserNotAvailable(format!("{}: {}", endpoint, e)))?
            .json()
            .await
            .map_err(|e| CdpError::BrowserNotAvailable(format!("{}: {}", endpoint, e)))?;

        debug!(
            "Found browser {} (protocol {})",
            version.browser, version.protocol_version
        );
        Self::connect_ws(&version.web_socket_debugger_url).await
    }

    /// Connect straight to a browser WebSocket URL.
    pub async fn connect_ws(browser_ws_url: &str) -> Result<Self, CdpError> {
        let url = url::Url::parse(browser_ws_url)?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(CdpError::ConnectionFailed(format!(
                "Not a WebSocket URL: {}",
                browser_ws_url
            )));
        }

        let (ws_stream, _) = tokio_tungstenite::connect_async(browser_ws_url)
            .await
            .map_err(|e| CdpError::ConnectionFailed(format!("WebSocket: {}", e)))?;
        let (ws_sink, ws_source) = ws_stream.split();

        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let routes: Routes = Arc::new(Mutex::new(HashMap::new()));
        let closed = Arc::new(AtomicBool::new(false));

        let recv_task = tokio::spawn(Self::receive_loop(
            ws_source,
            pending.clone(),
            routes.clone(),
            closed.clone(),
        ));

        debug!("DevTools client connected to {}", browser_ws_url);

        Ok(Self {
            browser_ws_url: browser_ws_url.to_string(),
            ws_tx: tokio::sync::Mutex::new(ws_sink),
            request_id: AtomicU64::new(1),
            pending,
            routes,
            closed,
            recv_task,
        })
    }

    async fn receive_loop(mut ws_source: WsSource, pending: Pending, routes: Routes, closed: Arc<AtomicBool>) {
        while let Some(msg) = ws_source.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    trace!("CDP recv: {}", text);
                    match serde_json::from_str::<CdpResponse>(&text) {
                        Ok(resp) => Self::handle_message(resp, &pending, &routes),
                        Err(e) => warn!("Failed to parse CDP message: {}", e),
                    }
                }
                Ok(Message::Close(_)) => {
                    debug!("DevTools socket closed");
                    break;
                }
                Err(e) => {
                    error!("DevTools socket error: {}", e);
                    break;
                }
                _ => {}
            }
        }

        // Order matters: callers check `closed` after registering.
        closed.store(true, Ordering::SeqCst);
        let waiting: Vec<PendingRequest> = pending.lock().drain().map(|(_, req)| req).collect();
        for req in waiting {
            let _ = req.tx.send(Err(CdpError::SessionClosed));
        }
        routes.lock().clear();
    }

    fn handle_message(resp: CdpResponse, pending: &Pending, routes: &Routes) {
        if let Some(id) = resp.id {
            let Some(req) = pending.lock().remove(&id) else {
                trace!("Reply for unknown request {}", id);
                return;
            };
            let result = match resp.error {
                Some(error) => Err(CdpError::Protocol {
                    code: error.code,
                    message: error.message,
                }),
                None => Ok(resp.result.unwrap_or(Value::Null)),
            };
            let _ = req.tx.send(result);
            return;
        }

        let Some(route) = Route::of(&resp) else {
            return;
        };
        let Some(method) = resp.method else {
            return;
        };
        let event = CdpEvent {
            method,
            params: resp.params.unwrap_or(Value::Null),
        };
        let mut routes = routes.lock();
        if let Some(tx) = routes.get(&route) {
            if tx.send(event).is_err() {
                routes.remove(&route);
            }
        }
    }

    /// Send a call and wait for its reply.
    pub async fn call(
        &self,
        method: &str,
        params: Option<Value>,
        session_id: Option<&str>,
    ) -> Result<Value, CdpError> {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);
        let request = CdpRequest {
            id,
            method: method.to_string(),
            params,
            session_id: session_id.map(|s| s.to_string()),
        };
        let json = serde_json::to_string(&request)?;
        trace!("CDP send: {}", json);

        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, PendingRequest { tx });
        if self.is_closed() {
            self.pending.lock().remove(&id);
            return Err(CdpError::SessionClosed);
        }

        {
            let mut ws = self.ws_tx.lock().await;
            if let Err(e) = ws.send(Message::Text(json.into())).await {
                self.pending.lock().remove(&id);
                return Err(e.into());
            }
        }

        match tokio::time::timeout(CALL_TIMEOUT, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(CdpError::SessionClosed),
            Err(_) => {
                self.pending.lock().remove(&id);
                Err(CdpError::Timeout(format!("Request {} timed out", method)))
            }
        }
    }

    /// Whether the browser connection has gone away.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn browser_ws_url(&self) -> &str {
        &self.browser_ws_url
    }

    // ========================================================================
    // Target Management
    // ========================================================================

    /// Ask for `Target.*` lifecycle events on the browser connection.
    pub async fn discover_targets(&self) -> Result<(), CdpError> {
        self.call("Target.setDiscoverTargets", Some(json!({"discover": true})), None)
            .await?;
        Ok(())
    }

    /// Open a new page target in the background and return its id.
    pub async fn create_target(&self, url: &str) -> Result<String, CdpError> {
        let result = self
            .call(
                "Target.createTarget",
                Some(json!({"url": url, "background": true})),
                None,
            )
            .await?;
        let target_id = result["targetId"]
            .as_str()
            .ok_or_else(|| CdpError::InvalidResponse("Missing targetId".to_string()))?
            .to_string();
        debug!("Created target {}", target_id);
        Ok(target_id)
    }

    /// Attach a flattened session to `target_id`. Events of the session go to
    /// `events` when given.
    pub async fn attach(&self, target_id: &str, events: Option<EventSender>) -> Result<String, CdpError> {
        let result = self
            .call(
                "Target.attachToTarget",
                Some(json!({"targetId": target_id, "flatten": true})),
                None,
            )
            .await?;
        let session_id = result["sessionId"]
            .as_str()
            .ok_or_else(|| CdpError::InvalidResponse("Missing sessionId".to_string()))?
            .to_string();

        if let Some(events) = events {
            self.routes
                .lock()
                .insert(Route::Session(session_id.clone()), events);
        }
        debug!("Attached session {} to target {}", session_id, target_id);
        Ok(session_id)
    }

    /// Detach a session. Its event route is dropped even if the browser
    /// rejects the call.
    pub async fn detach(&self, session_id: &str) -> Result<(), CdpError> {
        self.forget_session(session_id);
        self.call(
            "Target.detachFromTarget",
            Some(json!({"sessionId": session_id})),
            None,
        )
        .await?;
        debug!("Detached session {}", session_id);
        Ok(())
    }

    /// Drop a session's event route without a round trip.
    pub fn forget_session(&self, session_id: &str) {
        self.routes
            .lock()
            .remove(&Route::Session(session_id.to_string()));
    }

    /// Route browser-level `Target.*` events about `target_id` to `events`.
    pub fn watch_target(&self, target_id: &str, events: EventSender) {
        self.routes
            .lock()
            .insert(Route::Target(target_id.to_string()), events);
    }

    pub fn unwatch_target(&self, target_id: &str) {
        self.routes
            .lock()
            .remove(&Route::Target(target_id.to_string()));
    }

    /// Bring a target to the foreground.
    pub async fn activate_target(&self, target_id: &str) -> Result<(), CdpError> {
        self.call(
            "Target.activateTarget",
            Some(json!({"targetId": target_id})),
            None,
        )
        .await?;
        Ok(())
    }

    pub async fn close_target(&self, target_id: &str) -> Result<(), CdpError> {
        self.call(
            "Target.closeTarget",
            Some(json!({"targetId": target_id})),
            None,
        )
        .await?;
        Ok(())
    }
}

impl Drop for CdpClient {
    fn drop(&mut self) {
        self.recv_task.abort();
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
