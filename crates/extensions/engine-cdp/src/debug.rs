//! Debugging channel: a second flattened session on a tab's target.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::debug;

use tabpilot_protocols::{DebugChannel, EngineError};

use crate::client::CdpClient;
use crate::error::CdpError;

/// Passes method/params through to the browser and results back untouched.
pub struct CdpDebugChannel {
    client: Arc<CdpClient>,
    target_id: String,
    session: Mutex<Option<String>>,
}

impl CdpDebugChannel {
    pub fn new(client: Arc<CdpClient>, target_id: impl Into<String>) -> Self {
        Self {
            client,
            target_id: target_id.into(),
            session: Mutex::new(None),
        }
    }

    pub fn is_attached(&self) -> bool {
        self.session.lock().is_some()
    }

    /// Drop the session locally; the target is going away.
    pub(crate) fn release(&self) {
        if let Some(session_id) = self.session.lock().take() {
            self.client.forget_session(&session_id);
        }
    }
}

/// The browser's own message, unchanged, for protocol errors.
fn channel_error(e: CdpError) -> EngineError {
    match e {
        CdpError::Protocol { message, .. } => EngineError::DebugChannel(message),
        other => EngineError::DebugChannel(other.to_string()),
    }
}

#[async_trait]
impl DebugChannel for CdpDebugChannel {
    async fn attach(&self) -> Result<(), EngineError> {
        if self.is_attached() {
            return Ok(());
        }
        let session_id = self
            .client
            .attach(&self.target_id, None)
            .await
            .map_err(channel_error)?;
        debug!("Debugger attached to target {}", self.target_id);
        *self.session.lock() = Some(session_id);
        Ok(())
    }

    async fn detach(&self) -> Result<(), EngineError> {
        let Some(session_id) = self.session.lock().take() else {
            return Ok(());
        };
        self.client.detach(&session_id).await.map_err(channel_error)
    }

    async fn send_command(&self, method: &str, params: Value) -> Result<Value, EngineError> {
        let session_id = self
            .session
            .lock()
            .clone()
            .ok_or_else(|| EngineError::DebugChannel("Debugger is not attached".to_string()))?;
        let params = (!params.is_null()).then_some(params);
        self.client
            .call(method, params, Some(&session_id))
            .await
            .map_err(channel_error)
    }
}
