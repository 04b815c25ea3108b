//! Engine protocol definitions.
//!
//! The page-rendering engine is an external collaborator. The control plane
//! only talks to it through these traits:
//!
//! - **BrowserEngine**: creates page views
//! - **PageView**: one navigable page, with script execution, visibility and
//!   a push-style event subscription
//! - **DebugChannel**: the low-level debugging channel bound to one view

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::EngineError;

/// Events an engine pushes for a view.
///
/// This is the whole translation boundary: engines map their native
/// notifications onto these variants and nothing else leaks through.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    TitleChanged(String),
    UrlChanged(String),
    LoadFailed {
        url: String,
        code: i64,
        description: String,
    },
}

/// Receiving half of a view's event subscription.
pub type ViewEventReceiver = mpsc::UnboundedReceiver<ViewEvent>;

/// Factory for page views.
#[async_trait]
pub trait BrowserEngine: Send + Sync {
    /// Engine name for logs.
    fn name(&self) -> &str;

    /// Instantiate a new, hidden, blank view.
    async fn create_view(&self) -> Result<Arc<dyn PageView>, EngineError>;

    /// Release engine-wide resources.
    async fn shutdown(&self) -> Result<(), EngineError> {
        Ok(())
    }
}

/// A single page view owned by the tab registry.
#[async_trait]
pub trait PageView: Send + Sync {
    /// Subscribe to change notifications. Called once per view, at creation.
    fn subscribe(&self) -> ViewEventReceiver;

    /// Start loading `url`. Returns once the navigation is issued; the load
    /// itself may still be in flight.
    async fn load_url(&self, url: &str) -> Result<(), EngineError>;

    /// Run `code` in the page context and return its serializable completion
    /// value. A throw is reported as [`EngineError::ScriptException`].
    async fn execute_script(&self, code: &str) -> Result<Value, EngineError>;

    /// Attach (show) or detach (hide) the view in the host window.
    async fn set_visible(&self, visible: bool) -> Result<(), EngineError>;

    /// Destroy the view and release its engine handle.
    async fn destroy(&self) -> Result<(), EngineError>;

    /// The debugging channel bound to this view.
    fn debugger(&self) -> Arc<dyn DebugChannel>;
}

/// Low-level debugging channel for one view.
///
/// A channel carries one request at a time; callers serialize access.
#[async_trait]
pub trait DebugChannel: Send + Sync {
    async fn attach(&self) -> Result<(), EngineError>;

    async fn detach(&self) -> Result<(), EngineError>;

    /// Forward an opaque method/params pair and return the opaque result.
    async fn send_command(&self, method: &str, params: Value) -> Result<Value, EngineError>;
}
