//! DevTools transport errors.

use thiserror::Error;

use tabpilot_protocols::EngineError;

#[derive(Debug, Error)]
pub enum CdpError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Nothing is listening with remote debugging enabled.
    #[error("Browser not available at {0}. Start it with: chrome --remote-debugging-port=9222")]
    BrowserNotAvailable(String),

    #[error("No Chromium-based browser found on this system")]
    BrowserNotFound,

    #[error("Browser launch failed: {0}")]
    LaunchFailed(String),

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Error object returned by the browser for a call.
    #[error("{message} (code: {code})")]
    Protocol { code: i64, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    /// The browser connection is gone.
    #[error("Session closed")]
    SessionClosed,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for CdpError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        CdpError::WebSocket(e.to_string())
    }
}

impl From<reqwest::Error> for CdpError {
    fn from(e: reqwest::Error) -> Self {
        CdpError::Http(e.to_string())
    }
}

impl From<url::ParseError> for CdpError {
    fn from(e: url::ParseError) -> Self {
        CdpError::ConnectionFailed(format!("Invalid URL: {}", e))
    }
}

impl From<CdpError> for EngineError {
    fn from(e: CdpError) -> Self {
        match e {
            CdpError::ConnectionFailed(_)
            | CdpError::BrowserNotAvailable(_)
            | CdpError::BrowserNotFound
            | CdpError::LaunchFailed(_)
            | CdpError::WebSocket(_)
            | CdpError::Http(_)
            | CdpError::SessionClosed => EngineError::Unavailable(e.to_string()),
            CdpError::Protocol { message, .. } => EngineError::Other(message),
            other => EngineError::Other(other.to_string()),
        }
    }
}
