//! Remote connection errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// The server closed the socket with the authentication-rejected code.
    #[error("Authentication rejected by server")]
    AuthenticationRejected,

    #[error("Connection closed abnormally (code {code})")]
    AbnormalClosure { code: u16 },

    #[error("Connect timed out after {0} seconds")]
    Timeout(u64),
}

impl ConnectionError {
    /// Whether the reconnect policy applies after this error.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ConnectionError::AuthenticationRejected)
    }
}
