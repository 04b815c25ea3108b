//! Connection state and closure classification.

use std::fmt;

use tabpilot_protocols::{ConnectionError, CLOSE_ABNORMAL, CLOSE_AUTH_REJECTED, CLOSE_NORMAL};

/// Connection state as seen by observers.
///
/// `Disconnected -> Connecting -> Connected`; `Error` is entered from
/// either of the latter on failure and always settles to `Disconnected`
/// once cleanup completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

impl ConnectionState {
    /// Whether a connect request would be a no-op.
    pub fn is_active(&self) -> bool {
        matches!(self, ConnectionState::Connecting | ConnectionState::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Error => "error",
        };
        f.write_str(s)
    }
}

/// Why a session ended.
#[derive(Debug)]
pub enum CloseReason {
    /// Local disconnect.
    Cancelled,
    /// Peer closed with a close code (1006 when the socket just ended).
    Closed { code: u16, reason: String },
    /// The socket could not be opened or failed mid-session.
    Failed(ConnectionError),
}

impl CloseReason {
    pub fn from_code(code: u16, reason: impl Into<String>) -> Self {
        CloseReason::Closed {
            code,
            reason: reason.into(),
        }
    }

    /// Socket ended without a close frame.
    pub fn abnormal() -> Self {
        Self::from_code(CLOSE_ABNORMAL, "")
    }

    /// The error this closure amounts to. `None` for a local disconnect or
    /// a normal close, which never trigger a reconnect.
    pub fn into_error(self) -> Option<ConnectionError> {
        match self {
            CloseReason::Cancelled => None,
            CloseReason::Closed { code, .. } if code == CLOSE_NORMAL => None,
            CloseReason::Closed { code, .. } if code == CLOSE_AUTH_REJECTED => {
                Some(ConnectionError::AuthenticationRejected)
            }
            CloseReason::Closed { code, .. } => Some(ConnectionError::AbnormalClosure { code }),
            CloseReason::Failed(e) => Some(e),
        }
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::Cancelled => f.write_str("disconnected locally"),
            CloseReason::Closed { code, reason } if reason.is_empty() => {
                write!(f, "closed with code {}", code)
            }
            CloseReason::Closed { code, reason } => {
                write!(f, "closed with code {}: {}", code, reason)
            }
            CloseReason::Failed(e) => write!(f, "{}", e),
        }
    }
}
