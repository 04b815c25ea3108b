//! Debug bridge errors.

use thiserror::Error;

use crate::tab::TabId;

#[derive(Debug, Error)]
pub enum DebugError {
    #[error("Tab not found: {0}")]
    UnknownTab(TabId),

    /// Automation was withdrawn while the session was being attached. The
    /// tab still exists; a new command attaches afresh.
    #[error("Debug session for tab {0} was withdrawn")]
    SessionWithdrawn(TabId),

    /// The engine's debugging call failed; carries the engine message unchanged.
    #[error("{0}")]
    Channel(String),
}
