//! Tab registry errors.

use thiserror::Error;

use super::EngineError;
use crate::tab::TabId;

#[derive(Debug, Error)]
pub enum TabError {
    #[error("Tab not found: {0}")]
    UnknownTab(TabId),

    /// Code run in the page context threw; kept apart from `UnknownTab`.
    #[error("Script execution failed in tab {tab_id}: {message}")]
    ScriptExecution { tab_id: TabId, message: String },

    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl TabError {
    /// Classify an engine failure raised while running a script in `tab_id`.
    pub fn from_script_failure(tab_id: TabId, err: EngineError) -> Self {
        match err {
            EngineError::ScriptException(message) => TabError::ScriptExecution { tab_id, message },
            other => TabError::Engine(other),
        }
    }
}
