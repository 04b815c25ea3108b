//! Command dispatch errors.
//!
//! Every variant is converted into an `{id, error}` response at the
//! dispatcher boundary.

use thiserror::Error;

use super::{DebugError, TabError};

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Missing required parameter '{param}' for action '{action}'")]
    MissingParameter { action: String, param: String },

    #[error("Invalid parameter '{param}' for action '{action}': expected {expected}")]
    InvalidParameter {
        action: String,
        param: String,
        expected: String,
    },

    #[error("Action already registered: {0}")]
    AlreadyRegistered(String),

    #[error(transparent)]
    Tab(#[from] TabError),

    #[error(transparent)]
    Debug(#[from] DebugError),
}
