//! Errors reported by a page-rendering engine.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Page-context code threw, or the engine reported a fault while running it.
    #[error("Script threw: {0}")]
    ScriptException(String),

    /// The debugging channel rejected or failed a call.
    #[error("{0}")]
    DebugChannel(String),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    /// The underlying view no longer exists.
    #[error("View is gone: {0}")]
    ViewGone(String),

    #[error("Engine unavailable: {0}")]
    Unavailable(String),

    #[error("Engine error: {0}")]
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_channel_message_is_passed_through() {
        let err = EngineError::DebugChannel("'Foo.bar' wasn't found (code: -32601)".to_string());
        assert_eq!(err.to_string(), "'Foo.bar' wasn't found (code: -32601)");
    }

    #[test]
    fn test_script_exception_display() {
        let err = EngineError::ScriptException("Error: x".to_string());
        assert!(err.to_string().contains("Error: x"));
    }
}
