//! Command routing.

use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;
use tracing::{debug, warn};

use tabpilot_protocols::{Command, CommandError, Response};

use super::handler::ActionHandler;

/// Maps action names to handlers.
pub struct CommandDispatcher {
    handlers: DashMap<String, Arc<dyn ActionHandler>>,
}

impl CommandDispatcher {
    pub fn new() -> Self {
        Self {
            handlers: DashMap::new(),
        }
    }

    /// Register a handler. Fails if its action is already taken.
    pub fn register(&self, handler: Arc<dyn ActionHandler>) -> Result<(), CommandError> {
        let action = handler.action().to_string();
        if self.handlers.contains_key(&action) {
            return Err(CommandError::AlreadyRegistered(action));
        }
        self.handlers.insert(action, handler);
        Ok(())
    }

    pub fn register_all(
        &self,
        handlers: impl IntoIterator<Item = Arc<dyn ActionHandler>>,
    ) -> Result<(), CommandError> {
        for handler in handlers {
            self.register(handler)?;
        }
        Ok(())
    }

    /// Registered action names, sorted.
    pub fn actions(&self) -> Vec<String> {
        let mut actions: Vec<String> = self.handlers.iter().map(|h| h.key().clone()).collect();
        actions.sort();
        actions
    }

    pub fn contains(&self, action: &str) -> bool {
        self.handlers.contains_key(action)
    }

    /// Validate and run one action.
    pub async fn execute(&self, action: &str, params: Value) -> Result<Value, CommandError> {
        // Clone out of the map so no shard lock is held across the await.
        let handler = self
            .handlers
            .get(action)
            .map(|h| h.value().clone())
            .ok_or_else(|| CommandError::UnknownAction(action.to_string()))?;

        handler.validate(&params)?;
        handler.handle(params).await
    }

    /// Run a command and build its correlated response.
    ///
    /// Commands without an id produce no response; their failures are
    /// logged only.
    pub async fn dispatch(&self, command: Command) -> Option<Response> {
        let Command { id, action, params } = command;
        debug!("Dispatching {} (id: {:?})", action, id);

        let outcome = self.execute(&action, params).await;

        match (id, outcome) {
            (Some(id), Ok(result)) => Some(Response::success(id, result)),
            (Some(id), Err(e)) => {
                debug!("Command {} ({}) failed: {}", id, action, e);
                Some(Response::failure(id, e.to_string()))
            }
            (None, Ok(_)) => None,
            (None, Err(e)) => {
                warn!("Uncorrelated command {} failed: {}", action, e);
                None
            }
        }
    }
}

impl Default for CommandDispatcher {
    fn default() -> Self {
        Self::new()
    }
}
