//! Command dispatch.
//!
//! Two independent action families are registered into one
//! [`CommandDispatcher`]: tab actions over the [`TabRegistry`] and debug
//! actions over the [`DebugBridge`].
//!
//! [`TabRegistry`]: crate::tabs::TabRegistry
//! [`DebugBridge`]: crate::debug::DebugBridge

mod debug_actions;
mod dispatcher;
mod handler;
mod tab_actions;

pub use debug_actions::debug_actions;
pub use dispatcher::CommandDispatcher;
pub use handler::{ActionHandler, ParamKind, ParamSpec};
pub use tab_actions::tab_actions;

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
