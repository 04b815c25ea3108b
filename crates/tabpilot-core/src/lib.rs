//! # TabPilot Core
//!
//! The control plane of the browser shell.
//!
//! ## Components
//!
//! - [`TabRegistry`] - Owns tabs and their engine views, enforces a single
//!   visible tab
//! - [`AutomationStatusStore`] - Per-tab automation status mirrored to an
//!   observer
//! - [`DebugBridge`] - Per-tab debugging sessions, attached on demand
//! - [`CommandDispatcher`] - Routes remote commands to the tab and debug
//!   action families
//! - [`ShellContext`] - Owns all of the above; built once at startup and
//!   passed by reference

pub mod context;
pub mod debug;
pub mod dispatch;
pub mod status;
pub mod tabs;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use context::{ShellContext, ShellOptions};
pub use debug::DebugBridge;
pub use dispatch::{ActionHandler, CommandDispatcher, ParamKind, ParamSpec};
pub use status::AutomationStatusStore;
pub use tabs::{TabCloseHook, TabRegistry};
