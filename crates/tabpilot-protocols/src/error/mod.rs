//! Error types for the TabPilot control plane.

mod command;
mod connection;
mod debug;
mod engine;
mod protocol;
mod tab;

pub use command::*;
pub use connection::*;
pub use debug::*;
pub use engine::*;
pub use protocol::*;
pub use tab::*;
