//! # TabPilot Remote
//!
//! The persistent link to the remote controller.
//!
//! - [`RemoteConnection`] - connection state machine with reconnect policy
//! - [`ReconnectPolicy`] - fixed or bounded exponential delay schedule
//! - [`FrameRouter`] - hands inbound frames to the dispatcher or status store

mod connection;
mod policy;
mod router;
mod session;
mod state;

pub use connection::RemoteConnection;
pub use policy::ReconnectPolicy;
pub use router::{FrameRouter, Routed};
pub use state::{CloseReason, ConnectionState};
