//! # TabPilot Protocols
//!
//! Shared definitions for the TabPilot control plane.
//! Contains only types and interface definitions - no I/O.
//!
//! ## Contents
//!
//! - [`wire`] - JSON frames exchanged with the remote controller
//! - [`engine`] - Traits a page-rendering engine implements ([`BrowserEngine`],
//!   [`PageView`], [`DebugChannel`])
//! - [`status`] - Per-tab automation status values and the observer trait
//! - [`error`] - Error enums for every layer

pub mod engine;
pub mod error;
pub mod status;
pub mod tab;
pub mod wire;

pub use engine::{BrowserEngine, DebugChannel, PageView, ViewEvent, ViewEventReceiver};
pub use error::{
    CommandError, ConnectionError, DebugError, EngineError, ProtocolError, TabError,
};
pub use status::{AutomationStatus, StatusKind, StatusObserver};
pub use tab::{TabId, TabInfo};
pub use wire::{
    AnimationAction, AnimationFrame, Command, InboundFrame, OutboundFrame, Response,
    CLOSE_ABNORMAL, CLOSE_AUTH_REJECTED, CLOSE_NORMAL,
};
