//! # TabPilot Chromium Engine
//!
//! A [`BrowserEngine`](tabpilot_protocols::BrowserEngine) that drives a
//! Chromium-based browser through the DevTools protocol.
//!
//! Every tab is a browser target. Showing a tab activates its target, scripts
//! run through `Runtime.evaluate`, and each tab's debugging channel is a
//! second, separately attached flattened session on the same target.

mod client;
mod debug;
mod engine;
mod error;
mod launch;
mod protocol;
mod view;

pub use client::{CdpClient, CdpEvent, EventReceiver, EventSender};
pub use debug::CdpDebugChannel;
pub use engine::CdpEngine;
pub use error::CdpError;
pub use launch::find_browser;
pub use view::CdpPageView;
