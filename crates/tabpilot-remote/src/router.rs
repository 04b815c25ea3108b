//! Inbound frame routing.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use tabpilot_core::ShellContext;
use tabpilot_protocols::{Command, InboundFrame, Response};

/// What a routed frame turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Routed {
    Registered { user_id: Option<String> },
    Pong,
    /// Handed to the dispatcher; the response (if any) arrives later on the
    /// outbound queue.
    Command,
    /// Undecodable command; an error response was queued.
    Rejected,
    Status { applied: bool },
    Ignored,
}

/// Decodes text frames and hands them to the right component.
pub struct FrameRouter {
    ctx: Arc<ShellContext>,
    outbound: mpsc::UnboundedSender<String>,
}

impl FrameRouter {
    pub fn new(ctx: Arc<ShellContext>, outbound: mpsc::UnboundedSender<String>) -> Self {
        Self { ctx, outbound }
    }

    pub fn route(&self, text: &str) -> Routed {
        let frame = match InboundFrame::parse(text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Dropping undecodable frame: {}", e);
                return Routed::Ignored;
            }
        };

        match frame {
            InboundFrame::Registered { user_id } => Routed::Registered { user_id },
            InboundFrame::Pong => {
                trace!("Heartbeat acknowledged");
                Routed::Pong
            }
            InboundFrame::Command(command) => {
                self.spawn_command(command);
                Routed::Command
            }
            InboundFrame::Rejected(response) => {
                warn!(
                    "Rejecting command {}: {}",
                    response.id,
                    response.error.as_deref().unwrap_or_default()
                );
                send_response(&self.outbound, &response);
                Routed::Rejected
            }
            InboundFrame::Animation(frame) => Routed::Status {
                applied: self.ctx.apply_status(&frame),
            },
            InboundFrame::Unknown(value) => {
                debug!("Ignoring unrecognized frame: {}", value);
                Routed::Ignored
            }
        }
    }

    /// Commands run concurrently; responses are correlated by id only.
    fn spawn_command(&self, command: Command) {
        let ctx = self.ctx.clone();
        let outbound = self.outbound.clone();
        tokio::spawn(async move {
            if let Some(response) = ctx.dispatcher().dispatch(command).await {
                send_response(&outbound, &response);
            }
        });
    }
}

fn send_response(outbound: &mpsc::UnboundedSender<String>, response: &Response) {
    match response.to_json() {
        Ok(json) => {
            if outbound.send(json).is_err() {
                debug!("Connection gone before response {} could be sent", response.id);
            }
        }
        Err(e) => warn!("Failed to encode response {}: {}", response.id, e),
    }
}
