//! One WebSocket session: register, pump frames, heartbeat, close.

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

use tabpilot_core::ShellContext;
use tabpilot_protocols::{ConnectionError, OutboundFrame, CLOSE_NORMAL};

use crate::router::{FrameRouter, Routed};
use crate::state::CloseReason;

pub(crate) type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub(crate) struct Session {
    pub ctx: Arc<ShellContext>,
    pub token: String,
    pub heartbeat: Option<Duration>,
}

impl Session {
    /// Run until the peer closes, the socket fails or `cancel` fires.
    ///
    /// `on_registered` is called for every registration acknowledgement.
    pub async fn run(
        self,
        ws: WsStream,
        cancel: CancellationToken,
        on_registered: impl Fn(Option<String>),
    ) -> CloseReason {
        let (mut ws_tx, mut ws_rx) = ws.split();

        let register = match (OutboundFrame::Register { token: self.token }).to_json() {
            Ok(json) => json,
            Err(e) => return CloseReason::Failed(ConnectionError::WebSocket(e.to_string())),
        };
        if let Err(e) = ws_tx.send(Message::Text(register.into())).await {
            error!("Failed to send register frame: {}", e);
            return CloseReason::Failed(ConnectionError::WebSocket(e.to_string()));
        }
        debug!("Register frame sent");

        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
        let router = FrameRouter::new(self.ctx, outbound_tx);
        let mut heartbeat = self.heartbeat.map(|period| {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    let frame = CloseFrame {
                        code: CloseCode::from(CLOSE_NORMAL),
                        reason: "client disconnect".into(),
                    };
                    if let Err(e) = ws_tx.send(Message::Close(Some(frame))).await {
                        debug!("Close frame not delivered: {}", e);
                    }
                    return CloseReason::Cancelled;
                }

                Some(json) = outbound_rx.recv() => {
                    if let Err(e) = ws_tx.send(Message::Text(json.into())).await {
                        error!("Failed to send frame: {}", e);
                        return CloseReason::Failed(ConnectionError::WebSocket(e.to_string()));
                    }
                }

                _ = tick(&mut heartbeat) => {
                    let ping = match OutboundFrame::Ping.to_json() {
                        Ok(json) => json,
                        Err(e) => return CloseReason::Failed(ConnectionError::WebSocket(e.to_string())),
                    };
                    if let Err(e) = ws_tx.send(Message::Text(ping.into())).await {
                        error!("Failed to send heartbeat: {}", e);
                        return CloseReason::Failed(ConnectionError::WebSocket(e.to_string()));
                    }
                    trace!("Heartbeat sent");
                }

                msg = ws_rx.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            if let Routed::Registered { user_id } = router.route(&text) {
                                on_registered(user_id);
                            }
                        }
                        Some(Ok(Message::Close(frame))) => {
                            let reason = match frame {
                                Some(frame) => CloseReason::from_code(u16::from(frame.code), frame.reason.to_string()),
                                None => CloseReason::abnormal(),
                            };
                            info!("Server closed the connection: {}", reason);
                            return reason;
                        }
                        Some(Ok(Message::Binary(_))) => {
                            debug!("Ignoring binary frame");
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            error!("WebSocket error: {}", e);
                            return CloseReason::Failed(ConnectionError::WebSocket(e.to_string()));
                        }
                        None => {
                            info!("Connection ended without a close frame");
                            return CloseReason::abnormal();
                        }
                    }
                }
            }
        }
    }
}

async fn tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
