//! Wire protocol frames.
//!
//! One JSON object per WebSocket text frame:
//!
//! ```text
//! out  {"type":"register","token":"..."}          once per connection
//! out  {"type":"ping"}                             heartbeat
//! in   {"type":"registered","user_id":"..."}
//! in   {"type":"pong"}
//! in   {"id":"a1","action":"newTab","params":{...}}
//! out  {"id":"a1","result":{...}} | {"id":"a1","error":"..."}
//!
//! A command id is a string or a number and is echoed back as received.
//! in   {"type":"animation","action":"in_progress","tab_id":1,"message":"..."}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ProtocolError;
use crate::status::StatusKind;
use crate::tab::TabId;

/// Close code for an intentional disconnect. Suppresses reconnection.
pub const CLOSE_NORMAL: u16 = 1000;

/// Close code the server uses to reject the credential. Suppresses
/// reconnection until a new credential is supplied.
pub const CLOSE_AUTH_REJECTED: u16 = 4001;

/// Close code recorded when the socket ends without a close frame.
pub const CLOSE_ABNORMAL: u16 = 1006;

/// Frames the shell sends on its own initiative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundFrame {
    Register { token: String },
    Ping,
}

impl OutboundFrame {
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// A command from the remote controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    /// Correlation id. Commands without one are fire-and-forget.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub action: String,
    #[serde(default = "empty_params")]
    pub params: Value,
}

fn empty_params() -> Value {
    Value::Object(Map::new())
}

fn malformed_command(message: &str) -> ProtocolError {
    ProtocolError::Malformed {
        kind: "command".to_string(),
        message: message.to_string(),
    }
}

impl Command {
    pub fn new(id: impl Into<Value>, action: impl Into<String>, params: Value) -> Self {
        Self {
            id: Some(id.into()),
            action: action.into(),
            params,
        }
    }

    /// The correlation id, if the frame carries a usable one.
    fn id_of(obj: &Map<String, Value>) -> Result<Option<Value>, ProtocolError> {
        match obj.get("id") {
            None | Some(Value::Null) => Ok(None),
            Some(id @ (Value::String(_) | Value::Number(_))) => Ok(Some(id.clone())),
            Some(_) => Err(malformed_command("'id' must be a string or a number")),
        }
    }

    fn from_object(obj: &Map<String, Value>, id: Option<Value>) -> Result<Self, ProtocolError> {
        let action = obj
            .get("action")
            .and_then(Value::as_str)
            .ok_or_else(|| malformed_command("'action' must be a string"))?
            .to_string();

        let params = match obj.get("params") {
            None | Some(Value::Null) => empty_params(),
            Some(v) => v.clone(),
        };

        Ok(Self { id, action, params })
    }
}

/// Correlated reply to a [`Command`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    pub fn success(id: impl Into<Value>, result: Value) -> Self {
        Self {
            id: id.into(),
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: impl Into<Value>, error: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            result: None,
            error: Some(error.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Action carried by an animation (status) frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimationAction {
    Idle,
    InProgress,
    /// Keeps the tab in progress and replaces its message.
    Update,
    Success,
    Failed,
}

impl AnimationAction {
    pub fn status_kind(&self) -> StatusKind {
        match self {
            AnimationAction::Idle => StatusKind::Idle,
            AnimationAction::InProgress | AnimationAction::Update => StatusKind::InProgress,
            AnimationAction::Success => StatusKind::Success,
            AnimationAction::Failed => StatusKind::Failed,
        }
    }
}

/// Status side-channel frame. Never answered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimationFrame {
    pub action: AnimationAction,
    pub tab_id: TabId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    Registered { user_id: Option<String> },
    Pong,
    Command(Command),
    /// A correlated command that could not be decoded. Answered with an
    /// error response rather than dropped.
    Rejected(Response),
    Animation(AnimationFrame),
    /// Anything else; logged and dropped.
    Unknown(Value),
}

impl InboundFrame {
    /// Decode and classify a text frame.
    ///
    /// `type` wins over `action`: animation frames carry both.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_str(text)?;
        let obj = value.as_object().ok_or(ProtocolError::NotAnObject)?;

        match obj.get("type").and_then(Value::as_str) {
            Some("registered") => Ok(InboundFrame::Registered {
                user_id: obj.get("user_id").and_then(|v| match v {
                    Value::String(s) => Some(s.clone()),
                    Value::Null => None,
                    other => Some(other.to_string()),
                }),
            }),
            Some("pong") => Ok(InboundFrame::Pong),
            Some("animation") => {
                let frame = serde_json::from_value(value.clone()).map_err(|e| {
                    ProtocolError::Malformed {
                        kind: "animation".to_string(),
                        message: e.to_string(),
                    }
                })?;
                Ok(InboundFrame::Animation(frame))
            }
            _ if obj.contains_key("action") || obj.contains_key("id") => {
                let id = Command::id_of(obj)?;
                match (Command::from_object(obj, id.clone()), id) {
                    (Ok(command), _) => Ok(InboundFrame::Command(command)),
                    (Err(e), Some(id)) => {
                        Ok(InboundFrame::Rejected(Response::failure(id, e.to_string())))
                    }
                    (Err(e), None) => Err(e),
                }
            }
            _ => Ok(InboundFrame::Unknown(value)),
        }
    }
}

#[cfg(test)]
#[path = "wire_tests.rs"]
mod tests;
