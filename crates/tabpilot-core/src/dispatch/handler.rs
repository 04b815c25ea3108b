//! Action handler trait and parameter schema.

use async_trait::async_trait;
use serde_json::Value;

use tabpilot_protocols::CommandError;

/// Declared JSON type of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    String,
    /// Non-negative integer (tab ids).
    Integer,
    Boolean,
    Object,
}

impl ParamKind {
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            ParamKind::String => value.is_string(),
            ParamKind::Integer => value.is_u64(),
            ParamKind::Boolean => value.is_boolean(),
            ParamKind::Object => value.is_object(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ParamKind::String => "string",
            ParamKind::Integer => "non-negative integer",
            ParamKind::Boolean => "boolean",
            ParamKind::Object => "object",
        }
    }
}

/// One entry of a handler's parameter schema.
#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
}

impl ParamSpec {
    pub const fn required(name: &'static str, kind: ParamKind) -> Self {
        Self {
            name,
            kind,
            required: true,
        }
    }

    pub const fn optional(name: &'static str, kind: ParamKind) -> Self {
        Self {
            name,
            kind,
            required: false,
        }
    }
}

/// A remotely invocable action.
///
/// Handlers are always asynchronous. Parameters are validated against
/// [`ActionHandler::params`] before `handle` is called.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    /// Wire name of the action.
    fn action(&self) -> &'static str;

    fn params(&self) -> &'static [ParamSpec] {
        &[]
    }

    async fn handle(&self, params: Value) -> Result<Value, CommandError>;

    /// Check presence and type of declared parameters.
    ///
    /// `null` counts as absent.
    fn validate(&self, params: &Value) -> Result<(), CommandError> {
        for spec in self.params() {
            match params.get(spec.name) {
                None | Some(Value::Null) if spec.required => {
                    return Err(CommandError::MissingParameter {
                        action: self.action().to_string(),
                        param: spec.name.to_string(),
                    });
                }
                None | Some(Value::Null) => {}
                Some(value) if !spec.kind.matches(value) => {
                    return Err(CommandError::InvalidParameter {
                        action: self.action().to_string(),
                        param: spec.name.to_string(),
                        expected: spec.kind.name().to_string(),
                    });
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

pub(crate) fn require_u64(action: &str, params: &Value, name: &str) -> Result<u64, CommandError> {
    params
        .get(name)
        .and_then(Value::as_u64)
        .ok_or_else(|| CommandError::MissingParameter {
            action: action.to_string(),
            param: name.to_string(),
        })
}

pub(crate) fn require_str<'a>(
    action: &str,
    params: &'a Value,
    name: &str,
) -> Result<&'a str, CommandError> {
    params
        .get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| CommandError::MissingParameter {
            action: action.to_string(),
            param: name.to_string(),
        })
}

pub(crate) fn optional_bool(params: &Value, name: &str) -> Option<bool> {
    params.get(name).and_then(Value::as_bool)
}
