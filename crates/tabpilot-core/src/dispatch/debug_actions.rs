//! Debug action family, routed to the [`DebugBridge`].

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use tabpilot_protocols::CommandError;

use super::handler::{require_str, require_u64, ActionHandler, ParamKind, ParamSpec};
use crate::debug::DebugBridge;

pub fn debug_actions(bridge: Arc<DebugBridge>) -> Vec<Arc<dyn ActionHandler>> {
    vec![Arc::new(Cdp { bridge })]
}

/// `cdp {tab_id, method, args?}` → raw protocol result
pub struct Cdp {
    bridge: Arc<DebugBridge>,
}

#[async_trait]
impl ActionHandler for Cdp {
    fn action(&self) -> &'static str {
        "cdp"
    }

    fn params(&self) -> &'static [ParamSpec] {
        const PARAMS: &[ParamSpec] = &[
            ParamSpec::required("tab_id", ParamKind::Integer),
            ParamSpec::required("method", ParamKind::String),
            ParamSpec::optional("args", ParamKind::Object),
        ];
        PARAMS
    }

    async fn handle(&self, params: Value) -> Result<Value, CommandError> {
        let tab_id = require_u64(self.action(), &params, "tab_id")?;
        let method = require_str(self.action(), &params, "method")?;
        let args = match params.get("args") {
            Some(args @ Value::Object(_)) => args.clone(),
            _ => Value::Object(Map::new()),
        };
        Ok(self.bridge.send(tab_id, method, args).await?)
    }
}
