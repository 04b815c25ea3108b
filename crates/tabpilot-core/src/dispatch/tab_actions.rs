//! Tab action family, routed to the [`TabRegistry`].

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use tabpilot_protocols::CommandError;

use super::handler::{
    optional_bool, require_str, require_u64, ActionHandler, ParamKind, ParamSpec,
};
use crate::tabs::TabRegistry;

const TAB_ID: ParamSpec = ParamSpec::required("tab_id", ParamKind::Integer);

/// Every tab action, ready for registration.
pub fn tab_actions(tabs: Arc<TabRegistry>, default_focus: bool) -> Vec<Arc<dyn ActionHandler>> {
    vec![
        Arc::new(NewTab {
            tabs: tabs.clone(),
            default_focus,
        }),
        Arc::new(SwitchTab { tabs: tabs.clone() }),
        Arc::new(CloseTab { tabs: tabs.clone() }),
        Arc::new(GetAllTabs { tabs: tabs.clone() }),
        Arc::new(Navigate { tabs: tabs.clone() }),
        Arc::new(ExecuteScript { tabs: tabs.clone() }),
        Arc::new(GetTabInfo { tabs }),
    ]
}

/// `newTab {url, focus?}` → `{tabId}`
pub struct NewTab {
    tabs: Arc<TabRegistry>,
    default_focus: bool,
}

#[async_trait]
impl ActionHandler for NewTab {
    fn action(&self) -> &'static str {
        "newTab"
    }

    fn params(&self) -> &'static [ParamSpec] {
        const PARAMS: &[ParamSpec] = &[
            ParamSpec::required("url", ParamKind::String),
            ParamSpec::optional("focus", ParamKind::Boolean),
        ];
        PARAMS
    }

    async fn handle(&self, params: Value) -> Result<Value, CommandError> {
        let url = require_str(self.action(), &params, "url")?;
        let focus = optional_bool(&params, "focus").unwrap_or(self.default_focus);
        let tab_id = self.tabs.create_tab(url, focus).await?;
        Ok(json!({ "tabId": tab_id }))
    }
}

/// `switchTab {tab_id}` → `{}`
pub struct SwitchTab {
    tabs: Arc<TabRegistry>,
}

#[async_trait]
impl ActionHandler for SwitchTab {
    fn action(&self) -> &'static str {
        "switchTab"
    }

    fn params(&self) -> &'static [ParamSpec] {
        const PARAMS: &[ParamSpec] = &[TAB_ID];
        PARAMS
    }

    async fn handle(&self, params: Value) -> Result<Value, CommandError> {
        let tab_id = require_u64(self.action(), &params, "tab_id")?;
        self.tabs.switch_to(tab_id).await?;
        Ok(json!({}))
    }
}

/// `closeTab {tab_id}` → `{}`
pub struct CloseTab {
    tabs: Arc<TabRegistry>,
}

#[async_trait]
impl ActionHandler for CloseTab {
    fn action(&self) -> &'static str {
        "closeTab"
    }

    fn params(&self) -> &'static [ParamSpec] {
        const PARAMS: &[ParamSpec] = &[TAB_ID];
        PARAMS
    }

    async fn handle(&self, params: Value) -> Result<Value, CommandError> {
        let tab_id = require_u64(self.action(), &params, "tab_id")?;
        self.tabs.close_tab(tab_id).await?;
        Ok(json!({}))
    }
}

/// `getAllTabs {}` → `{tabs, current_tab_id}`
pub struct GetAllTabs {
    tabs: Arc<TabRegistry>,
}

#[async_trait]
impl ActionHandler for GetAllTabs {
    fn action(&self) -> &'static str {
        "getAllTabs"
    }

    async fn handle(&self, _params: Value) -> Result<Value, CommandError> {
        Ok(json!({
            "tabs": self.tabs.get_tab_info(),
            "current_tab_id": self.tabs.current_tab_id(),
        }))
    }
}

/// `navigate {tab_id, url}` → `{}`
pub struct Navigate {
    tabs: Arc<TabRegistry>,
}

#[async_trait]
impl ActionHandler for Navigate {
    fn action(&self) -> &'static str {
        "navigate"
    }

    fn params(&self) -> &'static [ParamSpec] {
        const PARAMS: &[ParamSpec] = &[TAB_ID, ParamSpec::required("url", ParamKind::String)];
        PARAMS
    }

    async fn handle(&self, params: Value) -> Result<Value, CommandError> {
        let tab_id = require_u64(self.action(), &params, "tab_id")?;
        let url = require_str(self.action(), &params, "url")?;
        self.tabs.navigate(tab_id, url).await?;
        Ok(json!({}))
    }
}

/// `executeScript {tab_id, code}` → `{value}`
pub struct ExecuteScript {
    tabs: Arc<TabRegistry>,
}

#[async_trait]
impl ActionHandler for ExecuteScript {
    fn action(&self) -> &'static str {
        "executeScript"
    }

    fn params(&self) -> &'static [ParamSpec] {
        const PARAMS: &[ParamSpec] = &[TAB_ID, ParamSpec::required("code", ParamKind::String)];
        PARAMS
    }

    async fn handle(&self, params: Value) -> Result<Value, CommandError> {
        let tab_id = require_u64(self.action(), &params, "tab_id")?;
        let code = require_str(self.action(), &params, "code")?;
        let value = self.tabs.execute_script(tab_id, code).await?;
        Ok(json!({ "value": value }))
    }
}

/// `getTabInfo {tab_id}` → `{id, url, title}`
pub struct GetTabInfo {
    tabs: Arc<TabRegistry>,
}

#[async_trait]
impl ActionHandler for GetTabInfo {
    fn action(&self) -> &'static str {
        "getTabInfo"
    }

    fn params(&self) -> &'static [ParamSpec] {
        const PARAMS: &[ParamSpec] = &[TAB_ID];
        PARAMS
    }

    async fn handle(&self, params: Value) -> Result<Value, CommandError> {
        let tab_id = require_u64(self.action(), &params, "tab_id")?;
        let info = self.tabs.tab_info(tab_id)?;
        Ok(json!(info))
    }
}
