//! Automation status types.
//!
//! An automation status tells the overlay whether a remote agent is
//! currently driving a tab.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tab::TabId;

/// Status value for a tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    Idle,
    InProgress,
    Success,
    Failed,
}

impl StatusKind {
    /// Whether an agent is actively working on the tab.
    pub fn is_active(&self) -> bool {
        matches!(self, StatusKind::InProgress)
    }
}

/// The full status entry for one tab.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutomationStatus {
    pub tab_id: TabId,
    pub status: StatusKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl AutomationStatus {
    pub fn new(tab_id: TabId, status: StatusKind, message: Option<String>) -> Self {
        Self {
            tab_id,
            status,
            message,
            updated_at: Utc::now(),
        }
    }
}

/// Presentation surface that mirrors the status store.
///
/// Called synchronously on every mutation with the new full state of the
/// affected tab; `None` means the entry was removed.
pub trait StatusObserver: Send + Sync {
    fn on_status_changed(&self, tab_id: TabId, status: Option<&AutomationStatus>);
}
