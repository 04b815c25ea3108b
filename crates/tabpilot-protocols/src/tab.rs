//! Tab identity and the public snapshot of a tab.

use serde::{Deserialize, Serialize};

/// Tab identifier. Allocated monotonically and never reused within a process.
pub type TabId = u64;

/// Snapshot of a tab as reported to the remote controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabInfo {
    pub id: TabId,
    pub url: String,
    pub title: Option<String>,
    /// Description of the most recent failed load, if the page has not
    /// navigated successfully since.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}
