//! Status overlay that reports to the log.
//!
//! Stands in for the on-page automation indicator: every status change of a
//! tab is written out as one structured event.

use tracing::info;

use tabpilot_protocols::{AutomationStatus, StatusObserver, TabId};

#[derive(Debug, Default)]
pub(crate) struct LoggingOverlay;

impl StatusObserver for LoggingOverlay {
    fn on_status_changed(&self, tab_id: TabId, status: Option<&AutomationStatus>) {
        match status {
            Some(status) => info!(
                tab_id,
                status = ?status.status,
                message = status.message.as_deref().unwrap_or(""),
                "Automation status changed"
            ),
            None => info!(tab_id, "Automation status cleared"),
        }
    }
}
