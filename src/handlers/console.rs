use tracing::{debug, warn};

use crate::error::ErrorCategory;
use crate::models::FileStatus;
use crate::services::{FileRegistry, PipelineObserver};

/// Terminal front end: logs list refreshes and error banners.
pub struct ConsoleObserver;

impl PipelineObserver for ConsoleObserver {
    fn records_changed(&self, registry: &FileRegistry) {
        let mut loading = 0;
        let mut ready = 0;
        let mut failed = 0;
        for (_, record) in registry.entries_in_order() {
            match record.status() {
                FileStatus::Queued | FileStatus::Loading => loading += 1,
                FileStatus::Ready => ready += 1,
                FileStatus::Error => failed += 1,
            }
        }
        debug!(
            files = registry.len(),
            loading = loading,
            ready = ready,
            failed = failed,
            "File list updated"
        );
    }

    fn error_occurred(&self, category: ErrorCategory, message: &str) {
        warn!(category = %category, "{}", message);
    }
}
