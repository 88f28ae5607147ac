use serde_json::Value;

use crate::core::{errors::AppResult, types::ProgressSummary};

pub const LABEL_QUEUED: &str = "queued";
pub const LABEL_REUSING_CACHED_ITEMS: &str = "reusing_cached_items";
pub const LABEL_FULL_PARSE_PROCESSING: &str = "full_parse_processing";
pub const LABEL_COMPLETE: &str = "complete";
pub const LABEL_FAILED: &str = "failed";

/// Whole-number share of `done` over `total`, clamped to `0..=100`.
pub fn progress_percent(total: i64, done: i64) -> i64 {
    if total <= 0 {
        return 0;
    }
    (done.saturating_mul(100) / total).clamp(0, 100)
}

/// Running counters of one job. Percent is derived, never stored here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressCounters {
    pub raw_candidates: i64,
    pub total_items: i64,
    pub reused_items: i64,
    pub queued_items: i64,
    pub processed_items: i64,
    pub failed_items: i64,
    pub total_pages: i64,
}

impl ProgressCounters {
    pub fn done_items(&self) -> i64 {
        self.reused_items + self.processed_items + self.failed_items
    }

    pub fn summary(&self) -> ProgressSummary {
        ProgressSummary {
            raw_candidates: self.raw_candidates,
            unique_skus: self.total_items,
            total_items: self.total_items,
            reused_items: self.reused_items,
            queued_items: self.queued_items,
            processed_items: self.processed_items,
            failed_items: self.failed_items,
            parsed_pages: self.total_pages,
            total_pages: self.total_pages,
            progress_percent: progress_percent(self.total_items, self.done_items()),
        }
    }
}

/// Catalog-side `parse_summary` payload while a job is still running.
pub fn processing_summary(progress: &ProgressSummary, label: &str) -> AppResult<Value> {
    let mut summary = serde_json::to_value(progress)?;
    if let Value::Object(fields) = &mut summary {
        fields.insert("progress_label".to_string(), Value::String(label.to_string()));
    }
    Ok(summary)
}
