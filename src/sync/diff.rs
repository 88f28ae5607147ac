use std::collections::{HashMap, HashSet};

use crate::core::types::{BaselineItem, ChangeType};

/// Classifies one current item against the baseline by strong fingerprint.
pub fn classify_change(sku: &str, signature: &str, baseline: &HashMap<String, BaselineItem>) -> ChangeType {
    match baseline.get(sku) {
        None => ChangeType::New,
        Some(previous) if previous.signature == signature => ChangeType::Unchanged,
        Some(_) => ChangeType::Updated,
    }
}

/// Baseline SKUs absent from the current run. Counted only, never materialized.
pub fn count_removed(baseline: &HashMap<String, BaselineItem>, current_skus: &HashSet<&str>) -> i64 {
    baseline
        .keys()
        .filter(|sku| !current_skus.contains(sku.as_str()))
        .count() as i64
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeCounts {
    pub new_items: i64,
    pub updated_items: i64,
    pub unchanged_items: i64,
}

impl ChangeCounts {
    pub fn record(&mut self, change: ChangeType) {
        match change {
            ChangeType::New => self.new_items += 1,
            ChangeType::Updated => self.updated_items += 1,
            ChangeType::Unchanged => self.unchanged_items += 1,
            ChangeType::Removed => {}
        }
    }
}
