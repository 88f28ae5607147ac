//! Structural check that item density is uniform on every page but the last.

use std::collections::BTreeMap;

use crate::{
    catalog::types::Candidate,
    core::types::{CaptureVerification, PageItemCount},
};

/// Counts raw candidates per page, including pages that yielded none.
pub fn page_item_counts(page_count: usize, candidates: &[Candidate]) -> Vec<i64> {
    let mut counts = vec![0_i64; page_count];
    for candidate in candidates {
        let index = candidate.page_no - 1;
        if index >= 0 && (index as usize) < page_count {
            counts[index as usize] += 1;
        }
    }
    counts
}

/// Most frequent count, preferring the larger count on ties.
fn dominant_count(counts: &[i64]) -> i64 {
    let mut frequency: BTreeMap<i64, usize> = BTreeMap::new();
    for count in counts {
        *frequency.entry(*count).or_default() += 1;
    }
    frequency
        .into_iter()
        .max_by(|(left_count, left_seen), (right_count, right_seen)| {
            left_seen.cmp(right_seen).then(left_count.cmp(right_count))
        })
        .map(|(count, _)| count)
        .unwrap_or(0)
}

pub fn build_capture_verification(
    page_count: usize,
    candidates: &[Candidate],
    actual_unique_skus: i64,
) -> CaptureVerification {
    let counts = page_item_counts(page_count, candidates);
    let Some((&last_page_item_count, leading)) = counts.split_last() else {
        return CaptureVerification {
            capture_verification_passed: false,
            per_page_item_count: 0,
            expected_items_min: 0,
            expected_items_max: 0,
            non_last_page_count_mismatches: Vec::new(),
            last_page_item_count: 0,
            actual_unique_skus,
        };
    };

    let per_page_item_count = if leading.is_empty() {
        last_page_item_count
    } else {
        dominant_count(leading)
    };

    let non_last_page_count_mismatches: Vec<PageItemCount> = leading
        .iter()
        .enumerate()
        .filter(|(_, count)| **count != per_page_item_count)
        .map(|(index, count)| PageItemCount {
            page_no: index as i64 + 1,
            count: *count,
        })
        .collect();

    let full_pages = leading.len() as i64;
    let last_page_in_range = last_page_item_count >= 1 && last_page_item_count <= per_page_item_count;

    CaptureVerification {
        capture_verification_passed: non_last_page_count_mismatches.is_empty() && last_page_in_range,
        per_page_item_count,
        expected_items_min: per_page_item_count * full_pages + 1,
        expected_items_max: per_page_item_count * (full_pages + 1),
        non_last_page_count_mismatches,
        last_page_item_count,
        actual_unique_skus,
    }
}
