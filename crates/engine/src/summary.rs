//! Run summary: row counts, notices and the ROI estimate.

use std::collections::HashSet;

use serde::Serialize;

use crate::config::RoiConfig;
use crate::filter::FilteredData;
use crate::model::Dataset;

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub registry_rows: usize,
    pub header_rows: usize,
    /// Review rows excluded from the joined view for lack of a matching
    /// deliverable.
    pub unmatched_reviews: usize,
    /// Distinct deliverables surviving the filter chain.
    pub analyzed_tokens: usize,
    pub filtered_registry_rows: usize,
    pub filtered_joined_rows: usize,
    /// Non-blocking conditions (empty subsets, absent optional columns).
    pub notices: Vec<String>,
}

/// Estimated time saved across the filtered deliverables.
#[derive(Debug, Clone, Serialize)]
pub struct RoiEstimate {
    pub item_count: usize,
    pub minutes_saved_per_item: u32,
    pub total_minutes_saved: u64,
}

impl RoiEstimate {
    pub fn new(item_count: usize, roi: &RoiConfig) -> Self {
        Self {
            item_count,
            minutes_saved_per_item: roi.minutes_saved_per_item,
            total_minutes_saved: item_count as u64 * u64::from(roi.minutes_saved_per_item),
        }
    }

    /// Whole hours and leftover minutes, for display.
    pub fn hours_minutes(&self) -> (u64, u64) {
        (self.total_minutes_saved / 60, self.total_minutes_saved % 60)
    }
}

/// Summarize a run. Soft conditions turn into notices here rather than
/// errors anywhere else.
pub fn compute_summary(dataset: &Dataset, filtered: &FilteredData) -> RunSummary {
    let analyzed_tokens = distinct_tokens(filtered);

    let mut notices = Vec::new();
    if filtered.registry.is_empty() {
        notices.push("no deliverables match the current filters".to_string());
    }
    if filtered.joined.is_empty() {
        notices.push("no review records match the current filters".to_string());
    }
    if dataset.unmatched_reviews > 0 {
        notices.push(format!(
            "{} review record(s) had no matching deliverable and were excluded",
            dataset.unmatched_reviews
        ));
    }
    if !dataset.header_columns.reviewer {
        notices.push("reviewer column missing; checker counts default to 0".to_string());
    }
    if !(dataset.header_columns.completed
        && dataset.header_columns.modified
        && dataset.registry_columns.deadline)
    {
        notices.push("completion/deadline columns missing; on-time rates report 0".to_string());
    }
    if dataset.registry_columns.grade_columns.is_empty() {
        notices.push("no grade-indicator columns; grade groupings have no data".to_string());
    }

    RunSummary {
        registry_rows: dataset.registry.len(),
        header_rows: dataset.joined.len() + dataset.unmatched_reviews,
        unmatched_reviews: dataset.unmatched_reviews,
        analyzed_tokens,
        filtered_registry_rows: filtered.registry.len(),
        filtered_joined_rows: filtered.joined.len(),
        notices,
    }
}

fn distinct_tokens(filtered: &FilteredData) -> usize {
    filtered
        .registry
        .iter()
        .map(|d| d.token.as_str())
        .collect::<HashSet<_>>()
        .len()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
