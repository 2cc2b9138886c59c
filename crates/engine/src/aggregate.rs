//! Scaffolded metric aggregation.
//!
//! Groups are the full cross-product of the selected dimension values, so
//! empty groups report zeros instead of being silently absent. Rates guard
//! zero denominators; display values round to one decimal.

use std::collections::HashSet;

use serde::Serialize;

use crate::filter::FilteredData;
use crate::grades;
use crate::model::JoinedRow;
use crate::ordering::is_rework_label;

// ---------------------------------------------------------------------------
// Dimensions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Grade,
    Stage,
    Month,
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Grade => write!(f, "grade"),
            Self::Stage => write!(f, "stage"),
            Self::Month => write!(f, "month"),
        }
    }
}

/// Values each dimension ranges over, in display order. Unselected
/// dimensions are ignored.
#[derive(Debug, Clone, Default)]
pub struct DimensionValues {
    pub grades: Vec<String>,
    pub stages: Vec<String>,
    pub months: Vec<String>,
}

// ---------------------------------------------------------------------------
// Output rows
// ---------------------------------------------------------------------------

/// One scaffold cell. Dimension fields are `None` when that dimension was
/// not requested.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsRow {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub month: Option<String>,
    /// Entity-level row count (integer by contract).
    pub total_count: u64,
    /// `on_time / completed * 100`, 0 when nothing completed. One decimal.
    pub on_time_rate: f64,
    /// Mean checker count over one row per (group, token). One decimal.
    pub avg_checker_count: f64,
    /// Whether the stage is a rework pass. Only set when the stage
    /// dimension is selected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rework: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NextCheckRow {
    pub grade: String,
    pub required_count: u64,
    /// Percentage of the grade's review rows flagged for another check
    /// round. One decimal, 0 when the grade has no rows.
    pub required_ratio: f64,
}

// ---------------------------------------------------------------------------
// Performance scaffold
// ---------------------------------------------------------------------------

/// Compute the scaffolded performance table for the requested dimensions.
///
/// `on_time_available` reflects column presence: when the joined view lacks
/// completion or deadline columns the rate is reported as 0 for every group.
pub fn performance(
    dimensions: &[Dimension],
    values: &DimensionValues,
    filtered: &FilteredData,
    on_time_available: bool,
) -> Vec<MetricsRow> {
    let axis = |dim: Dimension, labels: &[String]| -> Vec<Option<String>> {
        if dimensions.contains(&dim) {
            labels.iter().cloned().map(Some).collect()
        } else {
            vec![None]
        }
    };
    let grade_axis = axis(Dimension::Grade, &values.grades);
    let stage_axis = axis(Dimension::Stage, &values.stages);
    let month_axis = axis(Dimension::Month, &values.months);

    let mut rows = Vec::with_capacity(grade_axis.len() * stage_axis.len() * month_axis.len());
    for grade in &grade_axis {
        let grade_tokens: Option<HashSet<&str>> = grade
            .as_deref()
            .map(|g| grades::tokens_for_grade(&filtered.grade_relation, g));
        for stage in &stage_axis {
            for month in &month_axis {
                rows.push(group_metrics(
                    grade.clone(),
                    stage.clone(),
                    month.clone(),
                    grade_tokens.as_ref(),
                    filtered,
                    on_time_available,
                ));
            }
        }
    }
    rows
}

fn group_metrics(
    grade: Option<String>,
    stage: Option<String>,
    month: Option<String>,
    grade_tokens: Option<&HashSet<&str>>,
    filtered: &FilteredData,
    on_time_available: bool,
) -> MetricsRow {
    let in_grade = |token: &str| grade_tokens.map_or(true, |t| t.contains(token));
    let stage_matches = |s: Option<&str>| stage.as_deref().map_or(true, |w| s == Some(w));
    let month_matches = |m: Option<&str>| month.as_deref().map_or(true, |w| m == Some(w));

    // Total count on the entity-only view.
    let total_count = filtered
        .registry
        .iter()
        .filter(|d| {
            in_grade(&d.token) && stage_matches(d.stage.as_deref()) && month_matches(d.month.as_deref())
        })
        .count() as u64;

    // On-time rate and checker average on the joined view.
    let group_rows: Vec<&JoinedRow> = filtered
        .joined
        .iter()
        .filter(|j| {
            in_grade(&j.token) && stage_matches(j.stage.as_deref()) && month_matches(j.month.as_deref())
        })
        .collect();

    let on_time_rate = if on_time_available {
        let completed = group_rows
            .iter()
            .filter(|j| j.completed == Some(true))
            .count();
        let on_time = group_rows
            .iter()
            .filter(|j| {
                j.completed == Some(true)
                    && matches!((j.completed_at, j.deadline), (Some(done), Some(due)) if done <= due)
            })
            .count();
        rate_pct(on_time, completed)
    } else {
        0.0
    };

    // One row per token toward the average, however many reviews it has.
    let mut seen: HashSet<&str> = HashSet::new();
    let mut count_sum = 0u64;
    let mut token_count = 0u64;
    for j in &group_rows {
        if seen.insert(j.token.as_str()) {
            count_sum += u64::from(j.checker_count);
            token_count += 1;
        }
    }
    let avg_checker_count = if token_count == 0 {
        0.0
    } else {
        round1(count_sum as f64 / token_count as f64)
    };

    MetricsRow {
        rework: stage.as_deref().map(is_rework_label),
        grade,
        stage,
        month,
        total_count,
        on_time_rate,
        avg_checker_count,
    }
}

// ---------------------------------------------------------------------------
// Next-check table
// ---------------------------------------------------------------------------

/// Per-grade counts of review rows flagged for another check round, over a
/// slice of the joined view (typically one stage). Scaffolded on the
/// selected grades.
pub fn next_check_by_grade(
    joined: &[&JoinedRow],
    filtered: &FilteredData,
    selected_grades: &[String],
) -> Vec<NextCheckRow> {
    selected_grades
        .iter()
        .map(|grade| {
            let tokens = grades::tokens_for_grade(&filtered.grade_relation, grade);
            let rows: Vec<&&JoinedRow> =
                joined.iter().filter(|j| tokens.contains(j.token.as_str())).collect();
            let required = rows.iter().filter(|j| j.next_check == Some(true)).count();
            NextCheckRow {
                grade: grade.clone(),
                required_count: required as u64,
                required_ratio: rate_pct(required, rows.len()),
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Numeric guards
// ---------------------------------------------------------------------------

/// Percentage with a zero-denominator guard: never NaN, never infinite.
pub fn rate_pct(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        round1(numerator as f64 / denominator as f64 * 100.0)
    }
}

/// Round to one decimal for display.
pub fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
