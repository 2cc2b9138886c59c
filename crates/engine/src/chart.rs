//! Chart feeds — plain tabular data plus axis metadata for the external
//! rendering collaborator. The engine never draws anything.

use serde::Serialize;
use serde_json::json;

use crate::aggregate::{self, NextCheckRow};
use crate::filter::FilteredData;
use crate::ordering::EffectiveOrder;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Bar,
    Line,
}

/// One renderable feed: rows in display order plus which fields drive each
/// axis.
#[derive(Debug, Clone, Serialize)]
pub struct ChartFeed {
    pub kind: ChartKind,
    pub title: String,
    pub x: String,
    pub y: String,
    pub rows: Vec<serde_json::Value>,
}

impl ChartFeed {
    fn new(kind: ChartKind, title: impl Into<String>, x: &str, y: &str) -> Self {
        Self {
            kind,
            title: title.into(),
            x: x.into(),
            y: y.into(),
            rows: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// Per-grade next-check ratio for one stage (categorical bar).
pub fn next_check_ratio(stage: &str, table: &[NextCheckRow]) -> ChartFeed {
    let mut feed = ChartFeed::new(
        ChartKind::Bar,
        format!("学年別「次回チェック出し要」の割合 — {stage}"),
        "grade",
        "required_ratio",
    );
    for row in table {
        feed.rows.push(json!({
            "grade": row.grade,
            "required_ratio": row.required_ratio,
        }));
    }
    feed
}

/// Per-grade next-check head count for one stage (categorical bar).
pub fn next_check_count(stage: &str, table: &[NextCheckRow]) -> ChartFeed {
    let mut feed = ChartFeed::new(
        ChartKind::Bar,
        format!("学年別「次回チェック出し要」の人数 — {stage}"),
        "grade",
        "required_count",
    );
    for row in table {
        feed.rows.push(json!({
            "grade": row.grade,
            "required_count": row.required_count,
        }));
    }
    feed
}

/// Deliverable volume and on-time rate per publication month, in month
/// order (time-ordered line).
pub fn monthly_trend(
    months: &EffectiveOrder,
    filtered: &FilteredData,
    on_time_available: bool,
) -> ChartFeed {
    let mut feed = ChartFeed::new(ChartKind::Line, "発刊月別の推移", "month", "total_count");
    for month in months.labels() {
        let total = filtered
            .registry
            .iter()
            .filter(|d| d.month.as_deref() == Some(month.as_str()))
            .count();
        let month_rows: Vec<_> = filtered
            .joined
            .iter()
            .filter(|j| j.month.as_deref() == Some(month.as_str()))
            .collect();
        let on_time_rate = if on_time_available {
            let completed = month_rows.iter().filter(|j| j.completed == Some(true)).count();
            let on_time = month_rows
                .iter()
                .filter(|j| {
                    j.completed == Some(true)
                        && matches!((j.completed_at, j.deadline), (Some(done), Some(due)) if done <= due)
                })
                .count();
            aggregate::rate_pct(on_time, completed)
        } else {
            0.0
        };
        feed.rows.push(json!({
            "month": month,
            "total_count": total,
            "on_time_rate": on_time_rate,
        }));
    }
    feed
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
