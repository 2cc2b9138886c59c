//! The sequential filter chain.
//!
//! Every stage is applied identically to the joined view and the
//! entity-only view so the two stay in lockstep (same token population
//! after each stage). Stages copy; the base dataset is never mutated.
//! Empty results keep their column structure.

use chrono::{Days, NaiveDate, NaiveDateTime};

use crate::error::PipelineError;
use crate::grades;
use crate::model::{ColumnPresence, Dataset, Deliverable, GradeAssignment, JoinedRow};

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// Filter parameters for one recomputation pass. `None` means pass-through.
#[derive(Debug, Clone, Default)]
pub struct FilterParams {
    /// Inclusive lower bound on the entity-side creation date.
    pub start_date: Option<NaiveDate>,
    /// Inclusive upper bound at day granularity (internally end + 1 day,
    /// exclusive).
    pub end_date: Option<NaiveDate>,
    pub fiscal_year: Option<String>,
    pub month: Option<String>,
    /// Grades to keep. `None` selects every available grade; an empty list
    /// yields a structurally valid empty result.
    pub grades: Option<Vec<String>>,
    /// Case-sensitive substring match on the entity name. Nulls never match.
    pub name_contains: Option<String>,
}

impl FilterParams {
    pub fn validate(&self) -> Result<(), PipelineError> {
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err(PipelineError::InvalidFilter(format!(
                    "end date {end} is before start date {start}"
                )));
            }
        }
        Ok(())
    }
}

/// The two views after the filter chain, plus the grade relation that drove
/// the grade stage.
#[derive(Debug, Clone)]
pub struct FilteredData {
    pub joined: Vec<JoinedRow>,
    pub registry: Vec<Deliverable>,
    /// (token, grade) pairs of the month-filtered registry — the attribution
    /// target for all grade-grouped aggregations.
    pub grade_relation: Vec<GradeAssignment>,
    pub available_grades: Vec<String>,
    pub selected_grades: Vec<String>,
}

// ---------------------------------------------------------------------------
// Application
// ---------------------------------------------------------------------------

pub fn apply(dataset: &Dataset, params: &FilterParams) -> Result<FilteredData, PipelineError> {
    params.validate()?;

    // Stage 1: date range (entity-side creation date on both views).
    let start = params.start_date.map(day_start);
    let end_exclusive = params
        .end_date
        .and_then(|d| d.checked_add_days(Days::new(1)))
        .map(day_start);
    let mut registry: Vec<Deliverable> = dataset
        .registry
        .iter()
        .filter(|d| in_range(d.created, start, end_exclusive))
        .cloned()
        .collect();
    let mut joined: Vec<JoinedRow> = dataset
        .joined
        .iter()
        .filter(|j| in_range(j.entity_created, start, end_exclusive))
        .cloned()
        .collect();

    // Stage 2: fiscal year (exact match or pass-through).
    if let Some(ref year) = params.fiscal_year {
        registry.retain(|d| d.fiscal_year.as_deref() == Some(year.as_str()));
        joined.retain(|j| j.fiscal_year.as_deref() == Some(year.as_str()));
    }

    // Stage 3: publication month.
    if let Some(ref month) = params.month {
        registry.retain(|d| d.month.as_deref() == Some(month.as_str()));
        joined.retain(|j| j.month.as_deref() == Some(month.as_str()));
    }

    // Stage 4: grade. The relation is expanded from the month-filtered
    // registry; an empty selection empties both views (not an error). When
    // the registry carries no grade columns at all the stage is skipped —
    // absent columns degrade, they don't wipe the result.
    let grade_relation = grades::expand(&registry);
    let available_grades = grades::available_grades(&grade_relation);
    let selected_grades = match params.grades {
        Some(ref wanted) => wanted
            .iter()
            .filter(|g| available_grades.contains(g))
            .cloned()
            .collect(),
        None => available_grades.clone(),
    };
    if !dataset.registry_columns.grade_columns.is_empty() {
        if selected_grades.is_empty() {
            registry.clear();
            joined.clear();
        } else {
            let keep = grades::tokens_for_grades(&grade_relation, &selected_grades);
            let keep: std::collections::HashSet<String> =
                keep.into_iter().map(str::to_string).collect();
            registry.retain(|d| keep.contains(&d.token));
            joined.retain(|j| keep.contains(&j.token));
        }
    }

    // Stage 5: free-text on the entity name, only when the column exists.
    if let Some(ref needle) = params.name_contains {
        if !needle.is_empty() && has_name_column(&dataset.registry_columns) {
            registry.retain(|d| d.name.as_deref().is_some_and(|n| n.contains(needle.as_str())));
            joined.retain(|j| j.name.as_deref().is_some_and(|n| n.contains(needle.as_str())));
        }
    }

    Ok(FilteredData {
        joined,
        registry,
        grade_relation,
        available_grades,
        selected_grades,
    })
}

fn has_name_column(presence: &ColumnPresence) -> bool {
    presence.name
}

fn day_start(d: NaiveDate) -> NaiveDateTime {
    d.and_hms_opt(0, 0, 0).expect("midnight is always valid")
}

/// Inclusive lower / exclusive upper bound check. A missing creation date
/// never satisfies a bound (it passes only when no bound is set).
fn in_range(
    created: Option<NaiveDateTime>,
    start: Option<NaiveDateTime>,
    end_exclusive: Option<NaiveDateTime>,
) -> bool {
    match (start, end_exclusive) {
        (None, None) => true,
        _ => {
            let Some(created) = created else {
                return false;
            };
            start.map_or(true, |s| created >= s) && end_exclusive.map_or(true, |e| created < e)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use crate::enrich::build_dataset;
    use crate::model::RawTable;
    use crate::normalize::normalize;

    fn raw(headers: &[&str], rows: &[&[&str]]) -> RawTable {
        RawTable {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            records: rows
                .iter()
                .map(|r| r.iter().map(|v| v.to_string()).collect())
                .collect(),
        }
    }

    fn sample_dataset() -> Dataset {
        let registry = raw(
            &["トークン", "制作物名", "作成日", "年度", "発刊月", "1年生", "2年生"],
            &[
                &["T1", "算数ドリル", "2024-04-01 10:00:00", "2024", "6月号", "True", "False"],
                &["T2", "国語テキスト", "2024-05-01 23:59:59", "2024", "7月号", "False", "True"],
                &["T3", "理科資料", "2024-06-02 00:00:00", "2023", "7月号", "True", "True"],
            ],
        );
        let headers = raw(
            &["制作物トークン", "工程", "チェック済み"],
            &[
                &["T1", "初校", "True"],
                &["T2", "初校", "False"],
                &["T3", "再校", "True"],
            ],
        );
        let config = AnalysisConfig::default();
        let input = normalize(&config, &registry, &headers).unwrap();
        build_dataset(&config, input)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn tokens(filtered: &FilteredData) -> Vec<&str> {
        filtered.registry.iter().map(|d| d.token.as_str()).collect()
    }

    #[test]
    fn no_params_passes_everything_through() {
        let ds = sample_dataset();
        let f = apply(&ds, &FilterParams::default()).unwrap();
        assert_eq!(f.registry.len(), 3);
        assert_eq!(f.joined.len(), 3);
        assert_eq!(f.available_grades, ["1年生", "2年生"]);
        assert_eq!(f.selected_grades, f.available_grades);
    }

    #[test]
    fn end_date_is_inclusive_at_day_granularity() {
        let ds = sample_dataset();
        // T2 created 2024-05-01 23:59:59 — on the end date, included.
        // T3 created 2024-06-02 00:00:00 — the day after an end date of
        // 2024-06-01, excluded.
        let f = apply(
            &ds,
            &FilterParams {
                start_date: Some(date(2024, 4, 1)),
                end_date: Some(date(2024, 5, 1)),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(tokens(&f), ["T1", "T2"]);

        let f = apply(
            &ds,
            &FilterParams {
                start_date: Some(date(2024, 6, 1)),
                end_date: Some(date(2024, 6, 1)),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(tokens(&f).is_empty(), "next-day 00:00:00 must be excluded");
    }

    #[test]
    fn joined_view_stays_in_lockstep() {
        let ds = sample_dataset();
        let f = apply(
            &ds,
            &FilterParams {
                fiscal_year: Some("2024".into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(tokens(&f), ["T1", "T2"]);
        let joined_tokens: Vec<&str> = f.joined.iter().map(|j| j.token.as_str()).collect();
        assert_eq!(joined_tokens, ["T1", "T2"]);
    }

    #[test]
    fn month_filter() {
        let ds = sample_dataset();
        let f = apply(
            &ds,
            &FilterParams {
                month: Some("7月号".into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(tokens(&f), ["T2", "T3"]);
    }

    #[test]
    fn grade_filter_keeps_multi_grade_tokens() {
        let ds = sample_dataset();
        let f = apply(
            &ds,
            &FilterParams {
                grades: Some(vec!["2年生".into()]),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(tokens(&f), ["T2", "T3"]);
    }

    #[test]
    fn empty_grade_selection_yields_empty_views() {
        let ds = sample_dataset();
        let f = apply(
            &ds,
            &FilterParams {
                grades: Some(Vec::new()),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(f.registry.is_empty());
        assert!(f.joined.is_empty());
        // The relation itself is still available for introspection
        assert!(!f.grade_relation.is_empty());
    }

    #[test]
    fn grade_stage_skipped_when_no_grade_columns_exist() {
        let registry = raw(&["トークン", "制作物名"], &[&["T1", "資料"]]);
        let headers = raw(&["制作物トークン"], &[&["T1"]]);
        let config = AnalysisConfig::default();
        let input = normalize(&config, &registry, &headers).unwrap();
        let ds = build_dataset(&config, input);
        let f = apply(&ds, &FilterParams::default()).unwrap();
        assert_eq!(f.registry.len(), 1);
        assert_eq!(f.joined.len(), 1);
        assert!(f.available_grades.is_empty());
        assert!(f.selected_grades.is_empty());
    }

    #[test]
    fn name_filter_is_case_sensitive_and_null_safe() {
        let ds = sample_dataset();
        let f = apply(
            &ds,
            &FilterParams {
                name_contains: Some("ドリル".into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(tokens(&f), ["T1"]);
    }

    #[test]
    fn name_filter_skipped_when_column_absent() {
        let registry = raw(&["トークン", "1年生"], &[&["T1", "True"]]);
        let headers = raw(&["制作物トークン"], &[&["T1"]]);
        let config = AnalysisConfig::default();
        let input = normalize(&config, &registry, &headers).unwrap();
        let ds = build_dataset(&config, input);
        let f = apply(
            &ds,
            &FilterParams {
                name_contains: Some("何か".into()),
                ..Default::default()
            },
        )
        .unwrap();
        // Column missing → stage skipped, row survives
        assert_eq!(f.registry.len(), 1);
    }

    #[test]
    fn missing_creation_date_fails_date_bounds() {
        let registry = raw(
            &["トークン", "作成日", "1年生"],
            &[&["T1", "不明", "True"], &["T2", "2024-04-02", "True"]],
        );
        let headers = raw(&["制作物トークン"], &[&["T1"], &["T2"]]);
        let config = AnalysisConfig::default();
        let input = normalize(&config, &registry, &headers).unwrap();
        let ds = build_dataset(&config, input);
        let f = apply(
            &ds,
            &FilterParams {
                start_date: Some(date(2024, 4, 1)),
                end_date: Some(date(2024, 4, 30)),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(tokens(&f), ["T2"]);
    }

    #[test]
    fn reject_inverted_date_range() {
        let ds = sample_dataset();
        let err = apply(
            &ds,
            &FilterParams {
                start_date: Some(date(2024, 6, 1)),
                end_date: Some(date(2024, 4, 1)),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidFilter(_)));
    }
}
