//! Schema normalization: raw string tables into typed rows.
//!
//! Dates are coerced leniently (unparseable values become `None`, never a
//! hard failure). Boolean flags only accept literal `true`/`false` tokens.
//! The only fatal condition is a missing join-key column.

use chrono::{NaiveDate, NaiveDateTime};

use crate::config::AnalysisConfig;
use crate::error::PipelineError;
use crate::model::{ColumnPresence, Deliverable, NormalizedInput, RawTable, ReviewRecord};

/// Normalize both exports. Fails before any join when either table lacks its
/// join-key column.
pub fn normalize(
    config: &AnalysisConfig,
    registry: &RawTable,
    headers: &RawTable,
) -> Result<NormalizedInput, PipelineError> {
    let (registry_rows, registry_columns) = normalize_registry(config, registry)?;
    let (review_rows, header_columns) = normalize_headers(config, headers)?;
    Ok(NormalizedInput {
        registry: registry_rows,
        reviews: review_rows,
        registry_columns,
        header_columns,
        registry_headers: registry.headers.clone(),
        header_headers: headers.headers.clone(),
    })
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

pub fn normalize_registry(
    config: &AnalysisConfig,
    table: &RawTable,
) -> Result<(Vec<Deliverable>, ColumnPresence), PipelineError> {
    let c = &config.columns;
    let token_idx = table.column_index(&c.token).ok_or_else(|| {
        PipelineError::MissingJoinKey {
            table: "registry".into(),
            column: c.token.clone(),
        }
    })?;

    let grade_columns: Vec<String> = table
        .headers
        .iter()
        .filter(|h| config.grade_markers.iter().any(|m| h.contains(m.as_str())))
        .cloned()
        .collect();

    let presence = ColumnPresence {
        name: table.has_column(&c.name),
        created: table.has_column(&c.created),
        modified: table.has_column(&c.modified),
        deadline: table.has_column(&c.deadline),
        stage: table.has_column(&c.stage),
        month: table.has_column(&c.month),
        fiscal_year: table.has_column(&c.fiscal_year),
        reviewer: false,
        completed: false,
        next_check: false,
        grade_columns: grade_columns.clone(),
    };

    let col = |name: &str| table.column_index(name);
    let name_idx = col(&c.name);
    let created_idx = col(&c.created);
    let modified_idx = col(&c.modified);
    let deadline_idx = col(&c.deadline);
    let stage_idx = col(&c.stage);
    let month_idx = col(&c.month);
    let year_idx = col(&c.fiscal_year);
    let grade_idx: Vec<(String, usize)> = grade_columns
        .iter()
        .filter_map(|g| table.column_index(g).map(|i| (g.clone(), i)))
        .collect();

    let mut rows = Vec::with_capacity(table.records.len());
    for record in &table.records {
        let get = |idx: Option<usize>| idx.and_then(|i| table.value(record, i));
        rows.push(Deliverable {
            token: get(Some(token_idx)).unwrap_or("").to_string(),
            name: get(name_idx).map(str::to_string),
            created: get(created_idx).and_then(parse_datetime),
            modified: get(modified_idx).and_then(parse_datetime),
            deadline: get(deadline_idx).and_then(parse_datetime),
            fiscal_year: get(year_idx).map(str::to_string),
            month: get(month_idx).map(str::to_string),
            stage: get(stage_idx).map(str::to_string),
            grade_flags: grade_idx
                .iter()
                .map(|(g, i)| {
                    (
                        g.clone(),
                        table.value(record, *i).and_then(parse_bool_literal),
                    )
                })
                .collect(),
            checker_count: 0,
            raw_fields: raw_fields(table, record),
        });
    }

    Ok((rows, presence))
}

// ---------------------------------------------------------------------------
// Review headers
// ---------------------------------------------------------------------------

pub fn normalize_headers(
    config: &AnalysisConfig,
    table: &RawTable,
) -> Result<(Vec<ReviewRecord>, ColumnPresence), PipelineError> {
    let c = &config.columns;
    // The export names its foreign key differently from the registry; accept
    // the canonical key as a fallback (the rename is then a no-op).
    let token_idx = table
        .column_index(&c.header_token)
        .or_else(|| table.column_index(&c.token))
        .ok_or_else(|| PipelineError::MissingJoinKey {
            table: "header".into(),
            column: c.header_token.clone(),
        })?;

    let presence = ColumnPresence {
        name: table.has_column(&c.name),
        created: table.has_column(&c.created),
        modified: table.has_column(&c.modified),
        deadline: table.has_column(&c.deadline),
        stage: table.has_column(&c.stage),
        month: table.has_column(&c.month),
        fiscal_year: table.has_column(&c.fiscal_year),
        reviewer: table.has_column(&c.reviewer),
        completed: table.has_column(&c.completed),
        next_check: table.has_column(&c.next_check),
        grade_columns: Vec::new(),
    };

    let col = |name: &str| table.column_index(name);
    let reviewer_idx = col(&c.reviewer);
    let stage_idx = col(&c.stage);
    let completed_idx = col(&c.completed);
    let next_check_idx = col(&c.next_check);
    let created_idx = col(&c.created);
    let modified_idx = col(&c.modified);

    let mut rows = Vec::with_capacity(table.records.len());
    for record in &table.records {
        let get = |idx: Option<usize>| idx.and_then(|i| table.value(record, i));
        rows.push(ReviewRecord {
            token: get(Some(token_idx)).unwrap_or("").to_string(),
            stage: get(stage_idx).map(str::to_string),
            reviewer: get(reviewer_idx).map(str::to_string),
            completed: get(completed_idx).and_then(parse_bool_literal),
            next_check: get(next_check_idx).and_then(parse_bool_literal),
            created: get(created_idx).and_then(parse_datetime),
            modified: get(modified_idx).and_then(parse_datetime),
            raw_fields: raw_fields(table, record),
        });
    }

    Ok((rows, presence))
}

fn raw_fields(
    table: &RawTable,
    record: &[String],
) -> std::collections::BTreeMap<String, String> {
    table
        .headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.clone(), record.get(i).cloned().unwrap_or_default()))
        .collect()
}

// ---------------------------------------------------------------------------
// Scalar coercion
// ---------------------------------------------------------------------------

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];

/// Lenient timestamp parse. Zoned timestamps keep their wall-clock reading
/// (the offset is dropped); date-only values land on midnight. Anything
/// unparseable is `None`.
pub fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(dt);
        }
    }

    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_local());
    }

    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(value, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }

    None
}

/// Exact-boolean parse: only literal boolean tokens count. A truthy string
/// like "1" is deliberately not a flag.
pub fn parse_bool_literal(value: &str) -> Option<bool> {
    match value.trim() {
        "true" | "True" | "TRUE" => Some(true),
        "false" | "False" | "FALSE" => Some(false),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn table(headers: &[&str], rows: &[&[&str]]) -> RawTable {
        RawTable {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            records: rows
                .iter()
                .map(|r| r.iter().map(|v| v.to_string()).collect())
                .collect(),
        }
    }

    #[test]
    fn parse_datetime_formats() {
        assert_eq!(
            parse_datetime("2024-04-01 23:59:59"),
            NaiveDate::from_ymd_opt(2024, 4, 1).unwrap().and_hms_opt(23, 59, 59)
        );
        assert_eq!(
            parse_datetime("2024-04-01"),
            NaiveDate::from_ymd_opt(2024, 4, 1).unwrap().and_hms_opt(0, 0, 0)
        );
        assert_eq!(
            parse_datetime("2024/04/01 12:30:00"),
            NaiveDate::from_ymd_opt(2024, 4, 1).unwrap().and_hms_opt(12, 30, 0)
        );
        // Zoned timestamps drop the offset, keeping the wall-clock reading
        assert_eq!(
            parse_datetime("2024-04-01T09:00:00+09:00"),
            NaiveDate::from_ymd_opt(2024, 4, 1).unwrap().and_hms_opt(9, 0, 0)
        );
    }

    #[test]
    fn unparseable_dates_become_none() {
        assert_eq!(parse_datetime("来週"), None);
        assert_eq!(parse_datetime("2024-13-45"), None);
        assert_eq!(parse_datetime(""), None);
    }

    #[test]
    fn bool_literals_are_exact() {
        assert_eq!(parse_bool_literal("True"), Some(true));
        assert_eq!(parse_bool_literal("true"), Some(true));
        assert_eq!(parse_bool_literal("FALSE"), Some(false));
        // Truthy strings do not count
        assert_eq!(parse_bool_literal("1"), None);
        assert_eq!(parse_bool_literal("yes"), None);
        assert_eq!(parse_bool_literal("済"), None);
    }

    #[test]
    fn registry_requires_join_key() {
        let config = AnalysisConfig::default();
        let t = table(&["制作物名", "作成日"], &[&["単語帳", "2024-04-01"]]);
        let err = normalize_registry(&config, &t).unwrap_err();
        assert!(matches!(err, PipelineError::MissingJoinKey { ref table, .. } if table == "registry"));
    }

    #[test]
    fn header_foreign_key_falls_back_to_canonical() {
        let config = AnalysisConfig::default();
        // Already renamed upstream: canonical key instead of 制作物トークン
        let t = table(&["トークン", "工程"], &[&["T1", "初校"]]);
        let (rows, presence) = normalize_headers(&config, &t).unwrap();
        assert_eq!(rows[0].token, "T1");
        assert!(!presence.reviewer);
    }

    #[test]
    fn missing_reviewer_column_is_tolerated() {
        let config = AnalysisConfig::default();
        let t = table(&["制作物トークン", "工程"], &[&["T1", "初校"]]);
        let (rows, presence) = normalize_headers(&config, &t).unwrap();
        assert_eq!(rows[0].reviewer, None);
        assert!(!presence.reviewer);
    }

    #[test]
    fn registry_grade_columns_by_naming_convention() {
        let config = AnalysisConfig::default();
        let t = table(
            &["トークン", "1年生", "2年生", "学年その他", "備考"],
            &[&["T1", "True", "1", "", "メモ"]],
        );
        let (rows, presence) = normalize_registry(&config, &t).unwrap();
        assert_eq!(presence.grade_columns, ["1年生", "2年生", "学年その他"]);
        let flags = &rows[0].grade_flags;
        assert_eq!(flags[0], ("1年生".into(), Some(true)));
        // "1" is truthy but not a literal boolean
        assert_eq!(flags[1], ("2年生".into(), None));
        assert_eq!(flags[2], ("学年その他".into(), None));
    }

    #[test]
    fn registry_tolerates_missing_optional_columns() {
        let config = AnalysisConfig::default();
        let t = table(&["トークン"], &[&["T1"]]);
        let (rows, presence) = normalize_registry(&config, &t).unwrap();
        assert_eq!(rows.len(), 1);
        assert!(!presence.name);
        assert!(!presence.created);
        assert!(presence.grade_columns.is_empty());
        assert_eq!(rows[0].name, None);
    }

    #[test]
    fn short_records_read_as_absent() {
        let config = AnalysisConfig::default();
        let t = table(&["トークン", "制作物名", "作成日"], &[&["T1"]]);
        let (rows, _) = normalize_registry(&config, &t).unwrap();
        assert_eq!(rows[0].name, None);
        assert_eq!(rows[0].created, None);
    }
}
