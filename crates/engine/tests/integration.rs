//! End-to-end pipeline tests: raw tables in, scaffolded metrics out.

use prooflens_engine::aggregate::Dimension;
use prooflens_engine::engine::AnalysisInput;
use prooflens_engine::{run, AnalysisConfig, FilterParams, PipelineError, RawTable};

fn raw(headers: &[&str], rows: &[&[&str]]) -> RawTable {
    RawTable {
        headers: headers.iter().map(|h| h.to_string()).collect(),
        records: rows
            .iter()
            .map(|r| r.iter().map(|v| v.to_string()).collect())
            .collect(),
    }
}

fn sample_input() -> AnalysisInput {
    // Two deliverables: T1 (grade 1, two reviewers, both on time) and
    // T2 (grade 2, one reviewer, completed late).
    let registry = raw(
        &["トークン", "制作物名", "作成日", "締め切り日", "年度", "発刊月", "1年生", "2年生"],
        &[
            &["T1", "算数ドリル", "2024-04-01", "2024-06-01", "2024", "6月号", "True", "False"],
            &["T2", "国語テキスト", "2024-05-01", "2024-05-10", "2024", "7月号", "False", "True"],
        ],
    );
    let headers = raw(
        &["制作物トークン", "担当者メールアドレス", "工程", "チェック済み", "修正日", "次回チェック出し"],
        &[
            &["T1", "r1@example.com", "初校", "True", "2024-05-01", "False"],
            &["T1", "r2@example.com", "初校", "True", "2024-05-20", "True"],
            &["T2", "r1@example.com", "初校", "True", "2024-06-01", "False"],
        ],
    );
    AnalysisInput { registry, headers }
}

#[test]
fn end_to_end_scenario() {
    let config = AnalysisConfig::default();
    let result = run(&config, &sample_input(), &FilterParams::default(), &[]).unwrap();

    assert_eq!(result.summary.registry_rows, 2);
    assert_eq!(result.summary.header_rows, 3);
    assert_eq!(result.summary.analyzed_tokens, 2);
    assert_eq!(result.summary.unmatched_reviews, 0);

    // Checker counts survive into the filtered entity view
    let counts: Vec<(String, u32)> = result
        .filtered
        .registry
        .iter()
        .map(|d| (d.token.clone(), d.checker_count))
        .collect();
    assert_eq!(counts, [("T1".to_string(), 2), ("T2".to_string(), 1)]);

    // Default dimensions: grade x stage. One active stage, two grades.
    assert_eq!(result.active_stages, ["初校"]);
    assert_eq!(result.performance.len(), 2);

    let grade1 = result
        .performance
        .iter()
        .find(|r| r.grade.as_deref() == Some("1年生"))
        .unwrap();
    assert_eq!(grade1.total_count, 1);
    assert_eq!(grade1.on_time_rate, 100.0);
    assert_eq!(grade1.avg_checker_count, 2.0);

    let grade2 = result
        .performance
        .iter()
        .find(|r| r.grade.as_deref() == Some("2年生"))
        .unwrap();
    assert_eq!(grade2.total_count, 1);
    assert_eq!(grade2.on_time_rate, 0.0, "late completion is not on time");
    assert_eq!(grade2.avg_checker_count, 1.0);
}

#[test]
fn stage_reports_carry_next_check_and_charts() {
    let config = AnalysisConfig::default();
    let result = run(&config, &sample_input(), &FilterParams::default(), &[]).unwrap();

    assert_eq!(result.stages.len(), 1);
    let report = &result.stages[0];
    assert_eq!(report.stage, "初校");
    assert!(!report.rework);
    assert_eq!(report.next_check.len(), 2, "scaffolded on both grades");
    let grade1 = &report.next_check[0];
    assert_eq!(grade1.grade, "1年生");
    assert_eq!(grade1.required_count, 1);
    assert_eq!(grade1.required_ratio, 50.0);
    assert_eq!(report.charts.len(), 2);
}

#[test]
fn effective_orderings_follow_reference_order() {
    let registry = raw(
        &["トークン", "発刊月", "工程", "1年生"],
        &[
            &["T1", "その他", "その他", "True"],
            &["T2", "4月号", "再校", "True"],
            &["T3", "1月号", "初校", "True"],
        ],
    );
    let headers = raw(&["制作物トークン", "工程"], &[&["T1", "初校"]]);
    let config = AnalysisConfig::default();
    let result = run(
        &config,
        &AnalysisInput { registry, headers },
        &FilterParams::default(),
        &[],
    )
    .unwrap();

    // Reference-relative order, regardless of input row order
    assert_eq!(result.month_order, ["4月号", "1月号", "その他"]);
    assert_eq!(result.stage_order, ["初校", "再校", "その他"]);
}

#[test]
fn month_dimension_scaffold_is_complete() {
    let config = AnalysisConfig::default();
    let result = run(
        &config,
        &sample_input(),
        &FilterParams::default(),
        &[Dimension::Grade, Dimension::Month],
    )
    .unwrap();
    // 2 grades x 2 observed months = 4 rows, zero-filled where empty
    assert_eq!(result.performance.len(), 4);
    let empty = result
        .performance
        .iter()
        .find(|r| r.grade.as_deref() == Some("1年生") && r.month.as_deref() == Some("7月号"))
        .unwrap();
    assert_eq!(empty.total_count, 0);
    assert_eq!(empty.on_time_rate, 0.0);
}

#[test]
fn rework_stages_are_flagged() {
    let registry = raw(
        &["トークン", "締め切り日", "1年生"],
        &[&["T1", "2024-06-01", "True"]],
    );
    let headers = raw(
        &["制作物トークン", "工程", "チェック済み", "修正日"],
        &[
            &["T1", "初校", "True", "2024-05-01"],
            &["T1", "再校2", "False", ""],
            &["T1", "色校", "False", ""],
        ],
    );
    let config = AnalysisConfig::default();
    let result = run(
        &config,
        &AnalysisInput { registry, headers },
        &FilterParams::default(),
        &[],
    )
    .unwrap();

    assert_eq!(result.active_stages, ["初校", "再校2", "色校"]);
    assert_eq!(result.rework_stages, ["再校2", "色校"]);
    let first_proof = result.stages.iter().find(|s| s.stage == "初校").unwrap();
    assert!(!first_proof.rework);
    let recheck = result.stages.iter().find(|s| s.stage == "再校2").unwrap();
    assert!(recheck.rework);
}

#[test]
fn missing_join_key_aborts_before_any_join() {
    let registry = raw(&["制作物名"], &[&["単語帳"]]);
    let headers = raw(&["制作物トークン"], &[&["T1"]]);
    let config = AnalysisConfig::default();
    let err = run(
        &config,
        &AnalysisInput { registry, headers },
        &FilterParams::default(),
        &[],
    )
    .unwrap_err();
    assert!(matches!(err, PipelineError::MissingJoinKey { ref table, .. } if table == "registry"));
}

#[test]
fn empty_filter_result_is_a_notice_not_an_error() {
    let config = AnalysisConfig::default();
    let result = run(
        &config,
        &sample_input(),
        &FilterParams {
            name_contains: Some("存在しない名前".into()),
            ..Default::default()
        },
        &[],
    )
    .unwrap();
    assert_eq!(result.summary.filtered_registry_rows, 0);
    assert!(result
        .summary
        .notices
        .iter()
        .any(|n| n.contains("no deliverables match")));
    // Structure survives: the joined column order is still introspectable
    assert!(result.joined_columns.contains(&"トークン".to_string()));
    assert!(result.performance.is_empty(), "no active stages, empty scaffold");
}

#[test]
fn missing_optional_columns_degrade_to_notices() {
    // No reviewer, no completion, no deadline, no grade columns
    let registry = raw(&["トークン", "制作物名"], &[&["T1", "資料"]]);
    let headers = raw(&["制作物トークン", "工程"], &[&["T1", "初校"]]);
    let config = AnalysisConfig::default();
    let result = run(
        &config,
        &AnalysisInput { registry, headers },
        &FilterParams::default(),
        &[],
    )
    .unwrap();

    assert!(result.summary.notices.iter().any(|n| n.contains("reviewer column")));
    assert!(result.summary.notices.iter().any(|n| n.contains("on-time rates")));
    assert!(result.summary.notices.iter().any(|n| n.contains("grade-indicator")));
    assert_eq!(result.filtered.registry[0].checker_count, 0);
}

#[test]
fn reviewer_identity_is_absent_from_export_columns() {
    let config = AnalysisConfig::default();
    let result = run(&config, &sample_input(), &FilterParams::default(), &[]).unwrap();
    assert!(!result
        .joined_columns
        .iter()
        .any(|c| c == "担当者メールアドレス"));
    // And from every exported row
    for row in &result.filtered.joined {
        assert!(row.raw_fields.keys().all(|k| k != "担当者メールアドレス"));
    }
}
