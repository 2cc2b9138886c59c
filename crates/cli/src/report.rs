//! Human-readable tables for `plens analyze`.
//!
//! Tables go to stdout; the run summary, notices and ROI line go to stderr
//! so piped output stays machine-friendly.

use std::io::{self, Write};

use prooflens_engine::aggregate::{Dimension, MetricsRow, NextCheckRow};
use prooflens_engine::engine::AnalysisResult;

pub fn print_result(result: &AnalysisResult) -> io::Result<()> {
    let s = &result.summary;
    eprintln!(
        "{} deliverable(s), {} review row(s) ({} unmatched) — {} analyzed after filters",
        s.registry_rows, s.header_rows, s.unmatched_reviews, s.analyzed_tokens,
    );
    for notice in &s.notices {
        eprintln!("note: {notice}");
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();

    print_metrics(&mut out, &result.meta.dimensions, &result.performance)?;

    for stage in &result.stages {
        writeln!(out)?;
        if stage.rework {
            writeln!(out, "== {} (rework) ==", stage.stage)?;
        } else {
            writeln!(out, "== {} ==", stage.stage)?;
        }
        print_metrics(&mut out, &[Dimension::Grade, Dimension::Stage], &stage.performance)?;
        if !stage.next_check.is_empty() {
            writeln!(out)?;
            print_next_check(&mut out, &stage.next_check)?;
        }
    }

    let (hours, minutes) = result.roi.hours_minutes();
    eprintln!(
        "estimated time saved: {}h {}m ({} item(s) x {} min)",
        hours, minutes, result.roi.item_count, result.roi.minutes_saved_per_item,
    );

    Ok(())
}

fn print_metrics(
    out: &mut impl Write,
    dimensions: &[Dimension],
    rows: &[MetricsRow],
) -> io::Result<()> {
    let mut header: Vec<String> = dimensions.iter().map(|d| d.to_string()).collect();
    header.extend(["total", "on_time_rate", "avg_checkers"].map(String::from));

    let mut table: Vec<Vec<String>> = vec![header];
    for row in rows {
        let mut cells = Vec::new();
        for dim in dimensions {
            let value = match dim {
                Dimension::Grade => row.grade.as_deref(),
                Dimension::Stage => row.stage.as_deref(),
                Dimension::Month => row.month.as_deref(),
            };
            cells.push(value.unwrap_or("-").to_string());
        }
        cells.push(row.total_count.to_string());
        cells.push(format!("{:.1}", row.on_time_rate));
        cells.push(format!("{:.1}", row.avg_checker_count));
        table.push(cells);
    }

    print_table(out, &table)
}

fn print_next_check(out: &mut impl Write, rows: &[NextCheckRow]) -> io::Result<()> {
    let mut table: Vec<Vec<String>> = vec![
        ["grade", "next_check", "ratio"].map(String::from).to_vec(),
    ];
    for row in rows {
        table.push(vec![
            row.grade.clone(),
            row.required_count.to_string(),
            format!("{:.1}%", row.required_ratio),
        ]);
    }
    print_table(out, &table)
}

/// Column-aligned plain text. Widths count chars, which is close enough
/// for terminal use.
fn print_table(out: &mut impl Write, table: &[Vec<String>]) -> io::Result<()> {
    let columns = table.iter().map(Vec::len).max().unwrap_or(0);
    let mut widths = vec![0usize; columns];
    for row in table {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    for row in table {
        let mut line = String::new();
        for (i, cell) in row.iter().enumerate() {
            if i > 0 {
                line.push_str("  ");
            }
            line.push_str(cell);
            if i + 1 < row.len() {
                for _ in cell.chars().count()..widths[i] {
                    line.push(' ');
                }
            }
        }
        writeln!(out, "{line}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_columns_align() {
        let table = vec![
            vec!["grade".to_string(), "total".to_string()],
            vec!["1年生".to_string(), "12".to_string()],
            vec!["学年その他".to_string(), "3".to_string()],
        ];
        let mut buf = Vec::new();
        print_table(&mut buf, &table).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("grade"));
        assert!(lines[1].contains("1年生"));
    }

    #[test]
    fn metrics_rows_render_missing_dimensions_as_dash() {
        let rows = vec![MetricsRow {
            grade: Some("1年生".to_string()),
            stage: None,
            month: None,
            total_count: 4,
            on_time_rate: 50.0,
            avg_checker_count: 1.5,
            rework: None,
        }];
        let mut buf = Vec::new();
        print_metrics(&mut buf, &[Dimension::Grade, Dimension::Stage], &rows).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("1年生"));
        assert!(text.contains('-'));
        assert!(text.contains("50.0"));
    }
}
