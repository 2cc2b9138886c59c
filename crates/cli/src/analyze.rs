//! `plens analyze` / `plens validate` — the analysis pass itself.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use prooflens_engine::{AnalysisConfig, AnalysisInput, FilterParams};
use prooflens_io::EXPORT_FILE_NAME;

use crate::exit_codes::{io_exit_code, pipeline_exit_code, EXIT_CONFIG};
use crate::report;
use crate::{ByDimension, CliError};

pub struct AnalyzeArgs {
    pub registry: PathBuf,
    pub headers: PathBuf,
    pub config: Option<PathBuf>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub year: Option<String>,
    pub month: Option<String>,
    pub grades: Vec<String>,
    pub contains: Option<String>,
    pub by: Vec<ByDimension>,
    pub json: bool,
    pub output: Option<PathBuf>,
    pub export: Option<PathBuf>,
}

pub fn cmd_analyze(args: AnalyzeArgs) -> Result<(), CliError> {
    let config = load_config(args.config.as_deref())?;

    let params = FilterParams {
        start_date: args.from.as_deref().map(parse_date).transpose()?,
        end_date: args.to.as_deref().map(parse_date).transpose()?,
        fiscal_year: args.year,
        month: args.month,
        grades: if args.grades.is_empty() { None } else { Some(args.grades) },
        name_contains: args.contains,
    };

    let dimensions: Vec<prooflens_engine::aggregate::Dimension> =
        args.by.into_iter().map(Into::into).collect();

    let input = AnalysisInput {
        registry: prooflens_io::read_table(&args.registry)
            .map_err(|e| CliError { code: io_exit_code(&e), message: e.to_string(), hint: None })?,
        headers: prooflens_io::read_table(&args.headers)
            .map_err(|e| CliError { code: io_exit_code(&e), message: e.to_string(), hint: None })?,
    };

    let result = prooflens_engine::run(&config, &input, &params, &dimensions).map_err(|e| {
        let hint = match &e {
            prooflens_engine::PipelineError::MissingJoinKey { table, column } => Some(format!(
                "the {table} export must carry a '{column}' column; override names with --config"
            )),
            _ => None,
        };
        CliError { code: pipeline_exit_code(&e), message: e.to_string(), hint }
    })?;

    if let Some(ref path) = args.output {
        let json_str = serde_json::to_string_pretty(&result)
            .map_err(|e| CliError::io(format!("JSON serialization error: {e}")))?;
        std::fs::write(path, &json_str)
            .map_err(|e| CliError::io(format!("cannot write output: {e}")))?;
        eprintln!("wrote {}", path.display());
    }

    if args.json {
        let json_str = serde_json::to_string_pretty(&result)
            .map_err(|e| CliError::io(format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
    } else {
        report::print_result(&result).map_err(|e| CliError::io(e.to_string()))?;
    }

    if let Some(ref dir) = args.export {
        let path = dir.join(EXPORT_FILE_NAME);
        prooflens_io::write_filtered_csv(&result.joined_columns, &result.filtered.joined, &path)
            .map_err(|e| CliError { code: io_exit_code(&e), message: e.to_string(), hint: None })?;
        eprintln!("wrote {}", path.display());
    }

    Ok(())
}

/// Schema check only: normalize both exports against the mapping and report
/// what was found. No join, no aggregation.
pub fn cmd_validate(
    registry: PathBuf,
    headers: PathBuf,
    config_path: Option<PathBuf>,
) -> Result<(), CliError> {
    let config = load_config(config_path.as_deref())?;

    let registry_table = prooflens_io::read_table(&registry)
        .map_err(|e| CliError { code: io_exit_code(&e), message: e.to_string(), hint: None })?;
    let header_table = prooflens_io::read_table(&headers)
        .map_err(|e| CliError { code: io_exit_code(&e), message: e.to_string(), hint: None })?;

    let normalized = prooflens_engine::normalize::normalize(&config, &registry_table, &header_table)
        .map_err(|e| CliError {
            code: pipeline_exit_code(&e),
            message: e.to_string(),
            hint: Some("override column names with --config".into()),
        })?;

    let created = normalized.registry.iter().filter(|d| d.created.is_some()).count();
    let deadlines = normalized.registry.iter().filter(|d| d.deadline.is_some()).count();
    eprintln!(
        "registry: {} row(s), {} parseable creation date(s), {} parseable deadline(s), {} grade column(s)",
        normalized.registry.len(),
        created,
        deadlines,
        normalized.registry_columns.grade_columns.len(),
    );

    let completed = normalized.reviews.iter().filter(|r| r.completed.is_some()).count();
    eprintln!(
        "headers: {} row(s), {} literal completion flag(s), reviewer column {}",
        normalized.reviews.len(),
        completed,
        if normalized.header_columns.reviewer { "present" } else { "absent" },
    );

    eprintln!("valid: both exports carry their join key '{}'", config.columns.token);
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<AnalysisConfig, CliError> {
    match path {
        Some(path) => {
            let config_str = std::fs::read_to_string(path)
                .map_err(|e| CliError::io(format!("cannot read config: {e}")))?;
            AnalysisConfig::from_toml(&config_str)
                .map_err(|e| CliError { code: EXIT_CONFIG, message: e.to_string(), hint: None })
        }
        None => Ok(AnalysisConfig::default()),
    }
}

fn parse_date(input: &str) -> Result<NaiveDate, CliError> {
    NaiveDate::parse_from_str(input, "%Y-%m-%d").map_err(|_| {
        CliError::usage(format!("invalid date {input:?}"))
            .with_hint("dates use YYYY-MM-DD, e.g. --from 2024-04-01")
    })
}
