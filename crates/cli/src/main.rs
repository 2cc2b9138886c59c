// ProofLens CLI - headless check-workflow analysis

mod analyze;
mod exit_codes;
mod report;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};

use exit_codes::{EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "plens")]
#[command(about = "Publishing check-workflow analyzer (headless)")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Join the deliverable registry with review headers and report metrics
    #[command(after_help = "\
Examples:
  plens analyze registry.csv headers.csv
  plens analyze registry.csv headers.csv --from 2024-04-01 --to 2025-03-31
  plens analyze registry.csv headers.csv --month 10月号 --grade 1年生 --grade 2年生
  plens analyze registry.csv headers.csv --by grade --by month --json
  plens analyze registry.csv headers.csv --contains ドリル --export out/
  plens analyze registry.csv headers.csv --config columns.toml --output result.json")]
    Analyze {
        /// Deliverable registry export (CSV)
        registry: PathBuf,

        /// Review header export (CSV)
        headers: PathBuf,

        /// Column-mapping config (TOML; defaults apply when omitted)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Keep deliverables created on or after this date (YYYY-MM-DD)
        #[arg(long, value_name = "DATE")]
        from: Option<String>,

        /// Keep deliverables created on or before this date (YYYY-MM-DD)
        #[arg(long, value_name = "DATE")]
        to: Option<String>,

        /// Keep a single fiscal year
        #[arg(long)]
        year: Option<String>,

        /// Keep a single publication month
        #[arg(long)]
        month: Option<String>,

        /// Grade to keep. Repeatable; omit to keep all
        #[arg(long)]
        grade: Vec<String>,

        /// Keep deliverables whose name contains this substring
        #[arg(long, value_name = "TEXT")]
        contains: Option<String>,

        /// Grouping dimension for the metrics table. Repeatable;
        /// defaults to grade + stage
        #[arg(long, value_name = "DIM")]
        by: Vec<ByDimension>,

        /// Output the full result as JSON to stdout instead of tables
        #[arg(long)]
        json: bool,

        /// Write the JSON result to a file
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Write the filtered joined view as filtered_data.csv into this
        /// directory
        #[arg(long, value_name = "DIR")]
        export: Option<PathBuf>,
    },

    /// Check the two exports against the column mapping without aggregating
    #[command(after_help = "\
Examples:
  plens validate registry.csv headers.csv
  plens validate registry.csv headers.csv --config columns.toml

Exit codes:
  0  Both exports carry their join key
  3  An export cannot be read or parsed
  4  A join-key column is missing
  5  The config is invalid")]
    Validate {
        /// Deliverable registry export (CSV)
        registry: PathBuf,

        /// Review header export (CSV)
        headers: PathBuf,

        /// Column-mapping config (TOML; defaults apply when omitted)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ByDimension {
    Grade,
    Stage,
    Month,
}

impl From<ByDimension> for prooflens_engine::aggregate::Dimension {
    fn from(dim: ByDimension) -> Self {
        match dim {
            ByDimension::Grade => Self::Grade,
            ByDimension::Stage => Self::Stage,
            ByDimension::Month => Self::Month,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Analyze {
            registry,
            headers,
            config,
            from,
            to,
            year,
            month,
            grade,
            contains,
            by,
            json,
            output,
            export,
        } => analyze::cmd_analyze(analyze::AnalyzeArgs {
            registry,
            headers,
            config,
            from,
            to,
            year,
            month,
            grades: grade,
            contains,
            by,
            json,
            output,
            export,
        }),
        Commands::Validate { registry, headers, config } => {
            analyze::cmd_validate(registry, headers, config)
        }
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn usage(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
