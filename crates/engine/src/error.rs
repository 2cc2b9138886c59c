use std::fmt;

#[derive(Debug)]
pub enum PipelineError {
    /// Raw tabular input could not be read at all. The message describes the
    /// failure but never echoes row content.
    Parse(String),
    /// The join-key column is absent from one of the two tables. Fatal:
    /// no join is attempted.
    MissingJoinKey { table: String, column: String },
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (empty column name, bad marker list, etc.).
    ConfigValidation(String),
    /// Inconsistent filter parameters (end date before start date).
    InvalidFilter(String),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(msg) => write!(f, "parse error: {msg}"),
            Self::MissingJoinKey { table, column } => {
                write!(f, "table '{table}': join-key column '{column}' not found")
            }
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::InvalidFilter(msg) => write!(f, "invalid filter: {msg}"),
        }
    }
}

impl std::error::Error for PipelineError {}
