use serde::Deserialize;

use crate::error::PipelineError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Analysis configuration. Every field has a default matching the column
/// layout of the production exports, so an empty TOML string is a valid
/// config.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub columns: ColumnMapping,
    /// Substrings identifying grade-indicator columns in the registry
    /// (one-hot grade applicability flags).
    #[serde(default = "default_grade_markers")]
    pub grade_markers: Vec<String>,
    #[serde(default)]
    pub roi: RoiConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            columns: ColumnMapping::default(),
            grade_markers: default_grade_markers(),
            roi: RoiConfig::default(),
        }
    }
}

fn default_grade_markers() -> Vec<String> {
    vec!["年生".into(), "学年その他".into()]
}

// ---------------------------------------------------------------------------
// Column mapping
// ---------------------------------------------------------------------------

/// Physical column names for the two exports. The registry's `token` column
/// is the canonical join key; the header table's `header_token` column is
/// renamed to it during normalization.
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnMapping {
    #[serde(default = "d_token")]
    pub token: String,
    #[serde(default = "d_header_token")]
    pub header_token: String,
    #[serde(default = "d_reviewer")]
    pub reviewer: String,
    #[serde(default = "d_name")]
    pub name: String,
    #[serde(default = "d_created")]
    pub created: String,
    #[serde(default = "d_modified")]
    pub modified: String,
    #[serde(default = "d_deadline")]
    pub deadline: String,
    #[serde(default = "d_stage")]
    pub stage: String,
    #[serde(default = "d_month")]
    pub month: String,
    #[serde(default = "d_fiscal_year")]
    pub fiscal_year: String,
    #[serde(default = "d_completed")]
    pub completed: String,
    #[serde(default = "d_next_check")]
    pub next_check: String,
}

fn d_token() -> String { "トークン".into() }
fn d_header_token() -> String { "制作物トークン".into() }
fn d_reviewer() -> String { "担当者メールアドレス".into() }
fn d_name() -> String { "制作物名".into() }
fn d_created() -> String { "作成日".into() }
fn d_modified() -> String { "修正日".into() }
fn d_deadline() -> String { "締め切り日".into() }
fn d_stage() -> String { "工程".into() }
fn d_month() -> String { "発刊月".into() }
fn d_fiscal_year() -> String { "年度".into() }
fn d_completed() -> String { "チェック済み".into() }
fn d_next_check() -> String { "次回チェック出し".into() }

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            token: d_token(),
            header_token: d_header_token(),
            reviewer: d_reviewer(),
            name: d_name(),
            created: d_created(),
            modified: d_modified(),
            deadline: d_deadline(),
            stage: d_stage(),
            month: d_month(),
            fiscal_year: d_fiscal_year(),
            completed: d_completed(),
            next_check: d_next_check(),
        }
    }
}

impl ColumnMapping {
    /// The three date-valued columns coerced during normalization.
    pub fn date_columns(&self) -> [&str; 3] {
        [&self.created, &self.modified, &self.deadline]
    }
}

// ---------------------------------------------------------------------------
// ROI
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct RoiConfig {
    /// Estimated minutes saved per analyzed deliverable.
    #[serde(default = "default_minutes_saved")]
    pub minutes_saved_per_item: u32,
}

fn default_minutes_saved() -> u32 {
    5
}

impl Default for RoiConfig {
    fn default() -> Self {
        Self {
            minutes_saved_per_item: default_minutes_saved(),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl AnalysisConfig {
    pub fn from_toml(input: &str) -> Result<Self, PipelineError> {
        let config: AnalysisConfig =
            toml::from_str(input).map_err(|e| PipelineError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        let c = &self.columns;
        let names = [
            ("token", &c.token),
            ("header_token", &c.header_token),
            ("reviewer", &c.reviewer),
            ("name", &c.name),
            ("created", &c.created),
            ("modified", &c.modified),
            ("deadline", &c.deadline),
            ("stage", &c.stage),
            ("month", &c.month),
            ("fiscal_year", &c.fiscal_year),
            ("completed", &c.completed),
            ("next_check", &c.next_check),
        ];
        for (role, name) in names {
            if name.is_empty() {
                return Err(PipelineError::ConfigValidation(format!(
                    "column '{role}' must not be empty"
                )));
            }
        }

        if self.grade_markers.is_empty() || self.grade_markers.iter().any(String::is_empty) {
            return Err(PipelineError::ConfigValidation(
                "grade_markers must be a non-empty list of non-empty strings".into(),
            ));
        }

        // The canonical key doubles as the post-rename header key; a mapping
        // where another header column shares its name would be ambiguous.
        if c.token == c.reviewer {
            return Err(PipelineError::ConfigValidation(
                "token and reviewer columns must differ".into(),
            ));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
