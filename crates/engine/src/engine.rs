use serde::Serialize;

use crate::aggregate::{self, Dimension, DimensionValues, MetricsRow, NextCheckRow};
use crate::chart::{self, ChartFeed};
use crate::config::AnalysisConfig;
use crate::enrich::build_dataset;
use crate::error::PipelineError;
use crate::filter::{self, FilterParams, FilteredData};
use crate::model::{Dataset, JoinedRow, RawTable};
use crate::normalize::normalize;
use crate::ordering::{stage_reference, EffectiveOrder, MONTH_ORDER};
use crate::summary::{self, RoiEstimate, RunSummary};

/// The two raw exports for one analysis pass.
pub struct AnalysisInput {
    pub registry: RawTable,
    pub headers: RawTable,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunMeta {
    pub engine_version: String,
    pub run_at: String,
    pub dimensions: Vec<Dimension>,
}

/// Detail block for one active process stage (one dashboard tab).
#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    pub stage: String,
    /// Whether this stage is a rework (corrective) pass.
    pub rework: bool,
    /// Grade-scaffolded performance rows for this stage.
    pub performance: Vec<MetricsRow>,
    pub next_check: Vec<NextCheckRow>,
    pub charts: Vec<ChartFeed>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    pub meta: RunMeta,
    pub summary: RunSummary,
    /// The scaffolded metrics table over the requested dimensions.
    pub performance: Vec<MetricsRow>,
    pub stages: Vec<StageReport>,
    pub monthly_trend: ChartFeed,
    pub roi: RoiEstimate,
    /// Effective orderings (reference order ∩ observed values).
    pub month_order: Vec<String>,
    pub stage_order: Vec<String>,
    /// Stages surviving the filter chain, in effective order.
    pub active_stages: Vec<String>,
    pub rework_stages: Vec<String>,
    /// The filtered views, kept for export; not part of the JSON output.
    #[serde(skip)]
    pub filtered: FilteredData,
    /// Column order of the joined view, for export.
    #[serde(skip)]
    pub joined_columns: Vec<String>,
}

/// One full recomputation pass: normalize → enrich/join → ordering →
/// filters → grades → aggregate. Hard errors abort before any partial
/// output; soft conditions surface as summary notices.
pub fn run(
    config: &AnalysisConfig,
    input: &AnalysisInput,
    params: &FilterParams,
    dimensions: &[Dimension],
) -> Result<AnalysisResult, PipelineError> {
    let dimensions: Vec<Dimension> = if dimensions.is_empty() {
        vec![Dimension::Grade, Dimension::Stage]
    } else {
        dimensions.to_vec()
    };

    let normalized = normalize(config, &input.registry, &input.headers)?;
    let dataset = build_dataset(config, normalized);

    let month_order = effective_months(&dataset);
    let stage_order = effective_stages(&dataset);

    let filtered = filter::apply(&dataset, params)?;

    // Stages to report on: the effective order narrowed to what survived
    // the filters (tab order of the dashboard).
    let active_stages = stage_order.restrict_to(
        filtered
            .joined
            .iter()
            .filter_map(|j| j.stage.as_deref()),
    );

    let on_time_available = dataset.header_columns.completed
        && dataset.header_columns.modified
        && dataset.registry_columns.deadline;

    let values = DimensionValues {
        grades: filtered.selected_grades.clone(),
        stages: active_stages.labels().to_vec(),
        months: month_order.labels().to_vec(),
    };
    let performance = aggregate::performance(&dimensions, &values, &filtered, on_time_available);

    let stages = active_stages
        .labels()
        .iter()
        .map(|stage| stage_report(stage, &filtered, &active_stages, on_time_available))
        .collect();

    let monthly_trend = chart::monthly_trend(&month_order, &filtered, on_time_available);

    let summary = summary::compute_summary(&dataset, &filtered);
    let roi = RoiEstimate::new(summary.analyzed_tokens, &config.roi);

    let result = AnalysisResult {
        meta: RunMeta {
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
            dimensions,
        },
        summary,
        performance,
        stages,
        monthly_trend,
        roi,
        month_order: month_order.labels().to_vec(),
        stage_order: stage_order.labels().to_vec(),
        active_stages: active_stages.labels().to_vec(),
        rework_stages: active_stages.rework_labels(),
        filtered,
        joined_columns: dataset.joined_columns.clone(),
    };

    // `dataset` and the other intermediates drop here; only the filtered
    // views and aggregates survive the pass.
    Ok(result)
}

fn stage_report(
    stage: &str,
    filtered: &FilteredData,
    active_stages: &EffectiveOrder,
    on_time_available: bool,
) -> StageReport {
    let values = DimensionValues {
        grades: filtered.selected_grades.clone(),
        stages: vec![stage.to_string()],
        months: Vec::new(),
    };
    let performance = aggregate::performance(
        &[Dimension::Grade, Dimension::Stage],
        &values,
        filtered,
        on_time_available,
    );

    let stage_rows: Vec<&JoinedRow> = filtered
        .joined
        .iter()
        .filter(|j| j.stage.as_deref() == Some(stage))
        .collect();
    let next_check = aggregate::next_check_by_grade(&stage_rows, filtered, &filtered.selected_grades);

    let charts = vec![
        chart::next_check_ratio(stage, &next_check),
        chart::next_check_count(stage, &next_check),
    ];

    StageReport {
        stage: stage.to_string(),
        rework: active_stages.rework_labels().iter().any(|l| l == stage),
        performance,
        next_check,
        charts,
    }
}

/// Months observed across both views (nulls removed), in reference order.
fn effective_months(dataset: &Dataset) -> EffectiveOrder {
    let observed = dataset
        .registry
        .iter()
        .filter_map(|d| d.month.as_deref())
        .chain(dataset.joined.iter().filter_map(|j| j.month.as_deref()));
    EffectiveOrder::from_observed(MONTH_ORDER, observed)
}

/// Stages observed across both views, in reference order.
fn effective_stages(dataset: &Dataset) -> EffectiveOrder {
    let observed = dataset
        .registry
        .iter()
        .filter_map(|d| d.stage.as_deref())
        .chain(dataset.joined.iter().filter_map(|j| j.stage.as_deref()));
    EffectiveOrder::from_observed(stage_reference(), observed)
}
