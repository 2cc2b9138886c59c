//! `prooflens-engine` — publishing check-workflow analysis engine.
//!
//! Pure engine crate: receives two pre-loaded raw tables (deliverable
//! registry + review headers), joins them on the shared token, applies the
//! filter chain and returns scaffolded metrics. No CLI or IO dependencies.

pub mod aggregate;
pub mod chart;
pub mod config;
pub mod engine;
pub mod enrich;
pub mod error;
pub mod filter;
pub mod grades;
pub mod model;
pub mod normalize;
pub mod ordering;
pub mod summary;

pub use config::AnalysisConfig;
pub use engine::{run, AnalysisInput, AnalysisResult};
pub use error::PipelineError;
pub use filter::FilterParams;
pub use model::RawTable;
