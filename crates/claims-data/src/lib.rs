//! Data layer for the claims pipeline.
//!
//! Responsible for reading the raw CSV, gating it through the integrity
//! checks, cleaning it, computing KPIs and the other aggregates, and writing
//! every resulting table and chart file.

pub mod aggregator;
pub mod analysis;
pub mod anomalies;
pub mod charts;
pub mod cleaning;
pub mod concentration;
pub mod kpis;
pub mod quality;
pub mod reader;
pub mod writer;

pub use analysis::{run_pipeline, Analysis, PipelineOutcome, RunMetadata};
pub use writer::OutputLayout;
