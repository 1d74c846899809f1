//! Immutable configuration values handed to each pipeline component.
//!
//! Every struct deserialises with per-field defaults, so a JSON config file
//! only needs to name the values it overrides.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::columns::ColumnSpec;
use crate::error::{ClaimsError, Result};

// ── QualityConfig ─────────────────────────────────────────────────────────────

/// Settings for the integrity-check gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    /// Columns whose absence fails the run.
    pub required_columns: Vec<String>,
    /// How far past "now" the latest service date may lie.
    pub future_date_tolerance_days: i64,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            required_columns: vec!["Billed Amount".to_string()],
            future_date_tolerance_days: 1,
        }
    }
}

// ── AnalysisConfig ────────────────────────────────────────────────────────────

/// Thresholds and window sizes for the aggregators and chart projections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Population percentiles reported by the cost concentration table and
    /// marked on the Pareto curve, in whole percent.
    pub concentration_thresholds_pct: Vec<u32>,
    /// Minimum z-score for a patient to be flagged.
    pub z_threshold: f64,
    /// Number of bars in the top-diagnosis chart.
    pub top_n: usize,
    /// Trailing window (in months) of the monthly rolling average.
    pub rolling_months: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            concentration_thresholds_pct: vec![1, 5, 10],
            z_threshold: 3.0,
            top_n: 10,
            rolling_months: 3,
        }
    }
}

// ── PipelineConfig ────────────────────────────────────────────────────────────

/// Complete configuration for one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub columns: ColumnSpec,
    pub quality: QualityConfig,
    pub analysis: AnalysisConfig,
}

impl PipelineConfig {
    /// Load a config file. Missing fields take their defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ClaimsError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values no component can work with.
    pub fn validate(&self) -> Result<()> {
        let a = &self.analysis;
        if !a.z_threshold.is_finite() {
            return Err(ClaimsError::Config("z_threshold must be finite".into()));
        }
        if a.top_n == 0 {
            return Err(ClaimsError::Config("top_n must be at least 1".into()));
        }
        if a.rolling_months == 0 {
            return Err(ClaimsError::Config(
                "rolling_months must be at least 1".into(),
            ));
        }
        if let Some(bad) = a
            .concentration_thresholds_pct
            .iter()
            .find(|p| **p == 0 || **p > 100)
        {
            return Err(ClaimsError::Config(format!(
                "concentration threshold {bad}% is outside 1..=100"
            )));
        }
        if self.columns.billed_amount.is_empty() {
            return Err(ClaimsError::Config(
                "columns.billed_amount must not be empty".into(),
            ));
        }
        Ok(())
    }
}
