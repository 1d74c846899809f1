//! Main analysis pipeline.
//!
//! Orchestrates loading, the integrity gate, cleaning, the aggregators and
//! chart projections, writing each artifact under the output root and
//! returning a [`PipelineOutcome`] ready for the report stage.

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{Local, NaiveDateTime, Utc};
use claims_core::config::PipelineConfig;
use claims_core::error::Result;
use claims_core::table::Table;
use tracing::{debug, info, warn};

use crate::anomalies::AnomalyTable;
use crate::charts::ChartSet;
use crate::cleaning::clean;
use crate::concentration::CostConcentration;
use crate::kpis::KpiSummary;
use crate::quality::{run_integrity_checks_at, IntegrityReport};
use crate::reader::load_table;
use crate::writer::{write_json, write_table, OutputLayout};

// ── Public types ──────────────────────────────────────────────────────────────

/// Metadata produced alongside the pipeline outcome.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RunMetadata {
    /// ISO-8601 timestamp when this result was generated.
    pub generated_at: String,
    /// The CSV that was analysed.
    pub input_path: PathBuf,
    /// Rows in the raw table.
    pub rows_loaded: usize,
    /// Rows that survived cleaning.
    pub rows_cleaned: usize,
    /// Wall-clock seconds spent reading the CSV.
    pub load_time_seconds: f64,
    /// Wall-clock seconds spent on checks, cleaning and aggregation.
    pub analysis_time_seconds: f64,
}

/// Aggregates computed from a cleaned table.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub kpis: KpiSummary,
    pub concentration: CostConcentration,
    pub anomalies: AnomalyTable,
    pub charts: ChartSet,
}

impl Analysis {
    /// Run every aggregator and projection over `cleaned`. Never fails.
    pub fn compute(cleaned: &Table, config: &PipelineConfig) -> Self {
        let spec = &config.columns;
        let analysis = &config.analysis;
        Self {
            kpis: KpiSummary::summarize(cleaned, spec),
            concentration: CostConcentration::compute(
                cleaned,
                spec,
                &analysis.concentration_thresholds_pct,
            ),
            anomalies: AnomalyTable::detect(cleaned, spec, analysis.z_threshold),
            charts: ChartSet::project(cleaned, spec, analysis),
        }
    }
}

/// The complete output of [`run_pipeline`].
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub integrity: IntegrityReport,
    pub cleaned: Table,
    pub analysis: Analysis,
    /// Every file written, in write order (diagnostics first).
    pub artifacts: Vec<PathBuf>,
    pub metadata: RunMetadata,
}

// ── Public function ───────────────────────────────────────────────────────────

/// Run the full pipeline.
///
/// 1. Load the CSV at `input`.
/// 2. Run the integrity gate (diagnostics are written even when it fails).
/// 3. Clean the table and write `data/claims_clean.csv`.
/// 4. Compute KPIs, cost concentration, anomalies and chart data.
/// 5. Write every table and chart file under `output_dir`.
pub fn run_pipeline(
    input: &Path,
    output_dir: &Path,
    config: &PipelineConfig,
) -> Result<PipelineOutcome> {
    run_pipeline_at(input, output_dir, config, Local::now().naive_local())
}

/// [`run_pipeline`] with an explicit reference time for the date checks.
pub fn run_pipeline_at(
    input: &Path,
    output_dir: &Path,
    config: &PipelineConfig,
    now: NaiveDateTime,
) -> Result<PipelineOutcome> {
    let layout = OutputLayout::new(output_dir);

    // ── Step 1: Load ──────────────────────────────────────────────────────────
    info!("Loading {}", input.display());
    let load_start = Instant::now();
    let raw = load_table(input)?;
    let load_time = load_start.elapsed().as_secs_f64();
    debug!(
        "Loaded {} rows, {} columns in {:.3}s",
        raw.row_count(),
        raw.column_count(),
        load_time
    );

    // ── Step 2: Integrity gate ────────────────────────────────────────────────
    let analysis_start = Instant::now();
    let integrity = run_integrity_checks_at(&raw, output_dir, config, now)?;
    let mut artifacts = vec![
        integrity.missingness_path.clone(),
        integrity.profile_path.clone(),
    ];

    // ── Step 3: Clean ─────────────────────────────────────────────────────────
    let cleaned = clean(&raw, &config.columns);
    info!(
        "Cleaned table: {} of {} rows kept",
        cleaned.row_count(),
        raw.row_count()
    );
    write_artifact(&mut artifacts, layout.clean_csv(), |p| {
        write_table(p, &cleaned)
    })?;

    // ── Step 4: Aggregate ─────────────────────────────────────────────────────
    let analysis = Analysis::compute(&cleaned, config);
    if let Some(note) = analysis.concentration.note() {
        warn!("Cost concentration unavailable: {}", note);
    }
    if analysis.anomalies.is_empty() {
        debug!("No patients at or above z = {}", config.analysis.z_threshold);
    } else {
        info!("Flagged {} patient anomalies", analysis.anomalies.len());
    }

    // ── Step 5: Write tables and charts ───────────────────────────────────────
    write_artifact(&mut artifacts, layout.kpis_summary_csv(), |p| {
        write_table(p, &analysis.kpis)
    })?;
    write_artifact(&mut artifacts, layout.kpis_long_csv(), |p| {
        write_table(p, &analysis.kpis.to_long_rows())
    })?;
    write_artifact(&mut artifacts, layout.cost_concentration_csv(), |p| {
        write_table(p, &analysis.concentration)
    })?;
    write_artifact(&mut artifacts, layout.patient_anomalies_csv(), |p| {
        write_table(p, &analysis.anomalies)
    })?;

    let charts = &analysis.charts;
    if let Some(chart) = &charts.amount_distribution {
        write_artifact(&mut artifacts, layout.chart_json("claim_amount_distribution"), |p| {
            write_json(p, chart)
        })?;
    }
    if let Some(chart) = &charts.patient_totals {
        write_artifact(&mut artifacts, layout.chart_json("patient_total_boxplot"), |p| {
            write_json(p, chart)
        })?;
    }
    if let Some(chart) = &charts.top_dx {
        write_artifact(&mut artifacts, layout.chart_json("top_dx"), |p| {
            write_json(p, chart)
        })?;
    }
    if let Some(chart) = &charts.monthly_trend {
        write_artifact(&mut artifacts, layout.chart_json("monthly_trend"), |p| {
            write_json(p, chart)
        })?;
    }
    if let Some(chart) = &charts.pareto {
        write_artifact(&mut artifacts, layout.chart_json("pareto"), |p| {
            write_json(p, chart)
        })?;
    }
    let analysis_time = analysis_start.elapsed().as_secs_f64();

    // ── Step 6: Build outcome ─────────────────────────────────────────────────
    let metadata = RunMetadata {
        generated_at: Utc::now().to_rfc3339(),
        input_path: input.to_path_buf(),
        rows_loaded: raw.row_count(),
        rows_cleaned: cleaned.row_count(),
        load_time_seconds: load_time,
        analysis_time_seconds: analysis_time,
    };

    Ok(PipelineOutcome {
        integrity,
        cleaned,
        analysis,
        artifacts,
        metadata,
    })
}

// ── Private helpers ───────────────────────────────────────────────────────────

fn write_artifact(
    artifacts: &mut Vec<PathBuf>,
    path: PathBuf,
    write: impl FnOnce(&Path) -> Result<()>,
) -> Result<()> {
    write(&path)?;
    info!("Wrote {}", path.display());
    artifacts.push(path);
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
