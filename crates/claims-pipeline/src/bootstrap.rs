use std::path::{Path, PathBuf};

use claims_data::reader::pick_input_path;
use claims_data::OutputLayout;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// ── Directory bootstrap ────────────────────────────────────────────────────────

/// Ensure the output directory hierarchy exists.
///
/// Creates the following directories if absent (including any missing parents):
/// - `<output>/tables/`
/// - `<output>/charts/`
/// - `<output>/data/`
/// - `<output>/docs/`
pub fn ensure_output_dirs(layout: &OutputLayout) -> anyhow::Result<()> {
    std::fs::create_dir_all(layout.tables_dir())?;
    std::fs::create_dir_all(layout.charts_dir())?;
    for file in [layout.clean_csv(), layout.data_dictionary_md()] {
        if let Some(parent) = file.parent() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

// ── Logging bootstrap ──────────────────────────────────────────────────────────

/// Initialise the global `tracing` subscriber, writing to stderr.
///
/// `log_level` is mapped to a [`tracing_subscriber::EnvFilter`] directive.
/// Falls back to `"info"` if the level string is not recognised.
pub fn setup_logging(log_level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(level_directive(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(subscriber)
        .init();

    Ok(())
}

/// Map CLI level names to tracing directives (tracing uses lowercase).
fn level_directive(log_level: &str) -> String {
    let upper = log_level.to_uppercase();
    match upper.as_str() {
        "DEBUG" => "debug".to_string(),
        "INFO" => "info".to_string(),
        "WARNING" => "warn".to_string(),
        "ERROR" => "error".to_string(),
        _ => log_level.to_lowercase(),
    }
}

// ── Input discovery ────────────────────────────────────────────────────────────

/// Locate the input CSV relative to `cwd`.
///
/// Uses `explicit` when given; otherwise the first existing default file name
/// (`claim_data.csv`, then `MedicalClaimsSynthetic1M.csv`).
pub fn resolve_input(cwd: &Path, explicit: Option<&Path>) -> anyhow::Result<PathBuf> {
    let path = pick_input_path(cwd, explicit)?;
    if !path.is_file() {
        anyhow::bail!("input file {} does not exist", path.display());
    }
    Ok(path)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
