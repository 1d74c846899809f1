use clap::{CommandFactory, Parser};
use std::ffi::OsString;
use std::path::PathBuf;

use crate::config::PipelineConfig;
use crate::error::Result;

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Validate and summarise a healthcare claims dataset
#[derive(Parser, Debug, Clone)]
#[command(
    name = "claims-pipeline",
    about = "Validate and summarise a healthcare claims dataset",
    version
)]
pub struct Settings {
    /// Path to the input CSV (default: claim_data.csv if present)
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Directory receiving tables, chart data and reports
    #[arg(long, env = "OUTPUT_DIR", default_value = "outputs")]
    pub output_dir: PathBuf,

    /// JSON file overriding column aliases and thresholds
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Z-score at or above which a patient total is flagged
    #[arg(long, default_value = "3.0")]
    pub z_threshold: f64,

    /// Number of diagnosis codes in the top-diagnosis chart
    #[arg(long, default_value = "10", value_parser = clap::value_parser!(u32).range(1..))]
    pub top_n: u32,

    /// Rolling-average window for the monthly trend (1-24)
    #[arg(long, default_value = "3", value_parser = clap::value_parser!(u32).range(1..=24))]
    pub rolling_months: u32,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"])]
    pub log_level: String,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse the process arguments and build the run configuration.
    pub fn load_with_config() -> Result<(Self, PipelineConfig)> {
        Self::load_with_config_from_args(std::env::args_os().collect())
    }

    /// Same as [`Settings::load_with_config`] but accepts an explicit argument
    /// list, enabling unit-testing without spawning subprocesses.
    ///
    /// Values from `--config` are used unless the matching flag was given on
    /// the command line (CLI always wins).
    pub fn load_with_config_from_args(args: Vec<OsString>) -> Result<(Self, PipelineConfig)> {
        // Build raw ArgMatches so we can query ValueSource.
        let matches = Settings::command().get_matches_from(args.clone());
        let mut settings = Settings::parse_from(args);

        let mut config = match &settings.config {
            Some(path) => PipelineConfig::load_from(path)?,
            None => PipelineConfig::default(),
        };

        // NOTE: clap stores the arg id using the *field name* (underscores),
        // not the long-flag spelling (hyphens).
        if settings.config.is_none() || is_arg_explicitly_set(&matches, "z_threshold") {
            config.analysis.z_threshold = settings.z_threshold;
        }
        if settings.config.is_none() || is_arg_explicitly_set(&matches, "top_n") {
            config.analysis.top_n = settings.top_n as usize;
        }
        if settings.config.is_none() || is_arg_explicitly_set(&matches, "rolling_months") {
            config.analysis.rolling_months = settings.rolling_months as usize;
        }
        config.validate()?;

        // --debug overrides log level.
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }

        Ok((settings, config))
    }
}

// ── Helper: check if an arg was explicitly set on the command line ─────────────

/// Returns `true` when `name` was supplied explicitly on the command line
/// (not via default value or environment variable).
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(clap::parser::ValueSource::CommandLine)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
