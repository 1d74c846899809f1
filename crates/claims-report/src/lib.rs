//! Markdown reporting layer for the claims pipeline.
//!
//! Turns a computed [`PipelineOutcome`] into `REPORT.md`, `README.md` and the
//! data dictionary. All of them read only from computed values, so the
//! documents always match the tables written alongside them.

pub mod dictionary;
pub mod markdown;
pub mod readme;
pub mod report;

use std::path::PathBuf;

use claims_core::config::PipelineConfig;
use claims_core::error::Result;
use claims_data::{OutputLayout, PipelineOutcome};

pub use dictionary::{render_data_dictionary, write_data_dictionary, ColumnType};
pub use readme::{render_readme, write_readme};
pub use report::{render_report, write_report};

/// Write every Markdown document for one run. Returns the written paths.
pub fn write_reports(
    outcome: &PipelineOutcome,
    layout: &OutputLayout,
    config: &PipelineConfig,
) -> Result<Vec<PathBuf>> {
    let report = write_report(outcome, layout, config.analysis.z_threshold)?;
    let readme = write_readme(
        &outcome.analysis.kpis,
        &outcome.analysis.concentration,
        layout,
    )?;
    let dictionary = write_data_dictionary(&outcome.cleaned, &config.columns, layout)?;
    Ok(vec![report, readme, dictionary])
}
