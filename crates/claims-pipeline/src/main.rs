mod bootstrap;

use anyhow::{Context, Result};
use claims_core::settings::Settings;
use claims_data::{run_pipeline, OutputLayout};
use claims_report::write_reports;

fn main() -> Result<()> {
    let (settings, config) = Settings::load_with_config()?;

    bootstrap::setup_logging(&settings.log_level)?;

    tracing::info!("claims-pipeline v{} starting", env!("CARGO_PKG_VERSION"));

    let cwd = std::env::current_dir().context("cannot determine the working directory")?;
    let input = bootstrap::resolve_input(&cwd, settings.input.as_deref())?;
    let layout = OutputLayout::new(cwd.join(&settings.output_dir));
    bootstrap::ensure_output_dirs(&layout)?;

    tracing::info!(
        "Input: {}, output: {}",
        input.display(),
        layout.root().display()
    );

    // Integrity failures surface here as a non-zero exit with the full
    // failure list and next steps.
    let outcome = run_pipeline(&input, layout.root(), &config)?;
    write_reports(&outcome, &layout, &config)?;

    tracing::debug!(
        "Loaded in {:.3}s, analysed in {:.3}s",
        outcome.metadata.load_time_seconds,
        outcome.metadata.analysis_time_seconds
    );

    println!("Pipeline completed successfully.");
    println!("- Report: {}", layout.report_md().display());
    println!("- README: {}", layout.readme_md().display());
    println!("- Clean dataset: {}", layout.clean_csv().display());
    println!("- KPIs: {}", layout.kpis_summary_csv().display());
    println!("- Charts: {}", layout.charts_dir().display());
    println!("- Data dictionary: {}", layout.data_dictionary_md().display());

    Ok(())
}
