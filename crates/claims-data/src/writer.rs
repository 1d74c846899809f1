//! Output layout and file writers.
//!
//! Every artifact the pipeline produces lives under one output root. The
//! [`OutputLayout`] names each path so producers and the report stage agree
//! on where things are.

use std::path::{Path, PathBuf};

use claims_core::error::Result;
use claims_core::table::TabularOutput;
use serde::Serialize;
use tracing::debug;

// ── OutputLayout ──────────────────────────────────────────────────────────────

/// Fixed directory structure under the output root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn tables_dir(&self) -> PathBuf {
        self.root.join("tables")
    }

    pub fn charts_dir(&self) -> PathBuf {
        self.root.join("charts")
    }

    pub fn missingness_csv(&self) -> PathBuf {
        self.tables_dir().join("missingness.csv")
    }

    pub fn basic_profile_csv(&self) -> PathBuf {
        self.tables_dir().join("basic_profile.csv")
    }

    pub fn kpis_summary_csv(&self) -> PathBuf {
        self.tables_dir().join("kpis_summary.csv")
    }

    pub fn kpis_long_csv(&self) -> PathBuf {
        self.tables_dir().join("kpis.csv")
    }

    pub fn cost_concentration_csv(&self) -> PathBuf {
        self.tables_dir().join("cost_concentration.csv")
    }

    pub fn patient_anomalies_csv(&self) -> PathBuf {
        self.tables_dir().join("patient_anomalies.csv")
    }

    pub fn clean_csv(&self) -> PathBuf {
        self.root.join("data").join("claims_clean.csv")
    }

    /// Chart data file, e.g. `chart_json("pareto")` → `charts/pareto.json`.
    pub fn chart_json(&self, name: &str) -> PathBuf {
        self.charts_dir().join(format!("{name}.json"))
    }

    pub fn report_md(&self) -> PathBuf {
        self.root.join("REPORT.md")
    }

    pub fn readme_md(&self) -> PathBuf {
        self.root.join("README.md")
    }

    pub fn data_dictionary_md(&self) -> PathBuf {
        self.root.join("docs").join("data_dictionary.md")
    }
}

// ── Writers ───────────────────────────────────────────────────────────────────

/// Write a header + records table as CSV, creating parent directories.
pub fn write_table(path: &Path, table: &impl TabularOutput) -> Result<()> {
    ensure_parent(path)?;
    let mut writer = csv::WriterBuilder::new().from_path(path)?;
    writer.write_record(table.headers())?;
    let records = table.records();
    for record in &records {
        writer.write_record(record)?;
    }
    writer.flush()?;
    debug!("Wrote {} rows to {}", records.len(), path.display());
    Ok(())
}

/// Pretty-print `value` as JSON.
///
/// Writes to a sibling `.tmp` file first and renames it into place so a
/// crashed run never leaves a half-written file behind.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value)?;
    write_text(path, &content)
}

/// Write a text file atomically, creating parent directories.
pub fn write_text(path: &Path, content: &str) -> Result<()> {
    ensure_parent(path)?;
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, content)?;
    std::fs::rename(&tmp, path)?;
    debug!("Wrote {}", path.display());
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
