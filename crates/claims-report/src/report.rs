//! `REPORT.md`: the human-readable summary of one pipeline run.
//!
//! Every number is read from the computed outcome; nothing is typed by hand.

use std::path::{Path, PathBuf};

use claims_core::error::Result;
use claims_core::formatting::{format_currency, format_number};
use claims_data::analysis::PipelineOutcome;
use claims_data::concentration::CostConcentration;
use claims_data::kpis::KpiSummary;
use claims_data::writer::{write_text, OutputLayout};
use tracing::info;

use crate::markdown::{Align, MarkdownTable};

/// Flagged patients listed in the report body; the CSV has all of them.
const MAX_LISTED_ANOMALIES: usize = 10;

// ── Public API ────────────────────────────────────────────────────────────────

/// Render and write `REPORT.md` under the output root.
pub fn write_report(
    outcome: &PipelineOutcome,
    layout: &OutputLayout,
    z_threshold: f64,
) -> Result<PathBuf> {
    let path = layout.report_md();
    let content = render_report(outcome, layout, z_threshold);
    write_text(&path, &content)?;
    info!("Wrote {}", path.display());
    Ok(path)
}

/// Render the report as Markdown.
pub fn render_report(outcome: &PipelineOutcome, layout: &OutputLayout, z_threshold: f64) -> String {
    let meta = &outcome.metadata;
    let analysis = &outcome.analysis;
    let mut lines: Vec<String> = Vec::new();

    lines.push("# Healthcare Claims Pipeline Report".into());
    lines.push(String::new());
    lines.push(format!(
        "Generated by `claims-pipeline` at {}.",
        meta.generated_at
    ));
    lines.push(String::new());

    // ── Inputs ────────────────────────────────────────────────────────────────
    lines.push("## Inputs".into());
    lines.push(String::new());
    lines.push(format!("- Input CSV: `{}`", file_name(&meta.input_path)));
    lines.push(format!(
        "- Clean dataset: `{}`",
        relative(layout, &layout.clean_csv())
    ));
    lines.push(format!(
        "- Rows loaded: {}; rows after cleaning: {}",
        format_number(meta.rows_loaded as f64, 0),
        format_number(meta.rows_cleaned as f64, 0)
    ));
    lines.push(format!("- Grain: {}", outcome.integrity.grain));
    lines.push(String::new());

    // ── KPIs ──────────────────────────────────────────────────────────────────
    lines.push("## Key KPIs".into());
    lines.push(String::new());
    lines.extend(kpi_table(&analysis.kpis).render());
    lines.push(String::new());

    // ── Cost concentration ────────────────────────────────────────────────────
    lines.push("## Cost Concentration".into());
    lines.push(String::new());
    match &analysis.concentration {
        CostConcentration::Computed(rows) => {
            let mut table = MarkdownTable::new(["% of Patients", "Patients", "% of Total Cost"])
                .align(1, Align::Right)
                .align(2, Align::Right);
            for r in rows {
                table.row([
                    format!("Top {}%", r.top_pct_patients),
                    format!("{} of {}", r.patient_count, r.total_patients),
                    format!("{:.2}%", r.cost_share_pct),
                ]);
            }
            lines.extend(table.render());
        }
        CostConcentration::Unavailable { note } => lines.push(format!("_{note}_")),
    }
    lines.push(String::new());

    // ── Anomalies ─────────────────────────────────────────────────────────────
    lines.push("## Anomaly Detection".into());
    lines.push(String::new());
    lines.push(format!(
        "- Flagged patients (z-score ≥ {z_threshold} on patient total billed): {}",
        analysis.anomalies.len()
    ));
    if analysis.anomalies.is_empty() {
        lines.push(
            "- Note: In synthetic or tightly-bounded data, patient totals may not produce \
             extreme z-scores; this is expected."
                .into(),
        );
    } else {
        lines.push(String::new());
        let mut table = MarkdownTable::new(["Patient", "Total Billed", "Z-Score"])
            .align(1, Align::Right)
            .align(2, Align::Right);
        for r in analysis.anomalies.rows.iter().take(MAX_LISTED_ANOMALIES) {
            table.row([
                r.patient_id.clone(),
                format_currency(r.total_billed),
                format!("{:.2}", r.z_score),
            ]);
        }
        lines.extend(table.render());
    }
    lines.push(String::new());

    // ── Outputs ───────────────────────────────────────────────────────────────
    lines.push("## Outputs".into());
    lines.push(String::new());
    lines.push("Tables:".into());
    lines.push(String::new());
    for path in &outcome.artifacts {
        if path.extension().is_some_and(|e| e == "csv") {
            lines.push(format!("- `{}`", relative(layout, path)));
        }
    }
    lines.push(String::new());

    let charts: Vec<&PathBuf> = outcome
        .artifacts
        .iter()
        .filter(|p| p.extension().is_some_and(|e| e == "json"))
        .collect();
    if !charts.is_empty() {
        lines.push("Chart data:".into());
        lines.push(String::new());
        for path in charts {
            lines.push(format!("- `{}`", relative(layout, path)));
        }
        lines.push(String::new());
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn kpi_table(kpis: &KpiSummary) -> MarkdownTable {
    let mut table = MarkdownTable::new(["Metric", "Value"]).align(1, Align::Right);
    table.row(["Rows".to_string(), format_number(kpis.row_count as f64, 0)]);
    table.row([
        "Total billed amount".to_string(),
        format_currency(kpis.total_billed_amount),
    ]);

    if let Some(a) = &kpis.claim_amounts {
        table.row(["Average claim".to_string(), format_currency(a.avg_claim_amount)]);
        table.row(["Median claim".to_string(), format_currency(a.median_claim_amount)]);
        table.row(["P95 claim".to_string(), format_currency(a.p95_claim_amount)]);
    }
    if let Some(n) = kpis.unique_patients {
        table.row(["Unique patients".to_string(), format_number(n as f64, 0)]);
    }
    if let Some(n) = kpis.unique_diagnoses {
        table.row(["Unique diagnoses".to_string(), format_number(n as f64, 0)]);
    }
    if let Some(top) = &kpis.top_diagnosis {
        table.row([
            "Top diagnosis".to_string(),
            format!(
                "{} ({}, {:.2}% of total)",
                top.top_diagnosis_code,
                format_currency(top.top_diagnosis_total_billed),
                top.top_diagnosis_pct_of_total
            ),
        ]);
    }
    if let (Some(min), Some(max)) = (&kpis.date_min, &kpis.date_max) {
        if !min.is_empty() && !max.is_empty() {
            table.row(["Date range".to_string(), format!("{min} → {max}")]);
        }
    }
    if let Some(mm) = &kpis.member_months {
        table.row([
            "Member months".to_string(),
            format_number(mm.member_months as f64, 0),
        ]);
        if let Some(pmpm) = mm.pmpm_billed {
            table.row(["PMPM billed".to_string(), format_currency(pmpm)]);
        }
    }
    table
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Path relative to the output root, with `/` separators.
fn relative(layout: &OutputLayout, path: &Path) -> String {
    let rel = path.strip_prefix(layout.root()).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

// ── Tests ─────────────────────────────────────────────────────────────────────
