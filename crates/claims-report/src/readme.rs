//! `README.md`: project front page with the headline results of a run.
//!
//! Values come from the computed KPI summary and cost concentration table.
//! Anything missing renders as zero or blank.

use std::path::PathBuf;

use claims_core::error::Result;
use claims_core::formatting::{format_currency, format_number};
use claims_data::concentration::CostConcentration;
use claims_data::kpis::KpiSummary;
use claims_data::writer::{write_text, OutputLayout};
use tracing::info;

use crate::markdown::MarkdownTable;

/// Patient shares shown in the README's Pareto table.
const PARETO_SHARES_PCT: [u32; 3] = [1, 5, 10];

// ── Public API ────────────────────────────────────────────────────────────────

pub fn write_readme(
    kpis: &KpiSummary,
    concentration: &CostConcentration,
    layout: &OutputLayout,
) -> Result<PathBuf> {
    let path = layout.readme_md();
    write_text(&path, &render_readme(kpis, concentration))?;
    info!("Wrote {}", path.display());
    Ok(path)
}

pub fn render_readme(kpis: &KpiSummary, concentration: &CostConcentration) -> String {
    let values = Headline::from_kpis(kpis);
    let share = |pct: u32| cost_share(concentration, pct);
    let mut lines: Vec<String> = Vec::new();

    lines.push("# Healthcare Claims Analysis".into());
    lines.push(String::new());
    lines.push(
        "Analysis of synthetic healthcare claims data using a reproducible, auditable pipeline."
            .into(),
    );
    lines.push(String::new());

    // ── Quickstart ────────────────────────────────────────────────────────────
    lines.push("## Quickstart".into());
    lines.push(String::new());
    lines.push("```bash".into());
    lines.push("cargo run --release -p claims-pipeline -- --input claim_data.csv".into());
    lines.push("```".into());
    lines.push(String::new());
    lines.push("This generates:".into());
    lines.push("- Clean dataset: `outputs/data/claims_clean.csv`".into());
    lines.push(
        "- Tables: `outputs/tables/*.csv` (KPIs, cost concentration, anomalies, missingness)"
            .into(),
    );
    lines.push("- Chart data: `outputs/charts/*.json` (distribution, trends, diagnoses, Pareto)".into());
    lines.push("- Report: `outputs/REPORT.md`".into());
    lines.push("- Data dictionary: `outputs/docs/data_dictionary.md`".into());
    lines.push(String::new());

    // ── Results ───────────────────────────────────────────────────────────────
    lines.push("## Results (from pipeline outputs)".into());
    lines.push(String::new());
    let mut results = MarkdownTable::new(["Metric", "Value"]);
    results.row(["Total claims".to_string(), format_number(values.rows as f64, 0)]);
    results.row(["Total billed".to_string(), format_currency(values.total_billed)]);
    results.row([
        "Unique patients".to_string(),
        format_number(values.unique_patients as f64, 0),
    ]);
    results.row(["Average claim".to_string(), format!("${:.2}", values.avg_claim)]);
    results.row(["Median claim".to_string(), format!("${:.2}", values.median_claim)]);
    results.row(["P95 claim".to_string(), format!("${:.2}", values.p95_claim)]);
    results.row(["PMPM billed".to_string(), format!("${:.2}", values.pmpm)]);
    results.row([
        "Unique diagnoses".to_string(),
        values.unique_diagnoses.to_string(),
    ]);
    results.row([
        "Top diagnosis".to_string(),
        format!(
            "{} ({}, {:.2}%)",
            values.top_dx,
            format_currency(values.top_dx_billed),
            values.top_dx_pct
        ),
    ]);
    results.row([
        "Date range".to_string(),
        format!("{} to {}", values.date_min, values.date_max),
    ]);
    lines.extend(results.render());
    lines.push(String::new());

    // ── Pareto ────────────────────────────────────────────────────────────────
    lines.push("## Cost Concentration (Pareto)".into());
    lines.push(String::new());
    let mut pareto = MarkdownTable::new(["% of Patients", "% of Total Cost"]);
    for pct in PARETO_SHARES_PCT {
        pareto.row([format!("Top {pct}%"), format!("{:.2}%", share(pct))]);
    }
    lines.extend(pareto.render());
    lines.push(String::new());

    // ── Architecture ──────────────────────────────────────────────────────────
    lines.push("## Pipeline Architecture".into());
    lines.push(String::new());
    lines.push(
        "- **Data integrity**: `claims-data` checks missingness, ranges and uniqueness before \
         anything is cleaned."
            .into(),
    );
    lines.push(
        "- **Metrics & analysis**: `claims-data` computes KPIs, cost concentration, anomalies and \
         chart data."
            .into(),
    );
    lines.push(
        "- **Orchestration**: `claims-pipeline` chains load → check → clean → analyze → render."
            .into(),
    );
    lines.push(
        "- **Documentation**: `claims-report` renders this README, `REPORT.md` and the data \
         dictionary from computed outputs; no number is typed by hand."
            .into(),
    );
    lines.push(String::new());

    // ── Insights ──────────────────────────────────────────────────────────────
    lines.push("## Key Insights".into());
    lines.push(String::new());
    lines.push(format!(
        "- **Top 10% of patients** drive {:.1}% of total cost; targeted interventions could \
         yield high ROI.",
        share(10)
    ));
    lines.push(format!(
        "- **Diagnosis {}** is the leading cost driver at {:.2}% of total spend; consider \
         prevention/management programs.",
        values.top_dx, values.top_dx_pct
    ));
    lines.push(
        "- **Synthetic data note**: This is balanced/uniform sample data; real claims typically \
         show higher cost concentration."
            .into(),
    );
    lines.push(String::new());

    // ── Limitations ───────────────────────────────────────────────────────────
    lines.push("## Limitations".into());
    lines.push(String::new());
    lines.push(
        "- **Synthetic data**: Patterns may not reflect real-world healthcare claims \
         distributions."
            .into(),
    );
    lines.push(
        "- **Scope**: No clinical outcomes, provider performance, or member demographics \
         included."
            .into(),
    );
    lines.push(
        "- **Temporal**: Single fixed date range; seasonal/multi-year trends not visible.".into(),
    );

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// KPI values with every optional field resolved to a zero or blank default.
struct Headline {
    rows: usize,
    total_billed: f64,
    avg_claim: f64,
    median_claim: f64,
    p95_claim: f64,
    unique_patients: usize,
    unique_diagnoses: usize,
    top_dx: String,
    top_dx_billed: f64,
    top_dx_pct: f64,
    pmpm: f64,
    date_min: String,
    date_max: String,
}

impl Headline {
    fn from_kpis(kpis: &KpiSummary) -> Self {
        let amounts = kpis.claim_amounts.as_ref();
        let top = kpis.top_diagnosis.as_ref();
        Self {
            rows: kpis.row_count,
            total_billed: kpis.total_billed_amount,
            avg_claim: amounts.map_or(0.0, |a| a.avg_claim_amount),
            median_claim: amounts.map_or(0.0, |a| a.median_claim_amount),
            p95_claim: amounts.map_or(0.0, |a| a.p95_claim_amount),
            unique_patients: kpis.unique_patients.unwrap_or(0),
            unique_diagnoses: kpis.unique_diagnoses.unwrap_or(0),
            top_dx: top.map(|t| t.top_diagnosis_code.clone()).unwrap_or_default(),
            top_dx_billed: top.map_or(0.0, |t| t.top_diagnosis_total_billed),
            top_dx_pct: top.map_or(0.0, |t| t.top_diagnosis_pct_of_total),
            pmpm: kpis
                .member_months
                .and_then(|m| m.pmpm_billed)
                .unwrap_or(0.0),
            date_min: kpis.date_min.clone().unwrap_or_default(),
            date_max: kpis.date_max.clone().unwrap_or_default(),
        }
    }
}

/// Cost share for one patient percentage; 0 when that row is absent.
fn cost_share(concentration: &CostConcentration, pct: u32) -> f64 {
    concentration
        .rows()
        .iter()
        .find(|r| r.top_pct_patients == pct)
        .map_or(0.0, |r| r.cost_share_pct)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use claims_core::columns::ColumnSpec;
    use claims_core::table::{Cell, Table};
    use claims_data::cleaning::clean;
    use tempfile::TempDir;

    fn cleaned() -> Table {
        let rows = [
            ("C1", "P1", "2024-01-05", "E11", "1200"),
            ("C2", "P1", "2024-02-10", "I10", "50"),
            ("C3", "P2", "2024-02-11", "E11", "30"),
        ];
        let raw = Table::from_rows(
            vec![
                "Claim ID".into(),
                "Patient ID".into(),
                "Date of Service".into(),
                "Diagnosis Code".into(),
                "Billed Amount".into(),
            ],
            rows.iter()
                .map(|(c, p, d, dx, b)| {
                    [c, p, d, dx, b].iter().map(|v| Cell::from_raw(v)).collect()
                })
                .collect(),
        );
        clean(&raw, &ColumnSpec::default())
    }

    #[test]
    fn test_render_readme_results_and_pareto() {
        let table = cleaned();
        let spec = ColumnSpec::default();
        let kpis = KpiSummary::summarize(&table, &spec);
        let concentration = CostConcentration::compute(&table, &spec, &[1, 5, 10]);

        let readme = render_readme(&kpis, &concentration);

        assert!(readme.starts_with("# Healthcare Claims Analysis\n"));
        assert!(readme.contains("| Total claims | 3 |"));
        assert!(readme.contains("| Total billed | $1,280.00 |"));
        assert!(readme.contains("| Unique patients | 2 |"));
        assert!(readme.contains("| Top diagnosis | E11 ($1,230.00, 96.09%) |"));
        assert!(readme.contains("| Date range | 2024-01-05 to 2024-02-11 |"));
        assert!(readme.contains("| Top 1% | 97.66% |"));
        assert!(readme.contains("| Top 10% | 97.66% |"));
        assert!(readme.contains("- **Top 10% of patients** drive 97.7% of total cost"));
        assert!(readme.contains("- **Diagnosis E11** is the leading cost driver at 96.09%"));
    }

    #[test]
    fn test_render_readme_missing_share_is_zero() {
        let table = cleaned();
        let spec = ColumnSpec::default();
        let kpis = KpiSummary::summarize(&table, &spec);
        let concentration = CostConcentration::Unavailable {
            note: "No patient/member id column available".into(),
        };

        let readme = render_readme(&kpis, &concentration);
        assert!(readme.contains("| Top 5% | 0.00% |"));
        assert!(readme.contains("drive 0.0% of total cost"));
    }

    #[test]
    fn test_write_readme() {
        let tmp = TempDir::new().unwrap();
        let layout = OutputLayout::new(tmp.path().join("outputs"));
        let table = cleaned();
        let spec = ColumnSpec::default();
        let kpis = KpiSummary::summarize(&table, &spec);
        let concentration = CostConcentration::compute(&table, &spec, &[1, 5, 10]);

        let path = write_readme(&kpis, &concentration, &layout).unwrap();
        assert_eq!(path, layout.readme_md());
        assert!(std::fs::read_to_string(path)
            .unwrap()
            .contains("## Cost Concentration (Pareto)"));
    }
}
