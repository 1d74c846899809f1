//! Share of total cost carried by the most expensive patients.

use claims_core::columns::ColumnSpec;
use claims_core::formatting::percentage;
use claims_core::table::{TabularOutput, Table};
use serde::Serialize;

use crate::aggregator::{ClaimAggregator, GroupTotal};

const NO_PATIENT_COLUMN: &str =
    "No patient/member id column available; cost concentration not computed.";
const NO_TOTALS: &str =
    "No patient totals available or total cost is 0; cost concentration not computed.";

// ── Types ─────────────────────────────────────────────────────────────────────

/// Cost share of the top `top_pct_patients` percent of patients.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConcentrationRow {
    pub top_pct_patients: u32,
    pub patient_count: usize,
    pub total_patients: usize,
    pub cost_share_pct: f64,
}

/// Cost concentration table, or the reason it could not be computed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CostConcentration {
    Computed(Vec<ConcentrationRow>),
    Unavailable { note: String },
}

impl CostConcentration {
    /// Compute the table from per-patient billed totals.
    ///
    /// For each threshold `pct`, the top `max(1, ceil(n * pct / 100))`
    /// patients by total are summed and expressed as a percentage of the
    /// grand total.
    pub fn compute(cleaned: &Table, spec: &ColumnSpec, thresholds_pct: &[u32]) -> Self {
        let totals = match (spec.patient(cleaned), spec.billed(cleaned)) {
            (Some(patient), Some(billed)) => {
                ClaimAggregator::ranked_by_column(cleaned, patient, billed).unwrap_or_default()
            }
            (Some(_), None) => Vec::new(),
            (None, _) => return Self::unavailable(NO_PATIENT_COLUMN),
        };
        Self::from_totals(&totals, thresholds_pct)
    }

    /// Build the table from totals already ranked in descending order.
    pub fn from_totals(ranked: &[GroupTotal], thresholds_pct: &[u32]) -> Self {
        let grand_total: f64 = ranked.iter().map(|g| g.total).sum();
        let n = ranked.len();
        if n == 0 || grand_total <= 0.0 {
            return Self::unavailable(NO_TOTALS);
        }

        let rows = thresholds_pct
            .iter()
            .map(|&pct| {
                let k = top_count(n, pct);
                let top_sum: f64 = ranked[..k].iter().map(|g| g.total).sum();
                ConcentrationRow {
                    top_pct_patients: pct,
                    patient_count: k,
                    total_patients: n,
                    cost_share_pct: percentage(top_sum, grand_total, 2),
                }
            })
            .collect();
        Self::Computed(rows)
    }

    pub fn rows(&self) -> &[ConcentrationRow] {
        match self {
            Self::Computed(rows) => rows,
            Self::Unavailable { .. } => &[],
        }
    }

    pub fn note(&self) -> Option<&str> {
        match self {
            Self::Computed(_) => None,
            Self::Unavailable { note } => Some(note),
        }
    }

    fn unavailable(note: &str) -> Self {
        Self::Unavailable {
            note: note.to_string(),
        }
    }
}

impl TabularOutput for CostConcentration {
    fn headers(&self) -> Vec<String> {
        match self {
            Self::Computed(_) => vec![
                "top_pct_patients".into(),
                "patient_count".into(),
                "total_patients".into(),
                "cost_share_pct".into(),
            ],
            Self::Unavailable { .. } => vec!["note".into()],
        }
    }

    fn records(&self) -> Vec<Vec<String>> {
        match self {
            Self::Computed(rows) => rows
                .iter()
                .map(|r| {
                    vec![
                        r.top_pct_patients.to_string(),
                        r.patient_count.to_string(),
                        r.total_patients.to_string(),
                        format!("{:.2}", r.cost_share_pct),
                    ]
                })
                .collect(),
            Self::Unavailable { note } => vec![vec![note.clone()]],
        }
    }
}

/// `max(1, ceil(n * pct / 100))` in integer arithmetic, capped at `n`.
fn top_count(n: usize, pct: u32) -> usize {
    let k = (n * pct as usize).div_ceil(100);
    k.clamp(1, n)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use claims_core::table::Cell;

    fn patients(totals: &[(&str, f64)]) -> Table {
        Table::from_rows(
            vec!["Patient ID".into(), "Billed Amount".into()],
            totals
                .iter()
                .map(|(p, v)| vec![Cell::Text(p.to_string()), Cell::Number(*v)])
                .collect(),
        )
    }

    #[test]
    fn test_top_count() {
        assert_eq!(top_count(1, 1), 1);
        assert_eq!(top_count(100, 1), 1);
        assert_eq!(top_count(100, 5), 5);
        assert_eq!(top_count(101, 1), 2);
        assert_eq!(top_count(3, 10), 1);
        assert_eq!(top_count(7, 100), 7);
    }

    #[test]
    fn test_uniform_hundred_patients() {
        let rows: Vec<(String, f64)> = (0..100).map(|i| (format!("P{i:03}"), 10.0)).collect();
        let refs: Vec<(&str, f64)> = rows.iter().map(|(p, v)| (p.as_str(), *v)).collect();
        let table = patients(&refs);

        let result = CostConcentration::compute(&table, &ColumnSpec::default(), &[1, 5, 10]);
        let shares: Vec<(usize, f64)> = result
            .rows()
            .iter()
            .map(|r| (r.patient_count, r.cost_share_pct))
            .collect();
        assert_eq!(shares, vec![(1, 1.0), (5, 5.0), (10, 10.0)]);
        assert!(result.rows().iter().all(|r| r.total_patients == 100));
    }

    #[test]
    fn test_shares_are_monotone() {
        let table = patients(&[
            ("A", 500.0),
            ("B", 10.0),
            ("C", 250.0),
            ("D", 30.0),
            ("A", 100.0),
        ]);
        let result = CostConcentration::compute(&table, &ColumnSpec::default(), &[1, 5, 10, 50, 100]);
        let shares: Vec<f64> = result.rows().iter().map(|r| r.cost_share_pct).collect();
        assert!(shares.windows(2).all(|w| w[0] <= w[1]), "{shares:?}");
        assert_eq!(*shares.last().unwrap(), 100.0);
        // A carries 600 of 890.
        assert_eq!(shares[0], 67.42);
    }

    #[test]
    fn test_unavailable_without_patient_column() {
        let table = Table::from_rows(
            vec!["Billed Amount".into()],
            vec![vec![Cell::Number(1.0)]],
        );
        let result = CostConcentration::compute(&table, &ColumnSpec::default(), &[1]);
        assert_eq!(result.note(), Some(NO_PATIENT_COLUMN));
        assert_eq!(result.headers(), vec!["note".to_string()]);
    }

    #[test]
    fn test_unavailable_when_total_is_zero() {
        let table = patients(&[("A", 0.0), ("B", 0.0)]);
        let result = CostConcentration::compute(&table, &ColumnSpec::default(), &[1]);
        assert_eq!(result.note(), Some(NO_TOTALS));
    }

    #[test]
    fn test_unavailable_when_no_patients() {
        let result = CostConcentration::compute(&patients(&[]), &ColumnSpec::default(), &[1]);
        assert_eq!(result.note(), Some(NO_TOTALS));
        assert!(result.rows().is_empty());
    }

    #[test]
    fn test_records_format() {
        let table = patients(&[("A", 2.0), ("B", 1.0)]);
        let result = CostConcentration::compute(&table, &ColumnSpec::default(), &[50]);
        assert_eq!(result.records(), vec![vec!["50", "1", "2", "66.67"]]);
    }
}
