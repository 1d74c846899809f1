//! Patients whose total billed amount is a z-score outlier.

use std::cmp::Ordering;

use claims_core::columns::ColumnSpec;
use claims_core::stats::{mean, population_std};
use claims_core::table::{TabularOutput, Table};
use serde::Serialize;
use tracing::debug;

use crate::aggregator::{ClaimAggregator, GroupTotal};

/// One flagged patient.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyRow {
    pub patient_id: String,
    pub total_billed: f64,
    pub z_score: f64,
}

/// Flagged patients, highest z-score first. May be empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnomalyTable {
    pub rows: Vec<AnomalyRow>,
}

impl AnomalyTable {
    /// Flag patients with `z >= z_threshold`, using the population standard
    /// deviation of per-patient totals.
    ///
    /// Empty when no patient column resolves, there are no patients, or every
    /// patient has the same total.
    pub fn detect(cleaned: &Table, spec: &ColumnSpec, z_threshold: f64) -> Self {
        let totals = match (spec.patient(cleaned), spec.billed(cleaned)) {
            (Some(patient), Some(billed)) => {
                ClaimAggregator::by_column(cleaned, patient, billed).unwrap_or_default()
            }
            _ => return Self::default(),
        };
        Self::from_totals(&totals, z_threshold)
    }

    /// Score a list of per-patient totals.
    pub fn from_totals(totals: &[GroupTotal], z_threshold: f64) -> Self {
        let values: Vec<f64> = totals.iter().map(|g| g.total).collect();
        // Equal totals can still give a tiny non-zero sigma through rounding
        // in the mean, so compare the totals themselves.
        if values.iter().all(|v| *v == values[0]) {
            debug!("All patient totals are equal; no anomalies flagged");
            return Self::default();
        }
        let (Some(mu), Some(sigma)) = (mean(&values), population_std(&values)) else {
            return Self::default();
        };
        if sigma == 0.0 {
            return Self::default();
        }

        let mut rows: Vec<AnomalyRow> = totals
            .iter()
            .map(|g| AnomalyRow {
                patient_id: g.key.clone(),
                total_billed: g.total,
                z_score: (g.total - mu) / sigma,
            })
            .filter(|row| row.z_score >= z_threshold)
            .collect();

        rows.sort_by(|a, b| match b.z_score.total_cmp(&a.z_score) {
            Ordering::Equal => a.patient_id.cmp(&b.patient_id),
            other => other,
        });
        Self { rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

impl TabularOutput for AnomalyTable {
    fn headers(&self) -> Vec<String> {
        vec![
            "patient_id".into(),
            "total_billed".into(),
            "z_score".into(),
        ]
    }

    fn records(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|r| {
                vec![
                    r.patient_id.clone(),
                    r.total_billed.to_string(),
                    r.z_score.to_string(),
                ]
            })
            .collect()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use claims_core::table::Cell;

    fn patients(totals: &[(&str, f64)]) -> Table {
        Table::from_rows(
            vec!["member_id".into(), "Billed Amount".into()],
            totals
                .iter()
                .map(|(p, v)| vec![Cell::Text(p.to_string()), Cell::Number(*v)])
                .collect(),
        )
    }

    #[test]
    fn test_zero_variance_returns_empty() {
        let table = patients(&[("A", 5.0), ("B", 5.0), ("C", 5.0)]);
        let result = AnomalyTable::detect(&table, &ColumnSpec::default(), 0.0);
        assert!(result.is_empty());
        assert_eq!(result.headers().len(), 3);
    }

    #[test]
    fn test_equal_inexact_totals_return_empty_at_any_threshold() {
        let table = patients(&[("A", 0.1), ("B", 0.1), ("C", 0.1)]);
        let result = AnomalyTable::detect(&table, &ColumnSpec::default(), -2.0);
        assert!(result.is_empty());
    }

    #[test]
    fn test_outlier_below_default_threshold() {
        // Population std is 396, so the outlier's z is exactly 2.0.
        let table = patients(&[
            ("A", 10.0),
            ("B", 10.0),
            ("C", 10.0),
            ("D", 10.0),
            ("E", 1000.0),
        ]);
        assert!(AnomalyTable::detect(&table, &ColumnSpec::default(), 3.0).is_empty());

        let flagged = AnomalyTable::detect(&table, &ColumnSpec::default(), 2.0);
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged.rows[0].patient_id, "E");
        assert!((flagged.rows[0].z_score - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_sorted_by_z_then_id() {
        let table = patients(&[("B", 100.0), ("A", 100.0), ("C", 0.0), ("D", 0.0)]);
        let result = AnomalyTable::detect(&table, &ColumnSpec::default(), 0.5);
        let ids: Vec<&str> = result.rows.iter().map(|r| r.patient_id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B"]);
    }

    #[test]
    fn test_totals_summed_per_patient() {
        let table = patients(&[
            ("A", 1.0),
            ("B", 1.0),
            ("C", 1.0),
            ("D", 1.0),
            ("E", 50.0),
            ("E", 50.0),
        ]);
        let result = AnomalyTable::detect(&table, &ColumnSpec::default(), 1.5);
        assert_eq!(result.rows[0].patient_id, "E");
        assert_eq!(result.rows[0].total_billed, 100.0);
    }

    #[test]
    fn test_no_patient_column() {
        let table = Table::from_rows(vec!["Billed Amount".into()], vec![vec![Cell::Number(1.0)]]);
        assert!(AnomalyTable::detect(&table, &ColumnSpec::default(), 3.0).is_empty());
    }
}
