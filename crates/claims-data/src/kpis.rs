//! Headline KPIs for the cleaned claims table.
//!
//! Fields are optional: each appears only when the columns it depends on
//! resolve. The summary never fails; a missing column just shrinks it.

use std::collections::HashSet;

use chrono::Datelike;
use claims_core::columns::ColumnSpec;
use claims_core::formatting::{format_decimal, percentage};
use claims_core::stats::{round_to, Summary};
use claims_core::table::{Cell, TabularOutput, Table};
use serde::Serialize;

use crate::aggregator::ClaimAggregator;

// ── Types ─────────────────────────────────────────────────────────────────────

/// Distribution of billed amounts per claim row, rounded to cents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClaimAmountStats {
    pub avg_claim_amount: f64,
    pub median_claim_amount: f64,
    pub p95_claim_amount: f64,
    pub min_claim_amount: f64,
    pub max_claim_amount: f64,
}

/// The diagnosis code carrying the most billed amount.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopDiagnosis {
    pub top_diagnosis_code: String,
    pub top_diagnosis_total_billed: f64,
    pub top_diagnosis_pct_of_total: f64,
}

/// Member-month exposure and the per-member-per-month cost derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MemberMonths {
    pub member_months: usize,
    /// `None` when there are no member months.
    pub pmpm_billed: Option<f64>,
}

/// Single-row KPI record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiSummary {
    pub row_count: usize,
    pub column_count: usize,
    pub total_billed_amount: f64,
    #[serde(flatten)]
    pub claim_amounts: Option<ClaimAmountStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique_patients: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique_diagnoses: Option<usize>,
    #[serde(flatten)]
    pub top_diagnosis: Option<TopDiagnosis>,
    /// ISO date; empty when no date parses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_min: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_max: Option<String>,
    #[serde(flatten)]
    pub member_months: Option<MemberMonths>,
}

// ── Computation ───────────────────────────────────────────────────────────────

impl KpiSummary {
    /// Compute the KPIs of a cleaned table.
    pub fn summarize(cleaned: &Table, spec: &ColumnSpec) -> Self {
        let billed_col = spec.billed(cleaned);
        let amounts: Vec<f64> = billed_col
            .and_then(|col| cleaned.numbers(col))
            .unwrap_or_default()
            .into_iter()
            .flatten()
            .collect();
        let total: f64 = amounts.iter().sum();

        let claim_amounts = Summary::of(&amounts).map(|s| ClaimAmountStats {
            avg_claim_amount: round_to(s.mean, 2),
            median_claim_amount: round_to(s.median, 2),
            p95_claim_amount: round_to(s.p95, 2),
            min_claim_amount: round_to(s.min, 2),
            max_claim_amount: round_to(s.max, 2),
        });

        let patient_col = spec.patient(cleaned);
        let unique_patients = patient_col.and_then(|col| cleaned.column(col)).map(distinct);

        let diagnosis_col = spec.diagnosis(cleaned);
        let unique_diagnoses = diagnosis_col
            .and_then(|col| cleaned.column(col))
            .map(distinct);
        let top_diagnosis = match (diagnosis_col, billed_col) {
            (Some(dx), Some(billed)) if total > 0.0 => {
                ClaimAggregator::ranked_by_column(cleaned, dx, billed)
                    .and_then(|groups| groups.into_iter().next())
                    .map(|top| TopDiagnosis {
                        top_diagnosis_total_billed: round_to(top.total, 2),
                        top_diagnosis_pct_of_total: percentage(top.total, total, 2),
                        top_diagnosis_code: top.key,
                    })
            }
            _ => None,
        };

        let date_col = spec.date(cleaned);
        let dates: Vec<Option<chrono::NaiveDate>> = date_col
            .and_then(|col| cleaned.dates(col))
            .unwrap_or_default();
        let min = dates.iter().flatten().min();
        let max = dates.iter().flatten().max();
        let (date_min, date_max) = match date_col {
            Some(_) => (
                Some(min.map(|d| d.to_string()).unwrap_or_default()),
                Some(max.map(|d| d.to_string()).unwrap_or_default()),
            ),
            None => (None, None),
        };

        let member_months = match (patient_col, min) {
            (Some(col), Some(_)) => cleaned.column(col).map(|patients| {
                let pairs: HashSet<(String, i32, u32)> = patients
                    .zip(dates.iter())
                    .filter_map(|(p, d)| {
                        let d = (*d)?;
                        Some((p.group_key()?, d.year(), d.month()))
                    })
                    .collect();
                let member_months = pairs.len();
                MemberMonths {
                    member_months,
                    pmpm_billed: (member_months > 0)
                        .then(|| round_to(total / member_months as f64, 4)),
                }
            }),
            _ => None,
        };

        Self {
            row_count: cleaned.row_count(),
            column_count: cleaned.column_count(),
            total_billed_amount: round_to(total, 2),
            claim_amounts,
            unique_patients,
            unique_diagnoses,
            top_diagnosis,
            date_min,
            date_max,
            member_months,
        }
    }

    /// Present fields in output order, rendered as text.
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        let money = |v: f64| format_decimal(v, 2);
        let mut out = vec![
            ("row_count", self.row_count.to_string()),
            ("column_count", self.column_count.to_string()),
            ("total_billed_amount", money(self.total_billed_amount)),
        ];

        if let Some(a) = &self.claim_amounts {
            out.push(("avg_claim_amount", money(a.avg_claim_amount)));
            out.push(("median_claim_amount", money(a.median_claim_amount)));
            out.push(("p95_claim_amount", money(a.p95_claim_amount)));
            out.push(("min_claim_amount", money(a.min_claim_amount)));
            out.push(("max_claim_amount", money(a.max_claim_amount)));
        }
        if let Some(n) = self.unique_patients {
            out.push(("unique_patients", n.to_string()));
        }
        if let Some(n) = self.unique_diagnoses {
            out.push(("unique_diagnoses", n.to_string()));
        }
        if let Some(top) = &self.top_diagnosis {
            out.push(("top_diagnosis_code", top.top_diagnosis_code.clone()));
            out.push((
                "top_diagnosis_total_billed",
                money(top.top_diagnosis_total_billed),
            ));
            out.push((
                "top_diagnosis_pct_of_total",
                money(top.top_diagnosis_pct_of_total),
            ));
        }
        if let Some(d) = &self.date_min {
            out.push(("date_min", d.clone()));
        }
        if let Some(d) = &self.date_max {
            out.push(("date_max", d.clone()));
        }
        if let Some(mm) = &self.member_months {
            out.push(("member_months", mm.member_months.to_string()));
            out.push((
                "pmpm_billed",
                mm.pmpm_billed
                    .map(|v| format_decimal(v, 4))
                    .unwrap_or_default(),
            ));
        }
        out
    }

    /// Long `metric, value` view of the same fields.
    pub fn to_long_rows(&self) -> LongKpis {
        LongKpis {
            rows: self
                .fields()
                .into_iter()
                .map(|(metric, value)| (metric.to_string(), value))
                .collect(),
        }
    }

    /// Value of one field, if present.
    pub fn get(&self, metric: &str) -> Option<String> {
        self.fields()
            .into_iter()
            .find(|(m, _)| *m == metric)
            .map(|(_, v)| v)
    }
}

/// Wide form: one header per present field, one record.
impl TabularOutput for KpiSummary {
    fn headers(&self) -> Vec<String> {
        self.fields().into_iter().map(|(m, _)| m.to_string()).collect()
    }

    fn records(&self) -> Vec<Vec<String>> {
        vec![self.fields().into_iter().map(|(_, v)| v).collect()]
    }
}

/// Long form of a [`KpiSummary`].
#[derive(Debug, Clone, PartialEq)]
pub struct LongKpis {
    pub rows: Vec<(String, String)>,
}

impl TabularOutput for LongKpis {
    fn headers(&self) -> Vec<String> {
        vec!["metric".into(), "value".into()]
    }

    fn records(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|(m, v)| vec![m.clone(), v.clone()])
            .collect()
    }
}

fn distinct<'a>(cells: impl Iterator<Item = &'a Cell>) -> usize {
    cells.filter_map(Cell::group_key).collect::<HashSet<_>>().len()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
