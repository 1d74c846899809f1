//! Column alias sets and the first-match resolver.

use serde::{Deserialize, Serialize};

use crate::table::Table;

/// Return the first alias in `candidates` that names a column of `table`.
///
/// Aliases are tried in the caller's priority order. Returns `None` when no
/// alias matches.
pub fn resolve<'a, S: AsRef<str>>(table: &Table, candidates: &'a [S]) -> Option<&'a str> {
    candidates
        .iter()
        .map(|c| c.as_ref())
        .find(|name| table.has_column(name))
}

// ── ColumnSpec ────────────────────────────────────────────────────────────────

/// Ordered alias lists for every semantic field the pipeline reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnSpec {
    /// Billed amount has no alias fallback.
    pub billed_amount: String,
    pub date_of_service: Vec<String>,
    pub patient_id: Vec<String>,
    pub diagnosis: Vec<String>,
    pub claim_id: Vec<String>,
}

impl Default for ColumnSpec {
    fn default() -> Self {
        Self {
            billed_amount: "Billed Amount".to_string(),
            date_of_service: strings(&["Date of Service", "date_of_service"]),
            patient_id: strings(&["Patient ID", "patient_id", "member_id"]),
            diagnosis: strings(&["Diagnosis Code", "ICD-10 Code", "ICD10", "icd10"]),
            claim_id: strings(&["Claim ID", "claim_id"]),
        }
    }
}

impl ColumnSpec {
    /// The billed-amount column, if present.
    pub fn billed<'a>(&'a self, table: &Table) -> Option<&'a str> {
        table
            .has_column(&self.billed_amount)
            .then_some(self.billed_amount.as_str())
    }

    pub fn date<'a>(&'a self, table: &Table) -> Option<&'a str> {
        resolve(table, self.date_of_service.as_slice())
    }

    pub fn patient<'a>(&'a self, table: &Table) -> Option<&'a str> {
        resolve(table, self.patient_id.as_slice())
    }

    pub fn diagnosis<'a>(&'a self, table: &Table) -> Option<&'a str> {
        resolve(table, self.diagnosis.as_slice())
    }

    pub fn claim<'a>(&'a self, table: &Table) -> Option<&'a str> {
        resolve(table, self.claim_id.as_slice())
    }
}

fn strings(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}
