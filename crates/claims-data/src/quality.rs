//! Integrity gate for the raw claims table.
//!
//! Writes two diagnostic tables (missingness and a basic profile), then
//! evaluates every validation rule and fails the run with one aggregated
//! [`IntegrityError`] when any rule does not hold. The diagnostics are on
//! disk before the verdict, so a failed run can still be investigated.

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{Duration, Local, NaiveDate, NaiveDateTime};
use claims_core::columns::ColumnSpec;
use claims_core::config::{PipelineConfig, QualityConfig};
use claims_core::error::{ClaimsError, IntegrityError, Result};
use claims_core::formatting::format_significant;
use claims_core::stats;
use claims_core::table::{Cell, TabularOutput, Table};
use tracing::{info, warn};

use crate::writer::{write_table, OutputLayout};

// ── Missingness ───────────────────────────────────────────────────────────────

/// Null count for one column.
#[derive(Debug, Clone, PartialEq)]
pub struct MissingnessRow {
    pub column: String,
    pub missing_count: usize,
    /// Share of rows that are null, in percent. 0 for an empty table.
    pub missing_pct: f64,
}

/// Per-column null counts, most-missing first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Missingness {
    pub rows: Vec<MissingnessRow>,
}

impl Missingness {
    /// Count nulls in every column of `table`.
    ///
    /// Sorted by descending `missing_count`, ties by ascending column name.
    pub fn of(table: &Table) -> Self {
        let total = table.row_count();
        let mut rows: Vec<MissingnessRow> = table
            .columns()
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                let missing_count = table.rows().iter().filter(|r| r[idx].is_null()).count();
                let missing_pct = if total == 0 {
                    0.0
                } else {
                    missing_count as f64 / total as f64 * 100.0
                };
                MissingnessRow {
                    column: name.clone(),
                    missing_count,
                    missing_pct,
                }
            })
            .collect();

        rows.sort_by(|a, b| {
            b.missing_count
                .cmp(&a.missing_count)
                .then_with(|| a.column.cmp(&b.column))
        });
        Self { rows }
    }
}

impl TabularOutput for Missingness {
    fn headers(&self) -> Vec<String> {
        vec![
            "column".into(),
            "missing_count".into(),
            "missing_pct".into(),
        ]
    }

    fn records(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|r| {
                vec![
                    r.column.clone(),
                    r.missing_count.to_string(),
                    r.missing_pct.to_string(),
                ]
            })
            .collect()
    }
}

// ── Grain ─────────────────────────────────────────────────────────────────────

/// What one row of the table most likely represents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Grain {
    /// The claim id column is unique.
    PerClaim(String),
    /// The patient id column has one distinct value per row.
    PerPatient(String),
    /// Patient ids repeat across rows.
    MultiplePerPatient(String),
    Unknown,
}

impl Grain {
    /// Infer the grain from identifier uniqueness. First match wins: unique
    /// claim id, then unique patient id, then any patient id.
    pub fn infer(table: &Table, spec: &ColumnSpec) -> Self {
        if let Some(col) = spec.claim(table) {
            if table.column(col).map(duplicate_count) == Some(0) {
                return Grain::PerClaim(col.to_string());
            }
        }

        if let Some(col) = spec.patient(table) {
            let distinct = table.column(col).map(distinct_non_null).unwrap_or(0);
            if distinct == table.row_count() {
                return Grain::PerPatient(col.to_string());
            }
            return Grain::MultiplePerPatient(col.to_string());
        }

        Grain::Unknown
    }
}

impl fmt::Display for Grain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Grain::PerClaim(col) => write!(f, "One row per claim (unique `{col}`)."),
            Grain::PerPatient(col) => {
                write!(f, "One row per patient (`{col}` unique across rows).")
            }
            Grain::MultiplePerPatient(col) => write!(
                f,
                "Multiple rows per patient (`{col}` repeats); likely one row per claim/service."
            ),
            Grain::Unknown => write!(f, "Unable to infer grain (no unique claim id or patient id)."),
        }
    }
}

// ── BasicProfile ──────────────────────────────────────────────────────────────

/// Ordered `metric, value` pairs describing the raw table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BasicProfile {
    pub entries: Vec<(String, String)>,
}

impl BasicProfile {
    /// Build the profile for `table`.
    pub fn of(table: &Table, spec: &ColumnSpec, grain: &Grain) -> Self {
        let mut profile = Self::default();
        profile.push("row_count", table.row_count());
        profile.push("column_count", table.column_count());

        if let Some(col) = spec.date(table) {
            let dates = table.dates(col).unwrap_or_default();
            let failures = dates.iter().filter(|d| d.is_none()).count();
            let (min, max) = date_bounds(&dates);
            profile.push("date_column", col);
            profile.push("date_parse_failures", failures);
            profile.push("date_min", min.map(|d| d.to_string()).unwrap_or_default());
            profile.push("date_max", max.map(|d| d.to_string()).unwrap_or_default());
        }

        for col in table.amount_columns() {
            let values: Vec<f64> = table
                .numbers(col)
                .unwrap_or_default()
                .into_iter()
                .flatten()
                .collect();
            let sig = |v: Option<f64>| v.map(|v| format_significant(v, 6)).unwrap_or_default();
            let data = stats::sorted(&values);
            profile.push(format!("{col}__min"), sig(data.first().copied()));
            profile.push(format!("{col}__max"), sig(data.last().copied()));
            profile.push(format!("{col}__mean"), sig(stats::mean(&data)));
        }

        if let Some(col) = spec.claim(table) {
            let duplicates = table.column(col).map(duplicate_count).unwrap_or(0);
            profile.push("claim_id_column", col);
            profile.push("duplicate_claim_id_count", duplicates);
        }

        profile.push("grain_guess", grain);
        profile
    }

    /// Value recorded for `metric`, if any.
    pub fn get(&self, metric: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(m, _)| m == metric)
            .map(|(_, v)| v.as_str())
    }

    fn push(&mut self, metric: impl Into<String>, value: impl ToString) {
        self.entries.push((metric.into(), value.to_string()));
    }
}

impl TabularOutput for BasicProfile {
    fn headers(&self) -> Vec<String> {
        vec!["metric".into(), "value".into()]
    }

    fn records(&self) -> Vec<Vec<String>> {
        self.entries
            .iter()
            .map(|(m, v)| vec![m.clone(), v.clone()])
            .collect()
    }
}

// ── Rules ─────────────────────────────────────────────────────────────────────

/// Evaluate every validation rule against `table` as of the current local
/// time. Returns one message per failed rule; empty means the table passes.
pub fn check_rules(table: &Table, spec: &ColumnSpec, quality: &QualityConfig) -> Vec<String> {
    check_rules_at(table, spec, quality, Local::now().naive_local())
}

/// [`check_rules`] with an explicit reference time for the future-date rule.
pub fn check_rules_at(
    table: &Table,
    spec: &ColumnSpec,
    quality: &QualityConfig,
    now: NaiveDateTime,
) -> Vec<String> {
    let mut failures = Vec::new();

    if table.row_count() == 0 {
        failures.push("Row count is 0. The input dataset appears empty.".to_string());
    }

    let missing: Vec<&str> = quality
        .required_columns
        .iter()
        .map(String::as_str)
        .filter(|c| !table.has_column(c))
        .collect();
    if !missing.is_empty() {
        failures.push(format!("Missing required columns: {}.", missing.join(", ")));
    }

    if let Some(col) = spec.date(table) {
        let dates = table.dates(col).unwrap_or_default();
        match date_bounds(&dates) {
            (Some(min), Some(max)) => {
                let limit = now + Duration::days(quality.future_date_tolerance_days);
                if max.and_hms_opt(0, 0, 0).is_some_and(|start| start > limit) {
                    failures.push(format!(
                        "Date max ({max}) is in the future; check '{col}' parsing/format."
                    ));
                }
                if min > max {
                    failures.push(format!(
                        "Date min ({min}) is after date max ({max}); check '{col}'."
                    ));
                }
            }
            _ => failures.push(format!(
                "Column '{col}' exists but none of the values could be parsed as dates."
            )),
        }
    }

    let billed = spec.billed(table);
    if let Some(col) = billed {
        let invalid = table
            .numbers(col)
            .unwrap_or_default()
            .into_iter()
            .filter(|v| !matches!(v, Some(n) if *n > 0.0))
            .count();
        if invalid > 0 {
            failures.push(format!(
                "Found {invalid} rows with missing or non-positive '{col}'."
            ));
        }
    }

    for col in table.amount_columns() {
        if Some(col) == billed {
            continue;
        }
        let negative = table
            .numbers(col)
            .unwrap_or_default()
            .into_iter()
            .filter(|v| matches!(v, Some(n) if *n < 0.0))
            .count();
        if negative > 0 {
            failures.push(format!(
                "Found {negative} rows with negative values in '{col}'."
            ));
        }
    }

    if let Some(col) = spec.claim(table) {
        let duplicates = table.column(col).map(duplicate_count).unwrap_or(0);
        if duplicates > 0 {
            failures.push(format!(
                "Column '{col}' should be unique but has {duplicates} duplicate values."
            ));
        }
    }

    failures
}

// ── IntegrityReport ───────────────────────────────────────────────────────────

/// Outcome of a passing integrity check.
#[derive(Debug, Clone, PartialEq)]
pub struct IntegrityReport {
    pub missingness: Missingness,
    pub profile: BasicProfile,
    pub grain: Grain,
    pub missingness_path: PathBuf,
    pub profile_path: PathBuf,
}

/// Write the diagnostics under `outputs_dir`, then evaluate the rules.
///
/// Returns [`ClaimsError::Integrity`] listing every failed rule; the two
/// diagnostic files exist on disk in either case.
pub fn run_integrity_checks(
    raw: &Table,
    outputs_dir: &Path,
    config: &PipelineConfig,
) -> Result<IntegrityReport> {
    run_integrity_checks_at(raw, outputs_dir, config, Local::now().naive_local())
}

/// [`run_integrity_checks`] with an explicit reference time.
pub fn run_integrity_checks_at(
    raw: &Table,
    outputs_dir: &Path,
    config: &PipelineConfig,
    now: NaiveDateTime,
) -> Result<IntegrityReport> {
    let layout = OutputLayout::new(outputs_dir);
    let spec = &config.columns;

    let missingness = Missingness::of(raw);
    let grain = Grain::infer(raw, spec);
    let profile = BasicProfile::of(raw, spec, &grain);

    let missingness_path = layout.missingness_csv();
    let profile_path = layout.basic_profile_csv();
    write_table(&missingness_path, &missingness)?;
    write_table(&profile_path, &profile)?;
    info!("Wrote diagnostics: {}", missingness_path.display());
    info!("Wrote diagnostics: {}", profile_path.display());

    let failures = check_rules_at(raw, spec, &config.quality, now);
    if !failures.is_empty() {
        for failure in &failures {
            warn!("Integrity check failed: {}", failure);
        }
        return Err(ClaimsError::Integrity(IntegrityError {
            failures,
            missingness_path,
            profile_path,
        }));
    }

    info!("Integrity checks passed ({})", grain);
    Ok(IntegrityReport {
        missingness,
        profile,
        grain,
        missingness_path,
        profile_path,
    })
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Number of cells equal to an earlier cell in the same column. Nulls compare
/// equal to each other.
fn duplicate_count<'a>(cells: impl Iterator<Item = &'a Cell>) -> usize {
    let mut seen: HashSet<Option<String>> = HashSet::new();
    cells.filter(|cell| !seen.insert(cell.group_key())).count()
}

fn distinct_non_null<'a>(cells: impl Iterator<Item = &'a Cell>) -> usize {
    cells
        .filter_map(Cell::group_key)
        .collect::<BTreeSet<_>>()
        .len()
}

fn date_bounds(dates: &[Option<NaiveDate>]) -> (Option<NaiveDate>, Option<NaiveDate>) {
    let parsed = dates.iter().flatten();
    (parsed.clone().min().copied(), parsed.max().copied())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn claims(rows: &[(&str, &str, &str, &str)]) -> Table {
        Table::from_rows(
            vec![
                "Claim ID".into(),
                "Patient ID".into(),
                "Date of Service".into(),
                "Billed Amount".into(),
            ],
            rows.iter()
                .map(|(c, p, d, b)| {
                    vec![Cell::from_raw(c), Cell::from_raw(p), Cell::from_raw(d), Cell::from_raw(b)]
                })
                .collect(),
        )
    }

    fn good() -> Table {
        claims(&[
            ("C1", "P1", "2024-01-05", "100"),
            ("C2", "P1", "2024-02-10", "50.5"),
            ("C3", "P2", "2024-03-01", "20"),
        ])
    }

    fn rules(table: &Table) -> Vec<String> {
        check_rules_at(table, &ColumnSpec::default(), &QualityConfig::default(), now())
    }

    // ── Missingness ───────────────────────────────────────────────────────────

    #[test]
    fn test_missingness_sorted_by_count_then_name() {
        let table = Table::from_rows(
            vec!["b".into(), "a".into(), "c".into()],
            vec![
                vec![Cell::Null, Cell::Null, text("x")],
                vec![text("1"), Cell::Null, text("y")],
            ],
        );
        let m = Missingness::of(&table);
        let order: Vec<&str> = m.rows.iter().map(|r| r.column.as_str()).collect();
        assert_eq!(order, vec!["a", "b", "c"]);
        assert_eq!(m.rows[0].missing_count, 2);
        assert_eq!(m.rows[0].missing_pct, 100.0);
        assert_eq!(m.rows[1].missing_pct, 50.0);
    }

    #[test]
    fn test_missingness_empty_table() {
        let m = Missingness::of(&Table::new(vec!["a".into()]));
        assert_eq!(m.rows[0].missing_count, 0);
        assert_eq!(m.rows[0].missing_pct, 0.0);
    }

    // ── Grain ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_grain_unique_claim_id() {
        let grain = Grain::infer(&good(), &ColumnSpec::default());
        assert_eq!(grain, Grain::PerClaim("Claim ID".into()));
        assert_eq!(grain.to_string(), "One row per claim (unique `Claim ID`).");
    }

    #[test]
    fn test_grain_duplicate_claim_falls_through_to_patient() {
        let table = claims(&[
            ("C1", "P1", "2024-01-05", "100"),
            ("C1", "P2", "2024-01-06", "100"),
        ]);
        let grain = Grain::infer(&table, &ColumnSpec::default());
        assert_eq!(grain, Grain::PerPatient("Patient ID".into()));
    }

    #[test]
    fn test_grain_repeating_patient() {
        let table = Table::from_rows(
            vec!["member_id".into()],
            vec![vec![text("M1")], vec![text("M1")]],
        );
        let grain = Grain::infer(&table, &ColumnSpec::default());
        assert_eq!(
            grain.to_string(),
            "Multiple rows per patient (`member_id` repeats); likely one row per claim/service."
        );
    }

    #[test]
    fn test_grain_unknown() {
        let table = Table::new(vec!["x".into()]);
        assert_eq!(Grain::infer(&table, &ColumnSpec::default()), Grain::Unknown);
    }

    // ── BasicProfile ──────────────────────────────────────────────────────────

    #[test]
    fn test_profile_order_and_values() {
        let table = good();
        let spec = ColumnSpec::default();
        let grain = Grain::infer(&table, &spec);
        let profile = BasicProfile::of(&table, &spec, &grain);

        let metrics: Vec<&str> = profile.entries.iter().map(|(m, _)| m.as_str()).collect();
        assert_eq!(
            metrics,
            vec![
                "row_count",
                "column_count",
                "date_column",
                "date_parse_failures",
                "date_min",
                "date_max",
                "Billed Amount__min",
                "Billed Amount__max",
                "Billed Amount__mean",
                "claim_id_column",
                "duplicate_claim_id_count",
                "grain_guess",
            ]
        );
        assert_eq!(profile.get("row_count"), Some("3"));
        assert_eq!(profile.get("date_min"), Some("2024-01-05"));
        assert_eq!(profile.get("date_max"), Some("2024-03-01"));
        assert_eq!(profile.get("Billed Amount__min"), Some("20"));
        assert_eq!(profile.get("Billed Amount__max"), Some("100"));
        assert_eq!(profile.get("Billed Amount__mean"), Some("56.8333"));
        assert_eq!(profile.get("duplicate_claim_id_count"), Some("0"));
    }

    #[test]
    fn test_profile_unparseable_dates_leave_bounds_empty() {
        let table = claims(&[("C1", "P1", "not a date", "10")]);
        let spec = ColumnSpec::default();
        let profile = BasicProfile::of(&table, &spec, &Grain::infer(&table, &spec));
        assert_eq!(profile.get("date_parse_failures"), Some("1"));
        assert_eq!(profile.get("date_min"), Some(""));
    }

    // ── Rules ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_rules_pass_on_clean_input() {
        assert!(rules(&good()).is_empty());
        assert!(check_rules(&good(), &ColumnSpec::default(), &QualityConfig::default()).is_empty());
    }

    #[test]
    fn test_rules_empty_table() {
        let failures = rules(&claims(&[]));
        assert!(failures.contains(&"Row count is 0. The input dataset appears empty.".to_string()));
        assert!(failures
            .iter()
            .any(|f| f.contains("none of the values could be parsed as dates")));
    }

    #[test]
    fn test_rules_missing_required_columns() {
        let quality = QualityConfig {
            required_columns: vec!["Billed Amount".into(), "Paid Amount".into()],
            ..QualityConfig::default()
        };
        let table = Table::from_rows(vec!["x".into()], vec![vec![text("1")]]);
        let failures = check_rules_at(&table, &ColumnSpec::default(), &quality, now());
        assert_eq!(
            failures,
            vec!["Missing required columns: Billed Amount, Paid Amount.".to_string()]
        );
    }

    #[test]
    fn test_rules_future_date() {
        let table = claims(&[("C1", "P1", "2030-01-01", "10")]);
        let failures = rules(&table);
        assert_eq!(
            failures,
            vec!["Date max (2030-01-01) is in the future; check 'Date of Service' parsing/format."
                .to_string()]
        );
    }

    #[test]
    fn test_rules_date_within_tolerance() {
        // One day past `now` is still accepted.
        let table = claims(&[("C1", "P1", "2024-06-02", "10")]);
        assert!(rules(&table).is_empty());
    }

    #[test]
    fn test_rules_invalid_billed_amounts() {
        let table = claims(&[
            ("C1", "P1", "2024-01-01", "0"),
            ("C2", "P1", "2024-01-01", "-5"),
            ("C3", "P1", "2024-01-01", ""),
            ("C4", "P1", "2024-01-01", "abc"),
            ("C5", "P1", "2024-01-01", "10"),
        ]);
        assert_eq!(
            rules(&table),
            vec!["Found 4 rows with missing or non-positive 'Billed Amount'.".to_string()]
        );
    }

    #[test]
    fn test_rules_negative_other_amount() {
        let table = Table::from_rows(
            vec!["Billed Amount".into(), "Paid amount".into()],
            vec![vec![text("10"), text("-1")], vec![text("10"), text("3")]],
        );
        assert_eq!(
            rules(&table),
            vec!["Found 1 rows with negative values in 'Paid amount'.".to_string()]
        );
    }

    #[test]
    fn test_rules_duplicate_claims() {
        let table = claims(&[
            ("C1", "P1", "2024-01-01", "10"),
            ("C1", "P2", "2024-01-01", "10"),
            ("C1", "P3", "2024-01-01", "10"),
        ]);
        assert_eq!(
            rules(&table),
            vec!["Column 'Claim ID' should be unique but has 2 duplicate values.".to_string()]
        );
    }

    // ── run_integrity_checks ──────────────────────────────────────────────────

    #[test]
    fn test_run_writes_diagnostics_on_success() {
        let tmp = TempDir::new().unwrap();
        let report =
            run_integrity_checks_at(&good(), tmp.path(), &PipelineConfig::default(), now())
                .unwrap();

        assert!(report.missingness_path.exists());
        assert!(report.profile_path.exists());
        assert_eq!(report.grain, Grain::PerClaim("Claim ID".into()));
    }

    #[test]
    fn test_run_writes_diagnostics_before_failing() {
        let tmp = TempDir::new().unwrap();
        let table = claims(&[("C1", "P1", "2024-01-01", "-3")]);

        let err = run_integrity_checks_at(&table, tmp.path(), &PipelineConfig::default(), now())
            .unwrap_err();

        let ClaimsError::Integrity(integrity) = err else {
            panic!("expected integrity error");
        };
        assert_eq!(integrity.failures.len(), 1);
        assert!(tmp.path().join("tables/missingness.csv").exists());
        assert!(tmp.path().join("tables/basic_profile.csv").exists());
        assert!(integrity.to_string().contains("Next steps:"));
    }
}
