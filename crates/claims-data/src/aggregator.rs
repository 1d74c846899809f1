//! Group-and-sum over claim rows.
//!
//! Every per-patient, per-diagnosis and per-month figure in the pipeline is
//! a sum of billed amounts keyed by some function of the row. This module
//! does that grouping once, in a sorted map, and hands back plain vectors.

use std::collections::BTreeMap;

use claims_core::table::{Cell, Table};

// ── GroupTotal ────────────────────────────────────────────────────────────────

/// Billed amount accumulated for one group key.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct GroupTotal {
    /// Group key: a patient id, a diagnosis code or a `"%Y-%m"` month.
    pub key: String,
    /// Sum of the parseable values in the group. Unparseable values add 0.
    pub total: f64,
    /// Number of rows that fell in the group.
    pub count: usize,
}

impl GroupTotal {
    fn new(key: String) -> Self {
        Self {
            key,
            total: 0.0,
            count: 0,
        }
    }

    fn add(&mut self, value: Option<f64>) {
        self.total += value.unwrap_or(0.0);
        self.count += 1;
    }
}

// ── ClaimAggregator ───────────────────────────────────────────────────────────

/// Stateless helper that groups rows of a [`Table`].
pub struct ClaimAggregator;

impl ClaimAggregator {
    /// Sum `value_column` per distinct non-null value of `key_column`.
    ///
    /// Returns groups sorted by key (ascending), or `None` when either column
    /// is absent.
    pub fn by_column(
        table: &Table,
        key_column: &str,
        value_column: &str,
    ) -> Option<Vec<GroupTotal>> {
        let key_idx = table.column_index(key_column)?;
        let value_idx = table.column_index(value_column)?;
        Some(Self::aggregate_by(table, value_idx, |row| {
            row[key_idx].group_key()
        }))
    }

    /// Same as [`ClaimAggregator::by_column`] but ordered by total
    /// (descending); equal totals keep ascending key order.
    pub fn ranked_by_column(
        table: &Table,
        key_column: &str,
        value_column: &str,
    ) -> Option<Vec<GroupTotal>> {
        let mut groups = Self::by_column(table, key_column, value_column)?;
        rank_descending(&mut groups);
        Some(groups)
    }

    /// Sum `value_column` per calendar month of `date_column`.  Key format:
    /// `"%Y-%m"`. Rows whose date does not parse are dropped.
    ///
    /// Returns months sorted chronologically, or `None` when either column
    /// is absent.
    pub fn monthly(
        table: &Table,
        date_column: &str,
        value_column: &str,
    ) -> Option<Vec<GroupTotal>> {
        let date_idx = table.column_index(date_column)?;
        let value_idx = table.column_index(value_column)?;
        Some(Self::aggregate_by(table, value_idx, |row| {
            row[date_idx]
                .as_date()
                .map(|d| d.format("%Y-%m").to_string())
        }))
    }

    // ── Private ───────────────────────────────────────────────────────────────

    /// Generic aggregation driver.
    ///
    /// `key_fn` maps a row to its group key; rows mapped to `None` are skipped.
    fn aggregate_by(
        table: &Table,
        value_idx: usize,
        key_fn: impl Fn(&[Cell]) -> Option<String>,
    ) -> Vec<GroupTotal> {
        let mut map: BTreeMap<String, GroupTotal> = BTreeMap::new();

        for row in table.rows() {
            let Some(key) = key_fn(row) else {
                continue;
            };
            map.entry(key.clone())
                .or_insert_with(|| GroupTotal::new(key))
                .add(row[value_idx].as_number());
        }

        map.into_values().collect()
    }
}

/// Sort by total (descending). The sort is stable, so callers that start
/// from key order get ascending keys among ties.
pub fn rank_descending(groups: &mut [GroupTotal]) {
    groups.sort_by(|a, b| b.total.total_cmp(&a.total));
}

// ── Tests ─────────────────────────────────────────────────────────────────────
