//! In-memory claims table.
//!
//! A [`Table`] is an ordered list of column names plus rows of [`Cell`]s.
//! Columns carry no schema; callers look them up by name (see
//! [`crate::columns`]) and coerce cell values on demand.

use chrono::NaiveDate;
use serde::Serialize;

use crate::coerce;

/// Raw strings treated as missing when a table is loaded from text.
pub const NULL_MARKERS: &[&str] = &[
    "", "NA", "N/A", "n/a", "NaN", "nan", "-nan", "NULL", "null", "None", "<NA>", "#N/A",
];

// ── Cell ──────────────────────────────────────────────────────────────────────

/// A single scalar value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Null,
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

impl Cell {
    /// Build a cell from a raw text field, mapping [`NULL_MARKERS`] to `Null`.
    ///
    /// Markers match exactly; a whitespace-only field stays text.
    pub fn from_raw(raw: &str) -> Self {
        if NULL_MARKERS.contains(&raw) {
            Cell::Null
        } else {
            Cell::Text(raw.to_string())
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    /// Numeric view of the cell; unparseable text yields `None`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            Cell::Text(s) => coerce::parse_number(s),
            Cell::Null | Cell::Date(_) => None,
        }
    }

    /// Date view of the cell; unparseable text yields `None`.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Cell::Date(d) => Some(*d),
            Cell::Text(s) => coerce::parse_date(s),
            Cell::Null | Cell::Number(_) => None,
        }
    }

    /// Text key used when grouping rows by this cell. `Null` has no key.
    pub fn group_key(&self) -> Option<String> {
        match self {
            Cell::Null => None,
            other => Some(other.render()),
        }
    }

    /// Render the cell for flat text output. `Null` renders as an empty string.
    pub fn render(&self) -> String {
        match self {
            Cell::Null => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => n.to_string(),
            Cell::Date(d) => d.format("%Y-%m-%d").to_string(),
        }
    }
}

// ── Table ─────────────────────────────────────────────────────────────────────

/// Ordered rows over a set of named columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Create an empty table with the given columns.
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Create a table from column names and rows.
    ///
    /// Rows shorter than the header are padded with `Null`; longer rows are
    /// truncated.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let mut table = Self::new(columns);
        for row in rows {
            table.push_row(row);
        }
        table
    }

    /// Append a row, normalising its width to the column count.
    pub fn push_row(&mut self, mut row: Vec<Cell>) {
        row.resize(self.columns.len(), Cell::Null);
        self.rows.push(row);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Iterate over the cells of column `name`, or `None` if it is absent.
    pub fn column(&self, name: &str) -> Option<impl Iterator<Item = &Cell> + '_> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(move |row| &row[idx]))
    }

    /// Numeric coercion of a whole column (parse-or-null per cell).
    pub fn numbers(&self, name: &str) -> Option<Vec<Option<f64>>> {
        self.column(name)
            .map(|cells| cells.map(Cell::as_number).collect())
    }

    /// Date coercion of a whole column (parse-or-null per cell).
    pub fn dates(&self, name: &str) -> Option<Vec<Option<NaiveDate>>> {
        self.column(name).map(|cells| cells.map(Cell::as_date).collect())
    }

    /// Names of every column containing `"amount"` (case-insensitive).
    pub fn amount_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.to_lowercase().contains("amount"))
            .map(String::as_str)
            .collect()
    }

    /// Return a copy of the table with `f` applied to every cell of `name`.
    ///
    /// Unknown column names leave the table unchanged.
    pub fn map_column(mut self, name: &str, f: impl Fn(&Cell) -> Cell) -> Self {
        if let Some(idx) = self.column_index(name) {
            for row in &mut self.rows {
                row[idx] = f(&row[idx]);
            }
        }
        self
    }

    /// Keep only rows for which `keep` returns `true`.
    pub fn retain_rows(mut self, keep: impl Fn(&[Cell]) -> bool) -> Self {
        self.rows.retain(|row| keep(row));
        self
    }
}

// ── TabularOutput ─────────────────────────────────────────────────────────────

/// Anything that can be written out as a flat header + records table.
pub trait TabularOutput {
    fn headers(&self) -> Vec<String>;
    fn records(&self) -> Vec<Vec<String>>;
}

impl TabularOutput for Table {
    fn headers(&self) -> Vec<String> {
        self.columns.clone()
    }

    fn records(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| row.iter().map(Cell::render).collect())
            .collect()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
