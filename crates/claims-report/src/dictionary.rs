//! `docs/data_dictionary.md`: per-column description of the cleaned table.

use std::fmt;
use std::path::PathBuf;

use claims_core::columns::ColumnSpec;
use claims_core::error::Result;
use claims_core::formatting::format_number;
use claims_core::table::{Cell, Table};
use claims_data::quality::Grain;
use claims_data::writer::{write_text, OutputLayout};
use tracing::info;

use crate::markdown::{escape, Align, MarkdownTable};

const SAMPLE_COUNT: usize = 3;
const SAMPLE_WIDTH: usize = 50;

// ── ColumnType ────────────────────────────────────────────────────────────────

/// Display type of a column, judged from its non-null cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Date,
    Integer,
    Numeric,
    Text,
}

impl ColumnType {
    /// All-date columns are `Date`; all-numeric ones `Integer` or `Numeric`;
    /// anything else (including an all-null column) is `Text`.
    pub fn infer<'a>(cells: impl Iterator<Item = &'a Cell>) -> Self {
        let values: Vec<&Cell> = cells.filter(|c| !c.is_null()).collect();
        if values.is_empty() {
            return ColumnType::Text;
        }
        if values.iter().all(|c| matches!(c, Cell::Date(_))) {
            return ColumnType::Date;
        }
        let numbers: Option<Vec<f64>> = values.iter().map(|c| c.as_number()).collect();
        match numbers {
            Some(ns) if ns.iter().all(|n| n.fract() == 0.0) => ColumnType::Integer,
            Some(_) => ColumnType::Numeric,
            None => ColumnType::Text,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ColumnType::Date => "date",
            ColumnType::Integer => "integer",
            ColumnType::Numeric => "numeric",
            ColumnType::Text => "string",
        };
        f.write_str(label)
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Render and write the data dictionary for `cleaned`.
pub fn write_data_dictionary(
    cleaned: &Table,
    spec: &ColumnSpec,
    layout: &OutputLayout,
) -> Result<PathBuf> {
    let path = layout.data_dictionary_md();
    write_text(&path, &render_data_dictionary(cleaned, spec))?;
    info!("Wrote {}", path.display());
    Ok(path)
}

/// Render the data dictionary as Markdown.
pub fn render_data_dictionary(cleaned: &Table, spec: &ColumnSpec) -> String {
    let rows = cleaned.row_count();
    let mut lines: Vec<String> = vec![
        "# Data Dictionary".into(),
        String::new(),
        "## Dataset Overview".into(),
        String::new(),
        "- **Source**: `data/claims_clean.csv`".into(),
        format!("- **Rows**: {}", format_number(rows as f64, 0)),
        format!("- **Columns**: {}", cleaned.column_count()),
        format!("- **Grain**: {}", Grain::infer(cleaned, spec)),
        String::new(),
        "## Column Details".into(),
        String::new(),
    ];

    let mut table = MarkdownTable::new(["Column", "Type", "% Missing", "Example Values"])
        .align(2, Align::Right);
    for (idx, name) in cleaned.columns().iter().enumerate() {
        let cells = || cleaned.rows().iter().map(move |r| &r[idx]);
        let missing = cells().filter(|c| c.is_null()).count();
        let pct_missing = if rows == 0 {
            0.0
        } else {
            missing as f64 / rows as f64 * 100.0
        };
        table.row([
            name.clone(),
            ColumnType::infer(cells()).to_string(),
            format!("{pct_missing:.1}%"),
            sample_values(cells()),
        ]);
    }
    lines.extend(table.render());
    lines.push(String::new());

    lines.push("## Assumptions & Notes".into());
    lines.push(String::new());
    lines.push(format!(
        "- **Cleaning applied**: Rows with missing `{billed}` removed; records with `{billed} ≤ 0` removed.",
        billed = escape(&spec.billed_amount)
    ));
    if let Some(date) = spec.date(cleaned) {
        lines.push(format!(
            "- **Date parsing**: `{date}` parsed to a calendar date; unparseable values are left empty."
        ));
    }
    lines.push(
        "- **Amounts**: Every column whose name contains `amount` is coerced to a number; \
         unparseable values are left empty."
            .into(),
    );

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Up to [`SAMPLE_COUNT`] non-null values, each cut to [`SAMPLE_WIDTH`]
/// characters, joined with `"; "`.
fn sample_values<'a>(cells: impl Iterator<Item = &'a Cell>) -> String {
    let samples: Vec<String> = cells
        .filter(|c| !c.is_null())
        .take(SAMPLE_COUNT)
        .map(|c| c.render().chars().take(SAMPLE_WIDTH).collect())
        .collect();
    if samples.is_empty() {
        "(all null)".to_string()
    } else {
        samples.join("; ")
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
