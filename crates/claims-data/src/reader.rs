//! CSV discovery and loading.
//!
//! Reads the raw claims file into a [`Table`] of text cells. No typing is
//! applied here; coercion happens later in the cleaning stage.

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use claims_core::error::{ClaimsError, Result};
use claims_core::table::{Cell, Table};
use tracing::{debug, warn};

/// File names tried in the project root when no input is given.
pub const DEFAULT_INPUT_NAMES: &[&str] = &["claim_data.csv", "MedicalClaimsSynthetic1M.csv"];

// ── Public API ────────────────────────────────────────────────────────────────

/// Resolve the input path.
///
/// An explicit path is used as-is (relative paths are joined to `root`).
/// Otherwise the first of [`DEFAULT_INPUT_NAMES`] that exists under `root`
/// is returned.
pub fn pick_input_path(root: &Path, explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(p) = explicit {
        return Ok(if p.is_absolute() {
            p.to_path_buf()
        } else {
            root.join(p)
        });
    }

    DEFAULT_INPUT_NAMES
        .iter()
        .map(|name| root.join(name))
        .find(|candidate| candidate.exists())
        .ok_or_else(|| {
            ClaimsError::InputNotFound(format!(
                "expected {} in {}; pass --input PATH",
                DEFAULT_INPUT_NAMES.join(" or "),
                root.display()
            ))
        })
}

/// Load a CSV file with a header row into a [`Table`].
pub fn load_table(path: &Path) -> Result<Table> {
    let file = std::fs::File::open(path).map_err(|source| ClaimsError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let table = read_table(file)?;
    debug!(
        "Loaded {} rows x {} columns from {}",
        table.row_count(),
        table.column_count(),
        path.display()
    );
    Ok(table)
}

/// Parse CSV text from any reader into a [`Table`].
///
/// Empty fields and common null markers become [`Cell::Null`]. Ragged rows
/// are padded or truncated to the header width. Repeated header names get a
/// `.N` suffix so every column stays addressable.
pub fn read_table<R: Read>(input: R) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(input);

    let raw_headers: Vec<String> = reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(i, h)| {
            if i == 0 {
                h.trim_start_matches('\u{feff}').to_string()
            } else {
                h.to_string()
            }
        })
        .collect();
    let columns = dedupe_headers(raw_headers);
    let width = columns.len();

    let mut table = Table::new(columns);
    let mut ragged = 0usize;
    for record in reader.records() {
        let record = record?;
        if record.len() != width {
            ragged += 1;
        }
        table.push_row(record.iter().map(Cell::from_raw).collect());
    }

    if ragged > 0 {
        warn!("{} rows did not match the header width of {}", ragged, width);
    }
    Ok(table)
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn dedupe_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    headers
        .into_iter()
        .map(|h| {
            let count = seen.entry(h.clone()).or_insert(0);
            let name = if *count == 0 {
                h
            } else {
                format!("{}.{}", h, count)
            };
            *count += 1;
            name
        })
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
