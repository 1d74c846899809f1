//! Typed, filtered view of the raw table.

use claims_core::columns::ColumnSpec;
use claims_core::table::{Cell, Table};
use tracing::debug;

/// Coerce dates and amounts, then drop rows without a positive billed amount.
///
/// * The date-of-service column becomes [`Cell::Date`]; unparseable values
///   become `Null` and the row is kept.
/// * Every column whose name contains `amount` becomes [`Cell::Number`];
///   unparseable values become `Null`.
/// * When the billed column exists, rows where it is null or `<= 0` are
///   removed. Without it no rows are dropped.
///
/// Cleaning an already-clean table returns it unchanged.
pub fn clean(raw: &Table, spec: &ColumnSpec) -> Table {
    let mut table = raw.clone();

    if let Some(col) = spec.date(raw) {
        table = table.map_column(col, |cell| cell.as_date().map_or(Cell::Null, Cell::Date));
    }

    for col in raw.amount_columns() {
        table = table.map_column(col, |cell| {
            cell.as_number().map_or(Cell::Null, Cell::Number)
        });
    }

    if let Some(idx) = spec.billed(&table).and_then(|col| table.column_index(col)) {
        let before = table.row_count();
        table = table.retain_rows(|row| row[idx].as_number().is_some_and(|n| n > 0.0));
        debug!(
            "Cleaning dropped {} of {} rows without a positive billed amount",
            before - table.row_count(),
            before
        );
    }

    table
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn raw() -> Table {
        Table::from_rows(
            vec![
                "Patient ID".into(),
                "Date of Service".into(),
                "Billed Amount".into(),
                "Paid Amount".into(),
            ],
            vec![
                vec![
                    Cell::from_raw("P1"),
                    Cell::from_raw("2024-01-05"),
                    Cell::from_raw("100"),
                    Cell::from_raw("80"),
                ],
                vec![
                    Cell::from_raw("P2"),
                    Cell::from_raw("soon"),
                    Cell::from_raw("25.5"),
                    Cell::from_raw("n/a"),
                ],
                vec![
                    Cell::from_raw("P3"),
                    Cell::from_raw("2024-01-07"),
                    Cell::from_raw("0"),
                    Cell::from_raw("0"),
                ],
                vec![
                    Cell::from_raw("P4"),
                    Cell::from_raw("2024-01-08"),
                    Cell::from_raw(""),
                    Cell::from_raw("1"),
                ],
                vec![
                    Cell::from_raw("P5"),
                    Cell::from_raw("2024-01-09"),
                    Cell::from_raw("-4"),
                    Cell::from_raw("1"),
                ],
            ],
        )
    }

    #[test]
    fn test_clean_coerces_and_filters() {
        let cleaned = clean(&raw(), &ColumnSpec::default());

        assert_eq!(cleaned.row_count(), 2);
        assert_eq!(
            cleaned.rows()[0][1],
            Cell::Date(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap())
        );
        assert_eq!(cleaned.rows()[0][2], Cell::Number(100.0));
        assert_eq!(cleaned.rows()[0][3], Cell::Number(80.0));
        // Unparseable date is nulled but the row survives.
        assert_eq!(cleaned.rows()[1][1], Cell::Null);
        assert_eq!(cleaned.rows()[1][3], Cell::Null);
    }

    #[test]
    fn test_clean_is_idempotent() {
        let spec = ColumnSpec::default();
        let once = clean(&raw(), &spec);
        let twice = clean(&once, &spec);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_clean_without_billed_column_keeps_all_rows() {
        let table = Table::from_rows(
            vec!["Paid Amount".into()],
            vec![vec![Cell::from_raw("-1")], vec![Cell::from_raw("x")]],
        );
        let cleaned = clean(&table, &ColumnSpec::default());
        assert_eq!(cleaned.row_count(), 2);
        assert_eq!(cleaned.rows()[0][0], Cell::Number(-1.0));
        assert_eq!(cleaned.rows()[1][0], Cell::Null);
    }

    #[test]
    fn test_clean_leaves_input_untouched() {
        let input = raw();
        let _ = clean(&input, &ColumnSpec::default());
        assert_eq!(input, raw());
    }
}
