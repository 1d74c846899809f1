//! Minimal Markdown table builder.

/// Column alignment in a Markdown table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

/// A pipe table with a header row and any number of body rows.
#[derive(Debug, Clone)]
pub struct MarkdownTable {
    headers: Vec<String>,
    aligns: Vec<Align>,
    rows: Vec<Vec<String>>,
}

impl MarkdownTable {
    /// Columns default to left alignment.
    pub fn new<S: Into<String>>(headers: impl IntoIterator<Item = S>) -> Self {
        let headers: Vec<String> = headers.into_iter().map(Into::into).collect();
        let aligns = vec![Align::Left; headers.len()];
        Self {
            headers,
            aligns,
            rows: Vec::new(),
        }
    }

    pub fn align(mut self, column: usize, align: Align) -> Self {
        if let Some(slot) = self.aligns.get_mut(column) {
            *slot = align;
        }
        self
    }

    /// Append a row. Short rows are padded with empty cells.
    pub fn row<S: Into<String>>(&mut self, cells: impl IntoIterator<Item = S>) {
        let mut cells: Vec<String> = cells.into_iter().map(Into::into).collect();
        cells.resize(self.headers.len(), String::new());
        self.rows.push(cells);
    }

    /// Render as lines (no trailing blank line).
    pub fn render(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.rows.len() + 2);
        lines.push(pipe_row(&self.headers));
        let rule: Vec<String> = self
            .aligns
            .iter()
            .map(|a| match a {
                Align::Left => "---".to_string(),
                Align::Right => "---:".to_string(),
            })
            .collect();
        lines.push(format!("|{}|", rule.join("|")));
        for row in &self.rows {
            lines.push(pipe_row(row));
        }
        lines
    }
}

fn pipe_row(cells: &[String]) -> String {
    let escaped: Vec<String> = cells.iter().map(|c| escape(c)).collect();
    format!("| {} |", escaped.join(" | "))
}

/// Escape characters that would break a table cell.
pub fn escape(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

// ── Tests ─────────────────────────────────────────────────────────────────────
