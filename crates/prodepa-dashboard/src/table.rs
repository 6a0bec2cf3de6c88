//! Plain-text tables for terminal output.
//!
//! Columns are sized by display width (not byte length) so accented
//! municipality names and wide glyphs line up.

use unicode_width::UnicodeWidthStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

/// A header row, data rows and a per-column alignment.
#[derive(Debug, Clone, Default)]
pub struct TextTable {
    headers: Vec<String>,
    align: Vec<Align>,
    rows: Vec<Vec<String>>,
}

impl TextTable {
    /// New table; every column is left-aligned until [`TextTable::align`].
    pub fn new<S: Into<String>>(headers: impl IntoIterator<Item = S>) -> Self {
        let headers: Vec<String> = headers.into_iter().map(Into::into).collect();
        let align = vec![Align::Left; headers.len()];
        Self {
            headers,
            align,
            rows: Vec::new(),
        }
    }

    pub fn align(mut self, column: usize, align: Align) -> Self {
        if let Some(slot) = self.align.get_mut(column) {
            *slot = align;
        }
        self
    }

    /// Append a row; short rows are padded with empty cells, long rows cut.
    pub fn push<S: Into<String>>(&mut self, cells: impl IntoIterator<Item = S>) {
        let mut row: Vec<String> = cells.into_iter().map(Into::into).collect();
        row.resize(self.headers.len(), String::new());
        self.rows.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.width()).collect();
        for row in &self.rows {
            for (w, cell) in widths.iter_mut().zip(row) {
                *w = (*w).max(cell.width());
            }
        }
        widths
    }

    fn render_row(&self, cells: &[String], widths: &[usize]) -> String {
        let line: Vec<String> = cells
            .iter()
            .zip(widths)
            .zip(&self.align)
            .map(|((cell, width), align)| pad(cell, *width, *align))
            .collect();
        line.join("  ").trim_end().to_string()
    }

    /// Render with a dashed rule under the header. No trailing newline.
    pub fn render(&self) -> String {
        let widths = self.widths();
        let mut lines = Vec::with_capacity(self.rows.len() + 2);
        lines.push(self.render_row(&self.headers, &widths));
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        lines.push(rule.join("  "));
        for row in &self.rows {
            lines.push(self.render_row(row, &widths));
        }
        lines.join("\n")
    }
}

/// Pad `text` with spaces to `width` display columns.
pub fn pad(text: &str, width: usize, align: Align) -> String {
    let fill = " ".repeat(width.saturating_sub(text.width()));
    match align {
        Align::Left => format!("{text}{fill}"),
        Align::Right => format!("{fill}{text}"),
    }
}

/// Horizontal bar scaled to `max`, at most `width` cells long.
pub fn bar(value: f64, max: f64, width: usize) -> String {
    if width == 0 || max <= 0.0 || value <= 0.0 {
        return String::new();
    }
    let cells = ((value / max) * width as f64).round() as usize;
    "█".repeat(cells.clamp(1, width))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pad_uses_display_width() {
        assert_eq!(pad("Belém", 7, Align::Left), "Belém  ");
        assert_eq!(pad("42", 5, Align::Right), "   42");
        assert_eq!(pad("toolong", 3, Align::Left), "toolong");
    }

    #[test]
    fn test_render_aligns_columns() {
        let mut table = TextTable::new(["Município", "Qtd"]).align(1, Align::Right);
        table.push(["BELÉM", "12"]);
        table.push(["SANTARÉM", "3"]);

        let rendered = table.render();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "Município  Qtd");
        assert_eq!(lines[1], "---------  ---");
        assert_eq!(lines[2], "BELÉM       12");
        assert_eq!(lines[3], "SANTARÉM     3");
    }

    #[test]
    fn test_push_pads_short_rows() {
        let mut table = TextTable::new(["A", "B"]);
        table.push(["x"]);
        assert_eq!(table.render().lines().nth(2), Some("x"));
    }

    #[test]
    fn test_bar() {
        assert_eq!(bar(10.0, 10.0, 4), "████");
        assert_eq!(bar(5.0, 10.0, 4), "██");
        assert_eq!(bar(0.1, 10.0, 4), "█");
        assert_eq!(bar(0.0, 10.0, 4), "");
        assert_eq!(bar(1.0, 0.0, 4), "");
    }

    #[test]
    fn test_bar_zero_width_is_empty() {
        assert_eq!(bar(10.0, 10.0, 0), "");
        assert_eq!(bar(0.1, 10.0, 0), "");
    }
}
