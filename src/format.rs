//! Plain-text rendering of table rows.
//!
//! [`RowsToString`] measures every cell once, then yields one padded line
//! at a time: a header line followed by one line per row.

use crate::{
    data::ColumnValue,
    table::Table,
    Result,
};
use tokio::io::{
    AsyncWrite,
    AsyncWriteExt,
};

/// Options for rendering rows as text
#[derive(Clone, Debug)]
pub struct FormatOptions {
    /// Column separator
    pub separator: String,
    /// Text shown for null cells
    pub null_text: String,
    /// Header of the leading row-number column
    pub row_id_header: String,
    /// Stop after this many rows
    pub max_rows: Option<usize>,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            separator: " | ".to_string(),
            null_text: "null".to_string(),
            row_id_header: "row_id".to_string(),
            max_rows: None,
        }
    }
}

impl FormatOptions {
    /// Set the column separator
    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Set the text for null cells
    pub fn null_text(mut self, null_text: impl Into<String>) -> Self {
        self.null_text = null_text.into();
        self
    }

    /// Set the row-number column header
    pub fn row_id_header(mut self, header: impl Into<String>) -> Self {
        self.row_id_header = header.into();
        self
    }

    /// Limit the number of rendered rows
    pub fn max_rows(mut self, max_rows: Option<usize>) -> Self {
        self.max_rows = max_rows;
        self
    }
}

/// Restartable line iterator over a table's rows.
///
/// Column widths are fixed on construction, so every line has the same
/// layout regardless of where iteration is restarted.
pub struct RowsToString<'a> {
    table: &'a Table,
    options: FormatOptions,
    widths: Vec<usize>,
    rows: usize,
    position: usize,
    cancelled: bool,
}

impl<'a> RowsToString<'a> {
    pub fn new(table: &'a Table, options: FormatOptions) -> Self {
        let rows = options.max_rows.map_or(table.len(), |max| max.min(table.len()));

        let mut widths: Vec<usize> = std::iter::once(options.row_id_header.chars().count())
            .chain(table.schema().fields().iter().map(|field| field.to_string().chars().count()))
            .collect();
        widths[0] = widths[0].max(rows.saturating_sub(1).to_string().len());
        for row in 0..rows {
            let Some(values) = table.get(row) else { break };
            for (column, value) in values.iter().enumerate() {
                let width = cell(value, &options.null_text).chars().count();
                if let Some(slot) = widths.get_mut(column + 1) {
                    *slot = (*slot).max(width);
                }
            }
        }

        Self { table, options, widths, rows, position: 0, cancelled: false }
    }

    /// Rewind to the header line
    pub fn restart(&mut self) {
        self.position = 0;
        self.cancelled = false;
    }

    /// Stop yielding lines until [`restart`](Self::restart)
    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    /// Per-column widths, row-number column first
    pub fn widths(&self) -> &[usize] {
        &self.widths
    }

    /// Write every remaining line, newline-terminated, to `writer`.
    ///
    /// Suspends whenever the writer applies backpressure.
    pub async fn pipe<W>(&mut self, writer: &mut W) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        while let Some(line) = self.next() {
            writer.write_all(line.as_bytes()).await?;
            writer.write_all(b"\n").await?;
        }
        writer.flush().await?;
        Ok(())
    }

    fn header(&self) -> String {
        let cells = std::iter::once(self.options.row_id_header.clone())
            .chain(self.table.schema().fields().iter().map(ToString::to_string));
        self.join(cells)
    }

    fn row(&self, index: usize) -> Option<String> {
        let values = self.table.get(index)?;
        let cells = std::iter::once(index.to_string())
            .chain(values.iter().map(|value| cell(value, &self.options.null_text)));
        Some(self.join(cells))
    }

    fn join(&self, cells: impl Iterator<Item = String>) -> String {
        cells
            .zip(&self.widths)
            .map(|(text, width)| format!("{:>width$}", text, width = *width))
            .collect::<Vec<_>>()
            .join(&self.options.separator)
    }
}

impl Iterator for RowsToString<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.cancelled || self.position > self.rows {
            return None;
        }
        let line = match self.position {
            0 => self.header(),
            position => self.row(position - 1)?,
        };
        self.position += 1;
        Some(line)
    }
}

fn cell(value: &ColumnValue, null_text: &str) -> String {
    match value {
        ColumnValue::Null => null_text.to_string(),
        ColumnValue::Utf8(text) => format!("\"{}\"", text),
        other => other.to_string(),
    }
}
