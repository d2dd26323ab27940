//! Rendering command results.
//!
//! Every result type implements [`Serialize`] for `--format json` and
//! [`TableDisplay`] for the default human-readable view.

use std::io::Write;

use serde::Serialize;

use crate::cli::Format;
use crate::error::CliError;

/// Writes command results in the format picked on the command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputFormat {
    format: Format,
}

impl OutputFormat {
    /// Wraps the `--format` choice.
    #[must_use]
    pub const fn new(format: Format) -> Self {
        Self { format }
    }

    /// Writes `value` as pretty JSON or as its table view.
    ///
    /// # Errors
    ///
    /// Returns `CliError::Format` if JSON encoding fails and `CliError::Io`
    /// if the writer does.
    pub fn write<W, T>(&self, writer: &mut W, value: &T) -> Result<(), CliError>
    where
        W: Write,
        T: Serialize + TableDisplay,
    {
        if self.format == Format::Json {
            serde_json::to_writer_pretty(&mut *writer, value)
                .map_err(|e| CliError::Format(format!("cannot encode result as JSON: {e}")))?;
            writeln!(writer)?;
            return Ok(());
        }
        value.write_table(writer)
    }
}

/// Human-readable view of a command result.
pub trait TableDisplay {
    /// Writes the view.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError>;
}

/// Column-aligned rows with a header.
#[derive(Debug, Clone, Default)]
pub struct Table {
    header: Vec<&'static str>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Starts a table with the given column names.
    #[must_use]
    pub fn new(header: &[&'static str]) -> Self {
        Self {
            header: header.to_vec(),
            rows: Vec::new(),
        }
    }

    /// Appends a row. Missing cells render empty; extra cells are dropped.
    pub fn row(&mut self, cells: Vec<String>) {
        self.rows.push(cells);
    }

    /// Writes the header, a rule, and every row.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        let widths: Vec<usize> = self
            .header
            .iter()
            .enumerate()
            .map(|(i, name)| {
                self.rows
                    .iter()
                    .filter_map(|row| row.get(i))
                    .map(|cell| cell.chars().count())
                    .chain(std::iter::once(name.len()))
                    .max()
                    .unwrap_or_default()
            })
            .collect();

        let header: Vec<String> = self.header.iter().map(|h| (*h).to_string()).collect();
        write_row(writer, &header, &widths)?;
        let rule_len = widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1);
        writeln!(writer, "{}", "─".repeat(rule_len))?;
        for row in &self.rows {
            write_row(writer, row, &widths)?;
        }
        Ok(())
    }
}

fn write_row<W: Write>(writer: &mut W, cells: &[String], widths: &[usize]) -> Result<(), CliError> {
    let mut line = String::new();
    for (i, width) in widths.iter().enumerate() {
        let cell = cells.get(i).map_or("", String::as_str);
        if i + 1 == widths.len() {
            line.push_str(cell);
        } else {
            line.push_str(cell);
            let pad = width.saturating_sub(cell.chars().count()) + 2;
            line.extend(std::iter::repeat_n(' ', pad));
        }
    }
    writeln!(writer, "{}", line.trim_end())?;
    Ok(())
}

/// A one-line confirmation.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    /// Confirmation text.
    pub message: String,
}

impl Message {
    /// Confirms that `message` happened.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl TableDisplay for Message {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "✓ {}", self.message)?;
        Ok(())
    }
}

/// Truncate a string to a maximum number of characters.
#[must_use]
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len > 3 {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{kept}...")
    } else {
        s.chars().take(max_len).collect()
    }
}
