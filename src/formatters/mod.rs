use anyhow::Result;
use std::io::Write;

use crate::config::OutputFormat;
use crate::fields::FieldKey;
use crate::processor::{ProcessingReport, ResultRow};

mod csv;
mod table;

pub use self::csv::CsvFormatter;
pub use table::TableFormatter;

/// Render result rows as text lines
pub trait Formatter {
    fn format_header(&self, columns: &[FieldKey]) -> Result<String>;
    fn format(&self, row: &ResultRow) -> Result<String>;
}

pub fn create_formatter(
    format: &OutputFormat,
    columns: &[FieldKey],
    time_format: &str,
) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Table => Box::new(TableFormatter::new(columns, time_format)),
        OutputFormat::Csv => Box::new(CsvFormatter::new(time_format)),
    }
}

/// Write the optional header and every row
pub fn write_rows<W: Write>(
    out: &mut W,
    formatter: &dyn Formatter,
    report: &ProcessingReport,
    print_headers: bool,
) -> Result<()> {
    if print_headers {
        writeln!(out, "{}", formatter.format_header(&report.columns)?)?;
    }
    for row in &report.rows {
        writeln!(out, "{}", formatter.format(row)?)?;
    }
    Ok(())
}

/// The end-of-run summary: processed files, line counts and invalid lines
pub fn format_stats_block(report: &ProcessingReport) -> String {
    let mut output = format!(
        "\nProcessed files:       {}\nProcessed log entries: {}\nMatched log entries:   {}\n",
        report.files.join(", "),
        report
            .stats
            .lines_read
            .saturating_sub(report.stats.lines_invalid),
        report.rows.len()
    );

    if !report.invalid_lines.is_empty() {
        output.push_str("Invalid lines:\n");
        for invalid in &report.invalid_lines {
            output.push_str(&format!("\t{}\n", invalid));
        }
    }
    output
}
