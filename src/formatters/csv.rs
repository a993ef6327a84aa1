use anyhow::{Context, Result};

use super::Formatter;
use crate::fields::FieldKey;
use crate::processor::ResultRow;

/// CSV formatter, quoting handled by the `csv` writer
pub struct CsvFormatter {
    time_format: String,
}

impl CsvFormatter {
    pub fn new(time_format: impl Into<String>) -> Self {
        Self {
            time_format: time_format.into(),
        }
    }

    fn format_record<I, T>(&self, record: I) -> Result<String>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(Vec::new());
        writer
            .write_record(record)
            .context("Failed to write CSV record")?;
        let bytes = writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("Failed to flush CSV record: {}", e))?;

        let mut line = String::from_utf8(bytes).context("CSV record is not valid UTF-8")?;
        if line.ends_with('\n') {
            line.pop();
        }
        Ok(line)
    }
}

impl Formatter for CsvFormatter {
    fn format_header(&self, columns: &[FieldKey]) -> Result<String> {
        self.format_record(columns.iter().map(|key| key.spec().human_name))
    }

    fn format(&self, row: &ResultRow) -> Result<String> {
        self.format_record(row.values().iter().map(|value| value.render(&self.time_format)))
    }
}
