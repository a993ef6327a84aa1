use anyhow::Result;

use super::Formatter;
use crate::fields::FieldKey;
use crate::processor::ResultRow;

/// Tab separated columns, each left-aligned and padded to its field width
pub struct TableFormatter {
    widths: Vec<Option<usize>>,
    time_format: String,
}

impl TableFormatter {
    pub fn new(columns: &[FieldKey], time_format: impl Into<String>) -> Self {
        Self {
            widths: columns.iter().map(|key| key.spec().width).collect(),
            time_format: time_format.into(),
        }
    }

    fn join<I>(&self, cells: I) -> String
    where
        I: IntoIterator<Item = String>,
    {
        cells
            .into_iter()
            .zip(&self.widths)
            .map(|(cell, width)| match width {
                Some(width) => format!("{:<width$}", cell, width = *width),
                None => cell,
            })
            .collect::<Vec<_>>()
            .join("\t")
    }
}

impl Formatter for TableFormatter {
    fn format_header(&self, columns: &[FieldKey]) -> Result<String> {
        Ok(self.join(columns.iter().map(|key| key.spec().human_name.to_string())))
    }

    fn format(&self, row: &ResultRow) -> Result<String> {
        Ok(self.join(
            row.values()
                .iter()
                .map(|value| value.render(&self.time_format)),
        ))
    }
}
