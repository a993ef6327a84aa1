use std::time::{Duration, Instant};

/// Statistics collected during log processing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessingStats {
    /// Lines walked inside the selected windows
    pub lines_read: usize,
    /// Entries that passed every filter
    pub lines_output: usize,
    pub lines_filtered: usize,
    /// Lines the grammar rejected
    pub lines_invalid: usize,
    pub files_processed: usize,
    pub processing_time: Duration,
    pub start_time: Option<Instant>,
}

impl ProcessingStats {
    pub fn new() -> Self {
        Self {
            start_time: Some(Instant::now()),
            ..Default::default()
        }
    }

    pub fn finish(&mut self) {
        if let Some(start) = self.start_time {
            self.processing_time = start.elapsed();
        }
    }

    pub fn format_stats(&self) -> String {
        let mut output = format!(
            "Lines processed: {} total, {} output, {} filtered",
            self.lines_read, self.lines_output, self.lines_filtered
        );

        if self.files_processed > 0 {
            output.push_str(&format!(", {} files", self.files_processed));
        }

        if self.lines_invalid > 0 {
            output.push_str(&format!(", {} invalid", self.lines_invalid));
        }

        let processing_time_ms = self.processing_time.as_millis();
        output.push_str(&format!(" in {}ms", processing_time_ms));

        if processing_time_ms > 0 && self.lines_read > 0 {
            let lines_per_sec = (self.lines_read as f64 * 1000.0) / processing_time_ms as f64;
            output.push_str(&format!(" ({:.0} lines/s)", lines_per_sec));
        }

        output
    }
}
