use anyhow::Result;
use chrono::NaiveDateTime;
use tracing::{debug, info};

use crate::entry::LogEntry;
use crate::error::InvalidLine;
use crate::fields::{FieldKey, FieldValue, Projection, TimeDiff};
use crate::filters::FilterChain;
use crate::geo::{CachedResolver, GeoResolver, GeoResult};
use crate::line_index::FileWindow;
use crate::parsers::EntryParser;
use crate::readers::WindowReader;
use crate::stats::ProcessingStats;

/// The previously accepted entry, carried across lines and files.
/// Filtered or invalid lines never touch it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeltaState {
    previous: Option<(String, NaiveDateTime)>,
}

impl DeltaState {
    pub fn time_diff(&self, entry: &LogEntry) -> TimeDiff {
        match &self.previous {
            None => TimeDiff::First,
            Some((host, _)) if *host != entry.remote_host => TimeDiff::NewConnection,
            Some((_, time)) => TimeDiff::Seconds((entry.time - *time).num_seconds()),
        }
    }

    pub fn accept(self, entry: &LogEntry) -> Self {
        Self {
            previous: Some((entry.remote_host.clone(), entry.time)),
        }
    }
}

/// Output values of one accepted entry, one per projected column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRow {
    values: Vec<FieldValue>,
}

impl ResultRow {
    pub fn new(values: Vec<FieldValue>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[FieldValue] {
        &self.values
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortOrder {
    pub key: FieldKey,
    pub reverse: bool,
}

#[derive(Debug, Clone)]
pub struct ProcessingReport {
    pub columns: Vec<FieldKey>,
    pub rows: Vec<ResultRow>,
    /// Files that had at least one line in the selected windows
    pub files: Vec<String>,
    pub stats: ProcessingStats,
    pub invalid_lines: Vec<InvalidLine>,
}

/// Walks the selected windows line by line and turns accepted entries into
/// result rows.
pub struct StreamProcessor<'a> {
    parser: &'a dyn EntryParser,
    filters: &'a FilterChain,
    projection: &'a Projection,
    sort: Option<SortOrder>,
}

impl<'a> StreamProcessor<'a> {
    pub fn new(
        parser: &'a dyn EntryParser,
        filters: &'a FilterChain,
        projection: &'a Projection,
    ) -> Self {
        Self {
            parser,
            filters,
            projection,
            sort: None,
        }
    }

    pub fn with_sort(mut self, sort: Option<SortOrder>) -> Self {
        self.sort = sort;
        self
    }

    pub fn run(
        &self,
        windows: &[FileWindow],
        resolver: &mut dyn GeoResolver,
    ) -> Result<ProcessingReport> {
        let mut geo = CachedResolver::new(resolver);
        let mut stats = ProcessingStats::new();
        let mut rows = Vec::new();
        let mut invalid_lines = Vec::new();
        let mut delta = DeltaState::default();

        let total: usize = windows.iter().map(FileWindow::line_count).sum();
        info!(files = windows.len(), lines = total, "Processing log files");

        for window in windows {
            info!(
                file = %window.path,
                lines = window.line_count(),
                "Processing file"
            );
            stats.files_processed += 1;

            for line in WindowReader::open(window)? {
                let (line_number, line) = line?;
                stats.lines_read += 1;

                let entry = match self.parser.parse(&line) {
                    Ok(entry) => entry,
                    Err(e) => {
                        debug!(file = %window.path, line = line_number, error = %e, "Invalid line");
                        stats.lines_invalid += 1;
                        invalid_lines.push(InvalidLine {
                            file: window.path.clone(),
                            line: line_number,
                        });
                        continue;
                    }
                };

                let Some(location) = self.admit(&entry, &mut geo) else {
                    stats.lines_filtered += 1;
                    continue;
                };

                let time_diff = delta.time_diff(&entry);
                rows.push(self.build_row(&window.path, &entry, location.as_ref(), time_diff));
                delta = delta.accept(&entry);
                stats.lines_output += 1;
            }
        }

        if let Some(sort) = self.sort {
            sort_rows(&mut rows, self.projection, sort);
        }
        stats.finish();

        Ok(ProcessingReport {
            columns: self.projection.columns().to_vec(),
            rows,
            files: windows.iter().map(|w| w.path.clone()).collect(),
            stats,
            invalid_lines,
        })
    }

    /// Run the filter chain. `None` rejects the entry, otherwise carries the
    /// geolocation result when geolocation is active.
    fn admit(
        &self,
        entry: &LogEntry,
        geo: &mut CachedResolver<&mut dyn GeoResolver>,
    ) -> Option<Option<GeoResult>> {
        if !self.filters.date.accepts(entry.time) {
            return None;
        }
        if !self.filters.status.accepts(entry.status) {
            return None;
        }
        if !self.projection.geolocation() {
            return Some(None);
        }

        let location = geo.resolve(&entry.remote_host);
        if let Some(location) = &location {
            if !self.filters.country.accepts(location.country.as_deref()) {
                return None;
            }
        }
        Some(location)
    }

    fn build_row(
        &self,
        path: &str,
        entry: &LogEntry,
        location: Option<&GeoResult>,
        time_diff: TimeDiff,
    ) -> ResultRow {
        let values = self
            .projection
            .columns()
            .iter()
            .map(|key| match key {
                FieldKey::LogFileName => FieldValue::Text(path.to_string()),
                FieldKey::HttpStatus => FieldValue::Status(entry.status),
                FieldKey::RemoteHost => FieldValue::Text(entry.remote_host.clone()),
                FieldKey::Country => location.and_then(|l| l.country.clone()).into(),
                FieldKey::City => location.and_then(|l| l.city.clone()).into(),
                FieldKey::Time => FieldValue::Time(entry.time),
                FieldKey::TimeDiff => FieldValue::Diff(time_diff),
                FieldKey::UserAgent => FieldValue::Text(entry.user_agent.clone()),
                FieldKey::HttpRequest => FieldValue::Text(entry.request.clone()),
            })
            .collect();
        ResultRow::new(values)
    }
}

/// Stable sort by one column
pub fn sort_rows(rows: &mut [ResultRow], projection: &Projection, sort: SortOrder) {
    let Some(column) = projection.position(sort.key) else {
        return;
    };
    if sort.reverse {
        rows.sort_by(|a, b| b.values[column].cmp(&a.values[column]));
    } else {
        rows.sort_by(|a, b| a.values[column].cmp(&b.values[column]));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::InputFile;
    use crate::filters::{CountryFilter, StatusFilter};
    use crate::line_index::{LineAddressIndex, LineLimit};
    use crate::parsers::LineGrammar;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const FORMAT: &str = r#"%h %t "%r" %>s "%{User-Agent}i""#;

    struct FixedResolver {
        calls: usize,
    }

    impl GeoResolver for FixedResolver {
        fn resolve(&mut self, host: &str) -> Option<GeoResult> {
            self.calls += 1;
            let country = if host.starts_with("1.") { "France" } else { "Germany" };
            Some(GeoResult {
                country: Some(country.to_string()),
                city: None,
            })
        }
    }

    fn line(host: &str, secs: u32, status: u16) -> String {
        format!(
            r#"{} [01/Feb/2022:10:00:{:02} +0000] "GET / HTTP/1.1" {} "curl""#,
            host, secs, status
        )
    }

    fn write_log(lines: &[String]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        file.flush().unwrap();
        file
    }

    fn windows(files: &[&NamedTempFile]) -> Vec<FileWindow> {
        let inputs: Vec<InputFile> = files
            .iter()
            .map(|f| InputFile::from_path(&f.path().to_string_lossy()).unwrap())
            .collect();
        LineAddressIndex::build(&inputs)
            .unwrap()
            .windows(&LineLimit::All)
    }

    fn fields(names: &[&str]) -> Projection {
        let names: Vec<String> = names.iter().map(|n| n.to_string()).collect();
        Projection::resolve(&names, &[], false).unwrap()
    }

    fn rendered(report: &ProcessingReport) -> Vec<Vec<String>> {
        report
            .rows
            .iter()
            .map(|row| row.values().iter().map(|v| v.render("%H:%M:%S")).collect())
            .collect()
    }

    #[test]
    fn test_time_diff_sequence() {
        let log = write_log(&[
            line("1.1.1.1", 0, 200),
            line("1.1.1.1", 5, 200),
            line("2.2.2.2", 6, 200),
            line("2.2.2.2", 6, 200),
        ]);
        let grammar = LineGrammar::new(FORMAT).unwrap();
        let filters = FilterChain::default();
        let projection = fields(&["remote_host", "time_diff"]);
        let mut resolver = FixedResolver { calls: 0 };

        let report = StreamProcessor::new(&grammar, &filters, &projection)
            .run(&windows(&[&log]), &mut resolver)
            .unwrap();

        assert_eq!(
            rendered(&report),
            vec![
                vec!["1.1.1.1", "0"],
                vec!["1.1.1.1", "+5"],
                vec!["2.2.2.2", "NEW_CONN"],
                vec!["2.2.2.2", "0"],
            ]
        );
        assert_eq!(resolver.calls, 0);
    }

    #[test]
    fn test_filtered_lines_do_not_move_previous_entry() {
        let log = write_log(&[
            line("1.1.1.1", 0, 200),
            line("2.2.2.2", 3, 404),
            line("1.1.1.1", 9, 200),
        ]);
        let grammar = LineGrammar::new(FORMAT).unwrap();
        let filters = FilterChain {
            status: StatusFilter::new(&["20".to_string()]).unwrap(),
            ..Default::default()
        };
        let projection = fields(&["http_status", "time_diff"]);
        let mut resolver = FixedResolver { calls: 0 };

        let report = StreamProcessor::new(&grammar, &filters, &projection)
            .run(&windows(&[&log]), &mut resolver)
            .unwrap();

        assert_eq!(
            rendered(&report),
            vec![vec!["200", "0"], vec!["200", "+9"]]
        );
        assert_eq!(report.stats.lines_read, 3);
        assert_eq!(report.stats.lines_filtered, 1);
        assert_eq!(report.stats.lines_output, 2);
    }

    #[test]
    fn test_invalid_lines_recorded_with_local_numbers() {
        let first = write_log(&[line("1.1.1.1", 0, 200)]);
        let second = write_log(&[
            line("1.1.1.1", 1, 200),
            "garbage".to_string(),
            line("1.1.1.1", 2, 200),
        ]);
        let grammar = LineGrammar::new(FORMAT).unwrap();
        let filters = FilterChain::default();
        let projection = fields(&["time_diff"]);
        let mut resolver = FixedResolver { calls: 0 };

        let report = StreamProcessor::new(&grammar, &filters, &projection)
            .run(&windows(&[&first, &second]), &mut resolver)
            .unwrap();

        assert_eq!(report.invalid_lines.len(), 1);
        assert_eq!(report.invalid_lines[0].line, 2);
        assert_eq!(
            report.invalid_lines[0].file,
            second.path().to_string_lossy()
        );
        assert_eq!(report.stats.files_processed, 2);
        // Delta carries across the file boundary
        assert_eq!(
            rendered(&report),
            vec![vec!["0"], vec!["+1"], vec!["+1"]]
        );
    }

    #[test]
    fn test_country_filter_with_geolocation() {
        let log = write_log(&[
            line("1.1.1.1", 0, 200),
            line("1.1.1.1", 1, 200),
            line("2.2.2.2", 2, 200),
            line("1.1.1.1", 3, 200),
        ]);
        let grammar = LineGrammar::new(FORMAT).unwrap();
        let filters = FilterChain {
            country: CountryFilter::new(&["!France".to_string()]),
            ..Default::default()
        };
        let projection = fields(&["remote_host", "country"]);
        let mut resolver = FixedResolver { calls: 0 };

        let report = StreamProcessor::new(&grammar, &filters, &projection)
            .run(&windows(&[&log]), &mut resolver)
            .unwrap();

        assert_eq!(rendered(&report), vec![vec!["2.2.2.2", "Germany"]]);
        assert_eq!(resolver.calls, 3);
    }

    #[test]
    fn test_sort_by_status_reversed() {
        let log = write_log(&[
            line("1.1.1.1", 0, 404),
            line("1.1.1.1", 1, 200),
            line("1.1.1.1", 2, 500),
        ]);
        let grammar = LineGrammar::new(FORMAT).unwrap();
        let filters = FilterChain::default();
        let projection = fields(&["http_status"]);
        let mut resolver = FixedResolver { calls: 0 };

        let report = StreamProcessor::new(&grammar, &filters, &projection)
            .with_sort(Some(SortOrder {
                key: FieldKey::HttpStatus,
                reverse: true,
            }))
            .run(&windows(&[&log]), &mut resolver)
            .unwrap();

        assert_eq!(
            rendered(&report),
            vec![vec!["500"], vec!["404"], vec!["200"]]
        );
    }

    #[test]
    fn test_delta_state_fold() {
        let entry = |host: &str, secs: u32| LogEntry {
            time: chrono::NaiveDate::from_ymd_opt(2022, 2, 1)
                .unwrap()
                .and_hms_opt(10, 0, secs)
                .unwrap(),
            remote_host: host.to_string(),
            status: 200,
            user_agent: "-".to_string(),
            request: String::new(),
            referrer: None,
            bytes: None,
        };

        let state = DeltaState::default();
        assert_eq!(state.time_diff(&entry("a", 0)), TimeDiff::First);
        let state = state.accept(&entry("a", 0));
        assert_eq!(state.time_diff(&entry("a", 5)), TimeDiff::Seconds(5));
        assert_eq!(state.time_diff(&entry("b", 5)), TimeDiff::NewConnection);
    }
}
