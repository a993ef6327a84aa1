use anyhow::Result;
use std::time::SystemTime;
use tracing::debug;

use crate::error::ConfigError;
use crate::files::InputFile;
use crate::readers::count_lines;

/// Line selection across all input files, treated as one concatenated stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineLimit {
    #[default]
    All,
    /// First N lines
    Head(usize),
    /// Last N lines
    Tail(usize),
    /// Global lines MIN..=MAX
    Range { min: usize, max: usize },
}

impl LineLimit {
    /// Build the limit from raw user input.
    ///
    /// Negative head/tail counts mean "unset". Head, tail and range are
    /// mutually exclusive.
    pub fn from_options(
        head: Option<i64>,
        tail: Option<i64>,
        range: Option<(usize, usize)>,
    ) -> Result<Self, ConfigError> {
        let head = head.filter(|n| *n >= 0);
        let tail = tail.filter(|n| *n >= 0);

        match (head, tail, range) {
            (Some(_), Some(_), _) => Err(ConfigError::HeadAndTail),
            (Some(_), None, Some(_)) | (None, Some(_), Some(_)) => {
                Err(ConfigError::RangeWithHeadOrTail)
            }
            (Some(n), None, None) => Ok(LineLimit::Head(n as usize)),
            (None, Some(n), None) => Ok(LineLimit::Tail(n as usize)),
            (None, None, Some((min, max))) => {
                if min > max {
                    Err(ConfigError::InvalidLineRange(format!("{}-{}", min, max)))
                } else {
                    Ok(LineLimit::Range { min, max })
                }
            }
            (None, None, None) => Ok(LineLimit::All),
        }
    }

    /// Parse a `MIN-MAX` range argument
    pub fn parse_range(value: &str) -> Result<(usize, usize), ConfigError> {
        let invalid = || ConfigError::InvalidLineRange(value.to_string());
        let (min, max) = value.split_once('-').ok_or_else(invalid)?;
        let min = min.trim().parse::<usize>().map_err(|_| invalid())?;
        let max = max.trim().parse::<usize>().map_err(|_| invalid())?;
        if min > max {
            return Err(invalid());
        }
        Ok((min, max))
    }
}

/// A contiguous span of one file's lines, addressed both within the file
/// (local) and across all files (global). All bounds are 1-based and
/// inclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileWindow {
    pub path: String,
    pub global_start: usize,
    pub global_end: usize,
    pub local_start: usize,
    pub local_end: usize,
    pub modified: SystemTime,
    pub size: u64,
}

impl FileWindow {
    pub fn line_count(&self) -> usize {
        self.local_end + 1 - self.local_start
    }
}

/// Virtual global line numbering over an ordered list of files
#[derive(Debug, Clone)]
pub struct LineAddressIndex {
    windows: Vec<FileWindow>,
    total_lines: usize,
}

impl LineAddressIndex {
    /// Count lines of every file (one full scan each) and assign addresses
    /// in the given order.
    pub fn build(files: &[InputFile]) -> Result<Self> {
        if files.is_empty() {
            return Err(ConfigError::NoMatchingFiles.into());
        }
        let mut counted = Vec::with_capacity(files.len());
        for file in files {
            let lines = count_lines(&file.path)?;
            debug!(file = %file.path, lines, "Counted lines");
            counted.push((file.clone(), lines));
        }
        Ok(Self::from_line_counts(counted))
    }

    /// Assign global addresses from already known line counts.
    /// Empty files occupy no addresses and get no window.
    pub fn from_line_counts(files: Vec<(InputFile, usize)>) -> Self {
        let mut windows = Vec::with_capacity(files.len());
        let mut next_global = 1;

        for (file, lines) in files {
            if lines == 0 {
                continue;
            }
            windows.push(FileWindow {
                path: file.path,
                global_start: next_global,
                global_end: next_global + lines - 1,
                local_start: 1,
                local_end: lines,
                modified: file.modified,
                size: file.size,
            });
            next_global += lines;
        }

        Self {
            windows,
            total_lines: next_global - 1,
        }
    }

    pub fn total_lines(&self) -> usize {
        self.total_lines
    }

    /// Narrow the full window list to the requested lines
    pub fn windows(&self, limit: &LineLimit) -> Vec<FileWindow> {
        match *limit {
            LineLimit::All => self.windows.clone(),
            LineLimit::Head(n) => self.head(n),
            LineLimit::Tail(n) => self.tail(n),
            LineLimit::Range { min, max } => self.range(min, max),
        }
    }

    fn head(&self, n: usize) -> Vec<FileWindow> {
        let end = n.min(self.total_lines);
        let mut windows: Vec<FileWindow> = self
            .windows
            .iter()
            .filter(|w| w.global_start <= end)
            .cloned()
            .collect();

        if let Some(last) = windows.last_mut() {
            let cut = last.global_end - end;
            last.local_end -= cut;
            last.global_end = end;
        }
        windows
    }

    fn tail(&self, n: usize) -> Vec<FileWindow> {
        let start = (self.total_lines + 1).saturating_sub(n).max(1);
        let mut windows: Vec<FileWindow> = self
            .windows
            .iter()
            .filter(|w| w.global_end >= start)
            .cloned()
            .collect();

        if let Some(first) = windows.first_mut() {
            if first.global_start < start {
                first.local_start += start - first.global_start;
                first.global_start = start;
            }
        }
        windows
    }

    fn range(&self, min: usize, max: usize) -> Vec<FileWindow> {
        self.windows
            .iter()
            .filter(|w| w.global_start <= max && w.global_end >= min)
            .map(|w| {
                let lo = min.max(w.global_start);
                let hi = max.min(w.global_end);
                FileWindow {
                    local_start: w.local_start + (lo - w.global_start),
                    local_end: w.local_start + (hi - w.global_start),
                    global_start: lo,
                    global_end: hi,
                    ..w.clone()
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn input(path: &str) -> InputFile {
        InputFile {
            path: path.to_string(),
            modified: SystemTime::UNIX_EPOCH,
            size: 0,
        }
    }

    fn index(counts: &[usize]) -> LineAddressIndex {
        LineAddressIndex::from_line_counts(
            counts
                .iter()
                .enumerate()
                .map(|(i, c)| (input(&format!("file{}.log", i)), *c))
                .collect(),
        )
    }

    fn walked(windows: &[FileWindow]) -> usize {
        windows.iter().map(FileWindow::line_count).sum()
    }

    #[test]
    fn test_global_addresses_are_contiguous() {
        let idx = index(&[3, 0, 4]);
        let windows = idx.windows(&LineLimit::All);
        assert_eq!(idx.total_lines(), 7);
        assert_eq!(windows.len(), 2);
        assert_eq!((windows[0].global_start, windows[0].global_end), (1, 3));
        assert_eq!((windows[1].global_start, windows[1].global_end), (4, 7));
        assert_eq!(windows[1].path, "file2.log");
    }

    #[test]
    fn test_head_cuts_last_window() {
        let windows = index(&[3, 4]).windows(&LineLimit::Head(5));
        assert_eq!(windows.len(), 2);
        assert_eq!((windows[1].local_start, windows[1].local_end), (1, 2));
        assert_eq!(windows[1].global_end, 5);
        assert_eq!(walked(&windows), 5);
    }

    #[test]
    fn test_head_larger_than_total() {
        let windows = index(&[3, 4]).windows(&LineLimit::Head(100));
        assert_eq!(walked(&windows), 7);
    }

    #[test]
    fn test_head_zero_walks_nothing() {
        assert!(index(&[3, 4]).windows(&LineLimit::Head(0)).is_empty());
    }

    #[test]
    fn test_tail_trims_leading_files() {
        let windows = index(&[3, 4, 2]).windows(&LineLimit::Tail(3));
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0].path, "file1.log");
        assert_eq!((windows[0].local_start, windows[0].local_end), (4, 4));
        assert_eq!((windows[0].global_start, windows[0].global_end), (7, 7));
        assert_eq!(windows[1].global_end, 9);
        assert_eq!(walked(&windows), 3);
    }

    #[test]
    fn test_tail_larger_than_total_clamps() {
        let windows = index(&[3, 4]).windows(&LineLimit::Tail(50));
        assert_eq!(windows[0].global_start, 1);
        assert_eq!(walked(&windows), 7);
    }

    #[test]
    fn test_range_is_inclusive_and_clipped() {
        let windows = index(&[3, 4, 2]).windows(&LineLimit::Range { min: 3, max: 8 });
        assert_eq!(windows.len(), 3);
        assert_eq!((windows[0].local_start, windows[0].local_end), (3, 3));
        assert_eq!((windows[1].local_start, windows[1].local_end), (1, 4));
        assert_eq!((windows[2].local_start, windows[2].local_end), (1, 1));
        assert_eq!(walked(&windows), 6);
    }

    #[test]
    fn test_range_outside_files() {
        let windows = index(&[3]).windows(&LineLimit::Range { min: 10, max: 20 });
        assert!(windows.is_empty());
    }

    #[test]
    fn test_head_and_tail_rejected() {
        assert_eq!(
            LineLimit::from_options(Some(3), Some(4), None),
            Err(ConfigError::HeadAndTail)
        );
    }

    #[test]
    fn test_negative_counts_are_unset() {
        assert_eq!(
            LineLimit::from_options(Some(-1), Some(4), None),
            Ok(LineLimit::Tail(4))
        );
        assert_eq!(
            LineLimit::from_options(Some(-1), Some(-5), None),
            Ok(LineLimit::All)
        );
    }

    #[test]
    fn test_range_with_head_rejected() {
        assert_eq!(
            LineLimit::from_options(Some(3), None, Some((1, 2))),
            Err(ConfigError::RangeWithHeadOrTail)
        );
    }

    #[test]
    fn test_parse_range() {
        assert_eq!(LineLimit::parse_range("10-20"), Ok((10, 20)));
        assert!(LineLimit::parse_range("20-10").is_err());
        assert!(LineLimit::parse_range("abc").is_err());
    }

    #[test]
    fn test_build_without_files_is_config_error() {
        let err = LineAddressIndex::build(&[]).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ConfigError>(),
            Some(&ConfigError::NoMatchingFiles)
        );
    }

    proptest! {
        #[test]
        fn prop_head_never_exceeds_n_or_total(
            counts in proptest::collection::vec(0usize..50, 1..8),
            n in 0usize..400,
        ) {
            let idx = index(&counts);
            let total: usize = counts.iter().sum();
            let windows = idx.windows(&LineLimit::Head(n));
            let lines = walked(&windows);
            prop_assert!(lines <= n);
            prop_assert!(lines <= total);
            prop_assert_eq!(lines, n.min(total));
        }

        #[test]
        fn prop_tail_ends_at_global_max(
            counts in proptest::collection::vec(0usize..50, 1..8),
            n in 1usize..400,
        ) {
            let idx = index(&counts);
            let total: usize = counts.iter().sum();
            let windows = idx.windows(&LineLimit::Tail(n));
            if total > 0 {
                prop_assert_eq!(windows.last().map(|w| w.global_end), Some(total));
                prop_assert_eq!(walked(&windows), n.min(total));
            } else {
                prop_assert!(windows.is_empty());
            }
        }

        #[test]
        fn prop_windows_are_contiguous(
            counts in proptest::collection::vec(0usize..50, 1..8),
            min in 1usize..200,
            len in 0usize..200,
        ) {
            let windows = index(&counts).windows(&LineLimit::Range { min, max: min + len });
            for pair in windows.windows(2) {
                prop_assert_eq!(pair[0].global_end + 1, pair[1].global_start);
            }
            for w in &windows {
                prop_assert_eq!(w.global_end - w.global_start, w.local_end - w.local_start);
            }
        }
    }
}
