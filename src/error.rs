use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Fatal configuration errors.
///
/// All of these are raised before the first log line is read. The run is
/// aborted and nothing but the message is printed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Either single file or regex file selection method is required")]
    NoFileSelection,

    #[error("Single file and regex file selection methods are mutually exclusive")]
    ConflictingFileSelection,

    #[error("No matching files found")]
    NoMatchingFiles,

    #[error("Invalid file regex '{pattern}': {reason}")]
    InvalidFileRegex { pattern: String, reason: String },

    #[error("Head and tail line limits are mutually exclusive")]
    HeadAndTail,

    #[error("Line range limit can't be combined with head or tail")]
    RangeWithHeadOrTail,

    #[error("Invalid line range '{0}': expected MIN-MAX with MIN <= MAX")]
    InvalidLineRange(String),

    #[error("Invalid status code pattern '{pattern}': {reason}")]
    InvalidStatusPattern { pattern: String, reason: String },

    #[error("Invalid day '{0}': expected DD-MM-YYYY")]
    InvalidDay(String),

    #[error("Earlier day can't be later than later day")]
    DayBoundsInverted,

    #[error("Day can't be in the future")]
    DayInFuture,

    #[error("No output fields defined")]
    NoOutputFields,

    #[error("Unknown field value: {field}. Accepted values: {accepted}")]
    UnknownField { field: String, accepted: String },

    #[error("Sort-by field must be included in output fields")]
    SortFieldNotIncluded,

    #[error("Couldn't open Apache HTTPD configuration file {path}: {reason}")]
    HttpdConfUnreadable { path: PathBuf, reason: String },

    #[error("No LogFormat directive with nickname '{nickname}' in {path}")]
    DirectiveNotFound { path: PathBuf, nickname: String },

    #[error("Invalid log format '{format}': {reason}")]
    InvalidLogFormat { format: String, reason: String },

    #[error("Invalid time format '{0}'")]
    InvalidTimeFormat(String),
}

/// A log line that didn't match the configured grammar.
///
/// Line numbers are 1-based and local to the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidLine {
    pub file: String,
    pub line: usize,
}

impl fmt::Display for InvalidLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "File: {}, line: {}", self.file, self.line)
    }
}
