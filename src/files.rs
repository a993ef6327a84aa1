use crate::config::FileSort;
use crate::error::ConfigError;
use anyhow::{Context, Result};
use regex::Regex;
use std::fs;
use std::path::Path;
use std::time::SystemTime;

/// How input files are chosen on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSelection {
    /// Explicit list of paths; entries that are not regular files are ignored
    List(Vec<String>),
    /// `DIR/REGEX` where REGEX is matched against the start of each file name in DIR
    Regex(String),
}

/// An input file with the metadata used for ordering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    pub path: String,
    pub modified: SystemTime,
    pub size: u64,
}

impl InputFile {
    pub fn from_path(path: &str) -> Result<Self> {
        let metadata =
            fs::metadata(path).with_context(|| format!("Couldn't read input file {}", path))?;
        Ok(Self {
            path: path.to_string(),
            modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            size: metadata.len(),
        })
    }
}

/// Resolve the selection into existing regular files.
///
/// An empty result is a configuration error.
pub fn select_files(selection: &FileSelection) -> Result<Vec<String>, ConfigError> {
    let files = match selection {
        FileSelection::List(list) => list
            .iter()
            .filter(|f| !f.is_empty() && Path::new(f).is_file())
            .cloned()
            .collect::<Vec<_>>(),
        FileSelection::Regex(files_regex) => match_directory(files_regex)?,
    };

    if files.is_empty() {
        return Err(ConfigError::NoMatchingFiles);
    }
    Ok(files)
}

fn match_directory(files_regex: &str) -> Result<Vec<String>, ConfigError> {
    let (dir, file_part) = match files_regex.rsplit_once('/') {
        Some(("", file_part)) => ("/", file_part),
        Some((dir, file_part)) => (dir, file_part),
        None => (".", files_regex),
    };

    let pattern = Regex::new(&format!("^(?:{})", file_part)).map_err(|e| {
        ConfigError::InvalidFileRegex {
            pattern: files_regex.to_string(),
            reason: e.to_string(),
        }
    })?;

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return Err(ConfigError::NoMatchingFiles),
    };

    let mut files = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let name = entry.file_name();
        if pattern.is_match(&name.to_string_lossy()) {
            files.push(Path::new(dir).join(name).to_string_lossy().to_string());
        }
    }
    // read_dir order is platform dependent
    files.sort();
    Ok(files)
}

/// Collect metadata and order files by the configured key.
/// Ties keep name order so the result is deterministic.
pub fn sort_files(files: &[String], order: &FileSort) -> Result<Vec<InputFile>> {
    let mut input_files = files
        .iter()
        .map(|f| InputFile::from_path(f))
        .collect::<Result<Vec<_>>>()?;

    input_files.sort_by(|a, b| a.path.cmp(&b.path));

    match order {
        FileSort::Name => {}
        FileSort::Mtime => {
            // Oldest first
            input_files.sort_by(|a, b| a.modified.cmp(&b.modified));
        }
        FileSort::Size => {
            input_files.sort_by(|a, b| a.size.cmp(&b.size));
        }
    }

    Ok(input_files)
}
