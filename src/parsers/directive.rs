use crate::error::ConfigError;
use crate::readers::read_text_lines;
use regex::Regex;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Find the `LogFormat` directive tagged with `nickname` in an Apache HTTPD
/// configuration file and return its format string.
///
/// The format is the text between the first and the last double quote of the
/// directive line, with the backslash escapes removed.
pub fn find_log_format_directive(path: &Path, nickname: &str) -> Result<String, ConfigError> {
    let unreadable = |reason: String| ConfigError::HttpdConfUnreadable {
        path: path.to_path_buf(),
        reason,
    };

    let file = File::open(path).map_err(|e| unreadable(e.to_string()))?;
    let lines = read_text_lines(BufReader::new(file)).map_err(|e| unreadable(e.to_string()))?;

    let directive = Regex::new(&format!(
        r#"^\s*LogFormat\s+".*"\s+{}\s*$"#,
        regex::escape(nickname)
    ))
    .map_err(|e| unreadable(e.to_string()))?;

    lines
        .iter()
        .find(|line| directive.is_match(line))
        .and_then(|line| extract_quoted(line))
        .ok_or_else(|| ConfigError::DirectiveNotFound {
            path: path.to_path_buf(),
            nickname: nickname.to_string(),
        })
}

fn extract_quoted(line: &str) -> Option<String> {
    let first = line.find('"')?;
    let last = line.rfind('"')?;
    if last <= first {
        return None;
    }
    Some(line[first + 1..last].replace('\\', ""))
}
