use chrono::NaiveDateTime;
use std::fmt::Write;

/// One parsed access log line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Request time with the UTC offset dropped (wall clock of the server)
    pub time: NaiveDateTime,
    pub remote_host: String,
    /// Final status (`%>s`); 0 when the line carries none
    pub status: u16,
    /// `-` when the line carries none
    pub user_agent: String,
    /// Request line with control characters escaped
    pub request: String,
    pub referrer: Option<String>,
    pub bytes: Option<u64>,
}

/// Escape backslashes and control characters so a request line always
/// prints on a single terminal line.
pub fn escape_control(value: &str) -> String {
    if !value.chars().any(|c| c == '\\' || c.is_control()) {
        return value.to_string();
    }

    let mut escaped = String::with_capacity(value.len() + 8);
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            c if c.is_control() => {
                let code = c as u32;
                if code <= 0xff {
                    let _ = write!(escaped, "\\x{:02x}", code);
                } else {
                    let _ = write!(escaped, "\\u{:04x}", code);
                }
            }
            c => escaped.push(c),
        }
    }
    escaped
}
