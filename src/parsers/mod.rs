use anyhow::Result;
use std::path::PathBuf;
use tracing::debug;

use crate::entry::LogEntry;
use crate::error::ConfigError;
use crate::geo::is_private_host;

pub mod apache;
pub mod directive;

pub use apache::ApacheLogFormat;
pub use directive::find_log_format_directive;

/// Combined log format with a trailing cache status token
pub const DEFAULT_LOG_FORMAT: &str =
    r#"%h %l %u %t "%r" %>s %b "%{Referer}i" "%{User-Agent}i" %{cache-status}e"#;

/// Parse raw text lines into log entries
pub trait EntryParser {
    fn parse(&self, line: &str) -> Result<LogEntry>;
}

/// Where the log line grammar comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrammarSource {
    /// Format string given on the command line
    Explicit(String),
    /// `LogFormat` directive looked up by nickname in an httpd configuration file
    Directive { conf_file: PathBuf, nickname: String },
    Default,
}

impl GrammarSource {
    pub fn resolve(&self) -> Result<String, ConfigError> {
        match self {
            GrammarSource::Explicit(format) => Ok(format.clone()),
            GrammarSource::Directive {
                conf_file,
                nickname,
            } => find_log_format_directive(conf_file, nickname),
            GrammarSource::Default => Ok(DEFAULT_LOG_FORMAT.to_string()),
        }
    }
}

/// The configured grammar plus its variant for local clients.
///
/// Lines that fail the full grammar are retried without byte-count fields;
/// that result only counts when the remote host is in a private range.
#[derive(Debug, Clone)]
pub struct LineGrammar {
    primary: ApacheLogFormat,
    local: Option<ApacheLogFormat>,
}

impl LineGrammar {
    pub fn new(template: &str) -> Result<Self, ConfigError> {
        let primary = ApacheLogFormat::new(template)?;
        let local = if primary.has_byte_counts() {
            Some(primary.without_byte_counts()?)
        } else {
            None
        };
        debug!(format = %primary.template(), "Compiled log format");
        Ok(Self { primary, local })
    }

    pub fn from_source(source: &GrammarSource) -> Result<Self, ConfigError> {
        Self::new(&source.resolve()?)
    }

    pub fn template(&self) -> &str {
        self.primary.template()
    }
}

impl EntryParser for LineGrammar {
    fn parse(&self, line: &str) -> Result<LogEntry> {
        let err = match self.primary.parse(line) {
            Ok(entry) => return Ok(entry),
            Err(e) => e,
        };

        if let Some(local) = &self.local {
            if let Ok(entry) = local.parse(line) {
                if is_private_host(&entry.remote_host) {
                    return Ok(entry);
                }
            }
        }
        Err(err)
    }
}
