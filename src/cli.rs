// Command-line interface definitions

use clap::{ArgAction, Parser};
use std::path::PathBuf;

use crate::config::{FileSort, OutputFormat};
use crate::fields::DEFAULT_TIME_FORMAT;
use crate::geo::{DEFAULT_GEOTOOL, DEFAULT_GEO_DATABASE};

#[derive(Parser, Debug, Clone)]
#[command(name = "httpd-logparser")]
#[command(about = "Parse, filter and tabulate Apache HTTPD access logs")]
#[command(
    long_about = "Parse, filter and tabulate Apache HTTPD access logs\n\nThe log line grammar is an Apache LogFormat string, given directly with --log-format or\nlooked up by nickname in an httpd configuration file.\n\nCOMMON EXAMPLES:\n  httpd-logparser -f access.log --status-codes 4 --print-headers\n  httpd-logparser --files-regex '/var/log/httpd/access_log.*' --tail 1000 --geo-location\n  httpd-logparser -f access.log --included-fields all --excluded-fields user_agent --output-format csv"
)]
#[command(version)]
pub struct Cli {
    /// Comma separated list of log files
    #[arg(
        short = 'f',
        long = "files-list",
        value_delimiter = ',',
        help_heading = "Input Options"
    )]
    pub files_list: Vec<String>,

    /// Select files with DIR/REGEX, REGEX matched against file names in DIR
    #[arg(long = "files-regex", help_heading = "Input Options")]
    pub files_regex: Option<String>,

    /// Order of processed files
    #[arg(
        long = "file-sort",
        value_enum,
        default_value = "name",
        help_heading = "Input Options"
    )]
    pub file_sort: FileSort,

    /// Process only the first N lines across all files
    #[arg(long = "head", allow_negative_numbers = true, help_heading = "Input Options")]
    pub head: Option<i64>,

    /// Process only the last N lines across all files
    #[arg(long = "tail", allow_negative_numbers = true, help_heading = "Input Options")]
    pub tail: Option<i64>,

    /// Process only global lines MIN-MAX (inclusive)
    #[arg(long = "lines-range", help_heading = "Input Options")]
    pub lines_range: Option<String>,

    /// Apache LogFormat string, e.g. '%h %l %u %t "%r" %>s %b'
    #[arg(long = "log-format", help_heading = "Format Options")]
    pub log_format: Option<String>,

    /// Apache HTTPD configuration file containing LogFormat directives
    #[arg(long = "httpd-conf-file", help_heading = "Format Options")]
    pub httpd_conf_file: Option<PathBuf>,

    /// Nickname of the LogFormat directive to use
    #[arg(
        long = "httpd-log-nickname",
        default_value = "combinedio",
        help_heading = "Format Options"
    )]
    pub httpd_log_nickname: String,

    /// Status codes to include; partial codes and regular expressions match several codes
    #[arg(
        short = 'c',
        long = "status-codes",
        num_args = 1..,
        value_delimiter = ',',
        help_heading = "Filtering Options"
    )]
    pub status_codes: Vec<String>,

    /// Countries to include, or exclude with a leading '!'
    #[arg(long = "countries", value_delimiter = ',', help_heading = "Filtering Options")]
    pub countries: Vec<String>,

    /// Include entries after this day (DD-MM-YYYY)
    #[arg(long = "day-lower", help_heading = "Filtering Options")]
    pub day_lower: Option<String>,

    /// Include entries before this day (DD-MM-YYYY)
    #[arg(long = "day-upper", help_heading = "Filtering Options")]
    pub day_upper: Option<String>,

    /// Look up origin country and city with the external geoiplookup tool
    #[arg(long = "geo-location", help_heading = "Geolocation Options")]
    pub geo_location: bool,

    /// geoiplookup executable, searched in PATH
    #[arg(
        long = "geotool-exec",
        default_value = DEFAULT_GEOTOOL,
        help_heading = "Geolocation Options"
    )]
    pub geotool_exec: String,

    /// Database location passed to geoiplookup
    #[arg(
        long = "geo-database",
        default_value = DEFAULT_GEO_DATABASE,
        help_heading = "Geolocation Options"
    )]
    pub geo_database: PathBuf,

    /// Output fields, or 'all'
    #[arg(long = "included-fields", value_delimiter = ',', help_heading = "Output Options")]
    pub included_fields: Vec<String>,

    /// Fields removed from the output
    #[arg(long = "excluded-fields", value_delimiter = ',', help_heading = "Output Options")]
    pub excluded_fields: Vec<String>,

    /// Output format
    #[arg(
        long = "output-format",
        value_enum,
        default_value = "table",
        help_heading = "Output Options"
    )]
    pub output_format: OutputFormat,

    /// strftime format of the time field
    #[arg(
        long = "time-format",
        default_value = DEFAULT_TIME_FORMAT,
        help_heading = "Output Options"
    )]
    pub time_format: String,

    /// Sort output rows by this field
    #[arg(long = "sort-by", help_heading = "Output Options")]
    pub sort_by: Option<String>,

    /// Sort in reverse order
    #[arg(long = "reverse-order", help_heading = "Output Options")]
    pub reverse_order: bool,

    /// Print column headers
    #[arg(long = "print-headers", help_heading = "Output Options")]
    pub print_headers: bool,

    /// Print processing statistics after the rows
    #[arg(long = "show-stats", help_heading = "Output Options")]
    pub show_stats: bool,

    /// Show progress on stderr (-v info, -vv debug)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,
}
