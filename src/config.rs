use clap::ValueEnum;
use std::path::PathBuf;

use crate::cli::Cli;
use crate::error::ConfigError;
use crate::fields::{validate_sort_by, validate_time_format, Projection};
use crate::files::FileSelection;
use crate::filters::{CountryFilter, DateFilter, FilterChain, StatusFilter};
use crate::line_index::LineLimit;
use crate::parsers::GrammarSource;
use crate::processor::SortOrder;

/// Main configuration, validated once before any log line is read
#[derive(Debug, Clone)]
pub struct ParserConfig {
    pub input: InputConfig,
    pub processing: ProcessingConfig,
    pub geo: GeoConfig,
    pub output: OutputConfig,
}

/// Input configuration
#[derive(Debug, Clone)]
pub struct InputConfig {
    pub selection: FileSelection,
    pub file_sort: FileSort,
    pub line_limit: LineLimit,
    pub grammar: GrammarSource,
}

/// Processing configuration
#[derive(Debug, Clone)]
pub struct ProcessingConfig {
    pub filters: FilterChain,
    pub projection: Projection,
    pub sort: Option<SortOrder>,
}

/// External geolocation tool
#[derive(Debug, Clone)]
pub struct GeoConfig {
    pub executable: String,
    pub database: PathBuf,
}

/// Output configuration
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub time_format: String,
    pub print_headers: bool,
    pub show_stats: bool,
}

/// Input file ordering
#[derive(ValueEnum, Clone, Debug, Default, PartialEq, Eq)]
pub enum FileSort {
    #[default]
    Name,
    /// Oldest first
    Mtime,
    /// Smallest first
    Size,
}

/// Output format enumeration
#[derive(ValueEnum, Clone, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Table,
    Csv,
}

impl ParserConfig {
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let selection = match (cli.files_list.is_empty(), &cli.files_regex) {
            (false, Some(_)) => return Err(ConfigError::ConflictingFileSelection),
            (false, None) => FileSelection::List(cli.files_list.clone()),
            (true, Some(regex)) => FileSelection::Regex(regex.clone()),
            (true, None) => return Err(ConfigError::NoFileSelection),
        };

        let range = cli
            .lines_range
            .as_deref()
            .map(LineLimit::parse_range)
            .transpose()?;
        let line_limit = LineLimit::from_options(cli.head, cli.tail, range)?;

        let grammar = match (&cli.log_format, &cli.httpd_conf_file) {
            (Some(format), _) => GrammarSource::Explicit(format.clone()),
            (None, Some(conf_file)) => GrammarSource::Directive {
                conf_file: conf_file.clone(),
                nickname: cli.httpd_log_nickname.clone(),
            },
            (None, None) => GrammarSource::Default,
        };

        let filters = FilterChain {
            status: StatusFilter::new(&cli.status_codes)?,
            country: CountryFilter::new(&cli.countries),
            date: DateFilter::from_days(cli.day_lower.as_deref(), cli.day_upper.as_deref())?,
        };

        let projection =
            Projection::resolve(&cli.included_fields, &cli.excluded_fields, cli.geo_location)?;
        let sort = cli
            .sort_by
            .as_deref()
            .map(|field| validate_sort_by(field, &cli.included_fields, &projection))
            .transpose()?
            .map(|key| SortOrder {
                key,
                reverse: cli.reverse_order,
            });

        validate_time_format(&cli.time_format)?;

        Ok(Self {
            input: InputConfig {
                selection,
                file_sort: cli.file_sort.clone(),
                line_limit,
                grammar,
            },
            processing: ProcessingConfig {
                filters,
                projection,
                sort,
            },
            geo: GeoConfig {
                executable: cli.geotool_exec.clone(),
                database: cli.geo_database.clone(),
            },
            output: OutputConfig {
                format: cli.output_format.clone(),
                time_format: cli.time_format.clone(),
                print_headers: cli.print_headers,
                show_stats: cli.show_stats,
            },
        })
    }
}
