// Core library for httpd-logparser

pub mod cli;
pub mod config;
pub mod decompression;
pub mod entry;
pub mod error;
pub mod fields;
pub mod files;
pub mod filters;
pub mod formatters;
pub mod geo;
pub mod line_index;
pub mod logging;
pub mod parsers;
pub mod platform;
pub mod processor;
pub mod readers;
pub mod stats;

pub use cli::Cli;
pub use config::ParserConfig;
pub use error::ConfigError;
pub use processor::ProcessingReport;

use anyhow::Result;
use tracing::info;

use crate::files::{select_files, sort_files};
use crate::geo::GeoIpLookup;
use crate::line_index::LineAddressIndex;
use crate::parsers::LineGrammar;
use crate::processor::StreamProcessor;

/// Run one parse over the configured files.
///
/// Configuration problems surface as [`ConfigError`] inside the returned
/// error, before any log line is read.
pub fn run(config: &ParserConfig) -> Result<ProcessingReport> {
    let grammar = LineGrammar::from_source(&config.input.grammar)?;

    let files = select_files(&config.input.selection)?;
    let files = sort_files(&files, &config.input.file_sort)?;

    let index = LineAddressIndex::build(&files)?;
    let windows = index.windows(&config.input.line_limit);
    info!(
        files = files.len(),
        total_lines = index.total_lines(),
        windows = windows.len(),
        "Indexed input files"
    );

    let mut resolver = GeoIpLookup::new(&config.geo.executable, &config.geo.database);
    StreamProcessor::new(
        &grammar,
        &config.processing.filters,
        &config.processing.projection,
    )
    .with_sort(config.processing.sort)
    .run(&windows, &mut resolver)
}
