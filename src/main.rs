use anyhow::Result;
use clap::Parser;
use tracing::info;

use httpd_logparser::config::ParserConfig;
use httpd_logparser::error::ConfigError;
use httpd_logparser::formatters::{create_formatter, format_stats_block, write_rows};
use httpd_logparser::logging::init_logging;
use httpd_logparser::platform::{ExitCode, SafeStdout};
use httpd_logparser::{run, Cli, ProcessingReport};

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match ParserConfig::from_cli(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("httpd-logparser: Error: {}", e);
            ExitCode::InvalidUsage.exit();
        }
    };

    let report = match run(&config) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("httpd-logparser: Error: {:#}", e);
            if e.downcast_ref::<ConfigError>().is_some() {
                ExitCode::InvalidUsage.exit();
            }
            ExitCode::GeneralError.exit();
        }
    };

    if let Err(e) = print_report(&config, &report) {
        eprintln!("httpd-logparser: Error: {:#}", e);
        ExitCode::GeneralError.exit();
    }

    info!("{}", report.stats.format_stats());
    ExitCode::Success.exit();
}

fn print_report(config: &ParserConfig, report: &ProcessingReport) -> Result<()> {
    use std::io::Write;

    let mut stdout = SafeStdout::new();
    let formatter = create_formatter(
        &config.output.format,
        &report.columns,
        &config.output.time_format,
    );
    write_rows(
        &mut stdout,
        formatter.as_ref(),
        report,
        config.output.print_headers,
    )?;

    if config.output.show_stats {
        write!(stdout, "{}", format_stats_block(report))?;
    }
    stdout.finish()
}
