//! Convert command implementation

use super::{load_config, require_dir};
use crate::cli::error::CliError;
use crate::cli::output::format_report;
use crate::cli::progress::Spinner;
use crate::config::ConverterConfig;
use crate::convert::{ConversionRequest, Converter};
use crate::export::SqlLayout;
use std::path::PathBuf;

/// Arguments for the `convert` command
#[derive(Debug, Default)]
pub struct ConvertArgs {
    /// Project directory with AL sources and packages
    pub project: PathBuf,
    /// Script destination
    pub output: PathBuf,
    /// TOML configuration file
    pub config_file: Option<PathBuf>,
    pub no_source_tables: bool,
    pub no_aggressive: bool,
    /// Explicit archive tool executable
    pub archive_tool: Option<PathBuf>,
    pub no_archive_tool: bool,
    /// Timeout in seconds for each archive tool call
    pub tool_timeout: Option<u64>,
    pub pretty: bool,
    /// Print the report as JSON instead of text
    pub json: bool,
    /// Suppress the spinner
    pub quiet: bool,
}

/// Apply command-line flags over the loaded configuration.
pub fn apply_flags(mut config: ConverterConfig, args: &ConvertArgs) -> ConverterConfig {
    if args.no_source_tables {
        config.emit_source_tables = false;
    }
    if args.no_aggressive {
        config.aggressive_symbol_matching = false;
    }
    if let Some(path) = &args.archive_tool {
        config.archive_tool.path = Some(path.clone());
    }
    if args.no_archive_tool {
        config.archive_tool.enabled = false;
    }
    if let Some(secs) = args.tool_timeout {
        config.archive_tool.timeout_secs = secs;
    }
    if args.pretty {
        config.layout = SqlLayout::Pretty;
    }
    config
}

/// Handle the `convert` command
pub fn handle_convert(args: &ConvertArgs) -> Result<(), CliError> {
    require_dir(&args.project)?;
    let config = apply_flags(load_config(args.config_file.as_ref())?, args);
    config.validate()?;

    let spinner = if args.quiet || args.json {
        Spinner::hidden()
    } else {
        Spinner::new("Starting conversion")
    };

    let converter = Converter::new(config);
    let request = ConversionRequest::new(&args.project);
    let conversion = match converter.convert(&request, &spinner) {
        Ok(conversion) => conversion,
        Err(e) => {
            spinner.finish_error("Conversion failed");
            return Err(e.into());
        }
    };

    if let Err(e) = conversion.write_to(&args.output) {
        spinner.finish_error("Cannot write output");
        return Err(e.into());
    }
    spinner.finish_success(&format!("Wrote {}", args.output.display()));

    if args.json {
        println!("{}", serde_json::to_string_pretty(&conversion.report)?);
    } else {
        print!("{}", format_report(&conversion.report, &args.output));
    }
    Ok(())
}
