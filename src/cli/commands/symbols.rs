//! Symbols command implementation

use super::{load_config, require_dir};
use crate::cli::error::CliError;
use crate::cli::output::format_symbols;
use crate::cli::progress::Spinner;
use crate::convert::Converter;
use serde_json::json;
use std::path::PathBuf;

/// Arguments for the `symbols` command
#[derive(Debug)]
pub struct SymbolsArgs {
    pub project: PathBuf,
    pub config_file: Option<PathBuf>,
    pub no_archive_tool: bool,
    pub json: bool,
}

/// Handle the `symbols` command
pub fn handle_symbols(args: &SymbolsArgs) -> Result<(), CliError> {
    require_dir(&args.project)?;
    let mut config = load_config(args.config_file.as_ref())?;
    if args.no_archive_tool {
        config.archive_tool.enabled = false;
    }

    let spinner = if args.json {
        Spinner::hidden()
    } else {
        Spinner::new("Loading symbols")
    };
    let load = Converter::new(config).load_symbols(&args.project);
    spinner.finish_and_clear();

    if args.json {
        let tables: Vec<_> = load.tables.values().collect();
        let document = json!({ "stats": load.stats, "tables": tables });
        println!("{}", serde_json::to_string_pretty(&document)?);
    } else {
        print!("{}", format_symbols(&load));
    }
    Ok(())
}
