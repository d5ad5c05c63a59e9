//! Parse command implementation

use super::load_config;
use crate::cli::error::CliError;
use crate::cli::output::format_object;
use crate::import::ALSourceParser;
use crate::types::TypeResolver;
use std::path::PathBuf;

/// Arguments for the `parse` command
#[derive(Debug)]
pub struct ParseArgs {
    pub file: PathBuf,
    pub config_file: Option<PathBuf>,
    pub json: bool,
}

/// Handle the `parse` command
pub fn handle_parse(args: &ParseArgs) -> Result<(), CliError> {
    let config = load_config(args.config_file.as_ref())?;
    let resolver = TypeResolver::new(config.types);

    let object = ALSourceParser::new()
        .parse_file(&args.file)
        .map_err(|source| CliError::Parse {
            path: args.file.clone(),
            source,
        })?;

    let Some(object) = object else {
        eprintln!(
            "{} does not declare a table or table extension",
            args.file.display()
        );
        return Ok(());
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&object)?);
    } else {
        print!("{}", format_object(&object, &resolver));
    }
    Ok(())
}
