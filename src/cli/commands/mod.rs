//! CLI command implementations

pub mod convert;
pub mod parse;
pub mod symbols;

use crate::cli::error::CliError;
use crate::config::ConverterConfig;
use std::path::{Path, PathBuf};

/// Load the config file when one is given, defaults otherwise.
pub(crate) fn load_config(path: Option<&PathBuf>) -> Result<ConverterConfig, CliError> {
    match path {
        Some(path) => Ok(ConverterConfig::load(path)?),
        None => Ok(ConverterConfig::default()),
    }
}

pub(crate) fn require_dir(path: &Path) -> Result<(), CliError> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(CliError::NotADirectory(path.to_path_buf()))
    }
}
