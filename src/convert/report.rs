//! Conversion result and summary

use super::ConvertError;
use crate::archive::SymbolStats;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// What a conversion run did
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionReport {
    /// AL files that declared a table or table extension
    pub files_parsed: usize,
    /// AL files that declared no table object
    pub files_ignored: usize,
    /// AL files that could not be read or were structurally broken
    pub files_skipped: Vec<PathBuf>,
    /// Distinct source tables after merging repeated declarations
    pub source_tables: usize,
    pub extensions: usize,
    /// `extension -> base` for extensions whose base table was not found
    pub unresolved_bases: Vec<String>,
    pub symbols: SymbolStats,
    pub tables_emitted: usize,
    pub foreign_keys_emitted: usize,
    pub foreign_keys_skipped: usize,
    pub warnings: Vec<String>,
}

impl ConversionReport {
    /// Whether anything degraded during the run.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
            || !self.files_skipped.is_empty()
            || !self.unresolved_bases.is_empty()
            || self.symbols.packages_failed > 0
    }
}

/// Generated SQL script and its report
#[derive(Debug, Clone)]
pub struct Conversion {
    pub sql: String,
    pub report: ConversionReport,
}

impl Conversion {
    /// Write the script to `path`, creating missing parent directories.
    pub fn write_to(&self, path: &Path) -> Result<(), ConvertError> {
        let output = |source| ConvertError::Output {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(output)?;
        }
        std::fs::write(path, &self.sql).map_err(output)
    }
}
