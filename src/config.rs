//! Converter configuration
//!
//! Every setting has a default, so an empty TOML file (or none at all) gives the
//! standard behavior. Settings can also be assembled with [`ConverterConfig::builder`].

use crate::export::{EmitOptions, SqlLayout};
use crate::flatten::VendorRules;
use crate::naming::MAX_IDENTIFIER_LEN;
use crate::types::TypeMappingTable;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// External archive tool settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ArchiveToolConfig {
    /// Try the external tool after the in-process readers
    pub enabled: bool,
    /// Explicit executable; discovered when unset
    pub path: Option<PathBuf>,
    /// Limit for each list or extract call
    pub timeout_secs: u64,
    /// Leave the extraction scratch directory in place
    pub keep_scratch: bool,
}

impl Default for ArchiveToolConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
            timeout_secs: 60,
            keep_scratch: false,
        }
    }
}

impl ArchiveToolConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Configuration for a conversion run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ConverterConfig {
    /// Emit `CREATE TABLE` statements for tables declared in the project sources
    pub emit_source_tables: bool,

    /// Fall back to metadata-looking JSON entries when a package has no symbol file
    pub aggressive_symbol_matching: bool,

    /// Maximum entries taken by the aggressive fallback
    pub aggressive_match_limit: usize,

    pub layout: SqlLayout,

    /// Referenced column when the referenced table has no primary key
    pub foreign_key_fallback_column: String,

    /// Constraint names are truncated to this many characters
    pub identifier_max_len: usize,

    pub vendor: VendorRules,

    pub archive_tool: ArchiveToolConfig,

    /// Replacement AL to SQL type table
    pub types: TypeMappingTable,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            emit_source_tables: true,
            aggressive_symbol_matching: true,
            aggressive_match_limit: 10,
            layout: SqlLayout::Compact,
            foreign_key_fallback_column: "No.".to_string(),
            identifier_max_len: MAX_IDENTIFIER_LEN,
            vendor: VendorRules::default(),
            archive_tool: ArchiveToolConfig::default(),
            types: TypeMappingTable::default(),
        }
    }
}

impl ConverterConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder for custom configuration
    pub fn builder() -> ConverterConfigBuilder {
        ConverterConfigBuilder::default()
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Reject settings that cannot produce valid output.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.identifier_max_len == 0 {
            return Err(ConfigError::Invalid(
                "identifierMaxLen must be greater than zero".to_string(),
            ));
        }
        if self.foreign_key_fallback_column.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "foreignKeyFallbackColumn must not be empty".to_string(),
            ));
        }
        if self.archive_tool.enabled && self.archive_tool.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "archiveTool.timeoutSecs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn emit_options(&self) -> EmitOptions {
        EmitOptions {
            layout: self.layout,
            identifier_max_len: self.identifier_max_len,
            foreign_key_fallback_column: self.foreign_key_fallback_column.clone(),
        }
    }
}

/// Builder for ConverterConfig
#[derive(Debug, Default)]
pub struct ConverterConfigBuilder {
    config: ConverterConfig,
}

impl ConverterConfigBuilder {
    /// Emit or skip the source-table block
    pub fn emit_source_tables(mut self, emit: bool) -> Self {
        self.config.emit_source_tables = emit;
        self
    }

    /// Enable or disable the aggressive symbol entry fallback
    pub fn aggressive_symbol_matching(mut self, aggressive: bool) -> Self {
        self.config.aggressive_symbol_matching = aggressive;
        self
    }

    pub fn layout(mut self, layout: SqlLayout) -> Self {
        self.config.layout = layout;
        self
    }

    pub fn foreign_key_fallback_column(mut self, column: impl Into<String>) -> Self {
        self.config.foreign_key_fallback_column = column.into();
        self
    }

    pub fn vendor_rules(mut self, rules: VendorRules) -> Self {
        self.config.vendor = rules;
        self
    }

    /// Enable or disable the external archive tool
    pub fn archive_tool(mut self, enabled: bool) -> Self {
        self.config.archive_tool.enabled = enabled;
        self
    }

    pub fn archive_tool_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.archive_tool.path = Some(path.into());
        self
    }

    pub fn archive_tool_timeout(mut self, timeout: Duration) -> Self {
        self.config.archive_tool.timeout_secs = timeout.as_secs().max(1);
        self
    }

    pub fn type_mapping(mut self, types: TypeMappingTable) -> Self {
        self.config.types = types;
        self
    }

    /// Build the configuration
    pub fn build(self) -> ConverterConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ConverterConfig::default();
        assert!(config.emit_source_tables);
        assert!(config.aggressive_symbol_matching);
        assert_eq!(config.archive_tool.timeout(), Duration::from_secs(60));
        assert_eq!(config.foreign_key_fallback_column, "No.");
        assert_eq!(config.vendor.prefix, "M_");
    }

    #[test]
    fn test_builder() {
        let config = ConverterConfig::builder()
            .emit_source_tables(false)
            .layout(SqlLayout::Pretty)
            .archive_tool(false)
            .foreign_key_fallback_column("Code")
            .build();
        assert!(!config.emit_source_tables);
        assert_eq!(config.layout, SqlLayout::Pretty);
        assert!(!config.archive_tool.enabled);
        assert_eq!(config.emit_options().foreign_key_fallback_column, "Code");
    }

    #[test]
    fn test_partial_toml() {
        let config = ConverterConfig::from_toml_str(
            r#"
            emitSourceTables = false
            layout = "pretty"

            [vendor]
            prefix = "BC_"

            [archiveTool]
            timeoutSecs = 5
            "#,
        )
        .unwrap();
        assert!(!config.emit_source_tables);
        assert_eq!(config.layout, SqlLayout::Pretty);
        assert_eq!(config.vendor.prefix, "BC_");
        assert_eq!(config.vendor.id_ceiling, 50000);
        assert_eq!(config.archive_tool.timeout_secs, 5);
        assert!(config.archive_tool.enabled);
        assert_eq!(config.types, TypeMappingTable::default());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(matches!(
            ConverterConfig::from_toml_str("identifierMaxLen = 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            ConverterConfig::from_toml_str("layout = 3"),
            Err(ConfigError::Parse(_))
        ));
    }
}
