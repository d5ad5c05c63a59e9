//! Symbol archive reader
//!
//! Finds loose `SymbolReference.json` files and `*.app` packages below a set of search
//! roots and feeds every symbol document it can extract to the
//! [`SymbolReferenceParser`]. Packages come in several container encodings, so each
//! package is handed to an ordered list of [`ExtractionStrategy`] implementations.
//! Every strategy runs; results are merged add-if-absent, so a package read by two
//! strategies yields the same tables once.

pub mod decompress;
pub mod discovery;
pub mod external;
pub mod generic;
pub mod matcher;
pub mod opc;
pub mod zip_reader;

pub use decompress::decompress_entry;
pub use discovery::{collect_search_roots, find_loose_symbol_files, find_packages};
pub use external::{ArchiveExtractor, ExternalToolStrategy, SevenZipExtractor};
pub use generic::GenericArchiveStrategy;
pub use matcher::EntryMatcher;
pub use opc::PackagingStrategy;
pub use zip_reader::NativeZipStrategy;

use crate::import::SymbolReferenceParser;
use crate::models::Table;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, info_span, warn};

/// Externally known tables keyed by identity key (normalized, lower-cased name)
pub type SymbolTables = BTreeMap<String, Table>;

/// Errors raised while opening a package with one strategy
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("No archive signature found")]
    NoSignature,

    #[error("Unsupported container format")]
    UnsupportedFormat,

    #[error("Failed to decompress {entry}: {reason}")]
    Decompress { entry: String, reason: String },

    /// The external archive tool could not be located
    #[error("Archive tool not found")]
    ToolUnavailable,

    #[error("Archive tool timed out after {0:?}")]
    ToolTimeout(Duration),

    #[error("Archive tool exited with status {code:?}: {stderr}")]
    ToolFailed { code: Option<i32>, stderr: String },
}

impl ArchiveError {
    /// Tooling failures are reported for the package instead of only being logged.
    pub fn is_tooling(&self) -> bool {
        matches!(self, ArchiveError::ToolUnavailable | ArchiveError::ToolTimeout(_))
    }
}

/// One decompressed symbol document pulled out of a package
#[derive(Debug, Clone)]
pub struct SymbolStream {
    pub entry_name: String,
    pub bytes: Vec<u8>,
}

/// A way of opening a package container
pub trait ExtractionStrategy: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Extract every symbol document the matcher selects.
    fn open_symbol_streams(
        &self,
        package: &Path,
        matcher: &EntryMatcher,
    ) -> Result<Vec<SymbolStream>, ArchiveError>;
}

/// Summary counters of a symbol load
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolStats {
    /// Loose symbol JSON files read
    pub json_files_seen: usize,
    /// Distinct packages processed
    pub packages_seen: usize,
    /// Symbol documents handed to the parser
    pub symbol_entries_tried: usize,
    /// Distinct tables in the result map
    pub tables_loaded: usize,
    /// Packages from which no strategy produced a symbol document
    pub packages_failed: usize,
    /// Number of errors encountered
    pub errors_count: usize,
    /// Errors surfaced per package (limited to first 100)
    pub errors: Vec<String>,
}

impl SymbolStats {
    /// Add an error (limited to 100)
    pub fn add_error(&mut self, error: String) {
        self.errors_count += 1;
        if self.errors.len() < 100 {
            self.errors.push(error);
        }
    }
}

/// Result of loading symbols from a set of search roots
#[derive(Debug, Clone, Default)]
pub struct SymbolLoad {
    pub tables: SymbolTables,
    pub stats: SymbolStats,
}

impl SymbolLoad {
    /// Add tables that are not known yet. Returns how many were added.
    pub fn merge(&mut self, tables: Vec<Table>) -> usize {
        let mut added = 0;
        for table in tables {
            let key = table.key();
            if !self.tables.contains_key(&key) {
                self.tables.insert(key, table);
                added += 1;
            }
        }
        self.stats.tables_loaded = self.tables.len();
        added
    }
}

/// Discovers symbol sources and extracts base tables from them
pub struct SymbolArchiveReader {
    parser: SymbolReferenceParser,
    matcher: EntryMatcher,
    strategies: Vec<Box<dyn ExtractionStrategy>>,
}

impl SymbolArchiveReader {
    /// Reader with the in-process strategies: zip, packaging convention, generic.
    pub fn new(parser: SymbolReferenceParser, matcher: EntryMatcher) -> Self {
        Self {
            parser,
            matcher,
            strategies: vec![
                Box::new(NativeZipStrategy),
                Box::new(PackagingStrategy),
                Box::new(GenericArchiveStrategy),
            ],
        }
    }

    /// Append the external-tool strategy as the last resort.
    pub fn with_external_tool(
        mut self,
        extractor: Arc<dyn ArchiveExtractor>,
        timeout: Duration,
        keep_scratch: bool,
    ) -> Self {
        self.strategies.push(Box::new(ExternalToolStrategy::new(
            extractor,
            timeout,
            keep_scratch,
        )));
        self
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Load every externally known table below `roots`.
    ///
    /// Loose JSON files and packages are deduplicated across roots by canonical path.
    pub fn load(&self, roots: &[PathBuf]) -> SymbolLoad {
        let span = info_span!("symbol_load", roots = roots.len());
        let _enter = span.enter();

        let mut load = SymbolLoad::default();
        let mut seen_json = HashSet::new();
        let mut seen_packages = HashSet::new();

        for root in roots {
            for path in find_loose_symbol_files(root) {
                if seen_json.insert(canonical(&path)) {
                    self.load_json_file(&path, &mut load);
                }
            }
            for path in find_packages(root) {
                if seen_packages.insert(canonical(&path)) {
                    self.load_package(&path, &mut load);
                }
            }
        }

        info!(
            json_files = load.stats.json_files_seen,
            packages = load.stats.packages_seen,
            entries = load.stats.symbol_entries_tried,
            tables = load.stats.tables_loaded,
            "Symbol load finished"
        );
        load
    }

    /// Parse one loose symbol JSON file into `load`.
    pub fn load_json_file(&self, path: &Path, load: &mut SymbolLoad) {
        load.stats.json_files_seen += 1;
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Cannot read symbol file");
                return;
            }
        };
        match self.parser.parse_bytes(&bytes) {
            Ok(tables) => {
                let added = load.merge(tables);
                debug!(path = %path.display(), added, "Loaded symbol file");
            }
            Err(e) => warn!(path = %path.display(), error = %e, "Skipping symbol file"),
        }
    }

    /// Run every strategy against one package and merge what they yield into `load`.
    pub fn load_package(&self, path: &Path, load: &mut SymbolLoad) {
        let span = info_span!("package", path = %path.display());
        let _enter = span.enter();

        load.stats.packages_seen += 1;
        let mut produced = false;

        for strategy in &self.strategies {
            let streams = match strategy.open_symbol_streams(path, &self.matcher) {
                Ok(streams) => streams,
                Err(e) => {
                    debug!(strategy = strategy.name(), error = %e, "Strategy failed");
                    if e.is_tooling() {
                        load.stats
                            .add_error(format!("{}: {} ({})", path.display(), e, strategy.name()));
                    }
                    continue;
                }
            };

            produced |= !streams.is_empty();
            for stream in streams {
                load.stats.symbol_entries_tried += 1;
                match self.parser.parse_bytes(&stream.bytes) {
                    Ok(tables) => {
                        let added = load.merge(tables);
                        debug!(
                            strategy = strategy.name(),
                            entry = %stream.entry_name,
                            added,
                            "Parsed symbol entry"
                        );
                    }
                    Err(e) => warn!(
                        strategy = strategy.name(),
                        entry = %stream.entry_name,
                        error = %e,
                        "Skipping symbol entry"
                    ),
                }
            }
        }

        if !produced {
            load.stats.packages_failed += 1;
            warn!(path = %path.display(), "No strategy could extract symbols from package");
        }
    }
}

fn canonical(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
