//! Conversion pipeline
//!
//! Ties the parsers, the symbol reader, the flattener and the SQL emitter together:
//!
//! 1. parse every AL file of the project (or the files given in the request)
//! 2. merge repeated table declarations
//! 3. load externally known tables from symbol files and packages
//! 4. flatten table extensions onto their base tables
//! 5. render the SQL script
//!
//! Only writing the final script can fail the run; everything else degrades into
//! warnings recorded in the [`ConversionReport`].

pub mod report;
pub mod sink;

pub use report::{Conversion, ConversionReport};
pub use sink::StatusSink;

use crate::archive::discovery::find_source_files;
use crate::archive::{
    ArchiveExtractor, EntryMatcher, SevenZipExtractor, SymbolArchiveReader, SymbolLoad,
    collect_search_roots,
};
use crate::config::{ConfigError, ConverterConfig};
use crate::export::SqlEmitter;
use crate::flatten::{TableFlattener, merge_internal_tables};
use crate::import::{ALSourceParser, SymbolReferenceParser};
use crate::models::{AlObject, Table, TableExtension};
use crate::types::TypeResolver;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;
use thiserror::Error;
use tracing::{debug, info, info_span, warn};

/// Errors that abort a conversion
#[derive(Error, Debug)]
pub enum ConvertError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to write output {path}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The background task died before producing a result
    #[error("Conversion task failed: {0}")]
    Task(String),
}

/// What to convert
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    /// Directory scanned for AL sources and symbol packages
    pub project_root: PathBuf,
    /// Explicit AL files; discovered below `project_root` when `None`
    pub source_files: Option<Vec<PathBuf>>,
}

impl ConversionRequest {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            source_files: None,
        }
    }

    pub fn with_source_files(mut self, files: Vec<PathBuf>) -> Self {
        self.source_files = Some(files);
        self
    }
}

/// Runs conversions with one configuration
pub struct Converter {
    config: ConverterConfig,
    resolver: TypeResolver,
    extractor: Option<Arc<dyn ArchiveExtractor>>,
}

impl Converter {
    pub fn new(config: ConverterConfig) -> Self {
        let resolver = TypeResolver::new(config.types.clone());
        Self {
            config,
            resolver,
            extractor: None,
        }
    }

    /// Use `extractor` instead of discovering the archive tool.
    ///
    /// Has no effect when the archive tool is disabled in the configuration.
    pub fn with_extractor(mut self, extractor: Arc<dyn ArchiveExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Replace the resolver built from `config.types`.
    pub fn with_type_resolver(mut self, resolver: TypeResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Run the whole pipeline and return the script with its report.
    pub fn convert(
        &self,
        request: &ConversionRequest,
        sink: &dyn StatusSink,
    ) -> Result<Conversion, ConvertError> {
        self.config.validate()?;

        let span = info_span!("convert", root = %request.project_root.display());
        let _enter = span.enter();
        let mut report = ConversionReport::default();

        let files = match &request.source_files {
            Some(files) => files.clone(),
            None => {
                sink.status(&format!(
                    "Scanning {} for AL files",
                    request.project_root.display()
                ));
                find_source_files(&request.project_root)
            }
        };
        sink.status(&format!("Parsing {} AL files", files.len()));
        let (tables, extensions) = self.parse_sources(&files, &mut report, sink);
        let tables = merge_internal_tables(tables);
        report.source_tables = tables.len();
        report.extensions = extensions.len();
        sink.status(&format!(
            "Found {} tables and {} table extensions",
            tables.len(),
            extensions.len()
        ));

        let symbols = if extensions.is_empty() {
            debug!("No table extensions, skipping symbol load");
            SymbolLoad::default()
        } else {
            sink.status("Loading symbols from packages");
            self.load_symbols(&request.project_root)
        };
        for error in &symbols.stats.errors {
            sink.status(&format!("Warning: {error}"));
        }
        sink.status(&format!(
            "Loaded {} base tables from {} packages and {} symbol files",
            symbols.stats.tables_loaded, symbols.stats.packages_seen, symbols.stats.json_files_seen
        ));

        let flattener = TableFlattener::new(
            &tables,
            &symbols.tables,
            &self.resolver,
            self.config.vendor.clone(),
        );
        let outcome = flattener.flatten_all(&extensions);
        for unresolved in &outcome.unresolved {
            let message = format!("Base table not found for {unresolved}, using extension fields only");
            sink.status(&format!("Warning: {message}"));
            report.warnings.push(message);
        }
        report.unresolved_bases = outcome.unresolved;
        report.symbols = symbols.stats;

        sink.status("Generating SQL");
        let source: &[Table] = if self.config.emit_source_tables {
            &tables
        } else {
            &[]
        };
        let script = SqlEmitter::new(&self.resolver, self.config.emit_options())
            .emit(source, &outcome.tables);
        for warning in &script.warnings {
            sink.status(&format!("Warning: {warning}"));
        }
        report.tables_emitted = script.tables_emitted;
        report.foreign_keys_emitted = script.foreign_keys_emitted;
        report.foreign_keys_skipped = script.foreign_keys_skipped;
        report.warnings.extend(script.warnings);

        info!(
            files = report.files_parsed,
            tables = report.tables_emitted,
            foreign_keys = report.foreign_keys_emitted,
            warnings = report.warnings.len(),
            "Conversion finished"
        );
        sink.status(&format!(
            "Done: {} tables, {} foreign keys",
            report.tables_emitted, report.foreign_keys_emitted
        ));

        Ok(Conversion {
            sql: script.content,
            report,
        })
    }

    /// Run the conversion on a background thread.
    ///
    /// There is no cancellation point; dropping the handle abandons the result.
    pub fn spawn<S>(
        self,
        request: ConversionRequest,
        sink: S,
    ) -> JoinHandle<Result<Conversion, ConvertError>>
    where
        S: StatusSink + 'static,
    {
        std::thread::spawn(move || self.convert(&request, &sink))
    }

    /// Run the conversion on tokio's blocking pool.
    #[cfg(feature = "async")]
    pub async fn convert_async<S>(
        self,
        request: ConversionRequest,
        sink: S,
    ) -> Result<Conversion, ConvertError>
    where
        S: StatusSink + 'static,
    {
        tokio::task::spawn_blocking(move || self.convert(&request, &sink))
            .await
            .map_err(|e| ConvertError::Task(e.to_string()))?
    }

    /// Load externally known tables below the project's search roots.
    pub fn load_symbols(&self, project_root: &Path) -> SymbolLoad {
        let roots = collect_search_roots(project_root);
        debug!(roots = roots.len(), "Collected symbol search roots");
        self.symbol_reader().load(&roots)
    }

    fn symbol_reader(&self) -> SymbolArchiveReader {
        let parser = SymbolReferenceParser::new(self.resolver.clone());
        let matcher = EntryMatcher::new(
            self.config.aggressive_symbol_matching,
            self.config.aggressive_match_limit,
        );
        let reader = SymbolArchiveReader::new(parser, matcher);

        let tool = &self.config.archive_tool;
        if !tool.enabled {
            return reader;
        }
        let extractor: Arc<dyn ArchiveExtractor> = match &self.extractor {
            Some(extractor) => Arc::clone(extractor),
            None => Arc::new(SevenZipExtractor::discover(tool.path.as_deref())),
        };
        reader.with_external_tool(extractor, tool.timeout(), tool.keep_scratch)
    }

    fn parse_sources(
        &self,
        files: &[PathBuf],
        report: &mut ConversionReport,
        sink: &dyn StatusSink,
    ) -> (Vec<Table>, Vec<TableExtension>) {
        let parser = ALSourceParser::new();
        let mut tables = Vec::new();
        let mut extensions = Vec::new();

        for path in files {
            match parser.parse_file(path) {
                Ok(Some(AlObject::Table(table))) => {
                    debug!(path = %path.display(), table = %table.name, "Parsed table");
                    report.files_parsed += 1;
                    tables.push(table);
                }
                Ok(Some(AlObject::TableExtension(extension))) => {
                    debug!(
                        path = %path.display(),
                        extension = %extension.name,
                        base = %extension.base_table_name,
                        "Parsed table extension"
                    );
                    report.files_parsed += 1;
                    extensions.push(extension);
                }
                Ok(None) => report.files_ignored += 1,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping AL file");
                    sink.status(&format!("Skipped {}: {}", path.display(), e));
                    report.files_skipped.push(path.clone());
                }
            }
        }
        (tables, extensions)
    }
}

impl Default for Converter {
    fn default() -> Self {
        Self::new(ConverterConfig::default())
    }
}
