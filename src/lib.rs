//! al2sql - AL table schemas to MySQL DDL
//!
//! Provides:
//! - AL source and symbol metadata parsing
//! - Symbol extraction from compiled `.app` packages
//! - Table extension flattening
//! - SQL script generation
//! - A conversion pipeline with status reporting

pub mod archive;
pub mod config;
pub mod convert;
pub mod export;
pub mod flatten;
pub mod import;
pub mod models;
pub mod naming;
pub mod types;

#[cfg(feature = "cli")]
pub mod cli;

pub use archive::{
    ArchiveError, ArchiveExtractor, EntryMatcher, SevenZipExtractor, SymbolArchiveReader,
    SymbolLoad, SymbolStats, SymbolTables,
};
pub use config::{ConfigError, ConverterConfig};
pub use convert::{
    Conversion, ConversionReport, ConversionRequest, ConvertError, Converter, StatusSink,
};
pub use export::{EmitOptions, SqlEmitter, SqlLayout, SqlScript};
pub use flatten::{TableFlattener, VendorRules, merge_internal_tables};
pub use import::{ALSourceParser, ImportError, SymbolReferenceParser};
pub use models::{AlObject, Column, ForeignKey, Ownership, Table, TableExtension};
pub use naming::normalize_identifier;
pub use types::{TypeMappingTable, TypeResolver};
