//! Import functionality
//!
//! Parsers that turn the two schema representations into [`crate::models`] records:
//! - AL source files (`table` / `tableextension` objects)
//! - compiled-package symbol metadata (`SymbolReference.json`)

pub mod al_source;
pub mod symbols;

pub use al_source::ALSourceParser;
pub use symbols::SymbolReferenceParser;

use crate::naming::{normalize_identifier, relation_table};
use std::path::PathBuf;

/// Error during import
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Unbalanced braces in {block} block")]
    UnbalancedBlock { block: &'static str },
    #[error("JSON parse error: {0}")]
    Json(String),
    #[error("Malformed symbol table {table}: {reason}")]
    MalformedTable { table: String, reason: String },
}

/// Drop a leading UTF-8 byte order mark.
pub(crate) fn strip_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes)
}

/// Whether a relation value points at a real table.
///
/// `undefined` and relations to the number series table are sentinels, not foreign keys.
pub(crate) fn is_real_relation(relation: &str) -> bool {
    let table = relation_table(relation);
    let table = table.trim();
    !table.is_empty()
        && !table.eq_ignore_ascii_case("undefined")
        && !normalize_identifier(table).eq_ignore_ascii_case("NoSeries")
}
