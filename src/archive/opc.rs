//! Packaging-convention strategy
//!
//! Packages built by the AL compiler start with a vendor header in front of an Open
//! Packaging Convention container. Part names are percent-encoded and the container
//! carries `[Content_Types].xml` and `_rels/` bookkeeping parts.

use super::zip_reader::read_selected;
use super::{ArchiveError, EntryMatcher, ExtractionStrategy, SymbolStream};
use std::io::Cursor;
use std::path::Path;
use zip::ZipArchive;

const LOCAL_FILE_HEADER: &[u8] = b"PK\x03\x04";

/// Opens a package from its first zip local header, with OPC part-name handling
#[derive(Debug, Default, Clone, Copy)]
pub struct PackagingStrategy;

impl ExtractionStrategy for PackagingStrategy {
    fn name(&self) -> &'static str {
        "opc"
    }

    fn open_symbol_streams(
        &self,
        package: &Path,
        matcher: &EntryMatcher,
    ) -> Result<Vec<SymbolStream>, ArchiveError> {
        let bytes = std::fs::read(package)?;
        let offset = find_signature(&bytes, LOCAL_FILE_HEADER).ok_or(ArchiveError::NoSignature)?;
        let mut archive = ZipArchive::new(Cursor::new(&bytes[offset..]))?;
        read_selected(&mut archive, matcher, part_name)
    }
}

pub(crate) fn find_signature(bytes: &[u8], signature: &[u8]) -> Option<usize> {
    bytes.windows(signature.len()).position(|w| w == signature)
}

/// Decoded part name, `None` for packaging bookkeeping parts.
fn part_name(raw: &str) -> Option<String> {
    let decoded = urlencoding::decode(raw)
        .map(|name| name.into_owned())
        .unwrap_or_else(|_| raw.to_string());
    let decoded = decoded.trim_start_matches('/');

    let lower = decoded.to_lowercase();
    if lower == "[content_types].xml" || lower.starts_with("_rels/") || lower.contains("/_rels/") {
        return None;
    }
    Some(decoded.to_string())
}
