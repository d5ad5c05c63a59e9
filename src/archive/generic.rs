//! Generic archive strategy
//!
//! Sniffs the container signature instead of trusting the extension and reads entries
//! sequentially, so a zip without a usable central directory, a tar, or a gzip-compressed
//! tar can still be read.

use super::opc::find_signature;
use super::{ArchiveError, EntryMatcher, ExtractionStrategy, SymbolStream, decompress_entry};
use flate2::read::GzDecoder;
use std::io::{Cursor, Read};
use std::path::Path;
use tracing::debug;

const GZIP_MAGIC: &[u8] = &[0x1f, 0x8b];
const ZIP_LOCAL_HEADER: &[u8] = b"PK\x03\x04";
const TAR_MAGIC_OFFSET: usize = 257;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Container {
    Zip { offset: usize },
    Gzip,
    Tar,
}

fn sniff(bytes: &[u8]) -> Option<Container> {
    if bytes.starts_with(GZIP_MAGIC) {
        Some(Container::Gzip)
    } else if is_tar(bytes) {
        Some(Container::Tar)
    } else {
        find_signature(bytes, ZIP_LOCAL_HEADER).map(|offset| Container::Zip { offset })
    }
}

fn is_tar(bytes: &[u8]) -> bool {
    bytes
        .get(TAR_MAGIC_OFFSET..TAR_MAGIC_OFFSET + 5)
        .is_some_and(|magic| magic == b"ustar")
}

/// Signature-sniffing, streaming reader for zip, tar and tar.gz containers
#[derive(Debug, Default, Clone, Copy)]
pub struct GenericArchiveStrategy;

impl ExtractionStrategy for GenericArchiveStrategy {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn open_symbol_streams(
        &self,
        package: &Path,
        matcher: &EntryMatcher,
    ) -> Result<Vec<SymbolStream>, ArchiveError> {
        let bytes = std::fs::read(package)?;

        let candidates = match sniff(&bytes).ok_or(ArchiveError::UnsupportedFormat)? {
            Container::Zip { offset } => stream_zip(&bytes[offset..], matcher)?,
            Container::Tar => tar_entries(&bytes, matcher)?,
            Container::Gzip => {
                let mut inner = Vec::new();
                GzDecoder::new(bytes.as_slice()).read_to_end(&mut inner)?;
                if !is_tar(&inner) {
                    return Err(ArchiveError::UnsupportedFormat);
                }
                tar_entries(&inner, matcher)?
            }
        };

        let selected = matcher.select(candidates.iter().map(|(name, _)| name.as_str()));
        let mut streams = Vec::with_capacity(selected.len());
        for (name, bytes) in candidates {
            if !selected.contains(&name) {
                continue;
            }
            match decompress_entry(&name, bytes) {
                Ok(bytes) => streams.push(SymbolStream {
                    entry_name: name,
                    bytes,
                }),
                Err(e) => debug!(error = %e, "Skipping entry"),
            }
        }
        Ok(streams)
    }
}

/// Read candidate entries by walking zip local headers.
fn stream_zip(data: &[u8], matcher: &EntryMatcher) -> Result<Vec<(String, Vec<u8>)>, ArchiveError> {
    let mut reader = Cursor::new(data);
    let mut found = Vec::new();

    loop {
        match zip::read::read_zipfile_from_stream(&mut reader) {
            Ok(Some(mut entry)) => {
                let name = entry.name().to_string();
                if entry.is_dir() || !matcher.is_candidate(&name) {
                    continue;
                }
                let mut bytes = Vec::new();
                entry.read_to_end(&mut bytes)?;
                found.push((name, bytes));
            }
            Ok(None) => break,
            Err(e) if found.is_empty() => return Err(e.into()),
            Err(e) => {
                debug!(error = %e, "Stopping at unreadable zip entry");
                break;
            }
        }
    }
    Ok(found)
}

fn tar_entries(data: &[u8], matcher: &EntryMatcher) -> Result<Vec<(String, Vec<u8>)>, ArchiveError> {
    let mut archive = tar::Archive::new(data);
    let mut found = Vec::new();

    for entry in archive.entries()? {
        let mut entry = entry?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let name = entry.path()?.to_string_lossy().replace('\\', "/");
        if !matcher.is_candidate(&name) {
            continue;
        }
        let mut bytes = Vec::new();
        entry.read_to_end(&mut bytes)?;
        found.push((name, bytes));
    }
    Ok(found)
}
