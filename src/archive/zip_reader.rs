//! Central-directory zip strategy

use super::{ArchiveError, EntryMatcher, ExtractionStrategy, SymbolStream, decompress_entry};
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use tracing::debug;
use zip::ZipArchive;

/// Opens a package as a standard zip archive
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeZipStrategy;

impl ExtractionStrategy for NativeZipStrategy {
    fn name(&self) -> &'static str {
        "zip"
    }

    fn open_symbol_streams(
        &self,
        package: &Path,
        matcher: &EntryMatcher,
    ) -> Result<Vec<SymbolStream>, ArchiveError> {
        let file = File::open(package)?;
        let mut archive = ZipArchive::new(BufReader::new(file))?;
        read_selected(&mut archive, matcher, |raw| Some(raw.to_string()))
    }
}

/// Read the entries `matcher` selects from an open archive.
///
/// `display_name` maps a stored entry name to the name used for matching, or `None` to
/// hide the entry.
pub(crate) fn read_selected<R, F>(
    archive: &mut ZipArchive<R>,
    matcher: &EntryMatcher,
    display_name: F,
) -> Result<Vec<SymbolStream>, ArchiveError>
where
    R: Read + Seek,
    F: Fn(&str) -> Option<String>,
{
    let entries: Vec<(String, String)> = archive
        .file_names()
        .filter_map(|raw| display_name(raw).map(|shown| (shown, raw.to_string())))
        .collect();

    let selected = matcher.select(entries.iter().map(|(shown, _)| shown.as_str()));
    let mut streams = Vec::with_capacity(selected.len());

    for shown in selected {
        let Some((_, raw)) = entries.iter().find(|(s, _)| *s == shown) else {
            continue;
        };
        let mut bytes = Vec::new();
        let read = archive
            .by_name(raw)
            .map_err(ArchiveError::from)
            .and_then(|mut entry| entry.read_to_end(&mut bytes).map_err(ArchiveError::from));
        if let Err(e) = read {
            debug!(entry = %shown, error = %e, "Cannot read zip entry");
            continue;
        }
        match decompress_entry(&shown, bytes) {
            Ok(bytes) => streams.push(SymbolStream {
                entry_name: shown,
                bytes,
            }),
            Err(e) => debug!(error = %e, "Skipping entry"),
        }
    }

    Ok(streams)
}
