//! Entry decompression by file suffix

use super::ArchiveError;
use flate2::read::GzDecoder;
use std::io::Read;

/// Decompress an entry named `*.gz` (gzip) or `*.br` (brotli); other entries pass through.
pub fn decompress_entry(name: &str, bytes: Vec<u8>) -> Result<Vec<u8>, ArchiveError> {
    let lower = name.to_lowercase();
    let err = |e: std::io::Error| ArchiveError::Decompress {
        entry: name.to_string(),
        reason: e.to_string(),
    };

    if lower.ends_with(".gz") {
        let mut out = Vec::new();
        GzDecoder::new(bytes.as_slice())
            .read_to_end(&mut out)
            .map_err(err)?;
        Ok(out)
    } else if lower.ends_with(".br") {
        let mut out = Vec::new();
        brotli::Decompressor::new(bytes.as_slice(), 4096)
            .read_to_end(&mut out)
            .map_err(err)?;
        Ok(out)
    } else {
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    const DOC: &[u8] = br#"{"Tables":[]}"#;

    #[test]
    fn test_gzip_entry() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(DOC).unwrap();
        let packed = encoder.finish().unwrap();
        assert_eq!(decompress_entry("SymbolReference.json.GZ", packed).unwrap(), DOC);
    }

    #[test]
    fn test_brotli_entry() {
        let mut packed = Vec::new();
        {
            let mut writer = brotli::CompressorWriter::new(&mut packed, 4096, 5, 22);
            writer.write_all(DOC).unwrap();
        }
        assert_eq!(decompress_entry("SymbolReference.json.br", packed).unwrap(), DOC);
    }

    #[test]
    fn test_plain_and_corrupt_entries() {
        assert_eq!(decompress_entry("SymbolReference.json", DOC.to_vec()).unwrap(), DOC);
        assert!(matches!(
            decompress_entry("x.json.gz", b"not gzip".to_vec()),
            Err(ArchiveError::Decompress { .. })
        ));
    }
}
