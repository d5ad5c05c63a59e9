//! Archive reader tests
//!
//! Package fixtures are built in-process with the same crates the reader uses.

use al2sql::archive::{
    ArchiveError, ArchiveExtractor, EntryMatcher, SymbolArchiveReader, collect_search_roots,
};
use al2sql::import::SymbolReferenceParser;
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

fn symbol_document(tables: &[(u32, &str)]) -> Vec<u8> {
    let tables: Vec<_> = tables
        .iter()
        .map(|(id, name)| {
            serde_json::json!({
                "Id": id,
                "Name": name,
                "Fields": [
                    { "Name": "No.", "TypeDefinition": { "Name": "Code" }, "Length": 20 },
                    { "Name": "Description", "TypeDefinition": { "Name": "Text" }, "Length": 100 }
                ],
                "Keys": [{ "FieldNames": ["No."] }]
            })
        })
        .collect();
    serde_json::to_vec(&serde_json::json!({ "Tables": tables })).unwrap()
}

fn zip_bytes(entries: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, data) in entries {
        writer.start_file(*name, options).unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

fn brotli(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    {
        let mut writer = brotli::CompressorWriter::new(&mut out, 4096, 5, 22);
        writer.write_all(data).unwrap();
    }
    out
}

fn reader() -> SymbolArchiveReader {
    SymbolArchiveReader::new(SymbolReferenceParser::default(), EntryMatcher::default())
}

fn write_package(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let packages = dir.join(".alpackages");
    fs::create_dir_all(&packages).unwrap();
    let path = packages.join(name);
    fs::write(&path, bytes).unwrap();
    path
}

mod container_tests {
    use super::*;

    #[test]
    fn test_plain_zip_is_read_by_every_strategy_without_duplicates() {
        let dir = TempDir::new().unwrap();
        let package = zip_bytes(&[
            ("NavxManifest.xml", b"<Package/>".to_vec()),
            ("SymbolReference.json", symbol_document(&[(18, "Customer"), (27, "Item")])),
        ]);
        write_package(dir.path(), "Base Application.app", &package);

        let load = reader().load(&collect_search_roots(dir.path()));
        assert_eq!(load.stats.packages_seen, 1);
        assert_eq!(load.stats.packages_failed, 0);
        // zip, packaging and generic strategies all find the entry
        assert_eq!(load.stats.symbol_entries_tried, 3);
        assert_eq!(load.stats.tables_loaded, 2);
        assert_eq!(load.tables["customer"].primary_keys, vec!["No."]);
        assert_eq!(load.tables["item"].columns[1].sql_type.as_deref(), Some("varchar(100)"));
    }

    #[test]
    fn test_compressed_entries() {
        let dir = TempDir::new().unwrap();
        let package = zip_bytes(&[
            ("symbols/SymbolReference.json.gz", gzip(&symbol_document(&[(18, "Customer")]))),
            ("symbols/extra/SymbolReference.json.br", brotli(&symbol_document(&[(36, "Sales Header")]))),
        ]);
        write_package(dir.path(), "compressed.app", &package);

        let load = reader().load(&[dir.path().to_path_buf()]);
        assert!(load.tables.contains_key("customer"));
        assert!(load.tables.contains_key("salesheader"));
    }

    #[test]
    fn test_vendor_header_and_encoded_part_names() {
        let dir = TempDir::new().unwrap();
        let mut package = b"NAVX".to_vec();
        package.extend_from_slice(&[0u8; 36]);
        package.extend_from_slice(&zip_bytes(&[
            ("[Content_Types].xml", b"<Types/>".to_vec()),
            ("_rels/.rels", b"<Relationships/>".to_vec()),
            ("Symbol%52eference.json", symbol_document(&[(37, "Sales Line")])),
        ]));
        write_package(dir.path(), "navx.app", &package);

        let load = reader().load(&[dir.path().to_path_buf()]);
        assert_eq!(load.stats.packages_failed, 0);
        assert!(load.tables.contains_key("salesline"));
    }

    #[test]
    fn test_tar_gz_container() {
        let dir = TempDir::new().unwrap();
        let document = symbol_document(&[(5200, "Employee")]);
        let encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        let mut builder = tar::Builder::new(encoder);
        let mut header = tar::Header::new_gnu();
        header.set_size(document.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, "package/SymbolReference.json", document.as_slice())
            .unwrap();
        let bytes = builder.into_inner().unwrap().finish().unwrap();
        write_package(dir.path(), "tarred.app", &bytes);

        let load = reader().load(&[dir.path().to_path_buf()]);
        assert_eq!(load.stats.packages_failed, 0);
        assert!(load.tables.contains_key("employee"));
    }

    #[test]
    fn test_zip_without_central_directory_is_streamed() {
        let dir = TempDir::new().unwrap();
        let mut package = zip_bytes(&[("SymbolReference.json", symbol_document(&[(15, "G/L Account")]))]);
        let central = package
            .windows(4)
            .rposition(|w| w == b"PK\x01\x02")
            .expect("central directory header");
        package.truncate(central);
        write_package(dir.path(), "truncated.app", &package);

        let load = reader().load(&[dir.path().to_path_buf()]);
        assert_eq!(load.stats.symbol_entries_tried, 1);
        assert!(load.tables.contains_key("g/laccount"));
    }

    #[test]
    fn test_unreadable_package_is_counted_not_fatal() {
        let dir = TempDir::new().unwrap();
        write_package(dir.path(), "garbage.app", b"this is not an archive");
        write_package(
            dir.path(),
            "good.app",
            &zip_bytes(&[("SymbolReference.json", symbol_document(&[(18, "Customer")]))]),
        );

        let load = reader().load(&[dir.path().to_path_buf()]);
        assert_eq!(load.stats.packages_seen, 2);
        assert_eq!(load.stats.packages_failed, 1);
        assert_eq!(load.stats.tables_loaded, 1);
        assert_eq!(load.stats.errors_count, 0);
    }
}

mod selection_tests {
    use super::*;

    fn metadata_package() -> Vec<u8> {
        zip_bytes(&[
            ("readme.json", b"{}".to_vec()),
            ("metadata/objects.json", symbol_document(&[(50300, "Fallback")])),
        ])
    }

    #[test]
    fn test_aggressive_fallback_finds_metadata_entries() {
        let dir = TempDir::new().unwrap();
        write_package(dir.path(), "meta.app", &metadata_package());

        let load = reader().load(&[dir.path().to_path_buf()]);
        assert!(load.tables.contains_key("fallback"));
    }

    #[test]
    fn test_strict_matching_ignores_metadata_entries() {
        let dir = TempDir::new().unwrap();
        write_package(dir.path(), "meta.app", &metadata_package());

        let strict = SymbolArchiveReader::new(SymbolReferenceParser::default(), EntryMatcher::new(false, 10));
        let load = strict.load(&[dir.path().to_path_buf()]);
        assert!(load.tables.is_empty());
        assert_eq!(load.stats.packages_failed, 1);
    }

    #[test]
    fn test_fallback_is_bounded() {
        let names: Vec<String> = (0..25).map(|i| format!("objects/table{i}.json")).collect();
        let selected = EntryMatcher::new(true, 10).select(&names);
        assert_eq!(selected.len(), 10);
        assert_eq!(selected[0], "objects/table0.json");
    }
}

mod discovery_tests {
    use super::*;

    #[test]
    fn test_packages_and_loose_files_are_read_once_across_roots() {
        let dir = TempDir::new().unwrap();
        write_package(
            dir.path(),
            "base.app",
            &zip_bytes(&[("SymbolReference.json", symbol_document(&[(18, "Customer")]))]),
        );
        let nested = dir.path().join("app/.alpackages");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("symbolreference.json"), symbol_document(&[(27, "Item")])).unwrap();

        let roots = collect_search_roots(dir.path());
        assert_eq!(roots.len(), 3);

        let load = reader().load(&roots);
        assert_eq!(load.stats.packages_seen, 1);
        assert_eq!(load.stats.json_files_seen, 1);
        assert_eq!(load.stats.tables_loaded, 2);
    }

    #[test]
    fn test_first_package_wins_for_duplicate_tables() {
        let dir = TempDir::new().unwrap();
        let first = symbol_document(&[(18, "Customer")]);
        let mut second: serde_json::Value = serde_json::from_slice(&symbol_document(&[(99, "Customer")])).unwrap();
        second["Tables"][0]["Fields"] = serde_json::json!([{ "Name": "Other" }]);

        write_package(dir.path(), "a.app", &zip_bytes(&[("SymbolReference.json", first)]));
        write_package(
            dir.path(),
            "b.app",
            &zip_bytes(&[("SymbolReference.json", serde_json::to_vec(&second).unwrap())]),
        );

        let load = reader().load(&[dir.path().to_path_buf()]);
        assert_eq!(load.tables["customer"].number, "18");
    }
}

mod external_tool_tests {
    use super::*;

    /// Pretends to be a command-line archive tool by writing a fixed entry
    struct FakeExtractor {
        entries: Vec<String>,
        document: Vec<u8>,
        extracted: Mutex<Vec<Vec<String>>>,
    }

    impl ArchiveExtractor for FakeExtractor {
        fn list(&self, _archive: &Path, _timeout: Duration) -> Result<Vec<String>, ArchiveError> {
            Ok(self.entries.clone())
        }

        fn extract(
            &self,
            _archive: &Path,
            entries: &[String],
            dest: &Path,
            _timeout: Duration,
        ) -> Result<(), ArchiveError> {
            self.extracted.lock().unwrap().push(entries.to_vec());
            for entry in entries {
                let path = dest.join(entry);
                fs::create_dir_all(path.parent().unwrap())?;
                fs::write(path, &self.document)?;
            }
            Ok(())
        }
    }

    struct HangingExtractor;

    impl ArchiveExtractor for HangingExtractor {
        fn list(&self, _archive: &Path, timeout: Duration) -> Result<Vec<String>, ArchiveError> {
            Err(ArchiveError::ToolTimeout(timeout))
        }

        fn extract(&self, _: &Path, _: &[String], _: &Path, timeout: Duration) -> Result<(), ArchiveError> {
            Err(ArchiveError::ToolTimeout(timeout))
        }
    }

    #[test]
    fn test_external_tool_extracts_only_selected_entries() {
        let dir = TempDir::new().unwrap();
        write_package(dir.path(), "opaque.app", b"\x00\x01proprietary container");

        let fake = Arc::new(FakeExtractor {
            entries: vec![
                "src/Table.al".into(),
                "src/SymbolReference.json".into(),
                "NavxManifest.xml".into(),
            ],
            document: symbol_document(&[(38, "Purchase Header")]),
            extracted: Mutex::new(Vec::new()),
        });
        let reader = reader().with_external_tool(fake.clone(), Duration::from_secs(5), false);
        assert_eq!(reader.strategy_names(), vec!["zip", "opc", "generic", "external-tool"]);

        let load = reader.load(&[dir.path().to_path_buf()]);
        assert_eq!(load.stats.packages_failed, 0);
        assert!(load.tables.contains_key("purchaseheader"));
        assert_eq!(*fake.extracted.lock().unwrap(), vec![vec!["src/SymbolReference.json".to_string()]]);
    }

    #[test]
    fn test_tool_timeout_is_reported_for_the_package() {
        let dir = TempDir::new().unwrap();
        write_package(dir.path(), "opaque.app", b"not a container");
        write_package(
            dir.path(),
            "good.app",
            &zip_bytes(&[("SymbolReference.json", symbol_document(&[(18, "Customer")]))]),
        );

        let reader = reader().with_external_tool(Arc::new(HangingExtractor), Duration::from_secs(1), false);
        let load = reader.load(&[dir.path().to_path_buf()]);

        // Every package reaches the tool, the readable one still loads
        assert_eq!(load.stats.errors_count, 2);
        assert!(load.stats.errors.iter().all(|e| e.contains("timed out")));
        assert_eq!(load.stats.packages_failed, 1);
        assert!(load.tables.contains_key("customer"));
    }
}
