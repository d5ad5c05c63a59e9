//! End-to-end conversion tests

use al2sql::config::ConverterConfig;
use al2sql::convert::{ConversionRequest, ConvertError, Converter};
use al2sql::types::{TypeMappingTable, TypeResolver, TypeRule};
use std::fs;
use std::io::{Cursor, Write};
use std::path::Path;
use std::sync::mpsc;
use tempfile::TempDir;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

const CUSTOMER_SYMBOLS: &str = r#"{
    "Tables": [
        {
            "Id": 18,
            "Name": "Customer",
            "Fields": [
                { "Name": "No.", "TypeDefinition": { "Name": "Code" }, "Length": 20 },
                { "Name": "Name", "TypeDefinition": { "Name": "Text" }, "Length": 100 },
                { "Name": "Salesperson Code", "TypeDefinition": { "Name": "Code" }, "Length": 20,
                  "Properties": [{ "Name": "TableRelation", "Value": "\"Salesperson/Purchaser\"" }] }
            ],
            "Keys": [{ "FieldNames": ["No."] }]
        }
    ]
}"#;

const LOYALTY_TABLE: &str = r#"
table 50100 "Loyalty Tier"
{
    fields
    {
        field(1; Code; Code[10]) { }
        field(2; Description; Text[50]) { }
    }
    keys
    {
        key(PK; Code) { Clustered = true; }
    }
}
"#;

const CUSTOMER_EXT: &str = r#"
tableextension 50110 "Customer Ext" extends Customer
{
    fields
    {
        field(50100; "Loyalty Tier"; Code[10])
        {
            TableRelation = "Loyalty Tier";
        }
        field(50101; Name; Text[30]) { }
    }
}
"#;

const LOYALTY_EXT: &str = r#"
tableextension 50111 "Loyalty Tier Ext" extends "Loyalty Tier"
{
    fields
    {
        field(50100; "Points Required"; Integer) { }
    }
}
"#;

fn write_symbol_package(root: &Path) {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file("SymbolReference.json", SimpleFileOptions::default())
        .unwrap();
    writer.write_all(CUSTOMER_SYMBOLS.as_bytes()).unwrap();
    let bytes = writer.finish().unwrap().into_inner();

    let packages = root.join(".alpackages");
    fs::create_dir_all(&packages).unwrap();
    fs::write(packages.join("Microsoft_Base Application_24.0.app"), bytes).unwrap();
}

fn project() -> TempDir {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("src");
    fs::create_dir_all(&src).unwrap();
    fs::write(src.join("LoyaltyTier.Table.al"), LOYALTY_TABLE).unwrap();
    fs::write(src.join("CustomerExt.TableExt.al"), CUSTOMER_EXT).unwrap();
    fs::write(src.join("LoyaltyTierExt.TableExt.al"), LOYALTY_EXT).unwrap();
    write_symbol_package(dir.path());
    dir
}

fn offline_config() -> ConverterConfig {
    ConverterConfig::builder().archive_tool(false).build()
}

mod pipeline_tests {
    use super::*;

    #[test]
    fn test_full_project_conversion() {
        let dir = project();
        let conversion = Converter::new(offline_config())
            .convert(&ConversionRequest::new(dir.path()), &())
            .unwrap();
        let sql = &conversion.sql;

        assert!(sql.contains(
            "CREATE TABLE `LoyaltyTier` (`Code` varchar(10) NOT NULL, `Description` varchar(50) NULL, CONSTRAINT `PK_LoyaltyTier` PRIMARY KEY (`Code`));"
        ));
        assert!(sql.contains(
            "CREATE TABLE `CustomerExt` (`M_No` varchar(20) NOT NULL, `M_Name` varchar(100) NULL, `M_SalespersonCode` varchar(20) NULL, `LoyaltyTier` varchar(10) NULL, `Name` varchar(30) NULL, CONSTRAINT `PK_CustomerExt` PRIMARY KEY (`M_No`));"
        ));
        assert!(sql.contains(
            "CREATE TABLE `LoyaltyTierExt` (`Code` varchar(10) NOT NULL, `Description` varchar(50) NULL, `PointsRequired` int NULL, CONSTRAINT `PK_LoyaltyTierExt` PRIMARY KEY (`Code`));"
        ));
        assert!(sql.contains(
            "ALTER TABLE `CustomerExt` ADD CONSTRAINT `FK_CustomerExt_LoyaltyTier_LoyaltyTier` FOREIGN KEY (`LoyaltyTier`) REFERENCES `LoyaltyTier` (`Code`);"
        ));
        assert!(!sql.contains("Salesperson/Purchaser`"));

        let report = &conversion.report;
        assert_eq!(report.files_parsed, 3);
        assert_eq!(report.source_tables, 1);
        assert_eq!(report.extensions, 2);
        assert!(report.unresolved_bases.is_empty());
        assert_eq!(report.symbols.tables_loaded, 1);
        assert_eq!(report.tables_emitted, 3);
        assert_eq!(report.foreign_keys_emitted, 1);
        assert_eq!(report.foreign_keys_skipped, 1);
    }

    #[test]
    fn test_source_tables_can_be_left_out() {
        let dir = project();
        let config = ConverterConfig::builder()
            .archive_tool(false)
            .emit_source_tables(false)
            .build();
        let conversion = Converter::new(config)
            .convert(&ConversionRequest::new(dir.path()), &())
            .unwrap();

        assert!(!conversion.sql.contains("-- Source tables"));
        assert!(!conversion.sql.contains("CREATE TABLE `LoyaltyTier` "));
        assert!(conversion.sql.contains("CREATE TABLE `LoyaltyTierExt`"));
        assert_eq!(conversion.report.tables_emitted, 2);
    }

    #[test]
    fn test_missing_base_does_not_abort() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("Ext.al"), CUSTOMER_EXT).unwrap();

        let conversion = Converter::new(offline_config())
            .convert(&ConversionRequest::new(dir.path()), &())
            .unwrap();
        assert_eq!(conversion.report.unresolved_bases, vec!["Customer Ext -> Customer"]);
        assert!(conversion.sql.contains(
            "CREATE TABLE `CustomerExt` (`LoyaltyTier` varchar(10) NULL, `Name` varchar(30) NULL);"
        ));
        assert!(conversion.report.has_warnings());
    }

    #[test]
    fn test_explicit_source_files() {
        let dir = project();
        let request = ConversionRequest::new(dir.path())
            .with_source_files(vec![dir.path().join("src/LoyaltyTier.Table.al")]);
        let conversion = Converter::new(offline_config()).convert(&request, &()).unwrap();

        assert_eq!(conversion.report.files_parsed, 1);
        assert_eq!(conversion.report.extensions, 0);
        assert_eq!(conversion.report.symbols.packages_seen, 0);
    }

    #[test]
    fn test_injected_type_resolver() {
        let dir = project();
        let mut types = TypeMappingTable::default();
        types.rules.insert(0, TypeRule::fixed("integer", "bigint"));
        let conversion = Converter::new(offline_config())
            .with_type_resolver(TypeResolver::new(types))
            .convert(&ConversionRequest::new(dir.path()), &())
            .unwrap();
        assert!(conversion.sql.contains("`PointsRequired` bigint NULL"));
    }

    #[test]
    fn test_config_file_is_honored() {
        let dir = project();
        let config_path = dir.path().join("al2sql.toml");
        fs::write(
            &config_path,
            "layout = \"pretty\"\n\n[vendor]\nprefix = \"BC_\"\n\n[archiveTool]\nenabled = false\n",
        )
        .unwrap();

        let config = ConverterConfig::load(&config_path).unwrap();
        let conversion = Converter::new(config)
            .convert(&ConversionRequest::new(dir.path()), &())
            .unwrap();
        assert!(conversion.sql.contains("CREATE TABLE `CustomerExt` (\n  `BC_No` varchar(20) NOT NULL,"));
    }
}

mod output_tests {
    use super::*;

    #[test]
    fn test_write_to_creates_parent_directories() {
        let dir = project();
        let conversion = Converter::new(offline_config())
            .convert(&ConversionRequest::new(dir.path()), &())
            .unwrap();

        let out = dir.path().join("build/sql/schema.sql");
        conversion.write_to(&out).unwrap();
        assert_eq!(fs::read_to_string(&out).unwrap(), conversion.sql);
    }

    #[test]
    fn test_unwritable_destination_is_fatal() {
        let dir = project();
        let conversion = Converter::new(offline_config())
            .convert(&ConversionRequest::new(dir.path()), &())
            .unwrap();

        // A directory cannot be overwritten by a file
        let result = conversion.write_to(&dir.path().join("src"));
        assert!(matches!(result, Err(ConvertError::Output { .. })));
    }
}

mod background_tests {
    use super::*;

    #[test]
    fn test_spawn_reports_status_over_a_channel() {
        let dir = project();
        let (tx, rx) = mpsc::channel::<String>();

        let handle = Converter::new(offline_config()).spawn(ConversionRequest::new(dir.path()), tx);
        let conversion = handle.join().unwrap().unwrap();
        let messages: Vec<String> = rx.iter().collect();

        assert!(conversion.sql.contains("CREATE TABLE `CustomerExt`"));
        assert!(messages.iter().any(|m| m.starts_with("Loaded 1 base tables")));
        assert!(messages.last().is_some_and(|m| m.starts_with("Done:")));
    }

    #[test]
    fn test_abandoned_task_does_not_block() {
        let dir = project();
        let (tx, rx) = mpsc::channel::<String>();
        drop(rx);
        let handle = Converter::new(offline_config()).spawn(ConversionRequest::new(dir.path()), tx);
        assert!(handle.join().unwrap().is_ok());
    }

    #[cfg(feature = "async")]
    #[tokio::test]
    async fn test_convert_async() {
        let dir = project();
        let conversion = Converter::new(offline_config())
            .convert_async(ConversionRequest::new(dir.path()), ())
            .await
            .unwrap();
        assert_eq!(conversion.report.tables_emitted, 3);
    }
}
