//! Output formatting for CLI

use crate::archive::SymbolLoad;
use crate::convert::ConversionReport;
use crate::models::{AlObject, Column, ForeignKey};
use crate::types::TypeResolver;
use std::path::Path;

/// Summary printed after a conversion
pub fn format_report(report: &ConversionReport, output: &Path) -> String {
    let mut out = String::new();

    if !report.files_skipped.is_empty() {
        out.push_str("\n⚠️  Skipped files:\n");
        for path in &report.files_skipped {
            out.push_str(&format!("  - {}\n", path.display()));
        }
    }

    if !report.unresolved_bases.is_empty() {
        out.push_str("\n⚠️  Unresolved base tables:\n");
        for unresolved in &report.unresolved_bases {
            out.push_str(&format!("  - {}\n", unresolved));
        }
    }

    if !report.symbols.errors.is_empty() {
        out.push_str(&format!(
            "\n⚠️  Package errors ({}):\n",
            report.symbols.errors_count
        ));
        for error in &report.symbols.errors {
            out.push_str(&format!("  - {}\n", error));
        }
    }

    out.push_str(&format!(
        "\n✅ Wrote {} table(s) and {} foreign key(s) to {}\n",
        report.tables_emitted,
        report.foreign_keys_emitted,
        output.display()
    ));
    out.push_str(&format!(
        "  AL files: {} parsed, {} ignored, {} skipped\n",
        report.files_parsed,
        report.files_ignored,
        report.files_skipped.len()
    ));
    out.push_str(&format!(
        "  Source tables: {}, extensions: {}\n",
        report.source_tables, report.extensions
    ));
    out.push_str(&format!(
        "  Symbols: {} table(s) from {} package(s) and {} file(s)\n",
        report.symbols.tables_loaded, report.symbols.packages_seen, report.symbols.json_files_seen
    ));
    if report.foreign_keys_skipped > 0 {
        out.push_str(&format!(
            "  Foreign keys skipped: {}\n",
            report.foreign_keys_skipped
        ));
    }

    out
}

fn format_columns(out: &mut String, columns: &[Column], resolver: &TypeResolver) {
    for column in columns {
        out.push_str(&format!(
            "    {} : {} -> {}",
            column.name,
            column.source_type.as_deref().unwrap_or("?"),
            resolver.resolve(column)
        ));
        if let Some(target) = &column.relation_target {
            out.push_str(&format!("  (relation: {})", target));
        }
        out.push('\n');
    }
}

fn format_foreign_keys(out: &mut String, foreign_keys: &[ForeignKey]) {
    if foreign_keys.is_empty() {
        return;
    }
    out.push_str("  Foreign keys:\n");
    for fk in foreign_keys {
        out.push_str(&format!("    {} -> {}\n", fk.column_name, fk.referenced_table));
    }
}

/// Human-readable view of one parsed AL object
pub fn format_object(object: &AlObject, resolver: &TypeResolver) -> String {
    let mut out = String::new();
    match object {
        AlObject::Table(table) => {
            out.push_str(&format!("Table {} {:?}\n", table.number, table.name));
            out.push_str(&format!("  Columns ({}):\n", table.columns.len()));
            format_columns(&mut out, &table.columns, resolver);
            if !table.primary_keys.is_empty() {
                out.push_str(&format!("  Primary key: {}\n", table.primary_keys.join(", ")));
            }
            format_foreign_keys(&mut out, &table.foreign_keys);
        }
        AlObject::TableExtension(extension) => {
            out.push_str(&format!(
                "Table extension {} {:?} extends {:?}\n",
                extension.number, extension.name, extension.base_table_name
            ));
            out.push_str(&format!("  Columns ({}):\n", extension.columns.len()));
            format_columns(&mut out, &extension.columns, resolver);
            format_foreign_keys(&mut out, &extension.foreign_keys);
        }
    }
    out
}

/// Listing of externally known tables
pub fn format_symbols(load: &SymbolLoad) -> String {
    let mut out = String::new();
    let stats = &load.stats;

    out.push_str(&format!(
        "Loaded {} table(s) from {} package(s) and {} symbol file(s)\n",
        stats.tables_loaded, stats.packages_seen, stats.json_files_seen
    ));
    out.push_str(&format!(
        "  Symbol entries parsed: {}, packages without symbols: {}\n",
        stats.symbol_entries_tried, stats.packages_failed
    ));
    if !stats.errors.is_empty() {
        out.push_str("\n⚠️  Package errors:\n");
        for error in &stats.errors {
            out.push_str(&format!("  - {}\n", error));
        }
    }

    if !load.tables.is_empty() {
        out.push('\n');
    }
    for table in load.tables.values() {
        out.push_str(&format!(
            "  {:>8}  {}  ({} columns)\n",
            table.number,
            table.name,
            table.columns.len()
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Table;

    #[test]
    fn test_format_object_lists_columns_and_keys() {
        let mut table = Table::new("50100", "Test");
        table.columns = vec![
            Column::new("No.").with_source_type("Code[20]"),
            Column::new("Customer No.").with_relation("Customer"),
        ];
        table.primary_keys = vec!["No.".into()];
        table.foreign_keys = vec![ForeignKey::new("Customer No.", "Customer")];

        let out = format_object(&AlObject::Table(table), &TypeResolver::default());
        assert!(out.contains("No. : Code[20] -> varchar(20)"));
        assert!(out.contains("Customer No. : ? -> varchar(20)  (relation: Customer)"));
        assert!(out.contains("Primary key: No."));
        assert!(out.contains("Customer No. -> Customer"));
    }

    #[test]
    fn test_format_report_mentions_unresolved_bases() {
        let report = ConversionReport {
            tables_emitted: 2,
            unresolved_bases: vec!["Ext -> Missing".into()],
            ..Default::default()
        };
        let out = format_report(&report, Path::new("schema.sql"));
        assert!(out.contains("Ext -> Missing"));
        assert!(out.contains("Wrote 2 table(s) and 0 foreign key(s) to schema.sql"));
    }
}
