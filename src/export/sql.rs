//! MySQL DDL emitter for flattened AL tables.
//!
//! # Security
//!
//! All identifiers (table names, column names, constraint names) are quoted with
//! backticks and embedded backticks are escaped by doubling them.

use crate::models::Table;
use crate::naming::{MAX_IDENTIFIER_LEN, identity_key, normalize_identifier, truncate_identifier};
use crate::types::{TypeResolver, UNRESOLVED_SQL_TYPE};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::warn;

/// Type forced onto primary key columns that would otherwise be unsized `text`
const INDEXABLE_TEXT_TYPE: &str = "varchar(255)";

/// Statement layout
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SqlLayout {
    /// One statement per line
    #[default]
    Compact,
    /// One column per line
    Pretty,
}

/// Emitter settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitOptions {
    pub layout: SqlLayout,
    pub identifier_max_len: usize,
    /// Referenced column used when the referenced table declares no primary key
    pub foreign_key_fallback_column: String,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self {
            layout: SqlLayout::Compact,
            identifier_max_len: MAX_IDENTIFIER_LEN,
            foreign_key_fallback_column: "No.".to_string(),
        }
    }
}

/// Generated script plus what was left out of it
#[derive(Debug, Clone, Default)]
pub struct SqlScript {
    pub content: String,
    pub tables_emitted: usize,
    pub tables_skipped: usize,
    pub foreign_keys_emitted: usize,
    pub foreign_keys_skipped: usize,
    pub warnings: Vec<String>,
}

impl SqlScript {
    fn warn(&mut self, message: String) {
        warn!("{}", message);
        self.warnings.push(message);
    }
}

/// Renders tables as `CREATE TABLE` and `ALTER TABLE ... FOREIGN KEY` statements
pub struct SqlEmitter<'a> {
    resolver: &'a TypeResolver,
    options: EmitOptions,
}

impl<'a> SqlEmitter<'a> {
    pub fn new(resolver: &'a TypeResolver, options: EmitOptions) -> Self {
        Self { resolver, options }
    }

    /// Build the full script.
    ///
    /// Source tables come first, then flattened extension tables, then every foreign
    /// key. Tables without columns are omitted. Foreign keys are resolved against the
    /// emitted tables of both blocks.
    ///
    /// # Example
    ///
    /// ```rust
    /// use al2sql::export::{EmitOptions, SqlEmitter};
    /// use al2sql::models::{Column, Table};
    /// use al2sql::types::TypeResolver;
    ///
    /// let mut table = Table::new("50100", "Test");
    /// table.columns.push(Column::new("No.").with_source_type("Code[20]"));
    /// table.primary_keys.push("No.".to_string());
    ///
    /// let resolver = TypeResolver::default();
    /// let script = SqlEmitter::new(&resolver, EmitOptions::default()).emit(&[table], &[]);
    /// assert!(script.content.contains(
    ///     "CREATE TABLE `Test` (`No` varchar(20) NOT NULL, CONSTRAINT `PK_Test` PRIMARY KEY (`No`));"
    /// ));
    /// ```
    pub fn emit(&self, source_tables: &[Table], flattened_tables: &[Table]) -> SqlScript {
        let mut script = SqlScript::default();

        let source: Vec<&Table> = self.emittable(source_tables, &mut script);
        let flattened: Vec<&Table> = self.emittable(flattened_tables, &mut script);
        let lookup: Vec<&Table> = source.iter().chain(flattened.iter()).copied().collect();

        let mut sections: Vec<String> = Vec::new();
        for (title, tables) in [
            ("Source tables", &source),
            ("Flattened extension tables", &flattened),
        ] {
            if tables.is_empty() {
                continue;
            }
            let statements: Vec<String> = tables
                .iter()
                .map(|t| self.create_table(t, &mut script))
                .collect();
            script.tables_emitted += statements.len();
            sections.push(format!("-- {title}\n{}", statements.join("\n")));
        }

        let alters = self.foreign_keys(&lookup, &lookup, &mut script);
        if !alters.is_empty() {
            sections.push(format!("-- Foreign keys\n{}", alters.join("\n")));
        }

        script.content = sections.join("\n\n");
        if !script.content.is_empty() {
            script.content.push('\n');
        }
        script
    }

    fn emittable<'t>(&self, tables: &'t [Table], script: &mut SqlScript) -> Vec<&'t Table> {
        tables
            .iter()
            .filter(|t| {
                if t.columns.is_empty() {
                    script.tables_skipped += 1;
                    script.warn(format!("Table {} has no columns and is omitted", t.name));
                    false
                } else {
                    true
                }
            })
            .collect()
    }

    /// `CREATE TABLE` statement for one table.
    pub fn create_table(&self, table: &Table, script: &mut SqlScript) -> String {
        let table_name = normalize_identifier(&table.name);

        let mut primary_keys: Vec<String> = Vec::new();
        for pk in &table.primary_keys {
            match table.column(pk) {
                Some(column) => {
                    let name = normalize_identifier(&column.name);
                    if !primary_keys.contains(&name) {
                        primary_keys.push(name);
                    }
                }
                None => script.warn(format!(
                    "Primary key field {pk} is not a column of {}, dropped",
                    table.name
                )),
            }
        }
        let pk_keys: HashSet<String> = primary_keys.iter().map(|pk| pk.to_lowercase()).collect();

        let mut parts: Vec<String> = table
            .columns
            .iter()
            .map(|column| {
                let name = normalize_identifier(&column.name);
                let is_pk = pk_keys.contains(&name.to_lowercase());
                let mut sql_type = self.resolver.resolve(column);
                if is_pk && sql_type.eq_ignore_ascii_case(UNRESOLVED_SQL_TYPE) {
                    sql_type = INDEXABLE_TEXT_TYPE.to_string();
                }
                let nullability = if is_pk { "NOT NULL" } else { "NULL" };
                format!("{} {} {}", Self::quote_identifier(&name), sql_type, nullability)
            })
            .collect();

        if !primary_keys.is_empty() {
            let constraint = self.constraint_name(&format!("PK_{table_name}"));
            let columns: Vec<String> = primary_keys.iter().map(|pk| Self::quote_identifier(pk)).collect();
            parts.push(format!(
                "CONSTRAINT {} PRIMARY KEY ({})",
                Self::quote_identifier(&constraint),
                columns.join(", ")
            ));
        }

        let quoted_table = Self::quote_identifier(&table_name);
        match self.options.layout {
            SqlLayout::Compact => format!("CREATE TABLE {} ({});", quoted_table, parts.join(", ")),
            SqlLayout::Pretty => format!(
                "CREATE TABLE {} (\n  {}\n);",
                quoted_table,
                parts.join(",\n  ")
            ),
        }
    }

    /// `ALTER TABLE ... ADD CONSTRAINT ... FOREIGN KEY` statements for `tables`.
    ///
    /// A foreign key is emitted only when its referenced table is in `lookup` (first
    /// match by normalized name). The referenced column is that table's first primary
    /// key, or the configured fallback column.
    pub fn foreign_keys(&self, tables: &[&Table], lookup: &[&Table], script: &mut SqlScript) -> Vec<String> {
        let mut statements = Vec::new();
        let mut constraint_names = HashSet::new();

        for table in tables {
            let table_name = normalize_identifier(&table.name);
            for fk in &table.foreign_keys {
                if !table.has_column(&fk.column_name) {
                    script.foreign_keys_skipped += 1;
                    script.warn(format!(
                        "Foreign key column {} is not a column of {}, skipped",
                        fk.column_name, table.name
                    ));
                    continue;
                }

                let ref_key = identity_key(&fk.referenced_table);
                let Some(referenced) = lookup.iter().find(|t| t.key() == ref_key) else {
                    script.foreign_keys_skipped += 1;
                    script.warn(format!(
                        "Foreign key {}.{} references unknown table {}, skipped",
                        table.name, fk.column_name, fk.referenced_table
                    ));
                    continue;
                };

                let column = normalize_identifier(&fk.column_name);
                let ref_table = normalize_identifier(&referenced.name);
                // Primary-key entries that name no column are dropped from CREATE TABLE
                let ref_column = normalize_identifier(
                    referenced
                        .primary_keys
                        .iter()
                        .find(|pk| referenced.has_column(pk))
                        .unwrap_or(&self.options.foreign_key_fallback_column),
                );
                let constraint = self.constraint_name(&format!("FK_{table_name}_{ref_table}_{column}"));

                if !constraint_names.insert(constraint.to_lowercase()) {
                    script.foreign_keys_skipped += 1;
                    script.warn(format!("Duplicate foreign key constraint {constraint}, skipped"));
                    continue;
                }

                statements.push(format!(
                    "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({});",
                    Self::quote_identifier(&table_name),
                    Self::quote_identifier(&constraint),
                    Self::quote_identifier(&column),
                    Self::quote_identifier(&ref_table),
                    Self::quote_identifier(&ref_column)
                ));
                script.foreign_keys_emitted += 1;
            }
        }

        statements
    }

    fn constraint_name(&self, raw: &str) -> String {
        truncate_identifier(raw, self.options.identifier_max_len)
    }

    /// Quote an identifier with backticks.
    ///
    /// Embedded backticks are doubled, so the result is always a single identifier.
    pub fn quote_identifier(identifier: &str) -> String {
        format!("`{}`", identifier.replace('`', "``"))
    }
}
