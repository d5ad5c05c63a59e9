//! Table extension flattening
//!
//! A table extension only lists the fields it adds. To emit it as a standalone table it
//! is merged with its base table: inherited columns first (renamed with the vendor prefix
//! when the base belongs to the platform), then the extension's own columns.

use crate::archive::SymbolTables;
use crate::models::{ForeignKey, Ownership, Table, TableExtension};
use crate::naming::{apply_prefix, identity_key};
use crate::types::TypeResolver;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Naming rules applied to inherited columns
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct VendorRules {
    /// Prefix for columns inherited from vendor-owned tables
    pub prefix: String,
    /// Ids strictly between zero and this value are vendor-owned
    pub id_ceiling: i64,
}

impl Default for VendorRules {
    fn default() -> Self {
        Self {
            prefix: "M_".to_string(),
            id_ceiling: 50000,
        }
    }
}

/// Where an extension's base table was found
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BaseSource {
    /// Declared in the project's own source files
    Internal,
    /// Loaded from package symbols
    External,
    Unresolved,
}

/// One flattened extension
#[derive(Debug, Clone)]
pub struct Flattened {
    pub table: Table,
    pub base_source: BaseSource,
    pub ownership: Ownership,
}

/// Result of flattening every extension of a project
#[derive(Debug, Clone, Default)]
pub struct FlattenOutcome {
    pub tables: Vec<Table>,
    /// `extension -> base` descriptions for bases that could not be found
    pub unresolved: Vec<String>,
}

/// Merge repeated declarations of the same table, keeping first-seen order.
pub fn merge_internal_tables(tables: Vec<Table>) -> Vec<Table> {
    let mut merged: Vec<Table> = Vec::with_capacity(tables.len());
    for table in tables {
        let key = table.key();
        match merged.iter_mut().find(|t| t.key() == key) {
            Some(existing) => {
                debug!(table = %table.name, "Merging repeated table declaration");
                existing.merge(table);
            }
            None => merged.push(table),
        }
    }
    merged
}

/// Builds flattened tables from extensions and the known base tables
pub struct TableFlattener<'a> {
    internal: &'a [Table],
    external: &'a SymbolTables,
    resolver: &'a TypeResolver,
    rules: VendorRules,
}

impl<'a> TableFlattener<'a> {
    pub fn new(
        internal: &'a [Table],
        external: &'a SymbolTables,
        resolver: &'a TypeResolver,
        rules: VendorRules,
    ) -> Self {
        Self {
            internal,
            external,
            resolver,
            rules,
        }
    }

    /// Base table by name, project tables first.
    pub fn resolve_base(&self, name: &str) -> (Option<&'a Table>, BaseSource) {
        let key = identity_key(name);
        if let Some(table) = self.internal.iter().find(|t| t.key() == key) {
            return (Some(table), BaseSource::Internal);
        }
        match self.external.get(&key) {
            Some(table) => (Some(table), BaseSource::External),
            None => (None, BaseSource::Unresolved),
        }
    }

    /// Flatten one extension. The inputs are left untouched.
    pub fn flatten(&self, extension: &TableExtension) -> Flattened {
        let (base, base_source) = self.resolve_base(&extension.base_table_name);
        let ownership = Ownership::classify(base, self.rules.id_ceiling);

        info!(
            extension = %extension.name,
            base = %extension.base_table_name,
            source = ?base_source,
            vendor = ownership.is_vendor(),
            "Flattening table extension"
        );
        if base.is_none() {
            warn!(
                extension = %extension.name,
                base = %extension.base_table_name,
                "Base table not found, using extension fields only"
            );
        }

        let inherit = |name: &str| {
            if ownership.is_vendor() {
                apply_prefix(name, &self.rules.prefix)
            } else {
                name.to_string()
            }
        };

        let mut table = Table::new(extension.number.clone(), extension.name.clone());

        if let Some(base) = base {
            for column in &base.columns {
                let mut inherited = column.clone();
                inherited.name = inherit(column.name.as_str());
                inherited.sql_type = Some(self.resolver.resolve(column));
                if !table.push_column(inherited) {
                    debug!(column = %column.name, "Duplicate inherited column skipped");
                }
            }
            table.primary_keys = base.primary_keys.iter().map(|pk| inherit(pk.as_str())).collect();
            table.foreign_keys = base
                .foreign_keys
                .iter()
                .map(|fk| ForeignKey::new(inherit(fk.column_name.as_str()), fk.referenced_table.clone()))
                .collect();
        }

        for column in &extension.columns {
            if !table.push_column(column.clone()) {
                debug!(
                    extension = %extension.name,
                    column = %column.name,
                    "Extension column collides with an inherited column, skipped"
                );
            }
        }
        table.foreign_keys.extend(extension.foreign_keys.iter().cloned());

        Flattened {
            table,
            base_source,
            ownership,
        }
    }

    /// Flatten every extension in order.
    pub fn flatten_all(&self, extensions: &[TableExtension]) -> FlattenOutcome {
        let mut outcome = FlattenOutcome::default();
        for extension in extensions {
            let flattened = self.flatten(extension);
            if flattened.base_source == BaseSource::Unresolved {
                outcome.unresolved.push(format!(
                    "{} -> {}",
                    extension.name, extension.base_table_name
                ));
            }
            outcome.tables.push(flattened.table);
        }
        outcome
    }
}
