//! Table and table extension models

use super::column::{Column, ForeignKey};
use crate::naming::identity_key;
use serde::{Deserialize, Serialize};

/// A table as declared in AL source or described by package symbols
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    /// Object id, kept as text because symbol files do not always carry a number
    pub number: String,
    pub name: String,
    #[serde(default)]
    pub columns: Vec<Column>,
    #[serde(default)]
    pub primary_keys: Vec<String>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,
}

impl Table {
    pub fn new(number: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Case-insensitive identity key of the table name.
    pub fn key(&self) -> String {
        identity_key(&self.name)
    }

    /// Find a column by name, comparing normalized names.
    pub fn column(&self, name: &str) -> Option<&Column> {
        let key = identity_key(name);
        self.columns.iter().find(|c| c.key() == key)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Append `column` unless a column with the same normalized name exists.
    ///
    /// Returns `true` when the column was added.
    pub fn push_column(&mut self, column: Column) -> bool {
        if self.has_column(&column.name) {
            return false;
        }
        self.columns.push(column);
        true
    }

    /// Fold a duplicate declaration of the same table into this one.
    ///
    /// The first declaration keeps its number and name; new columns and primary key
    /// fields are appended, foreign keys are concatenated.
    pub fn merge(&mut self, other: Table) {
        for column in other.columns {
            self.push_column(column);
        }
        for pk in other.primary_keys {
            let key = identity_key(&pk);
            if !self.primary_keys.iter().any(|p| identity_key(p) == key) {
                self.primary_keys.push(pk);
            }
        }
        self.foreign_keys.extend(other.foreign_keys);
    }
}

/// A table extension: extra fields attached to a base table declared elsewhere
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TableExtension {
    pub number: String,
    pub name: String,
    /// Base table, referenced by name only
    pub base_table_name: String,
    #[serde(default)]
    pub columns: Vec<Column>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,
}

impl TableExtension {
    pub fn new(
        number: impl Into<String>,
        name: impl Into<String>,
        base_table_name: impl Into<String>,
    ) -> Self {
        Self {
            number: number.into(),
            name: name.into(),
            base_table_name: base_table_name.into(),
            ..Default::default()
        }
    }
}

/// Result of parsing one AL source file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum AlObject {
    Table(Table),
    TableExtension(TableExtension),
}

/// Who owns a base table, derived from its object id
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Ownership {
    /// Platform or vendor table; inherited columns get the vendor prefix
    Vendor,
    Custom,
}

impl Ownership {
    /// Classify a base table.
    ///
    /// A missing table or an id that does not parse as a number is vendor-owned, as is
    /// any id strictly between zero and `id_ceiling`.
    pub fn classify(base: Option<&Table>, id_ceiling: i64) -> Self {
        let Some(table) = base else {
            return Ownership::Vendor;
        };
        match table.number.trim().parse::<i64>() {
            Ok(id) if id > 0 && id < id_ceiling => Ownership::Vendor,
            Ok(_) => Ownership::Custom,
            Err(_) => Ownership::Vendor,
        }
    }

    pub fn is_vendor(self) -> bool {
        self == Ownership::Vendor
    }
}
