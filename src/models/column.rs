//! Column model shared by source tables, symbol tables and flattened tables

use serde::{Deserialize, Serialize};

/// Foreign key derived from a column that carries a table relation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKey {
    /// Column in the owning table
    pub column_name: String,
    /// Referenced table name (unqualified, as written in the relation)
    pub referenced_table: String,
}

impl ForeignKey {
    pub fn new(column_name: impl Into<String>, referenced_table: impl Into<String>) -> Self {
        Self {
            column_name: column_name.into(),
            referenced_table: referenced_table.into(),
        }
    }
}

/// Column model representing one AL field
///
/// `source_type` keeps the AL type token (`Code[20]`, `Decimal`, `Enum "Sales Line Type"`).
/// `sql_type` may be filled by a parser; the value `"text"` counts as unresolved and is
/// re-derived by the type resolver.
///
/// # Example
///
/// ```rust
/// use al2sql::models::Column;
///
/// let column = Column::new("No.").with_source_type("Code[20]");
/// assert_eq!(column.source_type.as_deref(), Some("Code[20]"));
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    /// Display name as declared in AL
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql_type: Option<String>,
    /// Raw `TableRelation` value, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation_target: Option<String>,
}

impl Column {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_source_type(mut self, source_type: impl Into<String>) -> Self {
        self.source_type = Some(source_type.into());
        self
    }

    pub fn with_sql_type(mut self, sql_type: impl Into<String>) -> Self {
        self.sql_type = Some(sql_type.into());
        self
    }

    pub fn with_relation(mut self, relation: impl Into<String>) -> Self {
        self.relation_target = Some(relation.into());
        self
    }

    /// Case-insensitive identity key of the column name.
    pub fn key(&self) -> String {
        crate::naming::identity_key(&self.name)
    }
}
