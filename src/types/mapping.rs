//! AL type to MySQL type mapping table
//!
//! The table is plain data so callers can replace it (from TOML or in tests) without
//! touching the resolver.

use serde::{Deserialize, Serialize};

/// How a rule's `al_type` is compared with the type keyword of a column
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum MatchMode {
    #[default]
    Exact,
    Prefix,
}

/// SQL type produced by a rule
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SqlTarget {
    /// Always the same SQL type, size arguments are ignored
    #[serde(rename_all = "camelCase")]
    Fixed { sql_type: String },
    /// `varchar(n)` using the declared length or `default_length`
    #[serde(rename_all = "camelCase")]
    Varchar {
        default_length: u32,
        /// Size sentinel (`Max`) that maps to an unsized `text` column
        #[serde(default, skip_serializing_if = "Option::is_none")]
        unsized_sentinel: Option<String>,
    },
    /// `decimal(p,s)` using declared precision/scale or the defaults
    #[serde(rename_all = "camelCase")]
    Decimal { precision: u32, scale: u32 },
}

/// One entry of the mapping table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TypeRule {
    /// AL type keyword, compared case-insensitively
    pub al_type: String,
    #[serde(default, rename = "match")]
    pub match_mode: MatchMode,
    pub target: SqlTarget,
}

impl TypeRule {
    pub fn fixed(al_type: &str, sql_type: &str) -> Self {
        Self {
            al_type: al_type.to_string(),
            match_mode: MatchMode::Exact,
            target: SqlTarget::Fixed {
                sql_type: sql_type.to_string(),
            },
        }
    }

    pub fn prefixed(mut self) -> Self {
        self.match_mode = MatchMode::Prefix;
        self
    }

    /// Whether the rule applies to a lower-cased type keyword.
    pub fn matches(&self, keyword: &str) -> bool {
        let al_type = self.al_type.to_lowercase();
        match self.match_mode {
            MatchMode::Exact => keyword == al_type,
            MatchMode::Prefix => keyword.starts_with(&al_type),
        }
    }
}

/// Ordered mapping table plus the name-based fallbacks
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct TypeMappingTable {
    /// Evaluated top-down, first match wins
    pub rules: Vec<TypeRule>,
    /// Type for columns named `No` (code-like identifiers)
    pub identifier_type: String,
    /// Type for columns that carry a table relation
    pub relation_type: String,
    /// Type when nothing else applies
    pub default_type: String,
}

impl Default for TypeMappingTable {
    fn default() -> Self {
        Self {
            rules: vec![
                TypeRule {
                    al_type: "code".into(),
                    match_mode: MatchMode::Exact,
                    target: SqlTarget::Varchar {
                        default_length: 50,
                        unsized_sentinel: None,
                    },
                },
                TypeRule {
                    al_type: "text".into(),
                    match_mode: MatchMode::Exact,
                    target: SqlTarget::Varchar {
                        default_length: 250,
                        unsized_sentinel: Some("max".into()),
                    },
                },
                TypeRule {
                    al_type: "decimal".into(),
                    match_mode: MatchMode::Exact,
                    target: SqlTarget::Decimal {
                        precision: 38,
                        scale: 20,
                    },
                },
                TypeRule::fixed("integer", "int"),
                TypeRule::fixed("biginteger", "bigint"),
                TypeRule::fixed("date", "date"),
                TypeRule::fixed("time", "time"),
                TypeRule::fixed("datetime", "datetime"),
                TypeRule::fixed("boolean", "boolean"),
                TypeRule::fixed("guid", "char(36)"),
                TypeRule::fixed("blob", "blob"),
                TypeRule::fixed("media", "blob"),
                TypeRule::fixed("mediaset", "blob"),
                TypeRule::fixed("medialink", "blob"),
                TypeRule::fixed("enum", "int").prefixed(),
                TypeRule::fixed("option", "int"),
            ],
            identifier_type: "varchar(20)".into(),
            relation_type: "varchar(20)".into(),
            default_type: "varchar(250)".into(),
        }
    }
}

impl TypeMappingTable {
    /// First rule matching a lower-cased keyword.
    pub fn find(&self, keyword: &str) -> Option<&TypeRule> {
        self.rules.iter().find(|rule| rule.matches(keyword))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_rule_matches_longer_keywords() {
        let table = TypeMappingTable::default();
        assert_eq!(table.find("enum").map(|r| r.al_type.as_str()), Some("enum"));
        assert_eq!(table.find("enumext").map(|r| r.al_type.as_str()), Some("enum"));
        assert!(table.find("datetimeoffset").is_none());
    }

    #[test]
    fn test_table_round_trips_through_toml() {
        let table = TypeMappingTable::default();
        let text = toml::to_string(&table).unwrap();
        let back: TypeMappingTable = toml::from_str(&text).unwrap();
        assert_eq!(back, table);
    }

    #[test]
    fn test_partial_toml_keeps_default_fallbacks() {
        let table: TypeMappingTable = toml::from_str(
            r#"
            rules = [{ alType = "integer", target = { kind = "fixed", sqlType = "bigint" } }]
            "#,
        )
        .unwrap();
        assert_eq!(table.rules.len(), 1);
        assert_eq!(table.default_type, "varchar(250)");
    }
}
