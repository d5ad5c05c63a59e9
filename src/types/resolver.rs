//! Column type resolution

use super::mapping::{SqlTarget, TypeMappingTable};
use crate::models::Column;

/// Placeholder meaning "no SQL type decided yet"
pub const UNRESOLVED_SQL_TYPE: &str = "text";

/// Parsed AL type token, e.g. `Code[20]` or `Decimal[18,5]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeToken {
    /// Lower-cased leading keyword
    pub keyword: String,
    /// Bracketed size arguments, trimmed
    pub args: Vec<String>,
}

impl TypeToken {
    pub fn parse(token: &str) -> Option<Self> {
        let token = token.trim();
        let keyword: String = token
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '_')
            .collect::<String>()
            .to_lowercase();
        if keyword.is_empty() {
            return None;
        }

        let args = match (token.find('['), token.rfind(']')) {
            (Some(open), Some(close)) if close > open => token[open + 1..close]
                .split([',', ':', ';'])
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty())
                .collect(),
            _ => Vec::new(),
        };

        Some(Self { keyword, args })
    }
}

/// Maps AL column metadata to a MySQL column type
///
/// Resolution order, first match wins:
/// 1. an already decided `sql_type` other than the `text` placeholder
/// 2. the AL source type, through the mapping table
/// 3. a column named `No` gets the identifier type
/// 4. a column with a table relation gets the relation type
/// 5. the default type
#[derive(Debug, Clone, Default)]
pub struct TypeResolver {
    table: TypeMappingTable,
}

impl TypeResolver {
    pub fn new(table: TypeMappingTable) -> Self {
        Self { table }
    }

    pub fn resolve(&self, column: &Column) -> String {
        if let Some(sql_type) = column.sql_type.as_deref().map(str::trim)
            && !sql_type.is_empty()
            && !sql_type.eq_ignore_ascii_case(UNRESOLVED_SQL_TYPE)
        {
            return sql_type.to_string();
        }

        if let Some(resolved) = column
            .source_type
            .as_deref()
            .and_then(|t| self.resolve_source_type(t))
        {
            return resolved;
        }

        let bare_name = column.name.replace('.', "");
        if bare_name.trim().trim_matches('"').eq_ignore_ascii_case("no") {
            return self.table.identifier_type.clone();
        }

        if column
            .relation_target
            .as_deref()
            .is_some_and(|r| !r.trim().is_empty())
        {
            return self.table.relation_type.clone();
        }

        self.table.default_type.clone()
    }

    /// Map an AL type token alone, without the name-based fallbacks.
    pub fn resolve_source_type(&self, source_type: &str) -> Option<String> {
        let token = TypeToken::parse(source_type)?;
        let rule = self.table.find(&token.keyword)?;

        let resolved = match &rule.target {
            SqlTarget::Fixed { sql_type } => sql_type.clone(),
            SqlTarget::Varchar {
                default_length,
                unsized_sentinel,
            } => match token.args.first() {
                Some(arg)
                    if unsized_sentinel
                        .as_deref()
                        .is_some_and(|s| arg.eq_ignore_ascii_case(s)) =>
                {
                    UNRESOLVED_SQL_TYPE.to_string()
                }
                Some(arg) => match arg.parse::<u32>() {
                    Ok(len) if len > 0 => format!("varchar({len})"),
                    _ => format!("varchar({default_length})"),
                },
                None => format!("varchar({default_length})"),
            },
            SqlTarget::Decimal { precision, scale } => {
                let p = token
                    .args
                    .first()
                    .and_then(|a| a.parse::<u32>().ok())
                    .unwrap_or(*precision);
                let s = token
                    .args
                    .get(1)
                    .and_then(|a| a.parse::<u32>().ok())
                    .unwrap_or(*scale)
                    .min(p);
                format!("decimal({p},{s})")
            }
        };
        Some(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::mapping::TypeRule;

    fn resolve(column: Column) -> String {
        TypeResolver::default().resolve(&column)
    }

    #[test]
    fn test_type_token_parse() {
        let token = TypeToken::parse("Decimal[18, 5]").unwrap();
        assert_eq!(token.keyword, "decimal");
        assert_eq!(token.args, vec!["18", "5"]);
        let token = TypeToken::parse("Enum \"Sales Line Type\"").unwrap();
        assert_eq!(token.keyword, "enum");
        assert!(token.args.is_empty());
        assert!(TypeToken::parse("  ").is_none());
    }

    #[test]
    fn test_keeps_decided_sql_type() {
        assert_eq!(resolve(Column::new("X").with_sql_type("bigint").with_source_type("Code[10]")), "bigint");
    }

    #[test]
    fn test_text_placeholder_is_re_resolved() {
        assert_eq!(resolve(Column::new("X").with_sql_type("TEXT").with_source_type("Code[10]")), "varchar(10)");
    }

    #[test]
    fn test_source_type_rules() {
        let cases = [
            ("Code[20]", "varchar(20)"),
            ("Code", "varchar(50)"),
            ("Text[100]", "varchar(100)"),
            ("Text", "varchar(250)"),
            ("Text[Max]", "text"),
            ("Decimal", "decimal(38,20)"),
            ("Decimal[18,5]", "decimal(18,5)"),
            ("Decimal[12]", "decimal(12,12)"),
            ("Integer", "int"),
            ("BigInteger", "bigint"),
            ("Date", "date"),
            ("Time", "time"),
            ("DateTime", "datetime"),
            ("Boolean", "boolean"),
            ("Guid", "char(36)"),
            ("BLOB", "blob"),
            ("MediaSet", "blob"),
            ("Media", "blob"),
            ("MediaLink", "blob"),
            ("Enum \"Sales Document Type\"", "int"),
            ("Option", "int"),
        ];
        for (source, expected) in cases {
            assert_eq!(resolve(Column::new("X").with_source_type(source)), expected, "{source}");
        }
    }

    #[test]
    fn test_name_and_relation_fallbacks() {
        assert_eq!(resolve(Column::new("No.")), "varchar(20)");
        assert_eq!(resolve(Column::new("no")), "varchar(20)");
        assert_eq!(resolve(Column::new("Customer").with_relation("Customer")), "varchar(20)");
        assert_eq!(resolve(Column::new("Description")), "varchar(250)");
        assert_eq!(resolve(Column::new("Ref").with_source_type("RecordId")), "varchar(250)");
    }

    #[test]
    fn test_injected_table_replaces_rules() {
        let mut table = TypeMappingTable::default();
        table.rules.insert(0, TypeRule::fixed("integer", "bigint"));
        let resolver = TypeResolver::new(table);
        assert_eq!(resolver.resolve(&Column::new("X").with_source_type("Integer")), "bigint");
    }
}
