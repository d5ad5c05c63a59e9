//! Symbol reference parser
//!
//! Compiled packages describe their objects in a `SymbolReference.json` document whose
//! shape differs between platform versions and vendors. The document is walked as a
//! generic [`serde_json::Value`] tree; any node that looks like a table is turned into a
//! [`Table`], everything else is ignored.

use super::{ImportError, is_real_relation, strip_bom};
use crate::models::{Column, ForeignKey, Table};
use crate::naming::relation_table;
use crate::types::{TypeResolver, TypeToken, UNRESOLVED_SQL_TYPE};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::{debug, warn};

const TYPE_TAG_KEYS: &[&str] = &["Type", "Kind", "ObjectType", "ALObjectType", "SymbolKind"];
const FIELD_TYPE_KEYS: &[&str] = &["Type", "DataType", "TypeDefinition"];
const TYPE_NAME_KEYS: &[&str] = &["Name", "Kind", "PrimitiveType", "TypeName"];
const LENGTH_KEYS: &[&str] = &["Length", "MaxLength", "Size"];
const PRECISION_KEYS: &[&str] = &["Precision", "PrecisionDigits"];
const SCALE_KEYS: &[&str] = &["Scale", "ScaleDigits"];

/// Parser for symbol reference documents
#[derive(Debug, Clone, Default)]
pub struct SymbolReferenceParser {
    resolver: TypeResolver,
}

impl SymbolReferenceParser {
    pub fn new(resolver: TypeResolver) -> Self {
        Self { resolver }
    }

    /// Parse raw document bytes.
    ///
    /// Strict JSON is tried first; documents with trailing commas go through
    /// a lenient parser before being rejected.
    pub fn parse_bytes(&self, bytes: &[u8]) -> Result<Vec<Table>, ImportError> {
        let bytes = strip_bom(bytes);
        let root: Value = match serde_json::from_slice(bytes) {
            Ok(value) => value,
            Err(strict_err) => {
                let text = std::str::from_utf8(bytes)
                    .map_err(|e| ImportError::Json(format!("invalid UTF-8: {e}")))?;
                parse_lenient(text).map_err(|lenient_err| {
                    debug!(error = %lenient_err, "Lenient JSON parse failed");
                    ImportError::Json(strict_err.to_string())
                })?
            }
        };
        Ok(self.parse_value(&root))
    }

    /// Extract every table-like node from a parsed document.
    ///
    /// Nodes are visited depth-first with an explicit stack. Children are pushed in document
    /// order, so later siblings are visited first. When two tables share a normalized name
    /// the first one visited wins.
    pub fn parse_value(&self, root: &Value) -> Vec<Table> {
        let mut tables = Vec::new();
        let mut seen = HashSet::new();
        let mut stack = vec![root];

        while let Some(node) = stack.pop() {
            match node {
                Value::Object(map) => {
                    if is_table_like(map) {
                        match self.parse_table(map) {
                            Ok(Some(table)) => {
                                if seen.insert(table.key()) {
                                    tables.push(table);
                                } else {
                                    debug!(table = %table.name, "Duplicate symbol table ignored");
                                }
                            }
                            Ok(None) => {}
                            Err(e) => warn!(error = %e, "Skipping symbol table"),
                        }
                    }
                    stack.extend(map.values().filter(|v| is_container(v)));
                }
                Value::Array(items) => {
                    stack.extend(items.iter().filter(|v| is_container(v)));
                }
                _ => {}
            }
        }

        tables
    }

    fn parse_table(&self, node: &Map<String, Value>) -> Result<Option<Table>, ImportError> {
        let Some(name) = get(node, "Name").and_then(non_blank_str) else {
            return Ok(None);
        };

        let number = match get(node, "Id") {
            None | Some(Value::Null) => String::new(),
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::String(s)) => s.trim().to_string(),
            Some(other) => {
                return Err(ImportError::MalformedTable {
                    table: name.to_string(),
                    reason: format!("unsupported Id value {other}"),
                });
            }
        };

        let mut table = Table::new(number, name);

        let fields = get(node, "Fields")
            .and_then(Value::as_array)
            .or_else(|| get(node, "Members").and_then(Value::as_array));
        for field in fields.into_iter().flatten() {
            let Some(field) = field.as_object() else {
                continue;
            };
            let Some(column) = self.parse_field(field) else {
                continue;
            };
            if table.has_column(&column.name) {
                debug!(table = %table.name, field = %column.name, "Duplicate symbol field ignored");
                continue;
            }
            if let Some(relation) = column.relation_target.as_deref() {
                table
                    .foreign_keys
                    .push(ForeignKey::new(column.name.clone(), relation_table(relation)));
            }
            table.columns.push(column);
        }

        table.primary_keys = primary_key(node);
        Ok(Some(table))
    }

    fn parse_field(&self, field: &Map<String, Value>) -> Option<Column> {
        let name = get(field, "Name").and_then(non_blank_str)?;
        let mut column = Column::new(name);

        let (source_type, sql_type) = self.field_type(field);
        column.source_type = source_type;
        column.sql_type = Some(sql_type);

        column.relation_target = field_relation(field).filter(|r| is_real_relation(r));
        Some(column)
    }

    /// Canonical AL type token and its SQL type (the `text` placeholder when unknown).
    fn field_type(&self, field: &Map<String, Value>) -> (Option<String>, String) {
        let type_value = FIELD_TYPE_KEYS.iter().find_map(|k| get(field, k));

        let (type_name, type_sizing) = match type_value {
            Some(Value::Object(obj)) => (
                TYPE_NAME_KEYS
                    .iter()
                    .find_map(|k| get(obj, k).and_then(non_blank_str)),
                Sizing::read(obj),
            ),
            Some(Value::String(s)) if !s.trim().is_empty() => (Some(s.trim()), Sizing::default()),
            _ => (None, Sizing::default()),
        };
        let sizing = Sizing::read(field).or(type_sizing);

        let source = match type_name {
            Some(name) => canonical_token(name, &sizing),
            None => match (&sizing.length, &sizing.precision, &sizing.scale) {
                (Some(len), _, _) => format!("Text[{len}]"),
                (None, Some(p), Some(s)) => format!("Decimal[{p},{s}]"),
                _ => return (None, UNRESOLVED_SQL_TYPE.to_string()),
            },
        };

        let sql = self
            .resolver
            .resolve_source_type(&source)
            .unwrap_or_else(|| UNRESOLVED_SQL_TYPE.to_string());
        (Some(source), sql)
    }
}

fn parse_lenient(text: &str) -> Result<Value, serde_json_lenient::Error> {
    let mut de = serde_json_lenient::Deserializer::from_str(text);
    de.set_ignore_trailing_commas(true);
    de.set_allow_comments(true);
    let value = Value::deserialize(&mut de)?;
    de.end()?;
    Ok(value)
}

/// Size information gathered from a field or type node and its `Properties`
#[derive(Debug, Default, Clone)]
struct Sizing {
    length: Option<String>,
    precision: Option<String>,
    scale: Option<String>,
}

impl Sizing {
    fn read(node: &Map<String, Value>) -> Self {
        let lookup = |keys: &[&str]| {
            keys.iter()
                .find_map(|k| get(node, k).and_then(size_value))
                .or_else(|| keys.iter().find_map(|k| property(node, k).and_then(size_value)))
        };

        Self {
            length: lookup(LENGTH_KEYS),
            precision: lookup(PRECISION_KEYS),
            scale: lookup(SCALE_KEYS),
        }
    }

    /// Field-level values win, gaps are filled from `other`.
    fn or(self, other: Sizing) -> Sizing {
        Sizing {
            length: self.length.or(other.length),
            precision: self.precision.or(other.precision),
            scale: self.scale.or(other.scale),
        }
    }
}

/// Build an AL type token such as `Code[20]` from a type name and sizing.
fn canonical_token(type_name: &str, sizing: &Sizing) -> String {
    let Some(token) = TypeToken::parse(type_name) else {
        return type_name.to_string();
    };
    if !token.args.is_empty() {
        return type_name.to_string();
    }
    match token.keyword.as_str() {
        "code" => match &sizing.length {
            Some(len) => format!("Code[{len}]"),
            None => "Code".to_string(),
        },
        "text" => match &sizing.length {
            Some(len) => format!("Text[{len}]"),
            None => "Text".to_string(),
        },
        "decimal" => match (&sizing.precision, &sizing.scale) {
            (Some(p), Some(s)) => format!("Decimal[{p},{s}]"),
            (Some(p), None) => format!("Decimal[{p}]"),
            _ => "Decimal".to_string(),
        },
        _ => type_name.to_string(),
    }
}

fn field_relation(field: &Map<String, Value>) -> Option<String> {
    if let Some(Value::Object(relation)) = get(field, "Relation") {
        let table = ["Table", "TableName"]
            .iter()
            .find_map(|k| get(relation, k).and_then(non_blank_str));
        if let Some(table) = table {
            return Some(table.to_string());
        }
    }
    get(field, "TableRelation")
        .or_else(|| property(field, "TableRelation"))
        .and_then(non_blank_str)
        .map(str::to_string)
}

fn primary_key(node: &Map<String, Value>) -> Vec<String> {
    if let Some(Value::Object(pk)) = get(node, "PrimaryKey") {
        let fields = key_field_names(pk, &["KeyFields", "FieldNames", "Fields"]);
        if !fields.is_empty() {
            return fields;
        }
    }

    let Some(keys) = get(node, "Keys").and_then(Value::as_array) else {
        return Vec::new();
    };
    let keys: Vec<&Map<String, Value>> = keys.iter().filter_map(Value::as_object).collect();
    let chosen = keys
        .iter()
        .find(|k| get(k, "Clustered").is_some_and(is_true))
        .or_else(|| keys.first());

    chosen
        .map(|k| key_field_names(k, &["Fields", "FieldNames", "KeyFields"]))
        .unwrap_or_default()
}

fn key_field_names(key: &Map<String, Value>, list_keys: &[&str]) -> Vec<String> {
    let Some(items) = list_keys
        .iter()
        .find_map(|k| get(key, k).and_then(Value::as_array))
    else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => non_blank(s),
            Value::Object(obj) => get(obj, "Name").and_then(non_blank_str),
            _ => None,
        })
        .map(str::to_string)
        .collect()
}

fn is_table_like(node: &Map<String, Value>) -> bool {
    let tagged = TYPE_TAG_KEYS.iter().any(|k| {
        get(node, k)
            .and_then(Value::as_str)
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("table"))
    });
    tagged || get(node, "Fields").is_some_and(Value::is_array)
}

fn is_container(value: &Value) -> bool {
    matches!(value, Value::Object(_) | Value::Array(_))
}

fn is_true(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    }
}

/// Property lookup, exact key first, then case-insensitive.
fn get<'a>(node: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    node.get(key).or_else(|| {
        node.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    })
}

/// Entry of a `Properties` collection: `[{ "Name": .., "Value": .. }]` or a flat object.
fn property<'a>(node: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    match get(node, "Properties")? {
        Value::Array(items) => items.iter().filter_map(Value::as_object).find_map(|item| {
            get(item, "Name")
                .and_then(Value::as_str)
                .filter(|n| n.eq_ignore_ascii_case(name))
                .and_then(|_| get(item, "Value"))
        }),
        Value::Object(map) => get(map, name),
        _ => None,
    }
}

fn non_blank(s: &str) -> Option<&str> {
    let s = s.trim();
    (!s.is_empty()).then_some(s)
}

fn non_blank_str(value: &Value) -> Option<&str> {
    value.as_str().and_then(non_blank)
}

fn size_value(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => non_blank(s).map(str::to_string),
        _ => None,
    }
}
