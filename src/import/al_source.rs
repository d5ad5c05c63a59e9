//! AL source parser for `table` and `tableextension` objects.
//!
//! Only the structural schema is extracted: object header, `fields` block and the first
//! key of the `keys` block. Triggers, procedures and every other property are ignored.

use super::{ImportError, is_real_relation, strip_bom};
use crate::models::{AlObject, Column, ForeignKey, Table, TableExtension};
use crate::naming::relation_table;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use tracing::debug;

static EXTENSION_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?is)\btableextension\s+(\d+)\s+(?:"([^"]+)"|([A-Za-z_][A-Za-z0-9_]*))\s+extends\s+(?:"([^"]+)"|([A-Za-z_][A-Za-z0-9_]*))"#,
    )
    .unwrap()
});

static TABLE_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)\btable\s+(\d+)\s+(?:"([^"]+)"|([A-Za-z_][A-Za-z0-9_]*))"#).unwrap()
});

static FIELDS_BLOCK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bfields\s*\{").unwrap());
static KEYS_BLOCK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bkeys\s*\{").unwrap());
static FIELD_START: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bfield\s*\(").unwrap());

static FIELD_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?is)^field\s*\(\s*\d+\s*;\s*(?:"([^"]+)"|([A-Za-z_][A-Za-z0-9_]*))\s*;\s*([^){]+)\)"#,
    )
    .unwrap()
});

static TABLE_RELATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bTableRelation\s*=\s*").unwrap());
static CONDITION_START: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^if\s*\(").unwrap());
static RELATION_TARGET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^(?:"[^"]+"|[A-Za-z_][A-Za-z0-9_]*)(?:\s*\.\s*(?:"[^"]+"|[A-Za-z_][A-Za-z0-9_]*))?"#,
    )
    .unwrap()
});

static KEY_START: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bkey\s*\(").unwrap());
static KEY_FIELD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""([^"]+)"|([A-Za-z_][A-Za-z0-9_]*)"#).unwrap());

/// Parser for AL source files
#[derive(Debug, Default, Clone)]
pub struct ALSourceParser;

impl ALSourceParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse one AL source file.
    ///
    /// # Returns
    ///
    /// `Ok(None)` when the file declares neither a table nor a table extension,
    /// `Err` when the object is structurally broken (unbalanced braces).
    ///
    /// # Example
    ///
    /// ```rust
    /// use al2sql::import::ALSourceParser;
    /// use al2sql::models::AlObject;
    ///
    /// let source = r#"table 50100 "Test" { fields { field(1;"No.";Code[20]) {} } keys { key(PK;"No.") {} } }"#;
    /// let Some(AlObject::Table(table)) = ALSourceParser::new().parse(source).unwrap() else {
    ///     panic!("expected a table");
    /// };
    /// assert_eq!(table.primary_keys, vec!["No."]);
    /// ```
    pub fn parse(&self, source: &str) -> Result<Option<AlObject>, ImportError> {
        let text = strip_comments(source);

        if let Some(caps) = EXTENSION_HEADER.captures(&text) {
            let number = caps[1].to_string();
            let name = first_group(&caps, 2, 3);
            let base = first_group(&caps, 4, 5);
            let mut extension = TableExtension::new(number, name, base);
            let (columns, foreign_keys) = parse_fields(&text)?;
            extension.columns = columns;
            extension.foreign_keys = foreign_keys;
            return Ok(Some(AlObject::TableExtension(extension)));
        }

        if let Some(caps) = TABLE_HEADER.captures(&text) {
            let number = caps[1].to_string();
            let name = first_group(&caps, 2, 3);
            let mut table = Table::new(number, name);
            let (columns, foreign_keys) = parse_fields(&text)?;
            table.columns = columns;
            table.foreign_keys = foreign_keys;
            table.primary_keys = parse_primary_key(&text)?;
            return Ok(Some(AlObject::Table(table)));
        }

        Ok(None)
    }

    /// Read and parse a file from disk. Invalid UTF-8 sequences are replaced.
    pub fn parse_file(&self, path: &Path) -> Result<Option<AlObject>, ImportError> {
        let bytes = std::fs::read(path).map_err(|source| ImportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let text = String::from_utf8_lossy(strip_bom(&bytes));
        self.parse(&text)
    }
}

/// Remove `//`, `/* */` and line-leading `--` comments. Literal contents are kept as is.
fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    let mut quote: Option<char> = None;
    let mut line_start = true;

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            out.push(c);
            if c == q {
                quote = None;
            }
            continue;
        }
        match (c, chars.peek().copied()) {
            ('\'' | '"', _) => {
                quote = Some(c);
                line_start = false;
                out.push(c);
            }
            ('/', Some('/')) => while chars.next_if(|&n| n != '\n').is_some() {},
            ('-', Some('-')) if line_start => while chars.next_if(|&n| n != '\n').is_some() {},
            ('/', Some('*')) => {
                chars.next();
                let mut prev = '\0';
                for n in chars.by_ref() {
                    if prev == '*' && n == '/' {
                        break;
                    }
                    prev = n;
                }
            }
            _ => {
                if c == '\n' {
                    line_start = true;
                } else if !c.is_whitespace() {
                    line_start = false;
                }
                out.push(c);
            }
        }
    }
    out
}

fn first_group(caps: &regex::Captures<'_>, quoted: usize, bare: usize) -> String {
    caps.get(quoted)
        .or_else(|| caps.get(bare))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

/// Per-byte brace depth, `None` inside string literals.
///
/// AL uses `'...'` for text literals and `"..."` for quoted identifiers; braces inside
/// either do not count.
fn depth_map(text: &str) -> Vec<Option<u32>> {
    let mut depths = Vec::with_capacity(text.len());
    let mut depth = 0u32;
    let mut quote: Option<u8> = None;

    for &b in text.as_bytes() {
        match quote {
            Some(q) => {
                depths.push(None);
                if b == q {
                    quote = None;
                }
            }
            None => {
                match b {
                    b'\'' | b'"' => {
                        quote = Some(b);
                        depths.push(None);
                        continue;
                    }
                    b'}' => depth = depth.saturating_sub(1),
                    _ => {}
                }
                depths.push(Some(depth));
                if b == b'{' {
                    depth += 1;
                }
            }
        }
    }
    depths
}

/// Given the byte offset of an opening `{`, return the offset of its matching `}`.
fn matching_brace(text: &str, open: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0u32;
    let mut quote: Option<u8> = None;

    for (i, &b) in bytes.iter().enumerate().skip(open) {
        if let Some(q) = quote {
            if b == q {
                quote = None;
            }
            continue;
        }
        match b {
            b'\'' | b'"' => quote = Some(b),
            b'{' => depth += 1,
            b'}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Inner text of the first `<keyword> { ... }` block.
fn find_block<'a>(
    text: &'a str,
    keyword: &Regex,
    block: &'static str,
) -> Result<Option<&'a str>, ImportError> {
    let Some(m) = keyword.find(text) else {
        return Ok(None);
    };
    let open = m.end() - 1;
    let close = matching_brace(text, open).ok_or(ImportError::UnbalancedBlock { block })?;
    Ok(Some(&text[open + 1..close]))
}

fn parse_fields(text: &str) -> Result<(Vec<Column>, Vec<ForeignKey>), ImportError> {
    let Some(block) = find_block(text, &FIELDS_BLOCK, "fields")? else {
        return Ok((Vec::new(), Vec::new()));
    };

    let depths = depth_map(block);
    let starts: Vec<usize> = FIELD_START
        .find_iter(block)
        .map(|m| m.start())
        .filter(|&start| depths.get(start).copied().flatten() == Some(0))
        .collect();

    let mut columns: Vec<Column> = Vec::new();
    let mut foreign_keys = Vec::new();

    for (i, &start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(block.len());
        let chunk = &block[start..end];

        let Some(caps) = FIELD_HEADER.captures(chunk) else {
            debug!(chunk = %chunk.lines().next().unwrap_or_default(), "Skipping unparsable field declaration");
            continue;
        };
        let name = first_group(&caps, 1, 2);
        let source_type = caps[3].trim().to_string();
        let header_end = caps.get(0).map_or(0, |m| m.end());

        let relation = property_block(chunk, header_end)?.and_then(table_relation);

        let mut column = Column::new(name.clone()).with_source_type(source_type);
        if columns.iter().any(|c| c.key() == column.key()) {
            debug!(field = %column.name, "Duplicate field name, keeping the first declaration");
            continue;
        }
        if let Some(relation) = relation.filter(|r| is_real_relation(r)) {
            foreign_keys.push(ForeignKey::new(name, relation_table(&relation)));
            column.relation_target = Some(relation);
        }
        columns.push(column);
    }

    Ok((columns, foreign_keys))
}

/// Property block following a field header, if any.
fn property_block(chunk: &str, header_end: usize) -> Result<Option<&str>, ImportError> {
    let rest = &chunk[header_end..];
    let Some(offset) = rest.find('{') else {
        return Ok(None);
    };
    // Anything other than whitespace before the brace belongs to a later declaration
    if !rest[..offset].trim().is_empty() {
        return Ok(None);
    }
    let open = header_end + offset;
    let close =
        matching_brace(chunk, open).ok_or(ImportError::UnbalancedBlock { block: "field" })?;
    Ok(Some(&chunk[open + 1..close]))
}

/// Raw target of a `TableRelation` property, e.g. `Customer` or `"Sales Header"."No."`.
///
/// For conditional relations the first branch's target is used.
fn table_relation(properties: &str) -> Option<String> {
    let m = TABLE_RELATION.find(properties)?;
    let mut rest = properties[m.end()..].trim_start();

    if let Some(cond) = CONDITION_START.find(rest) {
        let close = matching_paren(rest, cond.end() - 1)?;
        rest = rest[close + 1..].trim_start();
    }

    RELATION_TARGET
        .find(rest)
        .map(|t| t.as_str().trim().to_string())
}

fn matching_paren(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0u32;
    let mut quote: Option<u8> = None;
    for (i, &b) in text.as_bytes().iter().enumerate().skip(open) {
        if let Some(q) = quote {
            if b == q {
                quote = None;
            }
            continue;
        }
        match b {
            b'\'' | b'"' => quote = Some(b),
            b'(' => depth += 1,
            b')' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn parse_primary_key(text: &str) -> Result<Vec<String>, ImportError> {
    let Some(block) = find_block(text, &KEYS_BLOCK, "keys")? else {
        return Ok(Vec::new());
    };
    let Some(m) = KEY_START.find(block) else {
        return Ok(Vec::new());
    };
    let open = m.end() - 1;
    let Some(close) = matching_paren(block, open) else {
        return Ok(Vec::new());
    };
    // key(<name>; <field>, <field>, ...)
    let Some((_, fields)) = block[open + 1..close].split_once(';') else {
        return Ok(Vec::new());
    };
    Ok(KEY_FIELD
        .captures_iter(fields)
        .filter_map(|c| c.get(1).or_else(|| c.get(2)))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect())
}
