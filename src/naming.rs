//! Identifier normalization shared by the parsers, the flattener and the SQL emitter.
//!
//! AL display names such as `"Sell-to Customer No."` become SQL-safe identifiers by
//! removing `.` characters and camel-casing on space boundaries
//! (`Sell-toCustomerNo`). Every other character is left untouched.

/// Maximum identifier length accepted by MySQL.
pub const MAX_IDENTIFIER_LEN: usize = 64;

/// Normalize a raw display name into an SQL identifier.
///
/// The first word keeps its casing, every following word gets an upper-cased first
/// character. The function is idempotent.
///
/// # Example
///
/// ```rust
/// use al2sql::naming::normalize_identifier;
///
/// assert_eq!(normalize_identifier("No."), "No");
/// assert_eq!(normalize_identifier("Sell-to Customer No."), "Sell-toCustomerNo");
/// ```
pub fn normalize_identifier(raw: &str) -> String {
    if raw.trim().is_empty() {
        return raw.to_string();
    }

    let stripped = raw.replace('.', "");
    let mut words = stripped.split(' ').filter(|w| !w.is_empty());

    let Some(first) = words.next() else {
        return stripped;
    };

    let mut out = String::with_capacity(stripped.len());
    out.push_str(first);
    for word in words {
        let mut chars = word.chars();
        if let Some(c) = chars.next() {
            out.extend(c.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}

/// Case-insensitive identity key used to match tables and columns by name.
pub fn identity_key(raw: &str) -> String {
    normalize_identifier(raw).to_lowercase()
}

/// Whether two raw names refer to the same table or column.
pub fn names_match(a: &str, b: &str) -> bool {
    identity_key(a) == identity_key(b)
}

/// Truncate an identifier to at most `max_len` characters.
pub fn truncate_identifier(identifier: &str, max_len: usize) -> String {
    identifier.chars().take(max_len).collect()
}

/// Whether a name already carries the vendor prefix (case-insensitive).
pub fn has_prefix(name: &str, prefix: &str) -> bool {
    name.len() >= prefix.len()
        && name
            .get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

/// Prepend `prefix` unless `name` already starts with it.
pub fn apply_prefix(name: &str, prefix: &str) -> String {
    if has_prefix(name, prefix) {
        name.to_string()
    } else {
        format!("{prefix}{name}")
    }
}

/// Extract the referenced table from a relation value.
///
/// A quoted value is the table name verbatim (`"Sales Header"`). An unquoted,
/// qualified value such as `Customer."No."` is split at the first `.`.
pub fn relation_table(relation: &str) -> String {
    let trimmed = relation.trim();
    if let Some(rest) = trimmed.strip_prefix('"')
        && let Some(end) = rest.find('"')
    {
        return rest[..end].to_string();
    }

    match trimmed.split_once('.') {
        Some((table, _)) => table.trim().trim_matches('"').to_string(),
        None => trimmed.trim_matches('"').to_string(),
    }
}
