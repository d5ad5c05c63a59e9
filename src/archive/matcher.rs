//! Selection of symbol entries inside a package

const SYMBOL_SUFFIXES: &[&str] = &[".json", ".json.gz", ".json.br"];
const AGGRESSIVE_HINTS: &[&str] = &["symbol", "reference", "metadata", "objects"];

/// Decides which package entries hold symbol documents
#[derive(Debug, Clone)]
pub struct EntryMatcher {
    /// Fall back to JSON entries whose path hints at metadata
    pub aggressive: bool,
    /// Maximum entries taken by the fallback
    pub aggressive_limit: usize,
}

impl Default for EntryMatcher {
    fn default() -> Self {
        Self {
            aggressive: true,
            aggressive_limit: 10,
        }
    }
}

impl EntryMatcher {
    pub fn new(aggressive: bool, aggressive_limit: usize) -> Self {
        Self {
            aggressive,
            aggressive_limit,
        }
    }

    /// `SymbolReference.json`, optionally gzip or brotli compressed, anywhere in the package.
    pub fn is_symbol_entry(name: &str) -> bool {
        let lower = name.to_lowercase();
        lower.contains("symbolreference") && has_json_suffix(&lower)
    }

    fn is_fallback_entry(name: &str) -> bool {
        let lower = name.to_lowercase();
        has_json_suffix(&lower) && AGGRESSIVE_HINTS.iter().any(|hint| lower.contains(hint))
    }

    /// Pick entries to extract, preserving their order.
    ///
    /// Symbol reference entries win; only when there are none does the aggressive
    /// fallback apply.
    pub fn select<I, S>(&self, names: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names: Vec<String> = names
            .into_iter()
            .map(|n| n.as_ref().to_string())
            .filter(|n| !n.ends_with('/') && !n.ends_with('\\'))
            .collect();

        let primary: Vec<String> = names
            .iter()
            .filter(|n| Self::is_symbol_entry(n))
            .cloned()
            .collect();
        if !primary.is_empty() || !self.aggressive {
            return primary;
        }

        names
            .into_iter()
            .filter(|n| Self::is_fallback_entry(n))
            .take(self.aggressive_limit)
            .collect()
    }

    /// Whether an entry could be selected at all; used to skip reading other entries.
    pub fn is_candidate(&self, name: &str) -> bool {
        Self::is_symbol_entry(name) || (self.aggressive && Self::is_fallback_entry(name))
    }
}

fn has_json_suffix(lower: &str) -> bool {
    SYMBOL_SUFFIXES.iter().any(|suffix| lower.ends_with(suffix))
}
