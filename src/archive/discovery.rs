//! Discovery of symbol search roots, loose symbol files and packages

use glob::{MatchOptions, Pattern};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::warn;

const PACKAGE_CACHE_DIR: &str = ".alpackages";

fn options() -> MatchOptions {
    MatchOptions {
        case_sensitive: false,
        require_literal_separator: false,
        require_literal_leading_dot: false,
    }
}

/// Files below `base` whose relative path matches `pattern`, sorted by path.
fn glob_below(base: &Path, pattern: &str, want_dirs: bool) -> Vec<PathBuf> {
    let full_pattern = format!("{}/{}", Pattern::escape(&base.to_string_lossy()), pattern);

    let entries = match glob::glob_with(&full_pattern, options()) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(pattern = %full_pattern, error = %e, "Invalid search pattern");
            return Vec::new();
        }
    };

    let mut found: Vec<PathBuf> = entries
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("Error accessing path: {}", e);
                None
            }
        })
        .filter(|path| if want_dirs { path.is_dir() } else { path.is_file() })
        .collect();
    found.sort();
    found
}

/// Search roots for symbol metadata: the project root, its `.alpackages` directory and
/// every `.alpackages` directory below it. Duplicates are removed.
pub fn collect_search_roots(project_root: &Path) -> Vec<PathBuf> {
    let mut roots = vec![project_root.to_path_buf()];

    let direct = project_root.join(PACKAGE_CACHE_DIR);
    if direct.is_dir() {
        roots.push(direct);
    }
    roots.extend(glob_below(project_root, &format!("**/{PACKAGE_CACHE_DIR}"), true));

    let mut seen = HashSet::new();
    roots.retain(|root| {
        let key = std::fs::canonicalize(root)
            .unwrap_or_else(|_| root.clone())
            .to_string_lossy()
            .to_lowercase();
        seen.insert(key)
    });
    roots
}

/// Loose `SymbolReference.json` files anywhere below `root`, any casing.
pub fn find_loose_symbol_files(root: &Path) -> Vec<PathBuf> {
    // Literal glob components skip the case-insensitive match, so filter by name instead
    glob_below(root, "**/*.json", false)
        .into_iter()
        .filter(|path| {
            path.file_name()
                .is_some_and(|name| name.to_string_lossy().eq_ignore_ascii_case("SymbolReference.json"))
        })
        .collect()
}

/// `*.app` packages anywhere below `root`.
pub fn find_packages(root: &Path) -> Vec<PathBuf> {
    glob_below(root, "**/*.app", false)
}

/// AL source files anywhere below `root`.
pub fn find_source_files(root: &Path) -> Vec<PathBuf> {
    glob_below(root, "**/*.al", false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_search_roots_include_nested_package_dirs() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join(".alpackages")).unwrap();
        fs::create_dir_all(dir.path().join("app/sub/.alpackages")).unwrap();
        fs::create_dir_all(dir.path().join("other")).unwrap();

        let roots = collect_search_roots(dir.path());
        assert_eq!(roots.len(), 3);
        assert_eq!(roots[0], dir.path());
        assert!(roots.iter().any(|r| r.ends_with("app/sub/.alpackages")));
    }

    #[test]
    fn test_find_files_case_insensitively() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join(".alpackages/deep")).unwrap();
        fs::write(dir.path().join(".alpackages/Base.APP"), b"x").unwrap();
        fs::write(dir.path().join(".alpackages/deep/symbolreference.json"), b"{}").unwrap();
        fs::write(dir.path().join(".alpackages/deep/app.json"), b"{}").unwrap();
        fs::write(dir.path().join("Table.Al"), b"").unwrap();
        fs::write(dir.path().join("notes.txt"), b"").unwrap();

        assert_eq!(find_packages(dir.path()).len(), 1);
        assert_eq!(find_loose_symbol_files(dir.path()).len(), 1);
        assert_eq!(find_source_files(dir.path()).len(), 1);
    }
}
