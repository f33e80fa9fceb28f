//! Owned-scope matching.
//!
//! A scope entry containing glob metacharacters (`*`, `?`, `[`, `]`) is
//! matched as a gitignore-style pattern; any other entry is a literal
//! prefix, where "prefix" means exact or separator-prefixed: `src`
//! owns `src/foo.ts` but not `srctool.ts`.

use globset::Glob;
use globset::GlobSetBuilder;

/// True if the entry should be treated as a glob pattern.
pub fn has_glob_meta(entry: &str) -> bool {
    entry.contains(['*', '?', '[', ']'])
}

/// Match one normalized path against one normalized scope entry.
pub fn entry_matches(entry: &str, path: &str) -> bool {
    if has_glob_meta(entry) {
        let mut builder = GlobSetBuilder::new();
        match Glob::new(entry) {
            Ok(glob) => {
                builder.add(glob);
            }
            Err(err) => {
                tracing::warn!(pattern = entry, error = %err, "invalid scope pattern");
                return false;
            }
        }
        match builder.build() {
            Ok(set) => set.is_match(path),
            Err(err) => {
                tracing::warn!(pattern = entry, error = %err, "invalid scope pattern");
                false
            }
        }
    } else {
        let entry = entry.trim_end_matches('/');
        path == entry || path.starts_with(&format!("{entry}/"))
    }
}

/// Match a normalized path against the ordered scope list.
pub fn path_in_scope(path: &str, scope: &[String]) -> bool {
    scope.iter().any(|entry| entry_matches(entry, path))
}
