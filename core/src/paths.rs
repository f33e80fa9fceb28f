//! The one path normalizer.
//!
//! Scope matching, stale-block lookup, and snapshot lookup must all
//! agree on a single normalized form: POSIX separators, relative to the
//! session working directory, leading `./` stripped. Lookups that may
//! have stored a path before normalization existed also try a small set
//! of candidate spellings.

use std::path::Path;

/// Normalize a raw path string to the canonical form used as a map key
/// and for scope matching.
///
/// - backslashes become forward slashes;
/// - a prefix equal to `cwd` is stripped (making the path relative);
/// - a leading `./` is stripped;
/// - duplicate separators collapse.
pub fn normalize(raw: &str, cwd: &Path) -> String {
    let mut s = raw.replace('\\', "/");

    let cwd_posix = cwd.to_string_lossy().replace('\\', "/");
    if !cwd_posix.is_empty() {
        if let Some(rest) = s.strip_prefix(&cwd_posix) {
            s = rest.trim_start_matches('/').to_string();
        }
    }

    while let Some(rest) = s.strip_prefix("./") {
        s = rest.to_string();
    }

    // Collapse `//` runs left over from concatenation.
    while s.contains("//") {
        s = s.replace("//", "/");
    }

    s.trim_end_matches('/').to_string()
}

/// Candidate spellings for tolerant lookup of a path that may have been
/// recorded unnormalized: the canonical form, the raw input, a
/// `./`-prefixed variant, and the forward-slash form of the raw input.
pub fn candidates(raw: &str, cwd: &Path) -> Vec<String> {
    let norm = normalize(raw, cwd);
    let mut out = vec![norm.clone()];

    for candidate in [
        raw.to_string(),
        raw.replace('\\', "/"),
        format!("./{norm}"),
    ] {
        if !out.contains(&candidate) {
            out.push(candidate);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn cwd() -> PathBuf {
        PathBuf::from("/work/project")
    }

    #[test]
    fn strips_cwd_and_dot_prefix() {
        assert_eq!(normalize("/work/project/src/a.ts", &cwd()), "src/a.ts");
        assert_eq!(normalize("./src/a.ts", &cwd()), "src/a.ts");
        assert_eq!(normalize("src/a.ts", &cwd()), "src/a.ts");
    }

    #[test]
    fn converts_backslashes() {
        assert_eq!(normalize(".\\src\\a.ts", &cwd()), "src/a.ts");
        assert_eq!(normalize("src\\sub\\a.ts", &cwd()), "src/sub/a.ts");
    }

    #[test]
    fn collapses_duplicate_separators() {
        assert_eq!(normalize("src//a.ts", &cwd()), "src/a.ts");
    }

    #[test]
    fn candidates_cover_raw_forms() {
        let list = candidates(".\\src\\a.ts", &cwd());
        assert_eq!(list[0], "src/a.ts");
        assert!(list.contains(&".\\src\\a.ts".to_string()));
        assert!(list.contains(&"./src/a.ts".to_string()));
    }
}
