//! `.intentignore` parsing.
//!
//! One intent id per line; lines starting with `#` are comments. An
//! intent listed here bypasses all gate checks for the session that
//! selected it.

use std::path::Path;

/// Parse the ignore file into a list of intent ids.
pub fn ignored_intents(path: &Path) -> Vec<String> {
    let Ok(content) = std::fs::read_to_string(path) else {
        return Vec::new();
    };

    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// True if the given intent id is listed.
pub fn is_intent_ignored(path: &Path, intent_id: &str) -> bool {
    ignored_intents(path).iter().any(|id| id == intent_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ids_and_strips_comments() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".intentignore");
        std::fs::write(&path, "# exempt migrations\nINT-7\n\n  INT-9  \n#INT-11\n").unwrap();

        assert_eq!(ignored_intents(&path), vec!["INT-7", "INT-9"]);
        assert!(is_intent_ignored(&path, "INT-7"));
        assert!(!is_intent_ignored(&path, "INT-11"));
    }

    #[test]
    fn missing_file_ignores_nothing() {
        assert!(!is_intent_ignored(Path::new("/nonexistent/.intentignore"), "INT-1"));
    }
}
