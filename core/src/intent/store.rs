//! Loading the intent registry.
//!
//! `active_intents.yaml` is authored outside the middleware and read
//! fresh on every selection; there is no caching layer to invalidate.

use std::path::Path;

use thiserror::Error;
use ward_protocol::IntentsFile;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("intents file {path} is unreadable: {source}")]
    Unreadable {
        path: String,
        source: std::io::Error,
    },

    #[error("intents file {path} is unparseable: {message}")]
    Unparseable { path: String, message: String },
}

/// Read and parse the registry. A missing file is an empty registry
/// only in the sense that selection will fail with "unknown id";
/// unreadability is surfaced distinctly so the model can tell the
/// difference.
pub fn load_intents(path: &Path) -> Result<IntentsFile, StoreError> {
    let content = std::fs::read_to_string(path).map_err(|source| StoreError::Unreadable {
        path: path.display().to_string(),
        source,
    })?;

    serde_yaml::from_str(&content).map_err(|err| StoreError::Unparseable {
        path: path.display().to_string(),
        message: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ward_protocol::IntentStatus;

    const SAMPLE: &str = r#"
active_intents:
  - id: INT-1
    name: Harden the session layer
    status: IN_PROGRESS
    owned_scope:
      - src
      - "tests/**/*.rs"
    constraints:
      - Keep the public API stable
    acceptance_criteria:
      - All session tests pass
  - id: INT-2
    name: Old migration
    status: DONE
"#;

    #[test]
    fn parses_the_registry_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("active_intents.yaml");
        std::fs::write(&path, SAMPLE).unwrap();

        let file = load_intents(&path).unwrap();
        assert_eq!(file.active_intents.len(), 2);

        let intent = file.find("INT-1").unwrap();
        assert_eq!(intent.status, IntentStatus::InProgress);
        assert_eq!(intent.owned_scope, vec!["src", "tests/**/*.rs"]);
        assert_eq!(intent.constraints.len(), 1);

        assert_eq!(file.find("INT-2").unwrap().status, IntentStatus::Done);
    }

    #[test]
    fn missing_file_is_unreadable() {
        let err = load_intents(Path::new("/nonexistent/active_intents.yaml")).unwrap_err();
        assert!(matches!(err, StoreError::Unreadable { .. }));
    }

    #[test]
    fn bad_yaml_is_unparseable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("active_intents.yaml");
        std::fs::write(&path, "active_intents: [ {id: ").unwrap();

        let err = load_intents(&path).unwrap_err();
        assert!(matches!(err, StoreError::Unparseable { .. }));
    }
}
