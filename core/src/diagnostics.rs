//! Structured debug events.
//!
//! Mirrors interesting middleware decisions (vetoes, approvals,
//! classifier branches, lock failures) into `agent-diagnostics.jsonl`.
//! Best-effort by design: a diagnostics write failure is logged and
//! dropped, never surfaced.

use std::path::PathBuf;

use chrono::SecondsFormat;
use chrono::Utc;
use serde_json::Value;
use serde_json::json;

/// Sink for diagnostics events.
#[derive(Debug, Clone)]
pub struct DiagnosticsSink {
    path: PathBuf,
    enabled: bool,
}

impl DiagnosticsSink {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            enabled: true,
        }
    }

    /// A sink that drops everything.
    pub fn disabled() -> Self {
        Self {
            path: PathBuf::new(),
            enabled: false,
        }
    }

    /// Emit one event. `fields` should be a JSON object.
    pub async fn emit(&self, event: &str, fields: Value) {
        if !self.enabled {
            return;
        }

        let record = json!({
            "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            "event": event,
            "fields": fields,
        });

        if let Err(err) = ward_utils_lockfile::append_jsonl(&self.path, &record).await {
            tracing::debug!(event, error = %err, "failed to append diagnostics event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn emits_one_line_per_event() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agent-diagnostics.jsonl");
        let sink = DiagnosticsSink::new(path.clone());

        sink.emit("gate_veto", json!({"code": "REQ-001"})).await;
        sink.emit("command_classified", json!({"class": "safe"})).await;

        let lines: Vec<Value> = ward_utils_lockfile::read_jsonl_tolerant(&path);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "gate_veto");
        assert_eq!(lines[0]["fields"]["code"], "REQ-001");
    }

    #[tokio::test]
    async fn disabled_sink_writes_nothing() {
        let sink = DiagnosticsSink::disabled();
        sink.emit("noop", json!({})).await;
    }
}
