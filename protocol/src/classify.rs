//! User-message classification records.

use serde::Deserialize;
use serde::Serialize;

/// Safe/destructive verdict over the user's most recent message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentVerdict {
    Safe,
    Destructive,
    Unknown,
}

impl IntentVerdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentVerdict::Safe => "safe",
            IntentVerdict::Destructive => "destructive",
            IntentVerdict::Unknown => "unknown",
        }
    }
}

/// Where a verdict came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassificationSource {
    /// Produced by the configured LLM endpoint.
    Llm,
    /// Produced by the keyword heuristic.
    Heuristic,
    /// LLM was configured but failed; heuristic verdict substituted.
    Fallback,
    /// No message was available to classify.
    None,
}

/// Cached classification of one user message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserIntentClassification {
    pub verdict: IntentVerdict,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Confidence in `[0, 1]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,

    pub source: ClassificationSource,

    /// SHA-256 (hex) of the originating user message; the cache key.
    pub message_hash: String,
}

impl UserIntentClassification {
    pub fn is_destructive(&self) -> bool {
        self.verdict == IntentVerdict::Destructive
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_forms_are_lowercase() {
        let c = UserIntentClassification {
            verdict: IntentVerdict::Destructive,
            reason: Some("mentions deleting files".to_string()),
            confidence: Some(0.9),
            source: ClassificationSource::Llm,
            message_hash: "ab".repeat(32),
        };
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["verdict"], "destructive");
        assert_eq!(json["source"], "llm");
        assert!(c.is_destructive());
    }
}
