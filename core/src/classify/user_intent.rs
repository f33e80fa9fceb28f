//! User-message intent classification.
//!
//! Before a non-destructive tool touches the workspace, the gate asks:
//! did the user's last message ask for something destructive? A keyword
//! heuristic always runs; a configured LLM endpoint can refine it. The
//! LLM can only escalate with evidence: if it says destructive while the
//! heuristic found no destructive keyword at all, the heuristic's safe
//! verdict wins (routine edit requests must not trip the gate).

use ward_protocol::ClassificationSource;
use ward_protocol::IntentVerdict;
use ward_protocol::UserIntentClassification;

use crate::llm::ClassifierClient;
use crate::sha256_hex;

/// Heuristic confidence. Deliberately low; the keyword pass is a coarse
/// signal.
const HEURISTIC_CONFIDENCE: f64 = 0.4;

const DESTRUCTIVE_KEYWORDS: &[&str] = &[
    "delete", "remove", "wipe", "drop", "overwrite", "rename", "erase", "destroy", "purge",
    "uninstall", "rm -",
];

const SAFE_KEYWORDS: &[&str] = &[
    "read", "list", "view", "show", "explain", "inspect", "create", "add", "edit", "refactor",
    "implement", "fix", "update", "write", "document", "test",
];

fn contains_keyword<'a>(message: &str, keywords: &[&'a str]) -> Option<&'a str> {
    keywords.iter().find(|k| message.contains(*k)).copied()
}

/// The keyword pass on its own.
pub fn heuristic_verdict(message: &str) -> (IntentVerdict, Option<String>) {
    let lowered = message.to_lowercase();

    if let Some(keyword) = contains_keyword(&lowered, DESTRUCTIVE_KEYWORDS) {
        return (
            IntentVerdict::Destructive,
            Some(format!("message mentions '{keyword}'")),
        );
    }
    if let Some(keyword) = contains_keyword(&lowered, SAFE_KEYWORDS) {
        return (
            IntentVerdict::Safe,
            Some(format!("message mentions '{keyword}'")),
        );
    }
    (IntentVerdict::Unknown, None)
}

/// Classify the user's most recent message.
///
/// `client` is the optional LLM endpoint; any failure there degrades to
/// the heuristic verdict.
pub async fn classify_user_message(
    message: Option<&str>,
    client: Option<&dyn ClassifierClient>,
) -> UserIntentClassification {
    let Some(message) = message.filter(|m| !m.trim().is_empty()) else {
        return UserIntentClassification {
            verdict: IntentVerdict::Unknown,
            reason: None,
            confidence: None,
            source: ClassificationSource::None,
            message_hash: String::new(),
        };
    };

    let message_hash = sha256_hex(message.as_bytes());
    let (heuristic, heuristic_reason) = heuristic_verdict(message);

    let Some(client) = client else {
        return UserIntentClassification {
            verdict: heuristic,
            reason: heuristic_reason,
            confidence: Some(HEURISTIC_CONFIDENCE),
            source: ClassificationSource::Heuristic,
            message_hash,
        };
    };

    match client.classify_message(message).await {
        Ok(llm) => {
            // Safety override: an LLM "destructive" without any
            // destructive keyword in the message downgrades to the
            // heuristic's safe verdict.
            let no_destructive_keyword =
                contains_keyword(&message.to_lowercase(), DESTRUCTIVE_KEYWORDS).is_none();
            if llm.verdict == IntentVerdict::Destructive
                && heuristic == IntentVerdict::Safe
                && no_destructive_keyword
            {
                tracing::debug!(
                    "LLM over-classified a routine message as destructive; keeping heuristic verdict"
                );
                return UserIntentClassification {
                    verdict: IntentVerdict::Safe,
                    reason: heuristic_reason,
                    confidence: Some(HEURISTIC_CONFIDENCE),
                    source: ClassificationSource::Heuristic,
                    message_hash,
                };
            }

            UserIntentClassification {
                verdict: llm.verdict,
                reason: llm.reason,
                confidence: llm.confidence.map(|c| c.clamp(0.0, 1.0)),
                source: ClassificationSource::Llm,
                message_hash,
            }
        }
        Err(err) => {
            tracing::warn!(error = %err, "LLM classification failed; using heuristic");
            UserIntentClassification {
                verdict: heuristic,
                reason: heuristic_reason,
                confidence: Some(HEURISTIC_CONFIDENCE),
                source: ClassificationSource::Fallback,
                message_hash,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmClassification;
    use async_trait::async_trait;

    struct FixedClient {
        response: anyhow::Result<LlmClassification>,
    }

    #[async_trait]
    impl ClassifierClient for FixedClient {
        async fn classify_message(&self, _message: &str) -> anyhow::Result<LlmClassification> {
            match &self.response {
                Ok(c) => Ok(c.clone()),
                Err(e) => Err(anyhow::anyhow!(e.to_string())),
            }
        }
    }

    #[test]
    fn heuristic_keywords() {
        assert_eq!(
            heuristic_verdict("please delete the old config").0,
            IntentVerdict::Destructive
        );
        assert_eq!(
            heuristic_verdict("refactor the session module").0,
            IntentVerdict::Safe
        );
        assert_eq!(heuristic_verdict("hmm").0, IntentVerdict::Unknown);
    }

    #[tokio::test]
    async fn no_client_uses_heuristic() {
        let c = classify_user_message(Some("list the files"), None).await;
        assert_eq!(c.verdict, IntentVerdict::Safe);
        assert_eq!(c.source, ClassificationSource::Heuristic);
        assert_eq!(c.confidence, Some(0.4));
        assert_eq!(c.message_hash.len(), 64);
    }

    #[tokio::test]
    async fn empty_message_is_unknown() {
        let c = classify_user_message(None, None).await;
        assert_eq!(c.verdict, IntentVerdict::Unknown);
        assert_eq!(c.source, ClassificationSource::None);
    }

    #[tokio::test]
    async fn llm_verdict_wins_when_it_has_evidence() {
        let client = FixedClient {
            response: Ok(LlmClassification {
                verdict: IntentVerdict::Destructive,
                reason: Some("asks to wipe data".to_string()),
                confidence: Some(0.9),
            }),
        };
        let c =
            classify_user_message(Some("wipe the cache directory"), Some(&client)).await;
        assert_eq!(c.verdict, IntentVerdict::Destructive);
        assert_eq!(c.source, ClassificationSource::Llm);
    }

    #[tokio::test]
    async fn llm_overclassification_is_downgraded() {
        let client = FixedClient {
            response: Ok(LlmClassification {
                verdict: IntentVerdict::Destructive,
                reason: Some("sounds risky".to_string()),
                confidence: Some(0.95),
            }),
        };
        // Routine edit, no destructive keyword anywhere.
        let c = classify_user_message(Some("edit the readme wording"), Some(&client)).await;
        assert_eq!(c.verdict, IntentVerdict::Safe);
        assert_eq!(c.source, ClassificationSource::Heuristic);
    }

    #[tokio::test]
    async fn llm_failure_degrades_to_heuristic_fallback() {
        let client = FixedClient {
            response: Err(anyhow::anyhow!("timeout")),
        };
        let c = classify_user_message(Some("remove the feature flag"), Some(&client)).await;
        assert_eq!(c.verdict, IntentVerdict::Destructive);
        assert_eq!(c.source, ClassificationSource::Fallback);
    }
}
