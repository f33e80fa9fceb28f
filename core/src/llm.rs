//! LLM-assisted classification seam.
//!
//! The user-intent classifier can consult a configured endpoint for a
//! safe/destructive verdict over the user's last message. The transport
//! lives behind [`ClassifierClient`] so the classifier logic is testable
//! without a network; failures always degrade to the heuristic verdict.

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use std::time::Duration;
use ward_protocol::IntentVerdict;

/// The fixed output contract requested from the model.
const CLASSIFICATION_PROMPT: &str = r#"Classify the developer message below.
Respond with exactly one JSON object, no prose:
{"verdict": "safe" | "destructive", "reason": "<short>", "confidence": <0..1>}

"destructive" means the message asks to delete, remove, wipe, drop,
overwrite, or rename files or data. Everything else is "safe".

Message:
"#;

/// Parsed model response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmClassification {
    pub verdict: IntentVerdict,

    #[serde(default)]
    pub reason: Option<String>,

    #[serde(default)]
    pub confidence: Option<f64>,
}

/// One-shot classification transport.
#[async_trait]
pub trait ClassifierClient: Send + Sync {
    async fn classify_message(&self, message: &str) -> anyhow::Result<LlmClassification>;
}

/// Default request timeout for classification calls.
const CLASSIFY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct ClassifyRequest<'a> {
    model: &'a str,
    prompt: String,
}

/// HTTP transport: POSTs the contract prompt to a completion-style
/// endpoint and parses the JSON object out of the response body.
pub struct HttpClassifier {
    endpoint: String,
    model: String,
    client: reqwest::Client,
}

impl HttpClassifier {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(CLASSIFY_TIMEOUT)
            .build()?;
        Ok(Self {
            endpoint: endpoint.into(),
            model: model.into(),
            client,
        })
    }
}

#[async_trait]
impl ClassifierClient for HttpClassifier {
    async fn classify_message(&self, message: &str) -> anyhow::Result<LlmClassification> {
        let request = ClassifyRequest {
            model: &self.model,
            prompt: format!("{CLASSIFICATION_PROMPT}{message}"),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await?
            .error_for_status()?;

        let body = response.text().await?;
        parse_classification(&body)
    }
}

/// Extract the first JSON object from a possibly chatty response body.
pub fn parse_classification(body: &str) -> anyhow::Result<LlmClassification> {
    let start = body
        .find('{')
        .ok_or_else(|| anyhow::anyhow!("no JSON object in classifier response"))?;
    let end = body
        .rfind('}')
        .ok_or_else(|| anyhow::anyhow!("unterminated JSON object in classifier response"))?;

    let mut parsed: LlmClassification = serde_json::from_str(&body[start..=end])?;
    if let Some(confidence) = parsed.confidence {
        parsed.confidence = Some(confidence.clamp(0.0, 1.0));
    }
    Ok(parsed)
}
