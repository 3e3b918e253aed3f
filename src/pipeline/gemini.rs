use std::io::{BufRead, BufReader};

use serde::{Deserialize, Serialize};

use super::types::GenerativeClient;
use super::ClassificationError;

/// Generation settings held constant for an entire run.
pub const TEMPERATURE: f64 = 0.2;
pub const TOP_P: f64 = 0.95;
pub const MAX_OUTPUT_TOKENS: u32 = 8192;

/// Harm categories blocked at medium severity and above on every request.
const SAFETY_CATEGORIES: &[&str] = &[
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_HARASSMENT",
];
const SAFETY_THRESHOLD: &str = "BLOCK_MEDIUM_AND_ABOVE";

/// Gemini HTTP client for the streaming generateContent endpoint.
///
/// The response arrives as server-sent events; the client concatenates every
/// candidate text part into one blob. No retries, no timeout beyond the
/// request timeout it is constructed with.
pub struct GeminiClient {
    base_url: String,
    model: String,
    api_key: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl GeminiClient {
    pub fn new(base_url: &str, model: &str, api_key: &str, timeout_secs: u64) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
            client,
            timeout_secs,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse&key={}",
            self.base_url, self.model, self.api_key
        )
    }
}

// ── Wire types for generateContent ──────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    system_instruction: Content<'a>,
    generation_config: GenerationConfig,
    safety_settings: Vec<SafetySetting<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f64,
    top_p: f64,
    max_output_tokens: u32,
}

#[derive(Serialize)]
struct SafetySetting<'a> {
    category: &'a str,
    threshold: &'a str,
}

/// One SSE frame of a streaming response.
#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    candidates: Vec<StreamCandidate>,
}

#[derive(Deserialize)]
struct StreamCandidate {
    #[serde(default)]
    content: Option<StreamContent>,
}

#[derive(Deserialize)]
struct StreamContent {
    #[serde(default)]
    parts: Vec<StreamPart>,
}

#[derive(Deserialize)]
struct StreamPart {
    #[serde(default)]
    text: String,
}

impl GenerativeClient for GeminiClient {
    fn generate(&self, prompt: &str, system: &str) -> Result<String, ClassificationError> {
        let body = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text: prompt }],
            }],
            system_instruction: Content {
                role: None,
                parts: vec![Part { text: system }],
            },
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                top_p: TOP_P,
                max_output_tokens: MAX_OUTPUT_TOKENS,
            },
            safety_settings: SAFETY_CATEGORIES
                .iter()
                .map(|&category| SafetySetting {
                    category,
                    threshold: SAFETY_THRESHOLD,
                })
                .collect(),
        };

        let response = self
            .client
            .post(self.endpoint())
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_connect() {
                    ClassificationError::Connection(self.base_url.clone())
                } else if e.is_timeout() {
                    ClassificationError::Transport(format!(
                        "request timed out after {}s",
                        self.timeout_secs
                    ))
                } else {
                    ClassificationError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ClassificationError::Service {
                status: status.as_u16(),
                body,
            });
        }

        // Consume the event stream as it arrives, concatenating all text
        // parts of the first candidate into one response blob.
        let mut full_text = String::new();
        let reader = BufReader::new(response);
        for line in reader.lines() {
            let line = line
                .map_err(|e| ClassificationError::Transport(format!("stream read failed: {e}")))?;
            let Some(data) = line.strip_prefix("data:") else {
                continue;
            };
            let data = data.trim();
            if data.is_empty() {
                continue;
            }
            let chunk: StreamChunk = serde_json::from_str(data).map_err(|e| {
                ClassificationError::Transport(format!("malformed stream frame: {e}"))
            })?;
            if let Some(content) = chunk.candidates.first().and_then(|c| c.content.as_ref()) {
                for part in &content.parts {
                    full_text.push_str(&part.text);
                }
            }
        }

        Ok(full_text)
    }
}

/// Mock model client for testing — returns a configured response or error.
pub struct MockModelClient {
    outcome: MockOutcome,
}

enum MockOutcome {
    Respond(String),
    FailConnect(String),
}

impl MockModelClient {
    pub fn new(response: &str) -> Self {
        Self {
            outcome: MockOutcome::Respond(response.to_string()),
        }
    }

    /// A client whose every call fails as if the service were unreachable.
    pub fn unreachable(base_url: &str) -> Self {
        Self {
            outcome: MockOutcome::FailConnect(base_url.to_string()),
        }
    }
}

impl GenerativeClient for MockModelClient {
    fn generate(&self, _prompt: &str, _system: &str) -> Result<String, ClassificationError> {
        match &self.outcome {
            MockOutcome::Respond(text) => Ok(text.clone()),
            MockOutcome::FailConnect(url) => Err(ClassificationError::Connection(url.clone())),
        }
    }
}
