use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;

use crate::{Completion, Oracle, OracleConfig, OracleError};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-1.5-flash";
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Environment variable holding the API key
pub const API_KEY_ENV: &str = "GOOGLE_API_KEY";

/// Google Gemini `generateContent` oracle
#[derive(Clone)]
pub struct GeminiOracle {
    client: Client,
    api_key: String,
    default_model: String,
    base_url: String,
}

impl GeminiOracle {
    pub fn new(api_key: String) -> Result<Self, OracleError> {
        if api_key.trim().is_empty() {
            return Err(OracleError::ConfigError(format!("{} is empty", API_KEY_ENV)));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| OracleError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            default_model: DEFAULT_MODEL.to_string(),
            base_url: GEMINI_BASE_URL.to_string(),
        })
    }

    /// Build from `GOOGLE_API_KEY`
    pub fn from_env() -> Result<Self, OracleError> {
        let key = std::env::var(API_KEY_ENV)
            .map_err(|_| OracleError::ConfigError(format!("Missing {} in environment", API_KEY_ENV)))?;
        Self::new(key)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn build_request(instruction: &str, prompt: &str, config: &OracleConfig) -> GeminiRequest {
        GeminiRequest {
            system_instruction: GeminiContent {
                role: None,
                parts: vec![GeminiPart {
                    text: instruction.to_string(),
                }],
            },
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: config.temperature.map(|temperature| GeminiGenerationConfig {
                temperature: Some(temperature),
            }),
        }
    }
}

/// Map a non-success HTTP status to the oracle error taxonomy
fn classify_status(status: StatusCode, body: &str) -> OracleError {
    let detail = format!("Status: {}\nBody: {}", status, body);
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        OracleError::Unavailable(detail)
    } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        OracleError::ConfigError(detail)
    } else {
        OracleError::Rejected(detail)
    }
}

/// Pull the generated text out of a response, treating safety blocks as rejections
fn extract_text(response: GeminiResponse) -> Result<String, OracleError> {
    if let Some(reason) = response
        .prompt_feedback
        .as_ref()
        .and_then(|feedback| feedback.block_reason.as_deref())
    {
        return Err(OracleError::Rejected(format!("prompt blocked: {}", reason)));
    }

    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| OracleError::Rejected("Gemini returned no candidates".into()))?;

    if let Some(reason) = candidate.finish_reason.as_deref() {
        if matches!(
            reason,
            "SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT" | "SPII"
        ) {
            return Err(OracleError::Rejected(format!("response blocked: {}", reason)));
        }
    }

    let text: String = candidate
        .content
        .map(|content| content.parts.into_iter().map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(OracleError::Rejected("Gemini returned empty text".into()));
    }
    Ok(text)
}

#[async_trait]
impl Oracle for GeminiOracle {
    fn name(&self) -> &str {
        "Gemini"
    }

    async fn send(
        &self,
        instruction: &str,
        prompt: &str,
        config: &OracleConfig,
    ) -> Result<Completion, OracleError> {
        let start = Instant::now();
        let model = config.model.as_deref().unwrap_or(&self.default_model);
        let url = format!("{}/models/{}:generateContent", self.base_url, model);
        let body = Self::build_request(instruction, prompt, config);

        debug!(model, prompt_len = prompt.len(), "Sending request to Gemini API");

        let mut request = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body);
        if let Some(timeout) = config.timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                OracleError::Timeout(
                    config
                        .timeout
                        .unwrap_or(Duration::from_secs(REQUEST_TIMEOUT_SECS)),
                )
            } else {
                OracleError::Unavailable(format!("Failed to send request to Gemini API: {}", e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &error_body));
        }

        let parsed: GeminiResponse = response
            .json()
            .await
            .map_err(|e| OracleError::Unavailable(format!("Failed to parse Gemini response: {}", e)))?;

        let text = extract_text(parsed)?;
        debug!(model, chars = text.len(), "Received Gemini completion");
        Ok(Completion::new(text, start.elapsed()))
    }

    async fn is_available(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

// Gemini API types

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    system_instruction: GeminiContent,
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Clone, Serialize)]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    block_reason: Option<String>,
}
