//! Typed boundary around the Gemini generateContent API.
//!
//! The companion service never inspects error strings; every failure is
//! classified here into a `ProviderError` kind, and only the transient
//! kinds are eligible for model failover.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::models::chat::{ChatMessage, ChatRole};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// One request against a single model: prior turns plus the next
/// user-authored message, with bounded output.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub system_instruction: Option<String>,
    pub turns: Vec<ChatMessage>,
    pub message: String,
    pub max_output_tokens: u32,
    pub temperature: Option<f32>,
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("model not found: {0}")]
    NotFound(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("invalid api key")]
    InvalidKey,

    #[error("empty or degenerate response")]
    Empty,

    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

impl ProviderError {
    /// Quota and unknown-model failures are worth retrying against the
    /// next candidate model; everything else terminates the failover loop.
    pub fn is_retriable(&self) -> bool {
        matches!(self, ProviderError::RateLimited(_) | ProviderError::NotFound(_))
    }
}

/// Substitutable text-generation backend. The production implementation
/// is `GeminiClient`; tests drive the companion with stubs.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, model: &str, request: GenerateRequest) -> Result<String, ProviderError>;
}

/// Stateless Gemini client built per call around a shared `reqwest::Client`.
/// The key comes from the request (the mobile client holds the user's own
/// key) or from server config.
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    timeout: Duration,
}

impl GeminiClient {
    pub fn new(client: reqwest::Client, api_key: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            timeout,
        }
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiSystemInstruction>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
}

#[derive(Serialize)]
struct GeminiSystemInstruction {
    parts: Vec<GeminiPart>,
}

#[derive(Serialize)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Serialize)]
struct GeminiGenerationConfig {
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
    error: Option<GeminiError>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContentResponse>,
}

#[derive(Deserialize)]
struct GeminiContentResponse {
    parts: Option<Vec<GeminiPartResponse>>,
}

#[derive(Deserialize)]
struct GeminiPartResponse {
    text: Option<String>,
}

#[derive(Deserialize)]
struct GeminiError {
    message: String,
}

fn role_str(role: ChatRole) -> &'static str {
    match role {
        ChatRole::User => "user",
        ChatRole::Model => "model",
    }
}

/// Map an HTTP status plus response body onto an error kind. The body is
/// consulted for the provider-specific markers the status alone can't
/// distinguish (key rejection arrives as a 400).
fn classify(status: StatusCode, body: &str) -> ProviderError {
    if body.contains("API_KEY_INVALID") {
        return ProviderError::InvalidKey;
    }
    match status.as_u16() {
        429 => ProviderError::RateLimited(body.to_string()),
        404 => ProviderError::NotFound(body.to_string()),
        403 => ProviderError::PermissionDenied(body.to_string()),
        _ => {
            let lowered = body.to_lowercase();
            if lowered.contains("quota") {
                ProviderError::RateLimited(body.to_string())
            } else if lowered.contains("not found") {
                ProviderError::NotFound(body.to_string())
            } else {
                ProviderError::Unavailable(format!("{}: {}", status, body))
            }
        }
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, model: &str, request: GenerateRequest) -> Result<String, ProviderError> {
        if self.api_key.trim().is_empty() {
            return Err(ProviderError::InvalidKey);
        }

        let mut contents: Vec<GeminiContent> = request
            .turns
            .iter()
            .map(|msg| GeminiContent {
                role: role_str(msg.role).to_string(),
                parts: vec![GeminiPart {
                    text: msg.text.clone(),
                }],
            })
            .collect();
        contents.push(GeminiContent {
            role: "user".to_string(),
            parts: vec![GeminiPart {
                text: request.message,
            }],
        });

        let api_request = GeminiRequest {
            contents,
            system_instruction: request.system_instruction.map(|s| GeminiSystemInstruction {
                parts: vec![GeminiPart { text: s }],
            }),
            generation_config: GeminiGenerationConfig {
                max_output_tokens: request.max_output_tokens,
                temperature: request.temperature,
            },
        };

        let url = format!("{}/{}:generateContent?key={}", GEMINI_API_BASE, model, self.api_key);

        let response = self
            .client
            .post(&url)
            .json(&api_request)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify(status, &body));
        }

        let api_response: GeminiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;

        if let Some(error) = api_response.error {
            return Err(classify(status, &error.message));
        }

        let text = api_response
            .candidates
            .and_then(|c| c.into_iter().next())
            .and_then(|c| c.content)
            .and_then(|c| c.parts)
            .map(|parts| {
                parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        Ok(text.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_by_status_code() {
        assert!(matches!(
            classify(StatusCode::TOO_MANY_REQUESTS, "slow down"),
            ProviderError::RateLimited(_)
        ));
        assert!(matches!(
            classify(StatusCode::NOT_FOUND, "no such model"),
            ProviderError::NotFound(_)
        ));
        assert!(matches!(
            classify(StatusCode::FORBIDDEN, "nope"),
            ProviderError::PermissionDenied(_)
        ));
    }

    #[test]
    fn classifies_by_body_markers() {
        assert!(matches!(
            classify(StatusCode::BAD_REQUEST, "API_KEY_INVALID: check your key"),
            ProviderError::InvalidKey
        ));
        assert!(matches!(
            classify(StatusCode::INTERNAL_SERVER_ERROR, "Quota exceeded for project"),
            ProviderError::RateLimited(_)
        ));
        assert!(matches!(
            classify(StatusCode::BAD_REQUEST, "model not found in region"),
            ProviderError::NotFound(_)
        ));
        assert!(matches!(
            classify(StatusCode::INTERNAL_SERVER_ERROR, "backend exploded"),
            ProviderError::Unavailable(_)
        ));
    }

    #[test]
    fn only_quota_and_not_found_are_retriable() {
        assert!(ProviderError::RateLimited(String::new()).is_retriable());
        assert!(ProviderError::NotFound(String::new()).is_retriable());
        assert!(!ProviderError::PermissionDenied(String::new()).is_retriable());
        assert!(!ProviderError::InvalidKey.is_retriable());
        assert!(!ProviderError::Empty.is_retriable());
        assert!(!ProviderError::Unavailable(String::new()).is_retriable());
    }
}
