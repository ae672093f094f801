//! Chat-session orchestration for the Lumina companion.
//!
//! The reply path is total: provider failures fail over to cheaper
//! models where the failure is transient, and everything else degrades
//! to a canned reply that still carries the suggestion marker. The UI
//! never sees a raw error for a chat turn.

use serde::Serialize;

use crate::models::chat::{ChatMessage, ChatRole};
use crate::services::gemini::{GenerateRequest, ProviderError, TextGenerator};

/// Candidate models in priority order. The tail entries are the
/// cheaper fallbacks tried when the primary hits quota or is unknown
/// in the caller's region.
pub const MODEL_PRIORITY: [&str; 2] = ["gemini-2.5-flash-lite", "gemini-2.5-flash"];

pub const SUGGESTION_MARKER: &str = "[SUGGESTIONS]:";
const SUGGESTION_DELIMITER: char = '|';

const MAX_OUTPUT_TOKENS: u32 = 500;
const TEMPERATURE: f32 = 0.7;
/// Replies shorter than this are degenerate provider output.
const MIN_REPLY_LEN: usize = 5;

/// Produce one companion reply for the given mood and conversation.
///
/// Never fails: every error path lands on a canned reply keyed by the
/// mood label, so the caller always has something parseable to show.
pub async fn get_reply<B: TextGenerator + ?Sized>(
    backend: &B,
    mood_label: &str,
    history: &[ChatMessage],
    user_input: Option<&str>,
    user_name: Option<&str>,
    interests: &[String],
) -> String {
    let system = build_system_prompt(mood_label, user_name, interests);

    for (i, model) in MODEL_PRIORITY.iter().enumerate() {
        let mut turns = frame_history(history, mood_label);
        let message = take_outgoing(&mut turns, user_input, mood_label);

        let request = GenerateRequest {
            system_instruction: Some(system.clone()),
            turns,
            message,
            max_output_tokens: MAX_OUTPUT_TOKENS,
            temperature: Some(TEMPERATURE),
        };

        match backend.generate(model, request).await {
            Ok(text) => {
                let text = text.trim();
                if text.len() >= MIN_REPLY_LEN {
                    return text.to_string();
                }
                let error = ProviderError::Empty;
                tracing::error!(model, error = %error, "degenerate companion reply, falling back to canned");
                return canned_reply(mood_label);
            }
            Err(error) if error.is_retriable() && i + 1 < MODEL_PRIORITY.len() => {
                tracing::warn!(
                    model,
                    next = MODEL_PRIORITY[i + 1],
                    error = %error,
                    "switching companion model"
                );
            }
            Err(error) => {
                tracing::error!(model, error = %error, "companion call failed, falling back to canned");
                return canned_reply(mood_label);
            }
        }
    }

    // Unreachable while MODEL_PRIORITY is non-empty; still a parseable reply.
    "I'm here for you. [SUGGESTIONS]: Tell me more. | Can you help? | What should I do?".to_string()
}

/// Outcome of a key check, shaped for direct serialization to the client.
#[derive(Debug, Serialize, PartialEq)]
pub struct KeyValidation {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl KeyValidation {
    pub fn ok() -> Self {
        Self {
            valid: true,
            error: None,
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            error: Some(reason.into()),
        }
    }
}

/// Probe the primary model with a minimal low-token request. No
/// failover here: the point is to verify the key, not to get a reply.
pub async fn validate_api_key<B: TextGenerator + ?Sized>(backend: &B) -> KeyValidation {
    let request = GenerateRequest {
        system_instruction: None,
        turns: Vec::new(),
        message: "hi".to_string(),
        max_output_tokens: 5,
        temperature: None,
    };

    match backend.generate(MODEL_PRIORITY[0], request).await {
        Ok(text) if !text.trim().is_empty() => KeyValidation::ok(),
        Ok(_) => KeyValidation::invalid("Could not verify key. Please try again."),
        Err(ProviderError::RateLimited(_)) => {
            KeyValidation::invalid("Quota exceeded or too many requests.")
        }
        Err(ProviderError::PermissionDenied(_)) => {
            KeyValidation::invalid("Key does not have permission for this model.")
        }
        Err(ProviderError::InvalidKey) => {
            KeyValidation::invalid("The API key provided is invalid.")
        }
        Err(_) => KeyValidation::invalid("Invalid API Key."),
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ParsedReply {
    pub clean_text: String,
    pub suggestions: Vec<String>,
}

/// Split a raw reply into display text and the trailing suggestions.
/// Fragments at or under 5 characters are stray pieces of malformed
/// model output and are dropped.
pub fn parse_suggestions(text: &str) -> ParsedReply {
    let mut parts = text.split(SUGGESTION_MARKER);
    let clean_text = parts.next().unwrap_or("").trim().to_string();
    let suggestions = match parts.next() {
        Some(tail) => tail
            .split(SUGGESTION_DELIMITER)
            .map(str::trim)
            .filter(|s| s.len() > 5)
            .map(String::from)
            .collect(),
        None => Vec::new(),
    };
    ParsedReply {
        clean_text,
        suggestions,
    }
}

fn build_system_prompt(mood_label: &str, user_name: Option<&str>, interests: &[String]) -> String {
    let name = match user_name {
        Some(n) if !n.trim().is_empty() => n,
        _ => "friend",
    };
    let interests_line = if interests.is_empty() {
        String::new()
    } else {
        format!(" They are interested in {}.", interests.join(", "))
    };

    format!(
        "You are Lumina, a warm and empathetic mood companion.\n\
         The user's name is {name}.{interests_line}\n\
         The user is currently feeling \"{mood_label}\".\n\n\
         INSTRUCTIONS:\n\
         1. Keep responses very short (1-2 sentences).\n\
         2. Be warm, supportive, and never harsh.\n\
         3. Mention or relate to one of their interests if helpful/appropriate for their current mood.\n\
         4. Offer a quick, replyable follow-up.\n\
         5. ALWAYS end with exactly 3 short suggestions/questions in this format:\n\
         [SUGGESTIONS]: Suggestion 1? | Suggestion 2? | Suggestion 3?\n\n\
         No medical advice."
    )
}

/// Clean the stored history for the provider: blank turns are dropped,
/// and a history that opens with a model turn gets a synthetic user
/// opener, since the provider requires the first turn to be the user's.
fn frame_history(history: &[ChatMessage], mood_label: &str) -> Vec<ChatMessage> {
    let mut turns: Vec<ChatMessage> = history
        .iter()
        .filter(|m| !m.text.trim().is_empty())
        .cloned()
        .collect();

    if turns.first().map(|m| m.role) == Some(ChatRole::Model) {
        turns.insert(0, ChatMessage::user(format!("I am feeling {mood_label}.")));
    }

    turns
}

/// Pick the outgoing message and drop a duplicate trailing user turn
/// from the history so the same text is not sent twice.
fn take_outgoing(turns: &mut Vec<ChatMessage>, user_input: Option<&str>, mood_label: &str) -> String {
    let mut message = match user_input {
        Some(input) if !input.trim().is_empty() => input.to_string(),
        _ if turns.is_empty() => format!("I'm feeling {mood_label}."),
        _ => "Tell me more.".to_string(),
    };

    if turns.last().map(|m| m.role) == Some(ChatRole::User) {
        if let Some(popped) = turns.pop() {
            message = popped.text;
        }
    }

    message
}
