use std::time::Duration;

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::types::Json as Jsonb;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::models::chat::ChatMessage;
use crate::models::mood::MoodEntry;
use crate::services::companion::{self, KeyValidation};
use crate::services::gemini::GeminiClient;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct ChatRequest {
    /// Absent on the opening turn right after a mood is logged; the
    /// orchestrator synthesizes the opener in that case.
    #[validate(length(max = 2000, message = "Message must be under 2000 characters"))]
    pub message: Option<String>,

    /// The user's own Gemini key, held on device. Falls back to the
    /// server-configured key when absent.
    pub api_key: Option<String>,

    #[validate(length(max = 100, message = "Name must be under 100 characters"))]
    pub user_name: Option<String>,

    #[serde(default)]
    pub interests: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
    pub suggestions: Vec<String>,
    pub chat_history: Vec<ChatMessage>,
}

/// One companion turn against a mood entry. The reply is always real or
/// canned, never an error; only store failures surface as 500s.
pub async fn mood_chat(
    State(state): State<AppState>,
    Path(entry_id): Path<Uuid>,
    Json(body): Json<ChatRequest>,
) -> AppResult<Json<ChatResponse>> {
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let entry = sqlx::query_as::<_, MoodEntry>("SELECT * FROM mood_entries WHERE id = $1")
        .bind(entry_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::NotFound("Mood entry not found".into()))?;

    let api_key = body
        .api_key
        .filter(|k| !k.trim().is_empty())
        .unwrap_or_else(|| state.config.gemini_api_key.clone());
    let backend = GeminiClient::new(
        state.http.clone(),
        api_key,
        Duration::from_secs(state.config.gemini_timeout_secs),
    );

    let user_input = body
        .message
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty());

    let mut history = entry.chat_history.0.clone();
    if let Some(text) = user_input {
        history.push(ChatMessage::user(text));
    }

    let reply = companion::get_reply(
        &backend,
        &entry.label,
        &history,
        user_input,
        body.user_name.as_deref(),
        &body.interests,
    )
    .await;
    let parsed = companion::parse_suggestions(&reply);

    history.push(ChatMessage::model(parsed.clean_text.clone()));

    sqlx::query("UPDATE mood_entries SET chat_history = $2 WHERE id = $1")
        .bind(entry.id)
        .bind(Jsonb(&history))
        .execute(&state.db)
        .await?;

    Ok(Json(ChatResponse {
        reply: parsed.clean_text,
        suggestions: parsed.suggestions,
        chat_history: history,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ValidateKeyRequest {
    pub api_key: String,
}

/// Key check for the onboarding screen. Always 200 with a structured
/// verdict; the reason strings are shown to the user verbatim.
pub async fn validate_key(
    State(state): State<AppState>,
    Json(body): Json<ValidateKeyRequest>,
) -> Json<KeyValidation> {
    if body.api_key.trim().is_empty() {
        return Json(KeyValidation::invalid("Please enter an API key."));
    }

    let backend = GeminiClient::new(
        state.http.clone(),
        body.api_key,
        Duration::from_secs(state.config.gemini_timeout_secs),
    );

    Json(companion::validate_api_key(&backend).await)
}
