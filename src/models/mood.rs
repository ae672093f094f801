use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::chat::ChatMessage;

/// The seven mood levels, ordered worst to best.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "mood_level", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MoodLevel {
    Awful,
    Unhappy,
    Down,
    Neutral,
    Good,
    Great,
    Awesome,
}

impl MoodLevel {
    pub const ALL: [MoodLevel; 7] = [
        MoodLevel::Awful,
        MoodLevel::Unhappy,
        MoodLevel::Down,
        MoodLevel::Neutral,
        MoodLevel::Good,
        MoodLevel::Great,
        MoodLevel::Awesome,
    ];

    /// Display label shown to the user and fed to the companion prompt.
    /// Stored on the entry at creation time so old entries keep their
    /// wording if this table changes.
    pub fn label(&self) -> &'static str {
        match self {
            MoodLevel::Awful => "Awful",
            MoodLevel::Unhappy => "Bad",
            MoodLevel::Down => "Down",
            MoodLevel::Neutral => "Neutral",
            MoodLevel::Good => "Good",
            MoodLevel::Great => "Great",
            MoodLevel::Awesome => "Awesome",
        }
    }

    /// Icon key understood by the mobile client.
    pub fn icon(&self) -> &'static str {
        match self {
            MoodLevel::Awful => "Skull",
            MoodLevel::Unhappy => "Annoyed",
            MoodLevel::Down => "Frown",
            MoodLevel::Neutral => "Meh",
            MoodLevel::Good => "SmilePlus",
            MoodLevel::Great => "Smile",
            MoodLevel::Awesome => "Zap",
        }
    }

    /// Hex color used for pixel-grid and badge rendering.
    pub fn color(&self) -> &'static str {
        match self {
            MoodLevel::Awful => "#4B5563",
            MoodLevel::Unhappy => "#A78BFA",
            MoodLevel::Down => "#F87171",
            MoodLevel::Neutral => "#93C5FD",
            MoodLevel::Good => "#6EE7B7",
            MoodLevel::Great => "#FCD34D",
            MoodLevel::Awesome => "#8B5CF6",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MoodEntry {
    pub id: Uuid,
    pub level: MoodLevel,
    pub label: String,
    pub icon: String,
    pub chat_history: Json<Vec<ChatMessage>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateMoodRequest {
    pub level: MoodLevel,
}

#[derive(Debug, Deserialize)]
pub struct MoodQuery {
    pub start_date: Option<chrono::NaiveDate>,
    pub end_date: Option<chrono::NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_round_trips_through_lowercase_json() {
        for level in MoodLevel::ALL {
            let json = serde_json::to_string(&level).unwrap();
            assert_eq!(json, json.to_lowercase());
            let back: MoodLevel = serde_json::from_str(&json).unwrap();
            assert_eq!(back, level);
        }
    }

    #[test]
    fn every_level_has_display_metadata() {
        for level in MoodLevel::ALL {
            assert!(!level.label().is_empty());
            assert!(!level.icon().is_empty());
            assert!(level.color().starts_with('#'));
        }
    }
}
