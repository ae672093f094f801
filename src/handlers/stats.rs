use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::analytics::{self, PixelDay};
use crate::error::{AppError, AppResult};
use crate::models::mood::{MoodEntry, MoodLevel};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct StreakResponse {
    pub streak: u32,
}

#[derive(Debug, Deserialize)]
pub struct MonthQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
}

impl MonthQuery {
    fn resolve(&self, today: chrono::NaiveDate) -> (i32, u32) {
        (
            self.year.unwrap_or_else(|| today.year()),
            self.month.unwrap_or_else(|| today.month()),
        )
    }
}

/// Display metadata for a mood level, resolved from the current
/// configuration table (not the redundant copy stored on entries).
#[derive(Debug, Serialize)]
pub struct MoodBadge {
    pub level: MoodLevel,
    pub label: &'static str,
    pub icon: &'static str,
    pub color: &'static str,
}

impl From<MoodLevel> for MoodBadge {
    fn from(level: MoodLevel) -> Self {
        Self {
            level,
            label: level.label(),
            icon: level.icon(),
            color: level.color(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MonthSummaryResponse {
    pub year: i32,
    pub month: u32,
    pub total_logs: usize,
    pub level: u32,
    pub max_streak: u32,
    pub top_moods: Vec<MoodBadge>,
}

pub async fn get_streak(State(state): State<AppState>) -> AppResult<Json<StreakResponse>> {
    let entries = all_entries(&state.db).await?;
    let streak = analytics::current_streak(&entries, Utc::now().date_naive());
    Ok(Json(StreakResponse { streak }))
}

pub async fn get_pixels(
    State(state): State<AppState>,
    Query(query): Query<MonthQuery>,
) -> AppResult<Json<Vec<PixelDay>>> {
    let (year, month) = query.resolve(Utc::now().date_naive());
    let entries = all_entries(&state.db).await?;

    let pixels = analytics::monthly_pixels(&entries, year, month)
        .ok_or(AppError::Validation("month must be between 1 and 12".into()))?;

    Ok(Json(pixels))
}

pub async fn get_month_summary(
    State(state): State<AppState>,
    Query(query): Query<MonthQuery>,
) -> AppResult<Json<MonthSummaryResponse>> {
    let (year, month) = query.resolve(Utc::now().date_naive());
    let entries = all_entries(&state.db).await?;

    let summary = analytics::month_summary(&entries, year, month)
        .ok_or(AppError::Validation("month must be between 1 and 12".into()))?;

    Ok(Json(MonthSummaryResponse {
        year,
        month,
        total_logs: summary.total_logs,
        level: summary.level,
        max_streak: summary.max_streak,
        top_moods: summary.top_moods.into_iter().map(MoodBadge::from).collect(),
    }))
}

/// The pixel grid walks arbitrary months and the streak walks back from
/// today, so both need the full entry set. Entry volume is bounded by
/// the per-day creation cap.
async fn all_entries(db: &PgPool) -> AppResult<Vec<MoodEntry>> {
    let entries =
        sqlx::query_as::<_, MoodEntry>("SELECT * FROM mood_entries ORDER BY created_at ASC")
            .fetch_all(db)
            .await?;
    Ok(entries)
}
