use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{Duration, NaiveTime, Utc};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::mood::{CreateMoodRequest, MoodEntry, MoodQuery};
use crate::AppState;

pub async fn create_mood(
    State(state): State<AppState>,
    Json(body): Json<CreateMoodRequest>,
) -> AppResult<Json<MoodEntry>> {
    // Per-day creation cap; the client greys out the mood picker when
    // it sees the 403.
    let day_start = Utc::now().date_naive().and_time(NaiveTime::MIN).and_utc();
    let logged_today = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM mood_entries WHERE created_at >= $1 AND created_at < $2",
    )
    .bind(day_start)
    .bind(day_start + Duration::days(1))
    .fetch_one(&state.db)
    .await?;

    if logged_today >= state.config.max_entries_per_day {
        return Err(AppError::DailyLimitReached);
    }

    // Label and icon are copied from the level's configuration at
    // creation time so historical entries survive later table changes.
    let level = body.level;
    let entry = sqlx::query_as::<_, MoodEntry>(
        r#"
        INSERT INTO mood_entries (id, level, label, icon, chat_history)
        VALUES ($1, $2, $3, $4, '[]'::jsonb)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(level)
    .bind(level.label())
    .bind(level.icon())
    .fetch_one(&state.db)
    .await?;

    tracing::info!(entry_id = %entry.id, level = ?level, "mood entry created");

    Ok(Json(entry))
}

pub async fn list_moods(
    State(state): State<AppState>,
    Query(query): Query<MoodQuery>,
) -> AppResult<Json<Vec<MoodEntry>>> {
    let start = query
        .start_date
        .unwrap_or_else(|| Utc::now().date_naive() - Duration::days(30));
    let end = query.end_date.unwrap_or_else(|| Utc::now().date_naive());

    let from = start.and_time(NaiveTime::MIN).and_utc();
    let to = (end + Duration::days(1)).and_time(NaiveTime::MIN).and_utc();

    let entries = sqlx::query_as::<_, MoodEntry>(
        r#"
        SELECT * FROM mood_entries
        WHERE created_at >= $1 AND created_at < $2
        ORDER BY created_at DESC
        "#,
    )
    .bind(from)
    .bind(to)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(entries))
}

pub async fn get_mood(
    State(state): State<AppState>,
    Path(entry_id): Path<Uuid>,
) -> AppResult<Json<MoodEntry>> {
    let entry = sqlx::query_as::<_, MoodEntry>("SELECT * FROM mood_entries WHERE id = $1")
        .bind(entry_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::NotFound("Mood entry not found".into()))?;

    Ok(Json(entry))
}
