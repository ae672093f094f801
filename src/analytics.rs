//! Derived views over logged mood entries: streaks, the monthly pixel
//! grid, and the per-month summary card. Everything here is a pure
//! function of the entry list and an injected reference date; handlers
//! supply "today" so nothing below reads the wall clock.

use std::collections::HashSet;

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::models::mood::{MoodEntry, MoodLevel};

/// One cell of the monthly pixel grid.
#[derive(Debug, Clone, Serialize)]
pub struct PixelDay {
    pub date: NaiveDate,
    pub mood: Option<MoodEntry>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MonthSummary {
    pub total_logs: usize,
    pub level: u32,
    pub max_streak: u32,
    pub top_moods: Vec<MoodLevel>,
}

/// Consecutive calendar days with at least one entry, counting back
/// from `today`. A day without an entry ends the walk, so an unlogged
/// today means 0.
pub fn current_streak(entries: &[MoodEntry], today: NaiveDate) -> u32 {
    let mut days: Vec<NaiveDate> = entries.iter().map(|e| e.created_at.date_naive()).collect();
    days.sort_unstable_by(|a, b| b.cmp(a));
    days.dedup();

    let mut streak = 0;
    let mut check = today;
    for day in days {
        if day == check {
            streak += 1;
            check -= Duration::days(1);
        } else if day < check {
            break;
        }
    }
    streak
}

/// One `PixelDay` per calendar day of the month, in order. The first
/// entry found for a day wins; multiple same-day entries are legal and
/// simply not shown in the grid. `None` for an out-of-range month.
pub fn monthly_pixels(entries: &[MoodEntry], year: i32, month: u32) -> Option<Vec<PixelDay>> {
    let (first, next) = month_bounds(year, month)?;

    let mut days = Vec::with_capacity(31);
    let mut date = first;
    while date < next {
        let mood = entries
            .iter()
            .find(|e| e.created_at.date_naive() == date)
            .cloned();
        days.push(PixelDay { date, mood });
        date += Duration::days(1);
    }
    Some(days)
}

/// Aggregate stats for the month: log count, the count-derived level
/// (one step per five logs), the longest run of consecutive logged days
/// within the month, and up to three moods by descending frequency.
pub fn month_summary(entries: &[MoodEntry], year: i32, month: u32) -> Option<MonthSummary> {
    let (first, next) = month_bounds(year, month)?;

    let in_month = |date: NaiveDate| date >= first && date < next;

    let total_logs = entries
        .iter()
        .filter(|e| in_month(e.created_at.date_naive()))
        .count();
    let level = (total_logs as u32).div_ceil(5).max(1);

    // Frequency counts in first-seen order; the stable sort keeps that
    // order for ties.
    let mut counts: Vec<(MoodLevel, usize)> = Vec::new();
    for entry in entries.iter().filter(|e| in_month(e.created_at.date_naive())) {
        match counts.iter_mut().find(|(level, _)| *level == entry.level) {
            Some((_, n)) => *n += 1,
            None => counts.push((entry.level, 1)),
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    let top_moods = counts.into_iter().take(3).map(|(level, _)| level).collect();

    let logged: HashSet<NaiveDate> = entries.iter().map(|e| e.created_at.date_naive()).collect();
    let mut max_streak = 0u32;
    let mut run = 0u32;
    let mut date = first;
    while date < next {
        if logged.contains(&date) {
            run += 1;
            max_streak = max_streak.max(run);
        } else {
            run = 0;
        }
        date += Duration::days(1);
    }

    Some(MonthSummary {
        total_logs,
        level,
        max_streak,
        top_moods,
    })
}

fn month_bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }?;
    Some((first, next))
}

#[cfg(test)]
mod tests {
    use sqlx::types::Json;
    use uuid::Uuid;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn entry_on(day: NaiveDate, level: MoodLevel) -> MoodEntry {
        MoodEntry {
            id: Uuid::new_v4(),
            level,
            label: level.label().to_string(),
            icon: level.icon().to_string(),
            chat_history: Json(Vec::new()),
            created_at: day.and_hms_opt(12, 0, 0).unwrap().and_utc(),
        }
    }

    #[test]
    fn streak_of_no_entries_is_zero() {
        assert_eq!(current_streak(&[], date(2026, 8, 6)), 0);
    }

    #[test]
    fn streak_stops_at_first_gap() {
        let today = date(2026, 8, 6);
        let entries = vec![
            entry_on(today, MoodLevel::Good),
            entry_on(today - Duration::days(1), MoodLevel::Down),
            entry_on(today - Duration::days(3), MoodLevel::Great),
        ];
        assert_eq!(current_streak(&entries, today), 2);
    }

    #[test]
    fn streak_is_zero_when_today_is_unlogged() {
        let today = date(2026, 8, 6);
        let entries = vec![
            entry_on(today - Duration::days(1), MoodLevel::Good),
            entry_on(today - Duration::days(2), MoodLevel::Good),
        ];
        assert_eq!(current_streak(&entries, today), 0);
    }

    #[test]
    fn duplicate_days_do_not_inflate_the_streak() {
        let today = date(2026, 8, 6);
        let entries = vec![
            entry_on(today, MoodLevel::Good),
            entry_on(today, MoodLevel::Awful),
            entry_on(today - Duration::days(1), MoodLevel::Neutral),
        ];
        assert_eq!(current_streak(&entries, today), 2);
    }

    #[test]
    fn february_of_a_non_leap_year_has_28_empty_pixels() {
        let pixels = monthly_pixels(&[], 2026, 2).unwrap();
        assert_eq!(pixels.len(), 28);
        assert!(pixels.iter().all(|p| p.mood.is_none()));
    }

    #[test]
    fn pixel_count_matches_calendar_days() {
        let entries = vec![
            entry_on(date(2024, 2, 10), MoodLevel::Good),
            entry_on(date(2024, 2, 29), MoodLevel::Great),
        ];
        for (year, month, expected) in [(2024, 2, 29), (2026, 1, 31), (2026, 4, 30), (2026, 12, 31)]
        {
            assert_eq!(
                monthly_pixels(&entries, year, month).unwrap().len(),
                expected
            );
        }

        let mut reversed = entries.clone();
        reversed.reverse();
        assert_eq!(monthly_pixels(&reversed, 2024, 2).unwrap().len(), 29);
    }

    #[test]
    fn invalid_month_is_rejected() {
        assert!(monthly_pixels(&[], 2026, 0).is_none());
        assert!(monthly_pixels(&[], 2026, 13).is_none());
        assert!(month_summary(&[], 2026, 13).is_none());
    }

    #[test]
    fn first_entry_wins_a_shared_day() {
        let day = date(2026, 8, 3);
        let first = entry_on(day, MoodLevel::Awesome);
        let second = entry_on(day, MoodLevel::Awful);
        let entries = vec![first.clone(), second];

        let pixels = monthly_pixels(&entries, 2026, 8).unwrap();
        let cell = &pixels[2];
        assert_eq!(cell.date, day);
        assert_eq!(cell.mood.as_ref().map(|m| m.id), Some(first.id));
    }

    #[test]
    fn summary_level_steps_up_every_five_logs() {
        assert_eq!(month_summary(&[], 2026, 8).unwrap().level, 1);

        let one = vec![entry_on(date(2026, 8, 1), MoodLevel::Good)];
        assert_eq!(month_summary(&one, 2026, 8).unwrap().level, 1);

        let six: Vec<MoodEntry> = (1..=6)
            .map(|d| entry_on(date(2026, 8, d), MoodLevel::Good))
            .collect();
        assert_eq!(month_summary(&six, 2026, 8).unwrap().level, 2);
    }

    #[test]
    fn summary_ranks_top_moods_by_frequency() {
        let entries = vec![
            entry_on(date(2026, 8, 1), MoodLevel::Down),
            entry_on(date(2026, 8, 2), MoodLevel::Good),
            entry_on(date(2026, 8, 3), MoodLevel::Good),
            entry_on(date(2026, 8, 4), MoodLevel::Awesome),
            entry_on(date(2026, 8, 5), MoodLevel::Good),
            entry_on(date(2026, 8, 6), MoodLevel::Awesome),
        ];
        let summary = month_summary(&entries, 2026, 8).unwrap();
        assert_eq!(summary.total_logs, 6);
        assert_eq!(
            summary.top_moods,
            vec![MoodLevel::Good, MoodLevel::Awesome, MoodLevel::Down]
        );
    }

    #[test]
    fn summary_streak_is_confined_to_the_month() {
        // Four consecutive days straddling the boundary; only the two
        // February days count toward February's run.
        let entries = vec![
            entry_on(date(2026, 1, 30), MoodLevel::Good),
            entry_on(date(2026, 1, 31), MoodLevel::Good),
            entry_on(date(2026, 2, 1), MoodLevel::Good),
            entry_on(date(2026, 2, 2), MoodLevel::Good),
        ];
        assert_eq!(month_summary(&entries, 2026, 2).unwrap().max_streak, 2);
        assert_eq!(month_summary(&entries, 2026, 1).unwrap().max_streak, 2);
    }

    #[test]
    fn summary_streak_resets_on_gap_days() {
        let entries = vec![
            entry_on(date(2026, 8, 1), MoodLevel::Good),
            entry_on(date(2026, 8, 2), MoodLevel::Good),
            entry_on(date(2026, 8, 3), MoodLevel::Good),
            entry_on(date(2026, 8, 10), MoodLevel::Good),
        ];
        assert_eq!(month_summary(&entries, 2026, 8).unwrap().max_streak, 3);
    }
}
