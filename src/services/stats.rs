use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::{db::Store, error::AppResult, models::WatchProgress};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct LearningStats {
    pub weekly_minutes: i64,
    pub last_week_minutes: i64,
    /// Percent change against last week
    pub weekly_change: i64,
    pub completed_videos: usize,
    pub weekly_completed: usize,
}

fn minutes(rows: &[WatchProgress]) -> i64 {
    let seconds: f64 = rows.iter().map(|p| p.progress_seconds).sum();
    (seconds / 60.0).round() as i64
}

/// Week-over-week change in percent
///
/// A first active week counts as +100%; two idle weeks as 0%.
pub fn weekly_change(this_week: i64, last_week: i64) -> i64 {
    if last_week > 0 {
        (((this_week - last_week) as f64 / last_week as f64) * 100.0).round() as i64
    } else if this_week > 0 {
        100
    } else {
        0
    }
}

pub fn learning_stats(
    this_week: &[WatchProgress],
    last_week: &[WatchProgress],
    completed_videos: usize,
) -> LearningStats {
    let weekly_minutes = minutes(this_week);
    let last_week_minutes = minutes(last_week);

    LearningStats {
        weekly_minutes,
        last_week_minutes,
        weekly_change: weekly_change(weekly_minutes, last_week_minutes),
        completed_videos,
        weekly_completed: this_week.iter().filter(|p| p.completed).count(),
    }
}

pub struct StatsService {
    store: Arc<dyn Store>,
}

impl StatsService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn for_user(&self, user_id: Uuid, now: DateTime<Utc>) -> AppResult<LearningStats> {
        let week_ago = now - Duration::days(7);
        let two_weeks_ago = now - Duration::days(14);

        let (this_week, last_week, all) = tokio::try_join!(
            self.store.list_progress_between(user_id, week_ago, now + Duration::seconds(1)),
            self.store.list_progress_between(user_id, two_weeks_ago, week_ago),
            self.store.list_progress(user_id),
        )?;

        let completed = all.iter().filter(|p| p.completed).count();
        Ok(learning_stats(&this_week, &last_week, completed))
    }
}
