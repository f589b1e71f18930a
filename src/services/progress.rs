use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    db::Store,
    error::AppResult,
    models::{PlaybackEvent, Video, WatchProgress},
};

/// Remaining playback below which a video counts as finished
pub const COMPLETION_THRESHOLD_SECS: f64 = 5.0;

/// Size of the "continue watching" row
pub const CONTINUE_WATCHING_LIMIT: usize = 6;

/// `true` once fewer than five seconds remain
pub fn is_complete(current_time: f64, duration: f64) -> bool {
    duration - current_time < COMPLETION_THRESHOLD_SECS
}

/// Position the player should seek to on play
///
/// Resumes unfinished progress unless the viewer asked to restart.
pub fn resume_position(progress: Option<&WatchProgress>, restart: bool) -> f64 {
    match progress {
        Some(p) if !restart && p.in_progress() => p.progress_seconds,
        _ => 0.0,
    }
}

/// Wall-clock rate limit on non-terminal saves, one window per key
#[derive(Debug)]
pub struct SaveThrottle<K> {
    interval: Duration,
    last_accepted: HashMap<K, Instant>,
}

impl<K: Eq + Hash> SaveThrottle<K> {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_accepted: HashMap::new(),
        }
    }

    /// Accepts the save and stamps `now`, or rejects it when inside the window.
    /// Forced saves are always accepted.
    ///
    /// Keys whose window has closed are dropped on every accepted save, so the
    /// map only holds pairs saved within the last interval.
    pub fn try_acquire(&mut self, key: K, now: Instant, force: bool) -> bool {
        if !force {
            if let Some(last) = self.last_accepted.get(&key) {
                if now.saturating_duration_since(*last) < self.interval {
                    return false;
                }
            }
        }

        let interval = self.interval;
        self.last_accepted
            .retain(|_, last| now.saturating_duration_since(*last) < interval);
        self.last_accepted.insert(key, now);
        true
    }
}

/// Position report from a player
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ProgressUpdate {
    pub current_time: f64,
    pub duration: f64,
    #[serde(default)]
    pub event: PlaybackEvent,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct SaveOutcome {
    /// Whether a row was written
    pub saved: bool,
    pub progress_seconds: f64,
    pub completed: bool,
}

/// Resume information for the player overlay
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ResumePoint {
    pub video_id: Uuid,
    pub position_seconds: f64,
    pub has_started: bool,
    pub completed: bool,
    pub percent_watched: f64,
}

pub fn resume_point(video_id: Uuid, progress: Option<&WatchProgress>, restart: bool) -> ResumePoint {
    ResumePoint {
        video_id,
        position_seconds: resume_position(progress, restart),
        has_started: progress.map(|p| p.progress_seconds > 0.0).unwrap_or(false),
        completed: progress.map(|p| p.completed).unwrap_or(false),
        percent_watched: progress.map(|p| p.fraction() * 100.0).unwrap_or(0.0),
    }
}

/// Videos started but not finished, in catalog order
pub fn continue_watching(
    videos: &[Video],
    progress: &HashMap<Uuid, WatchProgress>,
    limit: usize,
) -> Vec<(Video, WatchProgress)> {
    videos
        .iter()
        .filter_map(|video| {
            progress
                .get(&video.id)
                .filter(|p| p.in_progress())
                .map(|p| (video.clone(), p.clone()))
        })
        .take(limit)
        .collect()
}

/// Persists playback position on a throttle
///
/// Persistence is best effort: store failures are logged and reported as
/// `saved: false`, never returned to the player.
pub struct ProgressTracker {
    store: Arc<dyn Store>,
    throttle: Mutex<SaveThrottle<(Uuid, Uuid)>>,
}

impl ProgressTracker {
    pub fn new(store: Arc<dyn Store>, min_interval: Duration) -> Self {
        Self {
            store,
            throttle: Mutex::new(SaveThrottle::new(min_interval)),
        }
    }

    pub async fn load(&self, user_id: Uuid, video_id: Uuid) -> AppResult<Option<WatchProgress>> {
        self.store.get_progress(user_id, video_id).await
    }

    pub async fn load_all(&self, user_id: Uuid) -> AppResult<HashMap<Uuid, WatchProgress>> {
        let rows = self.store.list_progress(user_id).await?;
        Ok(rows.into_iter().map(|p| (p.video_id, p)).collect())
    }

    pub async fn record(&self, user_id: Uuid, video_id: Uuid, update: ProgressUpdate) -> SaveOutcome {
        self.record_at(user_id, video_id, update, Instant::now()).await
    }

    pub(crate) async fn record_at(
        &self,
        user_id: Uuid,
        video_id: Uuid,
        update: ProgressUpdate,
        now: Instant,
    ) -> SaveOutcome {
        if !(update.duration.is_finite() && update.duration > 0.0) || !update.current_time.is_finite() {
            return SaveOutcome {
                saved: false,
                progress_seconds: 0.0,
                completed: false,
            };
        }

        let (progress_seconds, completed) = match update.event {
            PlaybackEvent::Ended => (update.duration, true),
            _ => {
                let position = update.current_time.clamp(0.0, update.duration);
                (position, is_complete(position, update.duration))
            }
        };

        let force = update.event.is_terminal() || completed;
        let accepted = self
            .throttle
            .lock()
            .await
            .try_acquire((user_id, video_id), now, force);

        if !accepted {
            return SaveOutcome {
                saved: false,
                progress_seconds,
                completed,
            };
        }

        let row = WatchProgress {
            user_id,
            video_id,
            progress_seconds,
            duration_seconds: update.duration,
            completed,
            last_watched_at: Utc::now(),
        };

        let saved = match self.store.upsert_progress(&row).await {
            Ok(()) => {
                tracing::debug!(
                    user_id = %user_id,
                    video_id = %video_id,
                    progress_seconds,
                    completed,
                    "Watch progress saved"
                );
                true
            }
            Err(e) => {
                tracing::error!(
                    user_id = %user_id,
                    video_id = %video_id,
                    error = %e,
                    "Error saving watch progress"
                );
                false
            }
        };

        SaveOutcome {
            saved,
            progress_seconds,
            completed,
        }
    }
}
