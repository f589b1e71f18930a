use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};
use uuid::Uuid;

use crate::error::AppError;

/// Persisted playback position; one row per (user, video)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WatchProgress {
    pub user_id: Uuid,
    pub video_id: Uuid,
    pub progress_seconds: f64,
    pub duration_seconds: f64,
    pub completed: bool,
    pub last_watched_at: DateTime<Utc>,
}

impl WatchProgress {
    /// Fraction watched in [0, 1]
    pub fn fraction(&self) -> f64 {
        if self.duration_seconds <= 0.0 {
            return 0.0;
        }
        (self.progress_seconds / self.duration_seconds).clamp(0.0, 1.0)
    }

    /// Started but not finished
    pub fn in_progress(&self) -> bool {
        !self.completed && self.progress_seconds > 0.0
    }
}

/// Player event that triggered a progress update
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackEvent {
    /// Periodic position report while playing
    #[default]
    TimeUpdate,
    Pause,
    Ended,
}

impl PlaybackEvent {
    /// Terminal events are never throttled
    pub fn is_terminal(&self) -> bool {
        matches!(self, PlaybackEvent::Pause | PlaybackEvent::Ended)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackType {
    NotForMe,
    Like,
    Love,
}

impl FeedbackType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackType::NotForMe => "not_for_me",
            FeedbackType::Like => "like",
            FeedbackType::Love => "love",
        }
    }
}

impl Display for FeedbackType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FeedbackType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_for_me" => Ok(FeedbackType::NotForMe),
            "like" => Ok(FeedbackType::Like),
            "love" => Ok(FeedbackType::Love),
            other => Err(AppError::InvalidInput(format!(
                "Unknown feedback type: {}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress(seconds: f64, duration: f64, completed: bool) -> WatchProgress {
        WatchProgress {
            user_id: Uuid::new_v4(),
            video_id: Uuid::new_v4(),
            progress_seconds: seconds,
            duration_seconds: duration,
            completed,
            last_watched_at: Utc::now(),
        }
    }

    #[test]
    fn test_fraction() {
        assert_eq!(progress(450.0, 900.0, false).fraction(), 0.5);
        assert_eq!(progress(10.0, 0.0, false).fraction(), 0.0);
        assert_eq!(progress(1000.0, 900.0, false).fraction(), 1.0);
    }

    #[test]
    fn test_in_progress() {
        assert!(progress(1.0, 900.0, false).in_progress());
        assert!(!progress(0.0, 900.0, false).in_progress());
        assert!(!progress(900.0, 900.0, true).in_progress());
    }

    #[test]
    fn test_terminal_events() {
        assert!(!PlaybackEvent::TimeUpdate.is_terminal());
        assert!(PlaybackEvent::Pause.is_terminal());
        assert!(PlaybackEvent::Ended.is_terminal());
    }

    #[test]
    fn test_feedback_type_serde() {
        let json = serde_json::to_string(&FeedbackType::NotForMe).unwrap();
        assert_eq!(json, r#""not_for_me""#);
        assert_eq!("love".parse::<FeedbackType>().unwrap(), FeedbackType::Love);
        assert!("meh".parse::<FeedbackType>().is_err());
    }
}
