use serde::Serialize;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::models::{Video, WatchProgress};

const CATEGORY_WATCH_WEIGHT: f64 = 10.0;
const ACCESS_BONUS: f64 = 5.0;
const FEATURED_BONUS: f64 = 3.0;
const NEW_BONUS: f64 = 2.0;
const VIEWS_PER_POINT: f64 = 1000.0;
const CATEGORY_AFFINITY_BONUS: f64 = 8.0;
const CATEGORY_COMPLETED_WEIGHT: f64 = 5.0;

/// Everything the scorer knows about one viewer
pub struct ViewerHistory<'a> {
    pub progress: &'a HashMap<Uuid, WatchProgress>,
    pub purchased: &'a HashSet<Uuid>,
    pub is_subscriber: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoredVideo {
    pub video: Video,
    pub score: f64,
}

/// Per-category counts of watched and completed videos
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct CategoryActivity {
    watched: usize,
    completed: usize,
}

fn category_activity(
    videos: &[Video],
    progress: &HashMap<Uuid, WatchProgress>,
) -> HashMap<Uuid, CategoryActivity> {
    let mut activity: HashMap<Uuid, CategoryActivity> = HashMap::new();

    for video in videos {
        let (Some(category_id), Some(entry)) = (video.category_id, progress.get(&video.id)) else {
            continue;
        };

        let counts = activity.entry(category_id).or_default();
        counts.watched += 1;
        if entry.completed {
            counts.completed += 1;
        }
    }

    activity
}

/// Weighted relevance of one candidate
///
/// Every term is non-negative, so raising any input never lowers the score.
fn score(
    video: &Video,
    activity: CategoryActivity,
    has_access: bool,
) -> f64 {
    let mut score = CATEGORY_WATCH_WEIGHT * activity.watched as f64;

    if has_access {
        score += ACCESS_BONUS;
    }
    if video.is_featured {
        score += FEATURED_BONUS;
    }
    if video.is_new {
        score += NEW_BONUS;
    }

    score += video.view_count.max(0) as f64 / VIEWS_PER_POINT;

    if activity.watched > 0 {
        score += CATEGORY_AFFINITY_BONUS;
    }

    score + CATEGORY_COMPLETED_WEIGHT * activity.completed as f64
}

/// Ranks unwatched-or-incomplete videos for a signed-in viewer
///
/// Videos the viewer completed are never returned. Ties keep catalog order.
pub fn recommend(videos: &[Video], history: &ViewerHistory<'_>, limit: usize) -> Vec<ScoredVideo> {
    let activity = category_activity(videos, history.progress);

    let mut scored: Vec<ScoredVideo> = videos
        .iter()
        .filter(|video| {
            !history
                .progress
                .get(&video.id)
                .map(|p| p.completed)
                .unwrap_or(false)
        })
        .map(|video| {
            let counts = video
                .category_id
                .and_then(|id| activity.get(&id).copied())
                .unwrap_or_default();
            let has_access = history.is_subscriber || history.purchased.contains(&video.id);

            ScoredVideo {
                video: video.clone(),
                score: score(video, counts, has_access),
            }
        })
        .collect();

    // sort_by is stable, so equal scores keep catalog order
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(limit);

    tracing::debug!(
        candidates = videos.len(),
        returned = scored.len(),
        "Recommendations scored"
    );

    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn video(category: Option<Uuid>) -> Video {
        Video {
            id: Uuid::new_v4(),
            title: "Video".to_string(),
            description: String::new(),
            thumbnail_url: String::new(),
            trailer_url: String::new(),
            full_video_url: String::new(),
            duration_minutes: 45,
            price: 19.99,
            category_id: category,
            category_name: None,
            is_featured: false,
            is_new: false,
            view_count: 0,
            created_at: Utc::now(),
        }
    }

    fn watched(video: &Video, completed: bool) -> (Uuid, WatchProgress) {
        (
            video.id,
            WatchProgress {
                user_id: Uuid::nil(),
                video_id: video.id,
                progress_seconds: if completed { 900.0 } else { 120.0 },
                duration_seconds: 900.0,
                completed,
                last_watched_at: Utc::now(),
            },
        )
    }

    fn run(
        videos: &[Video],
        progress: &HashMap<Uuid, WatchProgress>,
        purchased: &HashSet<Uuid>,
        is_subscriber: bool,
    ) -> Vec<ScoredVideo> {
        let history = ViewerHistory {
            progress,
            purchased,
            is_subscriber,
        };
        recommend(videos, &history, 6)
    }

    #[test]
    fn test_completed_videos_are_never_recommended() {
        let cat = Some(Uuid::new_v4());
        let videos: Vec<Video> = (0..8).map(|_| video(cat)).collect();
        let progress: HashMap<_, _> = videos
            .iter()
            .step_by(2)
            .map(|v| watched(v, true))
            .collect();

        let result = run(&videos, &progress, &HashSet::new(), true);
        assert_eq!(result.len(), 4);
        assert!(result
            .iter()
            .all(|s| !progress.get(&s.video.id).map(|p| p.completed).unwrap_or(false)));
    }

    #[test]
    fn test_incomplete_videos_stay_eligible() {
        let v = video(None);
        let progress: HashMap<_, _> = [watched(&v, false)].into_iter().collect();
        let result = run(std::slice::from_ref(&v), &progress, &HashSet::new(), false);
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn test_score_weights() {
        let cat = Uuid::new_v4();
        let mut candidate = video(Some(cat));
        candidate.is_featured = true;
        candidate.is_new = true;
        candidate.view_count = 2500;

        let watched_one = video(Some(cat));
        let completed_one = video(Some(cat));
        let videos = vec![candidate.clone(), watched_one.clone(), completed_one.clone()];
        let progress: HashMap<_, _> = [watched(&watched_one, false), watched(&completed_one, true)]
            .into_iter()
            .collect();
        let purchased: HashSet<Uuid> = [candidate.id].into_iter().collect();

        let result = run(&videos, &progress, &purchased, false);
        let top = result.iter().find(|s| s.video.id == candidate.id).unwrap();

        // 10*2 watched + 5 purchased + 3 featured + 2 new + 2.5 views + 8 affinity + 5*1 completed
        assert!((top.score - 45.5).abs() < 1e-9);
    }

    #[test]
    fn test_score_monotonic_in_each_input() {
        let base = video(Some(Uuid::new_v4()));
        let none = CategoryActivity::default();
        let base_score = score(&base, none, false);

        let mut featured = base.clone();
        featured.is_featured = true;
        assert!(score(&featured, none, false) >= base_score);

        let mut new = base.clone();
        new.is_new = true;
        assert!(score(&new, none, false) >= base_score);

        let mut popular = base.clone();
        popular.view_count = 10;
        assert!(score(&popular, none, false) >= base_score);

        let mut previous = base_score;
        for watched in 0..5 {
            for completed in 0..=watched {
                let s = score(&base, CategoryActivity { watched, completed }, false);
                if completed > 0 {
                    let fewer = score(&base, CategoryActivity { watched, completed: completed - 1 }, false);
                    assert!(s >= fewer);
                }
            }
            let s = score(&base, CategoryActivity { watched, completed: 0 }, false);
            assert!(s >= previous);
            previous = s;
        }

        assert!(score(&base, none, true) >= base_score);
    }

    #[test]
    fn test_ties_keep_catalog_order_and_truncate() {
        let videos: Vec<Video> = (0..10).map(|_| video(None)).collect();
        let result = run(&videos, &HashMap::new(), &HashSet::new(), false);
        assert_eq!(result.len(), 6);
        for (scored, original) in result.iter().zip(videos.iter()) {
            assert_eq!(scored.video.id, original.id);
        }
    }

    #[test]
    fn test_category_affinity_outranks_popularity() {
        let tax = Uuid::new_v4();
        let other = Uuid::new_v4();
        let mut popular = video(Some(other));
        popular.view_count = 9000;
        let related = video(Some(tax));
        let seen = video(Some(tax));

        let videos = vec![popular.clone(), related.clone(), seen.clone()];
        let progress: HashMap<_, _> = [watched(&seen, true)].into_iter().collect();

        let result = run(&videos, &progress, &HashSet::new(), false);
        assert_eq!(result[0].video.id, related.id);
        assert_eq!(result[1].video.id, popular.id);
    }
}
