use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    cached,
    db::{Cache, CacheKey, Store},
    error::{AppError, AppResult},
    models::{Category, Profile, Video, WatchProgress},
    services::{
        access::{access_for, resolve_stream, AccessGrant, FreePreviewSet, StreamResolution},
        progress::{continue_watching, CONTINUE_WATCHING_LIMIT},
        recommendations::{recommend, ScoredVideo, ViewerHistory},
    },
};

pub const CATALOG_CACHE_TTL_SECS: u64 = 300;
pub const HOME_ROW_LIMIT: usize = 6;
const UNCATEGORIZED: &str = "Uncategorized";

/// What the catalog needs to know about a signed-in viewer
#[derive(Debug, Clone)]
pub struct ViewerContext {
    pub profile: Profile,
    pub purchased: HashSet<Uuid>,
    pub progress: HashMap<Uuid, WatchProgress>,
}

impl ViewerContext {
    pub fn is_subscriber(&self, now: DateTime<Utc>) -> bool {
        self.profile.is_subscriber(now)
    }

    pub fn access(&self, video_id: &Uuid, preview: &FreePreviewSet, now: DateTime<Utc>) -> AccessGrant {
        access_for(
            self.is_subscriber(now),
            self.purchased.contains(video_id),
            preview.contains(video_id),
        )
    }

    pub fn history(&self, now: DateTime<Utc>) -> ViewerHistory<'_> {
        ViewerHistory {
            progress: &self.progress,
            purchased: &self.purchased,
            is_subscriber: self.is_subscriber(now),
        }
    }
}

/// Access for an optional viewer; anonymous visitors only get the free preview
pub fn access_of(
    viewer: Option<&ViewerContext>,
    video_id: &Uuid,
    preview: &FreePreviewSet,
    now: DateTime<Utc>,
) -> AccessGrant {
    match viewer {
        Some(viewer) => viewer.access(video_id, preview, now),
        None => access_for(false, false, preview.contains(video_id)),
    }
}

/// A video annotated for one viewer
#[derive(Debug, Clone, Serialize)]
pub struct VideoCard {
    #[serde(flatten)]
    pub video: Video,
    pub access: AccessGrant,
    pub has_access: bool,
    pub is_free_preview: bool,
    pub is_purchased: bool,
    /// Percent watched, when the viewer has started the video
    pub progress_percent: Option<f64>,
}

impl VideoCard {
    pub fn new(
        video: &Video,
        viewer: Option<&ViewerContext>,
        preview: &FreePreviewSet,
        now: DateTime<Utc>,
    ) -> Self {
        let access = access_of(viewer, &video.id, preview, now);

        Self {
            video: video.clone(),
            access,
            has_access: access.has_access(),
            is_free_preview: preview.contains(&video.id),
            is_purchased: viewer
                .map(|v| v.purchased.contains(&video.id))
                .unwrap_or(false),
            progress_percent: viewer
                .and_then(|v| v.progress.get(&video.id))
                .map(|p| p.fraction() * 100.0),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ContinueWatchingCard {
    #[serde(flatten)]
    pub card: VideoCard,
    pub progress_seconds: f64,
    pub last_watched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryRow {
    pub category: String,
    pub videos: Vec<VideoCard>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HomeFeed {
    pub featured: Vec<VideoCard>,
    pub new_releases: Vec<VideoCard>,
    pub popular: Vec<VideoCard>,
    pub continue_watching: Vec<ContinueWatchingCard>,
    /// Empty for anonymous visitors
    pub recommended: Vec<ScoredVideo>,
    pub by_category: Vec<CategoryRow>,
}

/// Builds every home row from the full catalog
///
/// Rows only show videos matching `query`. Recommendations are scored over
/// the whole catalog first, so the search text never changes a score.
pub fn build_home_feed(
    catalog: &[Video],
    query: Option<&str>,
    preview: &FreePreviewSet,
    viewer: Option<&ViewerContext>,
    recommendation_limit: usize,
    now: DateTime<Utc>,
) -> HomeFeed {
    let matches = |video: &Video| query.map_or(true, |q| video.matches_query(q));
    let videos: Vec<Video> = catalog.iter().filter(|&v| matches(v)).cloned().collect();
    let videos = videos.as_slice();

    let card = |video: &Video| VideoCard::new(video, viewer, preview, now);

    let row = |pred: fn(&Video) -> bool| -> Vec<VideoCard> {
        videos
            .iter()
            .filter(|&v| pred(v))
            .take(HOME_ROW_LIMIT)
            .map(card)
            .collect()
    };

    let mut by_views: Vec<&Video> = videos.iter().collect();
    by_views.sort_by(|a, b| b.view_count.cmp(&a.view_count));
    let popular = by_views
        .into_iter()
        .take(HOME_ROW_LIMIT)
        .map(card)
        .collect();

    let (continue_row, recommended) = match viewer {
        Some(ctx) => {
            let continue_row = continue_watching(videos, &ctx.progress, CONTINUE_WATCHING_LIMIT)
                .into_iter()
                .map(|(video, progress)| ContinueWatchingCard {
                    card: card(&video),
                    progress_seconds: progress.progress_seconds,
                    last_watched_at: progress.last_watched_at,
                })
                .collect();
            let recommended = recommend(catalog, &ctx.history(now), catalog.len())
                .into_iter()
                .filter(|scored| matches(&scored.video))
                .take(recommendation_limit)
                .collect();
            (continue_row, recommended)
        }
        None => (Vec::new(), Vec::new()),
    };

    HomeFeed {
        featured: row(|v| v.is_featured),
        new_releases: row(|v| v.is_new),
        popular,
        continue_watching: continue_row,
        recommended,
        by_category: group_by_category(videos)
            .into_iter()
            .map(|(category, videos)| CategoryRow {
                category,
                videos: videos.into_iter().map(card).collect(),
            })
            .collect(),
    }
}

/// Groups videos by category name in order of first appearance
pub fn group_by_category(videos: &[Video]) -> Vec<(String, Vec<&Video>)> {
    let mut groups: Vec<(String, Vec<&Video>)> = Vec::new();

    for video in videos {
        let name = video.category_name.as_deref().unwrap_or(UNCATEGORIZED);
        match groups.iter_mut().find(|(existing, _)| existing == name) {
            Some((_, members)) => members.push(video),
            None => groups.push((name.to_string(), vec![video])),
        }
    }

    groups
}

async fn cached_read<T, F>(cache: &Cache, key: CacheKey, fetch: F) -> AppResult<T>
where
    T: Serialize + DeserializeOwned,
    F: Future<Output = AppResult<T>>,
{
    cached!(cache, key, CATALOG_CACHE_TTL_SECS, fetch)
}

/// Read side of the video catalog
///
/// Catalog reads go through Redis when a cache is configured. A cache outage
/// degrades to direct store reads.
pub struct CatalogService {
    store: Arc<dyn Store>,
    cache: Option<Cache>,
    free_preview_per_category: usize,
}

impl CatalogService {
    pub fn new(store: Arc<dyn Store>, cache: Option<Cache>, free_preview_per_category: usize) -> Self {
        Self {
            store,
            cache,
            free_preview_per_category,
        }
    }

    async fn read<T, F, Fut>(&self, key: CacheKey, fetch: F) -> AppResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: Fn() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        if let Some(cache) = &self.cache {
            match cached_read(cache, key.clone(), fetch()).await {
                Err(AppError::Cache(e)) => {
                    tracing::warn!(key = %key, error = %e, "Catalog cache unavailable, reading store");
                }
                other => return other,
            }
        }

        fetch().await
    }

    /// Every video, newest first
    pub async fn videos(&self) -> AppResult<Vec<Video>> {
        self.read(CacheKey::Videos, || self.store.list_videos()).await
    }

    pub async fn search(&self, query: Option<&str>) -> AppResult<Vec<Video>> {
        let videos = self.videos().await?;

        Ok(match query {
            Some(q) => videos.into_iter().filter(|v| v.matches_query(q)).collect(),
            None => videos,
        })
    }

    pub async fn categories(&self) -> AppResult<Vec<Category>> {
        self.read(CacheKey::Categories, || self.store.list_categories())
            .await
    }

    pub async fn video(&self, video_id: Uuid) -> AppResult<Video> {
        self.read(CacheKey::Video(video_id), || self.store.get_video(video_id))
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Video {} not found", video_id)))
    }

    pub async fn videos_in_category(&self, category_id: Uuid) -> AppResult<Vec<Video>> {
        let (categories, videos) = tokio::try_join!(self.categories(), self.videos())?;

        if !categories.iter().any(|c| c.id == category_id) {
            return Err(AppError::NotFound(format!(
                "Category {} not found",
                category_id
            )));
        }

        Ok(videos
            .into_iter()
            .filter(|v| v.category_id == Some(category_id))
            .collect())
    }

    /// Free preview set over the full catalog
    pub fn free_preview(&self, videos: &[Video]) -> FreePreviewSet {
        let preview = FreePreviewSet::from_catalog(videos, self.free_preview_per_category);
        if preview.is_empty() && !videos.is_empty() {
            tracing::warn!(catalog_size = videos.len(), "Catalog has no free preview videos");
        }
        tracing::debug!(free_preview = preview.len(), "Free preview computed");
        preview
    }

    /// Loads profile, purchases and progress for a viewer concurrently
    pub async fn viewer_context(&self, user_id: Uuid) -> AppResult<ViewerContext> {
        let (profile, purchases, progress) = tokio::try_join!(
            self.store.get_profile(user_id),
            self.store.list_purchases(user_id),
            self.store.list_progress(user_id),
        )?;

        let profile =
            profile.ok_or_else(|| AppError::NotFound(format!("Profile {} not found", user_id)))?;

        Ok(ViewerContext {
            profile,
            purchased: purchases.into_iter().map(|p| p.video_id).collect(),
            progress: progress.into_iter().map(|p| (p.video_id, p)).collect(),
        })
    }

    pub async fn stream(&self, video_id: Uuid, viewer: Option<&ViewerContext>) -> AppResult<StreamResolution> {
        let videos = self.videos().await?;
        let video = videos
            .iter()
            .find(|v| v.id == video_id)
            .ok_or_else(|| AppError::NotFound(format!("Video {} not found", video_id)))?;

        let preview = self.free_preview(&videos);
        let access = access_of(viewer, &video_id, &preview, Utc::now());

        tracing::debug!(video_id = %video_id, access = ?access, "Stream resolved");
        Ok(resolve_stream(video, access))
    }

    pub async fn home(
        &self,
        query: Option<&str>,
        viewer: Option<&ViewerContext>,
        recommendation_limit: usize,
    ) -> AppResult<HomeFeed> {
        let videos = self.videos().await?;
        // Preview membership is fixed by the full catalog, not the filtered view
        let preview = self.free_preview(&videos);

        Ok(build_home_feed(
            &videos,
            query,
            &preview,
            viewer,
            recommendation_limit,
            Utc::now(),
        ))
    }

    pub async fn recommendations(&self, viewer: &ViewerContext, limit: usize) -> AppResult<Vec<ScoredVideo>> {
        let videos = self.videos().await?;
        Ok(recommend(&videos, &viewer.history(Utc::now()), limit))
    }

    /// Annotates videos for the viewer against the full catalog's preview set
    pub async fn cards(&self, videos: &[Video], viewer: Option<&ViewerContext>) -> AppResult<Vec<VideoCard>> {
        let catalog = self.videos().await?;
        let preview = self.free_preview(&catalog);
        let now = Utc::now();

        Ok(videos
            .iter()
            .map(|v| VideoCard::new(v, viewer, &preview, now))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemoryStore, MockStore};
    use crate::models::SubscriptionStatus;
    use chrono::Duration;

    fn video(title: &str, category: Option<(Uuid, &str)>, age_days: i64) -> Video {
        Video {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: String::new(),
            thumbnail_url: String::new(),
            trailer_url: format!("https://cdn/{}/trailer.mp4", title),
            full_video_url: format!("https://cdn/{}/full.mp4", title),
            duration_minutes: 30,
            price: 19.99,
            category_id: category.map(|(id, _)| id),
            category_name: category.map(|(_, name)| name.to_string()),
            is_featured: false,
            is_new: false,
            view_count: 0,
            created_at: Utc::now() - Duration::days(age_days),
        }
    }

    fn viewer(status: SubscriptionStatus) -> ViewerContext {
        let mut profile = Profile::new(Uuid::new_v4(), "v@taxtalkpro.com".to_string(), None);
        profile.subscription_status = status;
        ViewerContext {
            profile,
            purchased: HashSet::new(),
            progress: HashMap::new(),
        }
    }

    #[test]
    fn test_group_by_category_uses_uncategorized() {
        let gst = (Uuid::new_v4(), "GST");
        let videos = vec![
            video("a", Some(gst), 1),
            video("b", None, 2),
            video("c", Some(gst), 3),
        ];

        let groups = group_by_category(&videos);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, "GST");
        assert_eq!(groups[0].1.len(), 2);
        assert_eq!(groups[1].0, "Uncategorized");
    }

    #[test]
    fn test_home_feed_rows_truncate_and_sort_popular() {
        let mut videos: Vec<Video> = (0..10).map(|i| video(&format!("v{}", i), None, i)).collect();
        for (i, v) in videos.iter_mut().enumerate() {
            v.is_featured = true;
            v.view_count = i as i64 * 100;
        }

        let preview = FreePreviewSet::from_catalog(&videos, 2);
        let feed = build_home_feed(&videos, None, &preview, None, 6, Utc::now());

        assert_eq!(feed.featured.len(), HOME_ROW_LIMIT);
        assert!(feed.new_releases.is_empty());
        assert_eq!(feed.popular[0].video.view_count, 900);
        assert!(feed.recommended.is_empty());
        assert!(feed.continue_watching.is_empty());
        assert_eq!(feed.by_category[0].videos.len(), 10);
    }

    #[test]
    fn test_home_search_keeps_full_catalog_scores() {
        let gst = (Uuid::new_v4(), "GST");
        let mut catalog: Vec<Video> = (0..3)
            .map(|i| video(&format!("GST basics {}", i), Some(gst), i))
            .collect();
        let target = video("Advanced GST planning", Some(gst), 5);
        catalog.push(target.clone());

        let mut learner = viewer(SubscriptionStatus::Free);
        for watched in &catalog[..3] {
            learner.progress.insert(
                watched.id,
                WatchProgress {
                    user_id: learner.profile.id,
                    video_id: watched.id,
                    progress_seconds: 120.0,
                    duration_seconds: 1800.0,
                    completed: false,
                    last_watched_at: Utc::now(),
                },
            );
        }

        let now = Utc::now();
        let preview = FreePreviewSet::from_catalog(&catalog, 2);
        let unfiltered = recommend(&catalog, &learner.history(now), 6);
        let expected = unfiltered
            .iter()
            .find(|s| s.video.id == target.id)
            .map(|s| s.score)
            .unwrap();

        let feed = build_home_feed(&catalog, Some("advanced"), &preview, Some(&learner), 6, now);
        assert_eq!(feed.recommended.len(), 1);
        assert_eq!(feed.recommended[0].video.id, target.id);
        assert_eq!(feed.recommended[0].score, expected);
        assert_eq!(feed.by_category[0].videos.len(), 1);
    }

    #[test]
    fn test_anonymous_cards_only_open_free_preview() {
        let videos: Vec<Video> = (0..3).map(|i| video(&format!("v{}", i), None, i)).collect();
        let preview = FreePreviewSet::from_catalog(&videos, 2);
        let now = Utc::now();

        let cards: Vec<VideoCard> = videos
            .iter()
            .map(|v| VideoCard::new(v, None, &preview, now))
            .collect();
        assert!(cards[0].has_access);
        assert!(cards[1].has_access);
        assert!(!cards[2].has_access);

        let subscriber = viewer(SubscriptionStatus::Active);
        let card = VideoCard::new(&videos[2], Some(&subscriber), &preview, now);
        assert_eq!(card.access, AccessGrant::Subscription);
    }

    #[tokio::test]
    async fn test_stream_resolves_trailer_for_locked_video() {
        let videos: Vec<Video> = (0..3).map(|i| video(&format!("v{}", i), None, i)).collect();
        let locked = videos[2].clone();
        let store = MemoryStore::with_catalog(Vec::new(), videos);
        let catalog = CatalogService::new(Arc::new(store), None, 2);

        let anonymous = catalog.stream(locked.id, None).await.unwrap();
        assert!(anonymous.is_trailer);
        assert_eq!(anonymous.url, locked.trailer_url);

        let mut buyer = viewer(SubscriptionStatus::Free);
        buyer.purchased.insert(locked.id);
        let purchased = catalog.stream(locked.id, Some(&buyer)).await.unwrap();
        assert!(!purchased.is_trailer);
        assert_eq!(purchased.access, AccessGrant::Purchase);
    }

    #[tokio::test]
    async fn test_expired_subscriber_loses_access() {
        let videos: Vec<Video> = (0..3).map(|i| video(&format!("v{}", i), None, i)).collect();
        let locked = videos[2].id;
        let catalog = CatalogService::new(
            Arc::new(MemoryStore::with_catalog(Vec::new(), videos)),
            None,
            2,
        );

        let mut lapsed = viewer(SubscriptionStatus::Active);
        lapsed.profile.subscription_end_date = Some(Utc::now() - Duration::days(1));

        let stream = catalog.stream(locked, Some(&lapsed)).await.unwrap();
        assert_eq!(stream.access, AccessGrant::None);
    }

    #[tokio::test]
    async fn test_search_matches_category_name() {
        let catalog = CatalogService::new(Arc::new(MemoryStore::with_demo_catalog().unwrap()), None, 2);

        let gst = catalog.search(Some("gst")).await.unwrap();
        assert!(!gst.is_empty());
        assert!(gst.iter().all(|v| v.matches_query("gst")));

        let all = catalog.search(Some("   ")).await.unwrap();
        assert_eq!(all.len(), 20);
    }

    #[tokio::test]
    async fn test_missing_video_is_not_found() {
        let catalog = CatalogService::new(Arc::new(MemoryStore::new()), None, 2);
        let err = catalog.video(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = catalog.videos_in_category(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_viewer_context_requires_profile() {
        let mut store = MockStore::new();
        store.expect_get_profile().returning(|_| Ok(None));
        store.expect_list_purchases().returning(|_| Ok(Vec::new()));
        store.expect_list_progress().returning(|_| Ok(Vec::new()));

        let catalog = CatalogService::new(Arc::new(store), None, 2);
        let err = catalog.viewer_context(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_store_errors_propagate_from_catalog_reads() {
        let mut store = MockStore::new();
        store
            .expect_list_videos()
            .returning(|| Err(AppError::Internal("pool timed out".to_string())));

        let catalog = CatalogService::new(Arc::new(store), None, 2);
        tokio_test::assert_err!(catalog.videos().await);
    }
}
