use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    db::Store,
    error::{AppError, AppResult},
    models::{
        Category, FeedbackType, Profile, Purchase, Subscription, SubscriptionPlan,
        SubscriptionStatus, Video, WatchProgress,
    },
};

const DEMO_CATALOG: &str = include_str!("../../data/demo_catalog.json");

#[derive(Debug, Deserialize)]
struct CatalogSeed {
    categories: Vec<Category>,
    videos: Vec<Video>,
}

#[derive(Default)]
struct Tables {
    videos: Vec<Video>,
    categories: Vec<Category>,
    profiles: HashMap<Uuid, Profile>,
    purchases: Vec<Purchase>,
    subscriptions: Vec<Subscription>,
    progress: HashMap<(Uuid, Uuid), WatchProgress>,
    feedback: HashMap<(Uuid, Uuid), FeedbackType>,
}

/// In-process `Store` used for local development and tests
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Creates an empty store with no catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store seeded with the bundled demo catalog
    pub fn with_demo_catalog() -> AppResult<Self> {
        let seed: CatalogSeed = serde_json::from_str(DEMO_CATALOG)
            .map_err(|e| AppError::Internal(format!("Invalid demo catalog: {}", e)))?;

        Ok(Self::with_catalog(seed.categories, seed.videos))
    }

    /// Creates a store holding the given catalog
    pub fn with_catalog(categories: Vec<Category>, videos: Vec<Video>) -> Self {
        let names: HashMap<Uuid, String> = categories
            .iter()
            .map(|c| (c.id, c.name.clone()))
            .collect();

        let mut videos: Vec<Video> = videos
            .into_iter()
            .map(|mut video| {
                video.category_name = video.category_id.and_then(|id| names.get(&id).cloned());
                video
            })
            .collect();
        videos.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let mut categories = categories;
        categories.sort_by_key(|c| c.display_order);

        Self {
            tables: RwLock::new(Tables {
                videos,
                categories,
                ..Tables::default()
            }),
        }
    }
}

#[async_trait::async_trait]
impl Store for MemoryStore {
    async fn list_videos(&self) -> AppResult<Vec<Video>> {
        Ok(self.tables.read().await.videos.clone())
    }

    async fn get_video(&self, video_id: Uuid) -> AppResult<Option<Video>> {
        let tables = self.tables.read().await;
        Ok(tables.videos.iter().find(|v| v.id == video_id).cloned())
    }

    async fn list_categories(&self) -> AppResult<Vec<Category>> {
        Ok(self.tables.read().await.categories.clone())
    }

    async fn get_profile(&self, user_id: Uuid) -> AppResult<Option<Profile>> {
        Ok(self.tables.read().await.profiles.get(&user_id).cloned())
    }

    async fn insert_profile_if_missing(&self, profile: &Profile) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        tables
            .profiles
            .entry(profile.id)
            .or_insert_with(|| profile.clone());
        Ok(())
    }

    async fn update_subscription_status(
        &self,
        user_id: Uuid,
        status: SubscriptionStatus,
        plan: Option<SubscriptionPlan>,
        end_date: Option<DateTime<Utc>>,
    ) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        let profile = tables
            .profiles
            .get_mut(&user_id)
            .ok_or_else(|| AppError::NotFound(format!("Profile {} not found", user_id)))?;

        profile.subscription_status = status;
        profile.subscription_plan = plan;
        profile.subscription_end_date = end_date;
        Ok(())
    }

    async fn list_purchases(&self, user_id: Uuid) -> AppResult<Vec<Purchase>> {
        let tables = self.tables.read().await;
        let mut purchases: Vec<Purchase> = tables
            .purchases
            .iter()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        purchases.sort_by(|a, b| b.purchased_at.cmp(&a.purchased_at));
        Ok(purchases)
    }

    async fn insert_purchase(&self, purchase: &Purchase) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        let exists = tables
            .purchases
            .iter()
            .any(|p| p.user_id == purchase.user_id && p.video_id == purchase.video_id);

        if exists {
            return Err(AppError::Conflict("Video already purchased".to_string()));
        }

        tables.purchases.push(purchase.clone());
        Ok(())
    }

    async fn insert_subscription(&self, subscription: &Subscription) -> AppResult<()> {
        self.tables
            .write()
            .await
            .subscriptions
            .push(subscription.clone());
        Ok(())
    }

    async fn list_subscriptions(&self, user_id: Uuid) -> AppResult<Vec<Subscription>> {
        let tables = self.tables.read().await;
        let mut subscriptions: Vec<Subscription> = tables
            .subscriptions
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        subscriptions.sort_by(|a, b| b.start_date.cmp(&a.start_date));
        Ok(subscriptions)
    }

    async fn get_progress(
        &self,
        user_id: Uuid,
        video_id: Uuid,
    ) -> AppResult<Option<WatchProgress>> {
        let tables = self.tables.read().await;
        Ok(tables.progress.get(&(user_id, video_id)).cloned())
    }

    async fn list_progress(&self, user_id: Uuid) -> AppResult<Vec<WatchProgress>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<WatchProgress> = tables
            .progress
            .values()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.last_watched_at.cmp(&a.last_watched_at));
        Ok(rows)
    }

    async fn list_progress_between(
        &self,
        user_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<WatchProgress>> {
        let tables = self.tables.read().await;
        Ok(tables
            .progress
            .values()
            .filter(|p| p.user_id == user_id && p.last_watched_at >= from && p.last_watched_at < to)
            .cloned()
            .collect())
    }

    async fn upsert_progress(&self, progress: &WatchProgress) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        tables
            .progress
            .insert((progress.user_id, progress.video_id), progress.clone());
        Ok(())
    }

    async fn get_feedback(
        &self,
        user_id: Uuid,
        video_id: Uuid,
    ) -> AppResult<Option<FeedbackType>> {
        let tables = self.tables.read().await;
        Ok(tables.feedback.get(&(user_id, video_id)).copied())
    }

    async fn upsert_feedback(
        &self,
        user_id: Uuid,
        video_id: Uuid,
        feedback: FeedbackType,
    ) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        tables.feedback.insert((user_id, video_id), feedback);
        Ok(())
    }

    async fn delete_feedback(&self, user_id: Uuid, video_id: Uuid) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        tables.feedback.remove(&(user_id, video_id));
        Ok(())
    }
}
