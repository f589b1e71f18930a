use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        Category, FeedbackType, Profile, Purchase, Subscription, SubscriptionPlan,
        SubscriptionStatus, Video, WatchProgress,
    },
};

/// Persistence seam for every table the service reads or writes
///
/// Two implementations exist: `PgStore` against the hosted Postgres database
/// and `MemoryStore` for local development and tests. Handlers only ever see
/// `Arc<dyn Store>`.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Store: Send + Sync {
    /// All videos, newest first, with the category name joined in
    async fn list_videos(&self) -> AppResult<Vec<Video>>;

    async fn get_video(&self, video_id: Uuid) -> AppResult<Option<Video>>;

    /// All categories ordered by `display_order`
    async fn list_categories(&self) -> AppResult<Vec<Category>>;

    async fn get_profile(&self, user_id: Uuid) -> AppResult<Option<Profile>>;

    /// Inserts the profile, or leaves an existing row untouched
    async fn insert_profile_if_missing(&self, profile: &Profile) -> AppResult<()>;

    async fn update_subscription_status(
        &self,
        user_id: Uuid,
        status: SubscriptionStatus,
        plan: Option<SubscriptionPlan>,
        end_date: Option<DateTime<Utc>>,
    ) -> AppResult<()>;

    async fn list_purchases(&self, user_id: Uuid) -> AppResult<Vec<Purchase>>;

    /// Fails with `AppError::Conflict` when the (user, video) pair already exists
    async fn insert_purchase(&self, purchase: &Purchase) -> AppResult<()>;

    async fn insert_subscription(&self, subscription: &Subscription) -> AppResult<()>;

    async fn list_subscriptions(&self, user_id: Uuid) -> AppResult<Vec<Subscription>>;

    async fn get_progress(&self, user_id: Uuid, video_id: Uuid)
        -> AppResult<Option<WatchProgress>>;

    async fn list_progress(&self, user_id: Uuid) -> AppResult<Vec<WatchProgress>>;

    /// Rows whose `last_watched_at` falls in `[from, to)`
    async fn list_progress_between(
        &self,
        user_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<WatchProgress>>;

    /// Upsert keyed on (user_id, video_id)
    async fn upsert_progress(&self, progress: &WatchProgress) -> AppResult<()>;

    async fn get_feedback(&self, user_id: Uuid, video_id: Uuid)
        -> AppResult<Option<FeedbackType>>;

    async fn upsert_feedback(
        &self,
        user_id: Uuid,
        video_id: Uuid,
        feedback: FeedbackType,
    ) -> AppResult<()>;

    async fn delete_feedback(&self, user_id: Uuid, video_id: Uuid) -> AppResult<()>;
}
