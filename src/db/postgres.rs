use chrono::{DateTime, Utc};
use sqlx::{
    postgres::{PgPoolOptions, PgRow},
    PgPool, Row,
};
use uuid::Uuid;

use crate::{
    db::Store,
    error::{AppError, AppResult},
    models::{
        Category, FeedbackType, Profile, Purchase, Subscription, SubscriptionPlan,
        SubscriptionStatus, Video, WatchProgress,
    },
};

/// Postgres SQLSTATE for unique_violation
const UNIQUE_VIOLATION: &str = "23505";

/// Creates a PostgreSQL connection pool
///
/// Establishes a pool of database connections for efficient reuse.
/// The pool automatically manages connection lifecycle and limits.
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// Applies the schema under `migrations/`
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// `Store` backed by the hosted Postgres database
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const VIDEO_COLUMNS: &str = r#"
    v.id, v.title, v.description, v.thumbnail_url, v.trailer_url, v.full_video_url,
    v.duration_minutes, v.price, v.category_id, c.name AS category_name,
    v.is_featured, v.is_new, v.view_count, v.created_at
"#;

fn video_from_row(row: &PgRow) -> Result<Video, sqlx::Error> {
    Ok(Video {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        description: row
            .try_get::<Option<String>, _>("description")?
            .unwrap_or_default(),
        thumbnail_url: row.try_get("thumbnail_url")?,
        trailer_url: row.try_get("trailer_url")?,
        full_video_url: row.try_get("full_video_url")?,
        duration_minutes: row.try_get("duration_minutes")?,
        price: row.try_get("price")?,
        category_id: row.try_get("category_id")?,
        category_name: row.try_get("category_name")?,
        is_featured: row.try_get("is_featured")?,
        is_new: row.try_get("is_new")?,
        view_count: row.try_get("view_count")?,
        created_at: row.try_get("created_at")?,
    })
}

fn category_from_row(row: &PgRow) -> Result<Category, sqlx::Error> {
    Ok(Category {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        slug: row.try_get("slug")?,
        description: row.try_get("description")?,
        display_order: row.try_get("display_order")?,
    })
}

fn profile_from_row(row: &PgRow) -> AppResult<Profile> {
    let status: String = row.try_get("subscription_status")?;
    let plan: Option<String> = row.try_get("subscription_plan")?;

    Ok(Profile {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        full_name: row.try_get("full_name")?,
        subscription_status: status.parse()?,
        subscription_plan: plan.map(|p| p.parse()).transpose()?,
        subscription_end_date: row.try_get("subscription_end_date")?,
        is_admin: row.try_get("is_admin")?,
        created_at: row.try_get("created_at")?,
    })
}

fn purchase_from_row(row: &PgRow) -> Result<Purchase, sqlx::Error> {
    Ok(Purchase {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        video_id: row.try_get("video_id")?,
        amount_paid: row.try_get("amount_paid")?,
        purchased_at: row.try_get("purchased_at")?,
    })
}

fn subscription_from_row(row: &PgRow) -> AppResult<Subscription> {
    let plan: String = row.try_get("plan")?;
    let status: String = row.try_get("status")?;

    Ok(Subscription {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        plan: plan.parse()?,
        start_date: row.try_get("start_date")?,
        end_date: row.try_get("end_date")?,
        amount_paid: row.try_get("amount_paid")?,
        status: status.parse()?,
    })
}

fn progress_from_row(row: &PgRow) -> Result<WatchProgress, sqlx::Error> {
    Ok(WatchProgress {
        user_id: row.try_get("user_id")?,
        video_id: row.try_get("video_id")?,
        progress_seconds: row.try_get("progress_seconds")?,
        duration_seconds: row.try_get("duration_seconds")?,
        completed: row.try_get("completed")?,
        last_watched_at: row.try_get("last_watched_at")?,
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db| db.code())
        .map(|code| code == UNIQUE_VIOLATION)
        .unwrap_or(false)
}

#[async_trait::async_trait]
impl Store for PgStore {
    async fn list_videos(&self) -> AppResult<Vec<Video>> {
        let sql = format!(
            "SELECT {} FROM videos v LEFT JOIN categories c ON c.id = v.category_id \
             ORDER BY v.created_at DESC",
            VIDEO_COLUMNS
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        rows.iter()
            .map(|row| video_from_row(row).map_err(AppError::from))
            .collect()
    }

    async fn get_video(&self, video_id: Uuid) -> AppResult<Option<Video>> {
        let sql = format!(
            "SELECT {} FROM videos v LEFT JOIN categories c ON c.id = v.category_id \
             WHERE v.id = $1",
            VIDEO_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(video_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(video_from_row).transpose()?)
    }

    async fn list_categories(&self) -> AppResult<Vec<Category>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, slug, description, display_order
            FROM categories
            ORDER BY display_order ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| category_from_row(row).map_err(AppError::from))
            .collect()
    }

    async fn get_profile(&self, user_id: Uuid) -> AppResult<Option<Profile>> {
        let row = sqlx::query(
            r#"
            SELECT id, email, full_name, subscription_status, subscription_plan,
                   subscription_end_date, is_admin, created_at
            FROM profiles
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(profile_from_row).transpose()
    }

    async fn insert_profile_if_missing(&self, profile: &Profile) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO profiles
                (id, email, full_name, subscription_status, subscription_plan,
                 subscription_end_date, is_admin, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(profile.id)
        .bind(&profile.email)
        .bind(&profile.full_name)
        .bind(profile.subscription_status.as_str())
        .bind(profile.subscription_plan.map(|p| p.as_str()))
        .bind(profile.subscription_end_date)
        .bind(profile.is_admin)
        .bind(profile.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_subscription_status(
        &self,
        user_id: Uuid,
        status: SubscriptionStatus,
        plan: Option<SubscriptionPlan>,
        end_date: Option<DateTime<Utc>>,
    ) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE profiles
            SET subscription_status = $2, subscription_plan = $3, subscription_end_date = $4
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(status.as_str())
        .bind(plan.map(|p| p.as_str()))
        .bind(end_date)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Profile {} not found", user_id)));
        }

        Ok(())
    }

    async fn list_purchases(&self, user_id: Uuid) -> AppResult<Vec<Purchase>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, video_id, amount_paid, purchased_at
            FROM purchases
            WHERE user_id = $1
            ORDER BY purchased_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| purchase_from_row(row).map_err(AppError::from))
            .collect()
    }

    async fn insert_purchase(&self, purchase: &Purchase) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO purchases (id, user_id, video_id, amount_paid, purchased_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(purchase.id)
        .bind(purchase.user_id)
        .bind(purchase.video_id)
        .bind(purchase.amount_paid)
        .bind(purchase.purchased_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("Video already purchased".to_string())
            } else {
                AppError::Database(e)
            }
        })?;

        Ok(())
    }

    async fn insert_subscription(&self, subscription: &Subscription) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO subscriptions
                (id, user_id, plan, start_date, end_date, amount_paid, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(subscription.id)
        .bind(subscription.user_id)
        .bind(subscription.plan.as_str())
        .bind(subscription.start_date)
        .bind(subscription.end_date)
        .bind(subscription.amount_paid)
        .bind(subscription.status.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_subscriptions(&self, user_id: Uuid) -> AppResult<Vec<Subscription>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, plan, start_date, end_date, amount_paid, status
            FROM subscriptions
            WHERE user_id = $1
            ORDER BY start_date DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(subscription_from_row).collect()
    }

    async fn get_progress(
        &self,
        user_id: Uuid,
        video_id: Uuid,
    ) -> AppResult<Option<WatchProgress>> {
        let row = sqlx::query(
            r#"
            SELECT user_id, video_id, progress_seconds, duration_seconds, completed, last_watched_at
            FROM watch_progress
            WHERE user_id = $1 AND video_id = $2
            "#,
        )
        .bind(user_id)
        .bind(video_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(progress_from_row).transpose()?)
    }

    async fn list_progress(&self, user_id: Uuid) -> AppResult<Vec<WatchProgress>> {
        let rows = sqlx::query(
            r#"
            SELECT user_id, video_id, progress_seconds, duration_seconds, completed, last_watched_at
            FROM watch_progress
            WHERE user_id = $1
            ORDER BY last_watched_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| progress_from_row(row).map_err(AppError::from))
            .collect()
    }

    async fn list_progress_between(
        &self,
        user_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<WatchProgress>> {
        let rows = sqlx::query(
            r#"
            SELECT user_id, video_id, progress_seconds, duration_seconds, completed, last_watched_at
            FROM watch_progress
            WHERE user_id = $1 AND last_watched_at >= $2 AND last_watched_at < $3
            "#,
        )
        .bind(user_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| progress_from_row(row).map_err(AppError::from))
            .collect()
    }

    async fn upsert_progress(&self, progress: &WatchProgress) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO watch_progress
                (user_id, video_id, progress_seconds, duration_seconds, completed, last_watched_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id, video_id) DO UPDATE
            SET progress_seconds = EXCLUDED.progress_seconds,
                duration_seconds = EXCLUDED.duration_seconds,
                completed = EXCLUDED.completed,
                last_watched_at = EXCLUDED.last_watched_at,
                updated_at = now()
            "#,
        )
        .bind(progress.user_id)
        .bind(progress.video_id)
        .bind(progress.progress_seconds)
        .bind(progress.duration_seconds)
        .bind(progress.completed)
        .bind(progress.last_watched_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_feedback(
        &self,
        user_id: Uuid,
        video_id: Uuid,
    ) -> AppResult<Option<FeedbackType>> {
        let feedback: Option<String> = sqlx::query_scalar(
            r#"
            SELECT feedback_type FROM video_feedback
            WHERE user_id = $1 AND video_id = $2
            "#,
        )
        .bind(user_id)
        .bind(video_id)
        .fetch_optional(&self.pool)
        .await?;

        feedback.map(|f| f.parse()).transpose()
    }

    async fn upsert_feedback(
        &self,
        user_id: Uuid,
        video_id: Uuid,
        feedback: FeedbackType,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO video_feedback (user_id, video_id, feedback_type)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, video_id) DO UPDATE
            SET feedback_type = EXCLUDED.feedback_type
            "#,
        )
        .bind(user_id)
        .bind(video_id)
        .bind(feedback.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_feedback(&self, user_id: Uuid, video_id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM video_feedback WHERE user_id = $1 AND video_id = $2")
            .bind(user_id)
            .bind(video_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
