use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    db::Store,
    error::{AppError, AppResult},
    models::{
        Profile, Purchase, Subscription, SubscriptionPlan, SubscriptionRecordStatus,
        SubscriptionStatus, WatchProgress,
    },
};

/// Plan label shown on the account page
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum DisplayPlan {
    Premium,
    #[serde(rename = "Pay-Per-View")]
    PayPerView,
    Free,
}

impl DisplayPlan {
    pub fn for_viewer(is_subscriber: bool, purchase_count: usize) -> Self {
        if is_subscriber {
            DisplayPlan::Premium
        } else if purchase_count > 0 {
            DisplayPlan::PayPerView
        } else {
            DisplayPlan::Free
        }
    }

    pub fn access_description(&self) -> &'static str {
        match self {
            DisplayPlan::Premium => "Unlimited access",
            DisplayPlan::PayPerView => "Selected videos",
            DisplayPlan::Free => "Limited access",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AccountSummary {
    pub profile: Profile,
    /// Status after applying the end date
    pub effective_status: SubscriptionStatus,
    pub display_plan: DisplayPlan,
    pub access_description: &'static str,
    pub purchase_count: usize,
    pub next_payment_date: Option<DateTime<Utc>>,
    pub videos_started: usize,
    pub videos_completed: usize,
    pub total_watch_minutes: i64,
    /// Subscription history, newest first
    pub subscriptions: Vec<Subscription>,
}

pub fn account_summary(
    profile: Profile,
    purchases: &[Purchase],
    progress: &[WatchProgress],
    subscriptions: Vec<Subscription>,
    now: DateTime<Utc>,
) -> AccountSummary {
    let effective_status = profile.effective_status(now);
    let is_subscriber = effective_status == SubscriptionStatus::Active;
    let display_plan = DisplayPlan::for_viewer(is_subscriber, purchases.len());

    let next_payment_date = if is_subscriber {
        profile.subscription_end_date
    } else {
        None
    };

    let watched_seconds: f64 = progress.iter().map(|p| p.progress_seconds).sum();

    AccountSummary {
        profile,
        effective_status,
        display_plan,
        access_description: display_plan.access_description(),
        purchase_count: purchases.len(),
        next_payment_date,
        videos_started: progress.len(),
        videos_completed: progress.iter().filter(|p| p.completed).count(),
        total_watch_minutes: (watched_seconds / 60.0).round() as i64,
        subscriptions,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscribeOutcome {
    pub subscription: Subscription,
    pub profile: Profile,
}

/// Simulated checkout: records purchases and subscriptions, no payment gateway
pub struct BillingService {
    store: Arc<dyn Store>,
}

impl BillingService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Buys permanent access to one video at its list price
    pub async fn purchase(&self, user_id: Uuid, video_id: Uuid) -> AppResult<Purchase> {
        let video = self
            .store
            .get_video(video_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Video {} not found", video_id)))?;

        let purchase = Purchase {
            id: Uuid::new_v4(),
            user_id,
            video_id,
            amount_paid: video.price,
            purchased_at: Utc::now(),
        };

        self.store.insert_purchase(&purchase).await?;

        tracing::info!(
            user_id = %user_id,
            video_id = %video_id,
            amount_paid = purchase.amount_paid,
            "Video purchased"
        );

        Ok(purchase)
    }

    pub async fn subscribe(&self, user_id: Uuid, plan: SubscriptionPlan) -> AppResult<SubscribeOutcome> {
        let start_date = Utc::now();
        let end_date = plan.period_end(start_date);

        let subscription = Subscription {
            id: Uuid::new_v4(),
            user_id,
            plan,
            start_date,
            end_date,
            amount_paid: plan.price(),
            status: SubscriptionRecordStatus::Active,
        };

        self.store.insert_subscription(&subscription).await?;
        self.store
            .update_subscription_status(
                user_id,
                SubscriptionStatus::Active,
                Some(plan),
                Some(end_date),
            )
            .await?;

        let profile = self
            .store
            .get_profile(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Profile {} not found", user_id)))?;

        tracing::info!(
            user_id = %user_id,
            plan = plan.as_str(),
            end_date = %end_date,
            "Subscription started"
        );

        Ok(SubscribeOutcome {
            subscription,
            profile,
        })
    }

    pub async fn account(&self, user_id: Uuid) -> AppResult<AccountSummary> {
        let (profile, purchases, progress, subscriptions) = tokio::try_join!(
            self.store.get_profile(user_id),
            self.store.list_purchases(user_id),
            self.store.list_progress(user_id),
            self.store.list_subscriptions(user_id),
        )?;

        let profile =
            profile.ok_or_else(|| AppError::NotFound(format!("Profile {} not found", user_id)))?;

        Ok(account_summary(
            profile,
            &purchases,
            &progress,
            subscriptions,
            Utc::now(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemoryStore, MockStore};
    use crate::models::Video;
    use chrono::Duration;

    fn catalog_video(price: f64) -> Video {
        Video {
            id: Uuid::new_v4(),
            title: "Filing your first GST return".to_string(),
            description: String::new(),
            thumbnail_url: String::new(),
            trailer_url: String::new(),
            full_video_url: String::new(),
            duration_minutes: 40,
            price,
            category_id: None,
            category_name: None,
            is_featured: false,
            is_new: false,
            view_count: 0,
            created_at: Utc::now(),
        }
    }

    async fn seeded(video: &Video) -> (Arc<MemoryStore>, Uuid) {
        let store = Arc::new(MemoryStore::with_catalog(Vec::new(), vec![video.clone()]));
        let user = Uuid::new_v4();
        store
            .insert_profile_if_missing(&Profile::new(user, "learner@taxtalkpro.com".to_string(), None))
            .await
            .unwrap();
        (store, user)
    }

    #[test]
    fn test_display_plan() {
        assert_eq!(DisplayPlan::for_viewer(true, 0), DisplayPlan::Premium);
        assert_eq!(DisplayPlan::for_viewer(true, 3), DisplayPlan::Premium);
        assert_eq!(DisplayPlan::for_viewer(false, 1), DisplayPlan::PayPerView);
        assert_eq!(DisplayPlan::for_viewer(false, 0), DisplayPlan::Free);
        assert_eq!(DisplayPlan::PayPerView.access_description(), "Selected videos");
        assert_eq!(
            serde_json::to_string(&DisplayPlan::PayPerView).unwrap(),
            r#""Pay-Per-View""#
        );
    }

    #[test]
    fn test_account_summary_hides_payment_date_when_expired() {
        let now = Utc::now();
        let mut profile = Profile::new(Uuid::new_v4(), "a@b.com".to_string(), None);
        profile.subscription_status = SubscriptionStatus::Active;
        profile.subscription_end_date = Some(now - Duration::days(2));

        let summary = account_summary(profile, &[], &[], Vec::new(), now);
        assert_eq!(summary.effective_status, SubscriptionStatus::Expired);
        assert_eq!(summary.display_plan, DisplayPlan::Free);
        assert!(summary.next_payment_date.is_none());
    }

    #[tokio::test]
    async fn test_purchase_charges_list_price_once() {
        let video = catalog_video(29.99);
        let (store, user) = seeded(&video).await;
        let billing = BillingService::new(store.clone());

        let purchase = billing.purchase(user, video.id).await.unwrap();
        assert_eq!(purchase.amount_paid, 29.99);

        let err = billing.purchase(user, video.id).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let summary = billing.account(user).await.unwrap();
        assert_eq!(summary.purchase_count, 1);
        assert_eq!(summary.display_plan, DisplayPlan::PayPerView);
    }

    #[tokio::test]
    async fn test_purchase_unknown_video_not_found() {
        let video = catalog_video(19.99);
        let (store, user) = seeded(&video).await;
        let err = BillingService::new(store)
            .purchase(user, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_subscribe_activates_profile() {
        let video = catalog_video(19.99);
        let (store, user) = seeded(&video).await;
        let billing = BillingService::new(store.clone());

        let outcome = billing.subscribe(user, SubscriptionPlan::Annual).await.unwrap();
        assert_eq!(outcome.subscription.amount_paid, 999.0);
        assert_eq!(outcome.profile.subscription_status, SubscriptionStatus::Active);
        assert_eq!(outcome.profile.subscription_plan, Some(SubscriptionPlan::Annual));
        assert_eq!(
            outcome.profile.subscription_end_date,
            Some(outcome.subscription.end_date)
        );
        let summary = billing.account(user).await.unwrap();
        assert_eq!(summary.subscriptions, vec![outcome.subscription.clone()]);
        assert_eq!(summary.display_plan, DisplayPlan::Premium);
        assert_eq!(summary.access_description, "Unlimited access");
        assert_eq!(summary.next_payment_date, Some(outcome.subscription.end_date));
    }

    #[tokio::test]
    async fn test_subscribe_stops_when_history_insert_fails() {
        let mut store = MockStore::new();
        store
            .expect_insert_subscription()
            .times(1)
            .returning(|_| Err(AppError::Internal("insert failed".to_string())));
        store.expect_update_subscription_status().never();

        let err = BillingService::new(Arc::new(store))
            .subscribe(Uuid::new_v4(), SubscriptionPlan::Monthly)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
    }

    #[tokio::test]
    async fn test_account_lists_subscription_history_newest_first() {
        let video = catalog_video(19.99);
        let (store, user) = seeded(&video).await;
        let billing = BillingService::new(store.clone());

        billing.subscribe(user, SubscriptionPlan::Monthly).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        billing.subscribe(user, SubscriptionPlan::Annual).await.unwrap();

        let summary = billing.account(user).await.unwrap();
        let plans: Vec<SubscriptionPlan> = summary.subscriptions.iter().map(|s| s.plan).collect();
        assert_eq!(summary.subscriptions.len(), 2);
        assert_eq!(plans[0], SubscriptionPlan::Annual);
        assert_eq!(summary.profile.subscription_plan, Some(SubscriptionPlan::Annual));
    }
}
