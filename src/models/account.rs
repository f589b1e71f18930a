use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Free,
    Active,
    Expired,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Free => "free",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Expired => "expired",
        }
    }
}

impl Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SubscriptionStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(SubscriptionStatus::Free),
            "active" => Ok(SubscriptionStatus::Active),
            "expired" => Ok(SubscriptionStatus::Expired),
            other => Err(AppError::Internal(format!(
                "Unknown subscription status: {}",
                other
            ))),
        }
    }
}

/// Billing period of a subscription
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionPlan {
    Monthly,
    Annual,
}

impl SubscriptionPlan {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionPlan::Monthly => "monthly",
            SubscriptionPlan::Annual => "annual",
        }
    }

    /// Price charged for one billing period
    pub fn price(&self) -> f64 {
        match self {
            SubscriptionPlan::Monthly => 99.0,
            SubscriptionPlan::Annual => 999.0,
        }
    }

    /// End of the billing period starting at `start`
    pub fn period_end(&self, start: DateTime<Utc>) -> DateTime<Utc> {
        let months = match self {
            SubscriptionPlan::Monthly => Months::new(1),
            SubscriptionPlan::Annual => Months::new(12),
        };
        start.checked_add_months(months).unwrap_or(start)
    }
}

impl FromStr for SubscriptionPlan {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "monthly" => Ok(SubscriptionPlan::Monthly),
            "annual" => Ok(SubscriptionPlan::Annual),
            other => Err(AppError::Internal(format!(
                "Unknown subscription plan: {}",
                other
            ))),
        }
    }
}

/// One profile per auth user; `id` is the auth user id
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub subscription_status: SubscriptionStatus,
    pub subscription_plan: Option<SubscriptionPlan>,
    pub subscription_end_date: Option<DateTime<Utc>>,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

impl Profile {
    /// A fresh profile on the free tier
    pub fn new(id: Uuid, email: String, full_name: Option<String>) -> Self {
        Self {
            id,
            email,
            full_name,
            subscription_status: SubscriptionStatus::Free,
            subscription_plan: None,
            subscription_end_date: None,
            is_admin: false,
            created_at: Utc::now(),
        }
    }

    /// Status as of `now`: an active subscription past its end date counts as expired
    pub fn effective_status(&self, now: DateTime<Utc>) -> SubscriptionStatus {
        match (self.subscription_status, self.subscription_end_date) {
            (SubscriptionStatus::Active, Some(end)) if end < now => SubscriptionStatus::Expired,
            (status, _) => status,
        }
    }

    pub fn is_subscriber(&self, now: DateTime<Utc>) -> bool {
        self.effective_status(now) == SubscriptionStatus::Active
    }
}

/// Permanent access to one video
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Purchase {
    pub id: Uuid,
    pub user_id: Uuid,
    pub video_id: Uuid,
    pub amount_paid: f64,
    pub purchased_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionRecordStatus {
    Active,
    Expired,
    Cancelled,
}

impl SubscriptionRecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionRecordStatus::Active => "active",
            SubscriptionRecordStatus::Expired => "expired",
            SubscriptionRecordStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for SubscriptionRecordStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(SubscriptionRecordStatus::Active),
            "expired" => Ok(SubscriptionRecordStatus::Expired),
            "cancelled" => Ok(SubscriptionRecordStatus::Cancelled),
            other => Err(AppError::Internal(format!(
                "Unknown subscription record status: {}",
                other
            ))),
        }
    }
}

/// Billing history row written on every subscribe
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan: SubscriptionPlan,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub amount_paid: f64,
    pub status: SubscriptionRecordStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_subscription_status_roundtrip_strings() {
        for status in [
            SubscriptionStatus::Free,
            SubscriptionStatus::Active,
            SubscriptionStatus::Expired,
        ] {
            assert_eq!(status.as_str().parse::<SubscriptionStatus>().unwrap(), status);
        }
        assert!("premium".parse::<SubscriptionStatus>().is_err());
    }

    #[test]
    fn test_plan_period_end() {
        let start = Utc.with_ymd_and_hms(2024, 1, 31, 12, 0, 0).unwrap();
        assert_eq!(
            SubscriptionPlan::Monthly.period_end(start),
            Utc.with_ymd_and_hms(2024, 2, 29, 12, 0, 0).unwrap()
        );
        assert_eq!(
            SubscriptionPlan::Annual.period_end(start),
            Utc.with_ymd_and_hms(2025, 1, 31, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_plan_prices() {
        assert_eq!(SubscriptionPlan::Monthly.price(), 99.0);
        assert_eq!(SubscriptionPlan::Annual.price(), 999.0);
    }

    #[test]
    fn test_effective_status_expires_past_end_date() {
        let now = Utc::now();
        let mut profile = Profile::new(Uuid::new_v4(), "a@b.com".to_string(), None);
        profile.subscription_status = SubscriptionStatus::Active;
        profile.subscription_end_date = Some(now + Duration::days(3));
        assert!(profile.is_subscriber(now));

        profile.subscription_end_date = Some(now - Duration::days(1));
        assert_eq!(profile.effective_status(now), SubscriptionStatus::Expired);
        assert!(!profile.is_subscriber(now));
    }

    #[test]
    fn test_active_without_end_date_stays_active() {
        let mut profile = Profile::new(Uuid::new_v4(), "a@b.com".to_string(), None);
        profile.subscription_status = SubscriptionStatus::Active;
        assert!(profile.is_subscriber(Utc::now()));
    }
}
