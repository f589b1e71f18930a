pub mod account;
pub mod progress;
pub mod video;

pub use account::{
    Profile, Purchase, Subscription, SubscriptionPlan, SubscriptionRecordStatus,
    SubscriptionStatus,
};
pub use progress::{FeedbackType, PlaybackEvent, WatchProgress};
pub use video::{Category, Video};
