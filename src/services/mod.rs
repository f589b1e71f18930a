pub mod access;
pub mod billing;
pub mod catalog;
pub mod connectivity;
pub mod feedback;
pub mod progress;
pub mod recommendations;
pub mod stats;

pub use billing::BillingService;
pub use catalog::CatalogService;
pub use feedback::FeedbackService;
pub use progress::ProgressTracker;
pub use stats::StatsService;
