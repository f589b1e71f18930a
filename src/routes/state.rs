use std::sync::Arc;
use std::time::Duration;

use crate::{
    auth::{AuthProvider, SessionService},
    config::Config,
    db::{Cache, Store},
    services::{BillingService, CatalogService, FeedbackService, ProgressTracker, StatsService},
};

/// Shared application state
///
/// Every service is built once at startup over the same store and handed to
/// handlers by `State`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub sessions: Arc<SessionService>,
    pub catalog: Arc<CatalogService>,
    pub tracker: Arc<ProgressTracker>,
    pub billing: Arc<BillingService>,
    pub stats: Arc<StatsService>,
    pub feedback: Arc<FeedbackService>,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn Store>,
        provider: Arc<dyn AuthProvider>,
        cache: Option<Cache>,
    ) -> Self {
        let interval = Duration::from_secs(config.progress_save_interval_secs);

        Self {
            sessions: Arc::new(SessionService::new(provider, store.clone())),
            catalog: Arc::new(CatalogService::new(
                store.clone(),
                cache,
                config.free_preview_per_category,
            )),
            tracker: Arc::new(ProgressTracker::new(store.clone(), interval)),
            billing: Arc::new(BillingService::new(store.clone())),
            stats: Arc::new(StatsService::new(store.clone())),
            feedback: Arc::new(FeedbackService::new(store)),
            config: Arc::new(config),
        }
    }
}
