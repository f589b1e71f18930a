use std::sync::Arc;
use uuid::Uuid;

use crate::{
    db::Store,
    error::{AppError, AppResult},
    models::FeedbackType,
};

/// Thumbs-style reactions on videos
pub struct FeedbackService {
    store: Arc<dyn Store>,
}

impl FeedbackService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn get(&self, user_id: Uuid, video_id: Uuid) -> AppResult<Option<FeedbackType>> {
        self.store.get_feedback(user_id, video_id).await
    }

    /// Submitting the stored reaction again clears it; anything else replaces it.
    /// Returns the reaction now stored.
    pub async fn toggle(
        &self,
        user_id: Uuid,
        video_id: Uuid,
        feedback: FeedbackType,
    ) -> AppResult<Option<FeedbackType>> {
        if self.store.get_video(video_id).await?.is_none() {
            return Err(AppError::NotFound(format!("Video {} not found", video_id)));
        }

        let current = self.store.get_feedback(user_id, video_id).await?;

        if current == Some(feedback) {
            self.store.delete_feedback(user_id, video_id).await?;
            tracing::debug!(user_id = %user_id, video_id = %video_id, "Feedback cleared");
            return Ok(None);
        }

        self.store.upsert_feedback(user_id, video_id, feedback).await?;
        tracing::debug!(
            user_id = %user_id,
            video_id = %video_id,
            feedback = %feedback,
            "Feedback saved"
        );

        Ok(Some(feedback))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemoryStore, MockStore};
    use crate::models::Video;
    use chrono::Utc;

    fn store_with_video() -> (Arc<MemoryStore>, Uuid) {
        let video = Video {
            id: Uuid::new_v4(),
            title: "Property tax basics".to_string(),
            description: String::new(),
            thumbnail_url: String::new(),
            trailer_url: String::new(),
            full_video_url: String::new(),
            duration_minutes: 20,
            price: 19.99,
            category_id: None,
            category_name: None,
            is_featured: false,
            is_new: false,
            view_count: 0,
            created_at: Utc::now(),
        };
        let id = video.id;
        (Arc::new(MemoryStore::with_catalog(Vec::new(), vec![video])), id)
    }

    #[tokio::test]
    async fn test_toggle_same_type_clears() {
        let (store, video) = store_with_video();
        let service = FeedbackService::new(store);
        let user = Uuid::new_v4();

        assert_eq!(
            service.toggle(user, video, FeedbackType::Like).await.unwrap(),
            Some(FeedbackType::Like)
        );
        assert_eq!(service.toggle(user, video, FeedbackType::Like).await.unwrap(), None);
        assert_eq!(service.get(user, video).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_toggle_other_type_replaces() {
        let (store, video) = store_with_video();
        let service = FeedbackService::new(store);
        let user = Uuid::new_v4();

        service.toggle(user, video, FeedbackType::Like).await.unwrap();
        service.toggle(user, video, FeedbackType::Love).await.unwrap();
        assert_eq!(service.get(user, video).await.unwrap(), Some(FeedbackType::Love));
    }

    #[tokio::test]
    async fn test_toggle_unknown_video() {
        let mut store = MockStore::new();
        store.expect_get_video().returning(|_| Ok(None));
        store.expect_upsert_feedback().never();

        let err = FeedbackService::new(Arc::new(store))
            .toggle(Uuid::new_v4(), Uuid::new_v4(), FeedbackType::NotForMe)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
