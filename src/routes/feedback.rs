use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AppState, Viewer};
use crate::{error::AppResult, models::FeedbackType};

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub feedback_type: FeedbackType,
}

#[derive(Debug, Serialize)]
pub struct FeedbackResponse {
    pub video_id: Uuid,
    pub feedback_type: Option<FeedbackType>,
}

pub async fn get_feedback(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(video_id): Path<Uuid>,
) -> AppResult<Json<FeedbackResponse>> {
    let feedback_type = state.feedback.get(viewer.user.id, video_id).await?;
    Ok(Json(FeedbackResponse {
        video_id,
        feedback_type,
    }))
}

pub async fn toggle_feedback(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(video_id): Path<Uuid>,
    Json(request): Json<FeedbackRequest>,
) -> AppResult<Json<FeedbackResponse>> {
    let feedback_type = state
        .feedback
        .toggle(viewer.user.id, video_id, request.feedback_type)
        .await?;

    Ok(Json(FeedbackResponse {
        video_id,
        feedback_type,
    }))
}
