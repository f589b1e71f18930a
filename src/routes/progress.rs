use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use super::{AppState, Viewer};
use crate::{
    error::{AppError, AppResult},
    models::WatchProgress,
    services::progress::{resume_point, ProgressUpdate, ResumePoint, SaveOutcome},
};

#[derive(Debug, Deserialize)]
pub struct ResumeQuery {
    #[serde(default)]
    restart: bool,
}

pub async fn list_progress(
    State(state): State<AppState>,
    viewer: Viewer,
) -> AppResult<Json<Vec<WatchProgress>>> {
    let mut rows: Vec<WatchProgress> = state
        .tracker
        .load_all(viewer.user.id)
        .await?
        .into_values()
        .collect();
    rows.sort_by(|a, b| b.last_watched_at.cmp(&a.last_watched_at));

    Ok(Json(rows))
}

pub async fn resume(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(video_id): Path<Uuid>,
    Query(params): Query<ResumeQuery>,
) -> AppResult<Json<ResumePoint>> {
    let progress = state.tracker.load(viewer.user.id, video_id).await?;
    Ok(Json(resume_point(video_id, progress.as_ref(), params.restart)))
}

/// Player position report; persistence failures come back as `saved: false`
///
/// Unknown videos are rejected with 404 so no progress row outlives the
/// catalog. A failed catalog lookup is logged and the save still goes ahead.
pub async fn save_progress(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(video_id): Path<Uuid>,
    Json(update): Json<ProgressUpdate>,
) -> AppResult<Json<SaveOutcome>> {
    match state.catalog.video(video_id).await {
        Ok(_) => {}
        Err(e @ AppError::NotFound(_)) => return Err(e),
        Err(e) => {
            tracing::warn!(video_id = %video_id, error = %e, "Video lookup failed before progress save");
        }
    }

    Ok(Json(state.tracker.record(viewer.user.id, video_id, update).await))
}
