use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use super::{AppState, Viewer};
use crate::{
    error::AppResult,
    models::{Purchase, SubscriptionPlan},
    services::{
        billing::{AccountSummary, SubscribeOutcome},
        stats::LearningStats,
    },
};

#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    pub plan: SubscriptionPlan,
}

pub async fn purchase(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(video_id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<Purchase>)> {
    let purchase = state.billing.purchase(viewer.user.id, video_id).await?;
    Ok((StatusCode::CREATED, Json(purchase)))
}

pub async fn subscribe(
    State(state): State<AppState>,
    viewer: Viewer,
    Json(request): Json<SubscribeRequest>,
) -> AppResult<(StatusCode, Json<SubscribeOutcome>)> {
    let outcome = state.billing.subscribe(viewer.user.id, request.plan).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

pub async fn account(
    State(state): State<AppState>,
    viewer: Viewer,
) -> AppResult<Json<AccountSummary>> {
    Ok(Json(state.billing.account(viewer.user.id).await?))
}

pub async fn learning_stats(
    State(state): State<AppState>,
    viewer: Viewer,
) -> AppResult<Json<LearningStats>> {
    Ok(Json(state.stats.for_user(viewer.user.id, Utc::now()).await?))
}
