use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use super::{AppState, Viewer};
use crate::{
    error::{AppError, AppResult},
    models::Category,
    services::{
        access::StreamResolution,
        catalog::{HomeFeed, VideoCard, ViewerContext},
        recommendations::ScoredVideo,
    },
};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RecommendationQuery {
    #[serde(default)]
    limit: Option<usize>,
}

async fn context(state: &AppState, viewer: Option<&Viewer>) -> AppResult<Option<ViewerContext>> {
    match viewer {
        Some(viewer) => Ok(Some(state.catalog.viewer_context(viewer.user.id).await?)),
        None => Ok(None),
    }
}

pub async fn list_categories(State(state): State<AppState>) -> AppResult<Json<Vec<Category>>> {
    Ok(Json(state.catalog.categories().await?))
}

pub async fn list_videos(
    State(state): State<AppState>,
    viewer: Option<Viewer>,
    Query(params): Query<SearchQuery>,
) -> AppResult<Json<Vec<VideoCard>>> {
    let ctx = context(&state, viewer.as_ref()).await?;
    let videos = state.catalog.search(params.q.as_deref()).await?;
    Ok(Json(state.catalog.cards(&videos, ctx.as_ref()).await?))
}

pub async fn get_video(
    State(state): State<AppState>,
    viewer: Option<Viewer>,
    Path(video_id): Path<Uuid>,
) -> AppResult<Json<VideoCard>> {
    let ctx = context(&state, viewer.as_ref()).await?;
    let video = state.catalog.video(video_id).await?;
    let card = state
        .catalog
        .cards(std::slice::from_ref(&video), ctx.as_ref())
        .await?
        .pop()
        .ok_or_else(|| AppError::Internal("Video card missing".to_string()))?;

    Ok(Json(card))
}

pub async fn stream(
    State(state): State<AppState>,
    viewer: Option<Viewer>,
    Path(video_id): Path<Uuid>,
) -> AppResult<Json<StreamResolution>> {
    let ctx = context(&state, viewer.as_ref()).await?;
    Ok(Json(state.catalog.stream(video_id, ctx.as_ref()).await?))
}

pub async fn category_videos(
    State(state): State<AppState>,
    viewer: Option<Viewer>,
    Path(category_id): Path<Uuid>,
) -> AppResult<Json<Vec<VideoCard>>> {
    let ctx = context(&state, viewer.as_ref()).await?;
    let videos = state.catalog.videos_in_category(category_id).await?;
    Ok(Json(state.catalog.cards(&videos, ctx.as_ref()).await?))
}

pub async fn home(
    State(state): State<AppState>,
    viewer: Option<Viewer>,
    Query(params): Query<SearchQuery>,
) -> AppResult<Json<HomeFeed>> {
    let ctx = context(&state, viewer.as_ref()).await?;
    let feed = state
        .catalog
        .home(
            params.q.as_deref(),
            ctx.as_ref(),
            state.config.recommendation_limit,
        )
        .await?;
    Ok(Json(feed))
}

pub async fn recommendations(
    State(state): State<AppState>,
    viewer: Viewer,
    Query(params): Query<RecommendationQuery>,
) -> AppResult<Json<Vec<ScoredVideo>>> {
    let ctx = state.catalog.viewer_context(viewer.user.id).await?;
    let limit = params
        .limit
        .unwrap_or(state.config.recommendation_limit)
        .max(1);

    Ok(Json(state.catalog.recommendations(&ctx, limit).await?))
}
