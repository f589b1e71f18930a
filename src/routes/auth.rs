use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use super::{AppState, Viewer};
use crate::{
    auth::{AuthUser, Session, SessionState},
    error::AppResult,
    models::Profile,
};

#[derive(Debug, Deserialize)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub full_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub state: SessionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    pub user: Option<AuthUser>,
    pub profile: Profile,
}

impl SessionResponse {
    fn new(session: Session, profile: Profile, include_token: bool) -> Self {
        Self {
            state: session.state,
            access_token: if include_token { session.access_token } else { None },
            user: session.user,
            profile,
        }
    }
}

pub async fn sign_up(
    State(state): State<AppState>,
    Json(request): Json<SignUpRequest>,
) -> AppResult<(StatusCode, Json<SessionResponse>)> {
    let (session, profile) = state
        .sessions
        .sign_up(&request.email, &request.password, request.full_name)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SessionResponse::new(session, profile, true)),
    ))
}

pub async fn sign_in(
    State(state): State<AppState>,
    Json(request): Json<SignInRequest>,
) -> AppResult<Json<SessionResponse>> {
    let (session, profile) = state
        .sessions
        .sign_in(&request.email, &request.password)
        .await?;

    Ok(Json(SessionResponse::new(session, profile, true)))
}

pub async fn sign_out(State(state): State<AppState>, viewer: Viewer) -> AppResult<StatusCode> {
    state.sessions.sign_out(&viewer.access_token).await?;
    tracing::info!(user_id = %viewer.user.id, "Signed out");
    Ok(StatusCode::NO_CONTENT)
}

/// Current session, used by clients to restore state after a reload
pub async fn current_session(
    State(state): State<AppState>,
    viewer: Viewer,
) -> AppResult<Json<SessionResponse>> {
    let profile = state.sessions.profile_for(&viewer.user).await?;
    Ok(Json(SessionResponse::new(viewer.session, profile, false)))
}
