use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};

use super::AppState;
use crate::{
    auth::{AuthUser, Session},
    error::AppError,
};

/// Signed-in caller, resolved from the `Authorization: Bearer` header
///
/// Use `Option<Viewer>` on endpoints that also serve anonymous visitors.
#[derive(Debug, Clone)]
pub struct Viewer {
    pub access_token: String,
    pub session: Session,
    pub user: AuthUser,
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[axum::async_trait]
impl FromRequestParts<AppState> for Viewer {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| AppError::Unauthorized("Sign in required".to_string()))?
            .to_string();

        let session = state.sessions.resolve(&token).await?;
        let user = session
            .user
            .clone()
            .ok_or_else(|| AppError::Unauthorized("Session has no user".to_string()))?;

        Ok(Viewer {
            access_token: token,
            session,
            user,
        })
    }
}
