//! Hosted backend auth provider
//!
//! Talks to the backend's GoTrue-compatible REST endpoints:
//! 1. Sign-up: POST /auth/v1/signup
//! 2. Sign-in: POST /auth/v1/token?grant_type=password
//! 3. Sign-out: POST /auth/v1/logout (bearer)
//! 4. Current user: GET /auth/v1/user (bearer)
use reqwest::{Client as HttpClient, StatusCode};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::{AuthProvider, AuthSession, AuthUser};
use crate::error::{AppError, AppResult};

#[derive(Clone)]
pub struct HostedProvider {
    http_client: HttpClient,
    api_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct ApiUserMetadata {
    #[serde(default)]
    full_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUser {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_metadata: Option<ApiUserMetadata>,
}

impl From<ApiUser> for AuthUser {
    fn from(user: ApiUser) -> Self {
        AuthUser {
            id: user.id,
            email: user.email.unwrap_or_default(),
            full_name: user.user_metadata.and_then(|m| m.full_name),
        }
    }
}

/// Token grant / sign-up response; sign-up omits the token when email
/// confirmation is pending
#[derive(Debug, Deserialize)]
struct ApiSession {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    user: Option<ApiUser>,
}

impl ApiSession {
    fn into_session(self) -> AppResult<AuthSession> {
        match (self.access_token, self.user) {
            (Some(access_token), Some(user)) => Ok(AuthSession {
                access_token,
                user: user.into(),
            }),
            (None, Some(_)) => Err(AppError::Unauthorized(
                "Check your email to confirm your account".to_string(),
            )),
            _ => Err(AppError::ExternalApi(
                "Auth response did not include a session".to_string(),
            )),
        }
    }
}

impl HostedProvider {
    pub fn new(api_url: String, api_key: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.api_url, path)
    }

    async fn error_from(response: reqwest::Response) -> AppError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        AppError::ExternalApi(format!("Auth API returned status {}: {}", status, body))
    }
}

#[async_trait::async_trait]
impl AuthProvider for HostedProvider {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: Option<String>,
    ) -> AppResult<AuthSession> {
        let response = self
            .http_client
            .post(self.endpoint("signup"))
            .header("apikey", &self.api_key)
            .json(&json!({
                "email": email,
                "password": password,
                "data": { "full_name": full_name },
            }))
            .send()
            .await?;

        match response.status() {
            s if s.is_success() => response.json::<ApiSession>().await?.into_session(),
            StatusCode::UNPROCESSABLE_ENTITY | StatusCode::BAD_REQUEST => {
                let body = response.text().await.unwrap_or_default();
                Err(AppError::InvalidInput(body))
            }
            _ => Err(Self::error_from(response).await),
        }
    }

    async fn sign_in(&self, email: &str, password: &str) -> AppResult<AuthSession> {
        let response = self
            .http_client
            .post(self.endpoint("token"))
            .query(&[("grant_type", "password")])
            .header("apikey", &self.api_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        match response.status() {
            s if s.is_success() => response.json::<ApiSession>().await?.into_session(),
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => Err(AppError::Unauthorized(
                "Invalid email or password".to_string(),
            )),
            _ => Err(Self::error_from(response).await),
        }
    }

    async fn sign_out(&self, access_token: &str) -> AppResult<()> {
        let response = self
            .http_client
            .post(self.endpoint("logout"))
            .header("apikey", &self.api_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        Ok(())
    }

    async fn current_session(&self, access_token: &str) -> AppResult<Option<AuthSession>> {
        let response = self
            .http_client
            .get(self.endpoint("user"))
            .header("apikey", &self.api_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        match response.status() {
            s if s.is_success() => {
                let user: ApiUser = response.json().await?;
                Ok(Some(AuthSession {
                    access_token: access_token.to_string(),
                    user: user.into(),
                }))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(None),
            _ => Err(Self::error_from(response).await),
        }
    }

    fn name(&self) -> &'static str {
        "hosted"
    }
}
