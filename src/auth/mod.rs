//! Authentication capability
//!
//! Two interchangeable providers implement `AuthProvider`: `MockProvider` (fixed
//! demo accounts held in memory) and `HostedProvider` (the hosted backend's
//! auth REST API). Which one is wired is decided once at startup from
//! configuration.
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::AppResult, models::Profile};

pub mod hosted;
pub mod mock;
pub mod session;

pub use hosted::HostedProvider;
pub use mock::MockProvider;
pub use session::{Session, SessionService, SessionState};

/// Identity returned by a provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
}

/// A successful sign-in or sign-up
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthSession {
    pub access_token: String,
    pub user: AuthUser,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: Option<String>,
    ) -> AppResult<AuthSession>;

    async fn sign_in(&self, email: &str, password: &str) -> AppResult<AuthSession>;

    async fn sign_out(&self, access_token: &str) -> AppResult<()>;

    /// Restores the session behind a token, `None` when it is unknown or expired
    async fn current_session(&self, access_token: &str) -> AppResult<Option<AuthSession>>;

    /// Profiles that must exist before the first request (demo accounts)
    fn seed_profiles(&self) -> Vec<Profile> {
        Vec::new()
    }

    /// Provider name for logging
    fn name(&self) -> &'static str;
}
