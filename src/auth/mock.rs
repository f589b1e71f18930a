//! Development stand-in for the hosted auth service
//!
//! Credentials are compared as plain strings against an in-memory account
//! list. There is no hashing and no real token issuance; do not expose this
//! provider outside local development.
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{AuthProvider, AuthSession, AuthUser};
use crate::{
    error::{AppError, AppResult},
    models::{Profile, SubscriptionStatus},
};

pub const DEMO_PASSWORD: &str = "password123";

#[derive(Debug, Clone)]
struct MockAccount {
    id: Uuid,
    email: String,
    password: String,
    full_name: String,
    subscription_status: SubscriptionStatus,
}

impl MockAccount {
    fn user(&self) -> AuthUser {
        AuthUser {
            id: self.id,
            email: self.email.clone(),
            full_name: Some(self.full_name.clone()),
        }
    }
}

/// The free, pay-per-view and subscriber demo accounts
fn demo_accounts() -> Vec<MockAccount> {
    [
        (1u128, "free@taxtalkpro.com", "Free User", SubscriptionStatus::Free),
        (2, "payper@taxtalkpro.com", "Pay-Per-View User", SubscriptionStatus::Free),
        (3, "subscriber@taxtalkpro.com", "Subscriber", SubscriptionStatus::Active),
    ]
    .into_iter()
    .map(|(n, email, name, status)| MockAccount {
        id: Uuid::from_u128(n),
        email: email.to_string(),
        password: DEMO_PASSWORD.to_string(),
        full_name: name.to_string(),
        subscription_status: status,
    })
    .collect()
}

pub struct MockProvider {
    accounts: RwLock<Vec<MockAccount>>,
    /// Issued tokens, so a client can restore its session after a reload
    sessions: RwLock<HashMap<String, Uuid>>,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            accounts: RwLock::new(demo_accounts()),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    async fn issue(&self, account: &MockAccount) -> AuthSession {
        let access_token = format!("mock-{}", Uuid::new_v4().simple());
        self.sessions
            .write()
            .await
            .insert(access_token.clone(), account.id);

        AuthSession {
            access_token,
            user: account.user(),
        }
    }
}

#[async_trait::async_trait]
impl AuthProvider for MockProvider {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: Option<String>,
    ) -> AppResult<AuthSession> {
        let account = {
            let mut accounts = self.accounts.write().await;
            if accounts.iter().any(|a| a.email == email) {
                return Err(AppError::Conflict("User already exists".to_string()));
            }

            let account = MockAccount {
                id: Uuid::new_v4(),
                email: email.to_string(),
                password: password.to_string(),
                full_name: full_name.unwrap_or_default(),
                subscription_status: SubscriptionStatus::Free,
            };
            accounts.push(account.clone());
            account
        };

        tracing::info!(user_id = %account.id, provider = "mock", "Account created");
        Ok(self.issue(&account).await)
    }

    async fn sign_in(&self, email: &str, password: &str) -> AppResult<AuthSession> {
        let account = self
            .accounts
            .read()
            .await
            .iter()
            .find(|a| a.email == email && a.password == password)
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("Invalid email or password".to_string()))?;

        Ok(self.issue(&account).await)
    }

    async fn sign_out(&self, access_token: &str) -> AppResult<()> {
        self.sessions.write().await.remove(access_token);
        Ok(())
    }

    async fn current_session(&self, access_token: &str) -> AppResult<Option<AuthSession>> {
        let Some(user_id) = self.sessions.read().await.get(access_token).copied() else {
            return Ok(None);
        };

        let accounts = self.accounts.read().await;
        Ok(accounts
            .iter()
            .find(|a| a.id == user_id)
            .map(|account| AuthSession {
                access_token: access_token.to_string(),
                user: account.user(),
            }))
    }

    fn seed_profiles(&self) -> Vec<Profile> {
        demo_accounts()
            .into_iter()
            .map(|account| {
                let mut profile =
                    Profile::new(account.id, account.email, Some(account.full_name));
                profile.subscription_status = account.subscription_status;
                profile
            })
            .collect()
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
