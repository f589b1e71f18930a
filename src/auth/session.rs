use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use super::{AuthProvider, AuthSession, AuthUser};
use crate::{
    db::Store,
    error::{AppError, AppResult},
    models::Profile,
};

/// Lifecycle of a client session
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Anonymous,
    Authenticating,
    Authenticated,
    SignedOut,
}

impl SessionState {
    fn transition(self, to: SessionState) -> AppResult<SessionState> {
        use SessionState::*;

        let allowed = matches!(
            (self, to),
            (Anonymous | SignedOut, Authenticating)
                | (Authenticating, Authenticated)
                | (Authenticating, Anonymous)
                | (Authenticated, SignedOut)
        );

        if allowed {
            Ok(to)
        } else {
            Err(AppError::Internal(format!(
                "Invalid session transition {:?} -> {:?}",
                self, to
            )))
        }
    }
}

/// Explicit session object handed to handlers instead of ambient global state
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub state: SessionState,
    #[serde(skip)]
    pub access_token: Option<String>,
    pub user: Option<AuthUser>,
}

impl Default for Session {
    fn default() -> Self {
        Self::anonymous()
    }
}

impl Session {
    pub fn anonymous() -> Self {
        Self {
            state: SessionState::Anonymous,
            access_token: None,
            user: None,
        }
    }

    pub fn begin(&mut self) -> AppResult<()> {
        self.state = self.state.transition(SessionState::Authenticating)?;
        Ok(())
    }

    pub fn authenticate(&mut self, auth: AuthSession) -> AppResult<()> {
        self.state = self.state.transition(SessionState::Authenticated)?;
        self.access_token = Some(auth.access_token);
        self.user = Some(auth.user);
        Ok(())
    }

    /// Back to anonymous after a failed attempt
    pub fn fail(&mut self) -> AppResult<()> {
        self.state = self.state.transition(SessionState::Anonymous)?;
        self.access_token = None;
        self.user = None;
        Ok(())
    }

    pub fn sign_out(&mut self) -> AppResult<()> {
        self.state = self.state.transition(SessionState::SignedOut)?;
        self.user = None;
        Ok(())
    }

    pub fn is_authenticated(&self) -> bool {
        self.state == SessionState::Authenticated
    }
}

/// Sessions idle longer than this are dropped from the registry
const IDLE_SESSION_TTL: Duration = Duration::from_secs(60 * 60);

/// Signed-out tokens remembered for a friendly 401; oldest evicted first
const SIGNED_OUT_CAPACITY: usize = 1024;

/// Authenticated sessions seen by this process plus a bounded denylist of
/// signed-out tokens
#[derive(Default)]
struct Registry {
    active: HashMap<String, (Session, Instant)>,
    signed_out: VecDeque<String>,
}

impl Registry {
    fn remember(&mut self, token: String, session: Session, now: Instant) {
        self.active
            .retain(|_, (_, seen)| now.saturating_duration_since(*seen) < IDLE_SESSION_TTL);
        self.signed_out.retain(|t| t != &token);
        self.active.insert(token, (session, now));
    }

    fn touch(&mut self, token: &str, now: Instant) {
        if let Some((_, seen)) = self.active.get_mut(token) {
            *seen = now;
        }
    }

    fn forget(&mut self, token: &str) -> Option<Session> {
        self.active.remove(token).map(|(session, _)| session)
    }

    fn deny(&mut self, token: &str) {
        if self.is_signed_out(token) {
            return;
        }
        if self.signed_out.len() >= SIGNED_OUT_CAPACITY {
            self.signed_out.pop_front();
        }
        self.signed_out.push_back(token.to_string());
    }

    fn is_signed_out(&self, token: &str) -> bool {
        self.signed_out.iter().any(|t| t == token)
    }
}

/// Injected session service: runs the lifecycle against the configured
/// provider and keeps one profile row per authenticated user
pub struct SessionService {
    provider: Arc<dyn AuthProvider>,
    store: Arc<dyn Store>,
    registry: RwLock<Registry>,
}

impl SessionService {
    pub fn new(provider: Arc<dyn AuthProvider>, store: Arc<dyn Store>) -> Self {
        Self {
            provider,
            store,
            registry: RwLock::new(Registry::default()),
        }
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Writes the provider's seed profiles (demo accounts) into the store
    pub async fn seed_profiles(&self) -> AppResult<usize> {
        let profiles = self.provider.seed_profiles();
        for profile in &profiles {
            self.store.insert_profile_if_missing(profile).await?;
        }
        Ok(profiles.len())
    }

    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: Option<String>,
    ) -> AppResult<(Session, Profile)> {
        validate_credentials(email, password)?;

        let mut session = Session::anonymous();
        session.begin()?;

        match self.provider.sign_up(email, password, full_name).await {
            Ok(auth) => self.establish(session, auth).await,
            Err(e) => {
                session.fail()?;
                tracing::warn!(provider = self.provider.name(), error = %e, "Sign-up failed");
                Err(e)
            }
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> AppResult<(Session, Profile)> {
        let mut session = Session::anonymous();
        session.begin()?;

        match self.provider.sign_in(email, password).await {
            Ok(auth) => self.establish(session, auth).await,
            Err(e) => {
                session.fail()?;
                tracing::info!(provider = self.provider.name(), "Sign-in rejected");
                Err(e)
            }
        }
    }

    /// Marks the token signed out; provider failures are logged, not returned
    pub async fn sign_out(&self, access_token: &str) -> AppResult<()> {
        if let Err(e) = self.provider.sign_out(access_token).await {
            tracing::error!(provider = self.provider.name(), error = %e, "Provider sign-out failed");
        }

        let mut registry = self.registry.write().await;
        if let Some(mut session) = registry.forget(access_token) {
            session.sign_out()?;
        }
        registry.deny(access_token);

        Ok(())
    }

    /// Resolves a bearer token to an authenticated session
    ///
    /// Every call re-validates the token with the provider, so tokens that
    /// expired or were revoked upstream stop working here too. Tokens unknown
    /// to this process are restored, so a client keeps its session across
    /// service restarts and page reloads.
    pub async fn resolve(&self, access_token: &str) -> AppResult<Session> {
        if self.registry.read().await.is_signed_out(access_token) {
            return Err(AppError::Unauthorized("Session signed out".to_string()));
        }

        let Some(auth) = self.provider.current_session(access_token).await? else {
            self.registry.write().await.forget(access_token);
            return Err(AppError::Unauthorized(
                "Invalid or expired session".to_string(),
            ));
        };

        let cached = self
            .registry
            .read()
            .await
            .active
            .get(access_token)
            .map(|(session, _)| session.clone())
            .filter(|session| session.user.as_ref().map(|u| u.id) == Some(auth.user.id));

        if let Some(session) = cached {
            self.registry.write().await.touch(access_token, Instant::now());
            return Ok(session);
        }

        let mut session = Session::anonymous();
        session.begin()?;
        let (session, _) = self.establish(session, auth).await?;
        Ok(session)
    }

    /// Profile of an authenticated user, created on first sight
    pub async fn profile_for(&self, user: &AuthUser) -> AppResult<Profile> {
        if let Some(profile) = self.store.get_profile(user.id).await? {
            return Ok(profile);
        }

        let profile = Profile::new(user.id, user.email.clone(), user.full_name.clone());
        self.store.insert_profile_if_missing(&profile).await?;

        Ok(self.store.get_profile(user.id).await?.unwrap_or(profile))
    }

    async fn establish(&self, mut session: Session, auth: AuthSession) -> AppResult<(Session, Profile)> {
        let token = auth.access_token.clone();
        session.authenticate(auth)?;

        let user = session
            .user
            .as_ref()
            .ok_or_else(|| AppError::Internal("Authenticated session without user".to_string()))?;
        let profile = self.profile_for(user).await?;

        tracing::info!(
            user_id = %profile.id,
            provider = self.provider.name(),
            "Session established"
        );

        self.registry
            .write()
            .await
            .remember(token, session.clone(), Instant::now());
        Ok((session, profile))
    }
}

fn validate_credentials(email: &str, password: &str) -> AppResult<()> {
    if !email.contains('@') {
        return Err(AppError::InvalidInput("A valid email is required".to_string()));
    }
    if password.len() < 6 {
        return Err(AppError::InvalidInput(
            "Password must be at least 6 characters".to_string(),
        ));
    }
    Ok(())
}
