use crate::domain_model::*;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredential,
    #[error("user not found")]
    NotFound,
    #[error("unauthorized")]
    Unauthorized,
    #[error("forbidden")]
    Forbidden,
    #[error("email already registered")]
    Conflict,
    #[error("token subject mismatch")]
    SubjectMismatch,
    #[error("token invalid")]
    TokenInvalid,
    #[error("token expired")]
    TokenExpired,
    #[error("store error: {0}")]
    Store(String),
    #[error("internal error: {0}")]
    InternalError(String),
}

#[derive(Debug, Clone)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionTokens {
    pub access_token: AccessToken,
    pub refresh_token: RefreshToken,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
}

/// Outcome of a successful login, registration or refresh.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub identity: Identity,
    pub tokens: SessionTokens,
}

#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    async fn login(&self, input: LoginInput, meta: SessionMeta) -> Result<AuthSession, AuthError>;

    async fn register_client(
        &self,
        input: RegisterInput,
        meta: SessionMeta,
    ) -> Result<AuthSession, AuthError>;

    async fn register_seller(
        &self,
        input: RegisterInput,
        meta: SessionMeta,
    ) -> Result<AuthSession, AuthError>;

    /// Only an actor already carrying [`Role::Admin`] may mint admins.
    async fn register_admin(
        &self,
        input: RegisterInput,
        actor: &Identity,
        meta: SessionMeta,
    ) -> Result<AuthSession, AuthError>;

    /// Exchange a refresh token for a fresh session, rotating it. Fails
    /// with [`AuthError::Unauthorized`] when the token is missing, invalid
    /// or reused.
    async fn refresh(
        &self,
        refresh_token: &RefreshToken,
        meta: SessionMeta,
    ) -> Result<AuthSession, AuthError>;

    /// Best-effort revocation; never fails the caller-visible flow.
    async fn logout(&self, refresh_token: &RefreshToken);

    /// Resolve a verified identity from an access token. Every failure
    /// mode collapses into [`AuthError::Unauthorized`].
    async fn authenticate(&self, token: &AccessToken) -> Result<Identity, AuthError>;

    async fn revoke_all_sessions(&self, user_id: UserId) -> Result<u64, AuthError>;
}
