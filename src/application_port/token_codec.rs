use crate::application_port::AuthError;
use crate::domain_model::*;
use chrono::{DateTime, Utc};

/// Claims recovered from a cryptographically valid, unexpired access token.
#[derive(Debug, Clone)]
pub struct VerifiedAccess {
    pub user_id: UserId,
    pub roles: Vec<Role>,
    pub expires_at: DateTime<Utc>,
}

/// Claims recovered from a cryptographically valid, unexpired refresh token.
#[derive(Debug, Clone)]
pub struct VerifiedRefresh {
    pub user_id: UserId,
    pub roles: Vec<Role>,
    pub token_id: TokenId,
    pub expires_at: DateTime<Utc>,
}

/// Signs and verifies the two token classes. Access and refresh tokens use
/// distinct secrets so compromising one key cannot forge the other class.
/// Refresh issuance always generates a fresh [`TokenId`].
#[async_trait::async_trait]
pub trait TokenCodec: Send + Sync {
    async fn issue_access(
        &self,
        user: UserId,
        roles: &[Role],
    ) -> Result<(AccessToken, DateTime<Utc>), AuthError>;

    async fn issue_refresh(
        &self,
        user: UserId,
        roles: &[Role],
    ) -> Result<(RefreshToken, TokenId, DateTime<Utc>), AuthError>;

    /// Signature + expiry check. [`AuthError::TokenExpired`] on expiry,
    /// [`AuthError::TokenInvalid`] on everything else; callers present
    /// both as one uniform unauthenticated outcome.
    async fn verify_access(&self, token: &AccessToken) -> Result<VerifiedAccess, AuthError>;

    async fn verify_refresh(&self, token: &RefreshToken) -> Result<VerifiedRefresh, AuthError>;
}
