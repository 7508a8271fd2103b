use crate::application_port::AuthError;
use crate::domain_model::*;

/// Server-side tracking of issued refresh tokens: one record per token,
/// rotated atomically on use, with replay detection and lineage-wide
/// revocation on reuse.
#[async_trait::async_trait]
pub trait RefreshTokenStore: Send + Sync {
    /// Verify the signed token, bind it to `user_id` (rejecting a token
    /// minted for another subject with [`AuthError::SubjectMismatch`]),
    /// hash it and persist an ACTIVE record under its `jti`.
    async fn create(
        &self,
        user_id: UserId,
        raw: &RefreshToken,
        meta: &SessionMeta,
    ) -> Result<TokenId, AuthError>;

    /// Usability check: the token verifies, its record exists, is
    /// unrevoked and unexpired, and the raw token matches the stored hash.
    /// Any failed condition yields `Ok(false)`, never an error, so callers
    /// can answer with one uniform denial. Observing an already-rotated
    /// record additionally revokes its whole successor lineage.
    async fn exists(&self, raw: &RefreshToken) -> Result<bool, AuthError>;

    /// Atomically replace `old_raw`'s record with one for `new_raw`,
    /// revoking the old record and linking it to its successor. Fails with
    /// [`AuthError::Unauthorized`] when the old token is unknown, revoked,
    /// expired, hash-mismatched, or lost a concurrent rotation race; that
    /// is the reuse-detection outcome, indistinguishable from ordinary
    /// expiry to callers.
    async fn rotate(
        &self,
        old_raw: &RefreshToken,
        new_raw: &RefreshToken,
        meta: &SessionMeta,
    ) -> Result<(TokenId, TokenId), AuthError>;

    /// Revoke the record of one token (logout). Idempotent.
    async fn remove(&self, raw: &RefreshToken) -> Result<(), AuthError>;

    /// Revoke every live session of one user ("log out everywhere",
    /// password change). Returns the number of records revoked.
    async fn revoke_all_for_user(&self, user_id: UserId) -> Result<u64, AuthError>;
}
