use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::repo_tx::StorageTx;
use chrono::{DateTime, Utc};

/// One record per issued refresh token, keyed by the token's `jti`.
///
/// Lifecycle: inserted ACTIVE, then either rotated (revoked with a
/// `replaced_by` pointer to its successor), revoked manually (logout,
/// revoke-all), or left to expire by the clock. Records are never deleted
/// except to clear a duplicate id during rotation and by the hygiene
/// sweeper.
#[derive(Debug, Clone)]
pub struct RefreshTokenRecord {
    pub id: TokenId,
    pub user_id: UserId,
    /// Hash of the raw signed token; the raw token itself is never stored.
    pub token_hash: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub replaced_by: Option<TokenId>,
    pub user_agent: Option<String>,
    pub ip: Option<String>,
}

impl RefreshTokenRecord {
    /// A record expiring exactly now is already unusable.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    /// Revoked because a successor took its place. Presenting the token of
    /// a rotated record is the replay signal.
    pub fn is_rotated(&self) -> bool {
        self.revoked_at.is_some() && self.replaced_by.is_some()
    }
}

#[async_trait::async_trait]
pub trait RefreshTokenRepo: Send + Sync {
    async fn insert(&self, record: &RefreshTokenRecord) -> Result<(), AuthError>;

    async fn insert_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        record: &RefreshTokenRecord,
    ) -> Result<(), AuthError>;

    async fn get(&self, id: TokenId) -> Result<Option<RefreshTokenRecord>, AuthError>;

    /// Remove any record with this id. Used before re-inserting under the
    /// same `jti` inside a rotation transaction.
    async fn delete_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        id: TokenId,
    ) -> Result<(), AuthError>;

    /// Conditionally mark a record rotated: sets `revoked_at` and
    /// `replaced_by` only when the record is still unrevoked. Returns
    /// false when a concurrent rotation already consumed it.
    async fn mark_rotated_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        id: TokenId,
        replaced_by: TokenId,
        at: DateTime<Utc>,
    ) -> Result<bool, AuthError>;

    /// Revoke one record; a no-op when it is already revoked or missing.
    async fn revoke(&self, id: TokenId, at: DateTime<Utc>) -> Result<(), AuthError>;

    /// Revoke every unrevoked record of one user. Returns the number of
    /// records touched.
    async fn revoke_all_for_user(&self, user_id: UserId, at: DateTime<Utc>)
    -> Result<u64, AuthError>;

    /// Storage hygiene only; correctness never depends on it.
    async fn delete_expired(&self, before: DateTime<Utc>) -> Result<u64, AuthError>;
}
