use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::warn;

/// Refresh-token lifecycle over the injected persistence port.
///
/// Per-record states: ACTIVE, ROTATED (revoked with a successor), REVOKED
/// (manual), EXPIRED (implicit, by clock). Rotation consumes the old
/// record inside one transaction; presenting a token whose record is
/// already ROTATED burns the whole successor lineage.
pub struct RealRefreshTokenStore {
    repo: Arc<dyn RefreshTokenRepo>,
    token_codec: Arc<dyn TokenCodec>,
    hasher: Arc<dyn CredentialHasher>,
    tx_manager: Arc<dyn TxManager>,
}

impl RealRefreshTokenStore {
    pub fn new(
        repo: Arc<dyn RefreshTokenRepo>,
        token_codec: Arc<dyn TokenCodec>,
        hasher: Arc<dyn CredentialHasher>,
        tx_manager: Arc<dyn TxManager>,
    ) -> Self {
        Self {
            repo,
            token_codec,
            hasher,
            tx_manager,
        }
    }

    /// Walk the `replaced_by` chain from `start`, revoking every record on
    /// the way. Invoked when a rotated token resurfaces: its successors may
    /// be in an attacker's hands.
    async fn revoke_lineage(&self, start: TokenId, now: DateTime<Utc>) -> Result<(), AuthError> {
        let mut next = Some(start);
        while let Some(id) = next {
            let Some(rec) = self.repo.get(id).await? else {
                break;
            };
            if rec.revoked_at.is_none() {
                self.repo.revoke(id, now).await?;
            }
            next = rec.replaced_by;
        }
        Ok(())
    }

    fn build_record(
        verified: &VerifiedRefresh,
        user_id: UserId,
        token_hash: String,
        meta: &SessionMeta,
        now: DateTime<Utc>,
    ) -> RefreshTokenRecord {
        RefreshTokenRecord {
            id: verified.token_id,
            user_id,
            token_hash,
            issued_at: now,
            expires_at: verified.expires_at,
            revoked_at: None,
            replaced_by: None,
            user_agent: meta.user_agent.clone(),
            ip: meta.ip.clone(),
        }
    }
}

#[async_trait::async_trait]
impl RefreshTokenStore for RealRefreshTokenStore {
    async fn create(
        &self,
        user_id: UserId,
        raw: &RefreshToken,
        meta: &SessionMeta,
    ) -> Result<TokenId, AuthError> {
        let verified = self.token_codec.verify_refresh(raw).await?;
        if verified.user_id != user_id {
            return Err(AuthError::SubjectMismatch);
        }

        let token_hash = self.hasher.hash(&raw.0).await?;
        let record = Self::build_record(&verified, user_id, token_hash, meta, Utc::now());
        self.repo.insert(&record).await?;
        Ok(record.id)
    }

    async fn exists(&self, raw: &RefreshToken) -> Result<bool, AuthError> {
        let Ok(verified) = self.token_codec.verify_refresh(raw).await else {
            return Ok(false);
        };
        let Some(rec) = self.repo.get(verified.token_id).await? else {
            return Ok(false);
        };

        let now = Utc::now();
        if rec.is_rotated() {
            warn!(token = %rec.id, user = %rec.user_id, "rotated refresh token presented, revoking lineage");
            if let Some(successor) = rec.replaced_by {
                self.revoke_lineage(successor, now).await?;
            }
            return Ok(false);
        }
        if rec.is_revoked() || rec.is_expired(now) {
            return Ok(false);
        }

        self.hasher.verify(&raw.0, &rec.token_hash).await
    }

    async fn rotate(
        &self,
        old_raw: &RefreshToken,
        new_raw: &RefreshToken,
        meta: &SessionMeta,
    ) -> Result<(TokenId, TokenId), AuthError> {
        let old = self
            .token_codec
            .verify_refresh(old_raw)
            .await
            .map_err(|_| AuthError::Unauthorized)?;
        let new = self
            .token_codec
            .verify_refresh(new_raw)
            .await
            .map_err(|_| AuthError::Unauthorized)?;

        let now = Utc::now();
        let Some(old_rec) = self.repo.get(old.token_id).await? else {
            return Err(AuthError::Unauthorized);
        };

        if old_rec.is_rotated() {
            warn!(token = %old_rec.id, user = %old_rec.user_id, "rotated refresh token replayed, revoking lineage");
            if let Some(successor) = old_rec.replaced_by {
                self.revoke_lineage(successor, now).await?;
            }
            return Err(AuthError::Unauthorized);
        }
        if old_rec.is_revoked() || old_rec.is_expired(now) {
            return Err(AuthError::Unauthorized);
        }
        if !self.hasher.verify(&old_raw.0, &old_rec.token_hash).await? {
            return Err(AuthError::Unauthorized);
        }
        if new.user_id != old_rec.user_id {
            return Err(AuthError::SubjectMismatch);
        }

        let new_hash = self.hasher.hash(&new_raw.0).await?;
        let new_rec = Self::build_record(&new, old_rec.user_id, new_hash, meta, now);

        let mut tx = self
            .tx_manager
            .begin()
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?;

        // Consuming the old record decides concurrent rotations: only one
        // caller can flip it from unrevoked to rotated. The loser observes
        // the flip and fails as a detected reuse.
        if !self
            .repo
            .mark_rotated_in_tx(tx.as_mut(), old_rec.id, new_rec.id, now)
            .await?
        {
            let _ = tx.rollback().await;
            return Err(AuthError::Unauthorized);
        }

        // A retried client request can re-present a jti that already has a
        // record; clear it before inserting under the same key.
        self.repo.delete_in_tx(tx.as_mut(), new_rec.id).await?;
        self.repo.insert_in_tx(tx.as_mut(), &new_rec).await?;

        tx.commit()
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?;

        Ok((old_rec.id, new_rec.id))
    }

    async fn remove(&self, raw: &RefreshToken) -> Result<(), AuthError> {
        let verified = self
            .token_codec
            .verify_refresh(raw)
            .await
            .map_err(|_| AuthError::Unauthorized)?;
        self.repo.revoke(verified.token_id, Utc::now()).await
    }

    async fn revoke_all_for_user(&self, user_id: UserId) -> Result<u64, AuthError> {
        self.repo.revoke_all_for_user(user_id, Utc::now()).await
    }
}
