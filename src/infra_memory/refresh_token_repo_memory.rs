use super::backend::{MemoryInner, lock};
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use std::sync::Arc;

pub struct MemoryRefreshTokenRepo {
    pub(crate) inner: Arc<MemoryInner>,
}

#[async_trait::async_trait]
impl RefreshTokenRepo for MemoryRefreshTokenRepo {
    async fn insert(&self, record: &RefreshTokenRecord) -> Result<(), AuthError> {
        let mut tokens = lock(&self.inner.tokens)?;
        if tokens.contains_key(&record.id) {
            return Err(AuthError::Store(format!(
                "duplicate refresh token id {}",
                record.id
            )));
        }
        tokens.insert(record.id, record.clone());
        Ok(())
    }

    async fn insert_in_tx<'t>(
        &self,
        _tx: &mut dyn StorageTx<'t>,
        record: &RefreshTokenRecord,
    ) -> Result<(), AuthError> {
        self.insert(record).await
    }

    async fn get(&self, id: TokenId) -> Result<Option<RefreshTokenRecord>, AuthError> {
        Ok(lock(&self.inner.tokens)?.get(&id).cloned())
    }

    async fn delete_in_tx<'t>(
        &self,
        _tx: &mut dyn StorageTx<'t>,
        id: TokenId,
    ) -> Result<(), AuthError> {
        lock(&self.inner.tokens)?.remove(&id);
        Ok(())
    }

    async fn mark_rotated_in_tx<'t>(
        &self,
        _tx: &mut dyn StorageTx<'t>,
        id: TokenId,
        replaced_by: TokenId,
        at: DateTime<Utc>,
    ) -> Result<bool, AuthError> {
        let mut tokens = lock(&self.inner.tokens)?;
        match tokens.get_mut(&id) {
            Some(rec) if rec.revoked_at.is_none() => {
                rec.revoked_at = Some(at);
                rec.replaced_by = Some(replaced_by);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn revoke(&self, id: TokenId, at: DateTime<Utc>) -> Result<(), AuthError> {
        if let Some(rec) = lock(&self.inner.tokens)?.get_mut(&id) {
            if rec.revoked_at.is_none() {
                rec.revoked_at = Some(at);
            }
        }
        Ok(())
    }

    async fn revoke_all_for_user(
        &self,
        user_id: UserId,
        at: DateTime<Utc>,
    ) -> Result<u64, AuthError> {
        let mut revoked = 0;
        for rec in lock(&self.inner.tokens)?.values_mut() {
            if rec.user_id == user_id && rec.revoked_at.is_none() {
                rec.revoked_at = Some(at);
                revoked += 1;
            }
        }
        Ok(revoked)
    }

    async fn delete_expired(&self, before: DateTime<Utc>) -> Result<u64, AuthError> {
        let mut tokens = lock(&self.inner.tokens)?;
        let len_before = tokens.len();
        tokens.retain(|_, rec| rec.expires_at > before);
        Ok((len_before - tokens.len()) as u64)
    }
}
