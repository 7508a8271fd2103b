use super::backend::{MemoryInner, lock};
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use std::sync::Arc;

pub struct MemoryUserRepo {
    pub(crate) inner: Arc<MemoryInner>,
}

#[async_trait::async_trait]
impl UserRepo for MemoryUserRepo {
    async fn get_by_id(&self, user_id: UserId) -> Result<Option<UserRecord>, AuthError> {
        Ok(lock(&self.inner.users)?.get(&user_id).cloned())
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<UserRecord>, AuthError> {
        Ok(lock(&self.inner.users)?
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn email_exists(&self, email: &str) -> Result<bool, AuthError> {
        Ok(lock(&self.inner.users)?.values().any(|u| u.email == email))
    }

    async fn create_in_tx<'t>(
        &self,
        _tx: &mut dyn StorageTx<'t>,
        record: &UserRecord,
    ) -> Result<(), AuthError> {
        let mut users = lock(&self.inner.users)?;
        if users.values().any(|u| u.email == record.email) {
            return Err(AuthError::Conflict);
        }
        users.insert(record.user_id, record.clone());
        Ok(())
    }
}
