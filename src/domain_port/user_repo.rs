use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::repo_tx::StorageTx;
use chrono::{DateTime, Utc};

/// One row of the user directory. This service reads id/email/roles for
/// authentication and writes a row on registration; everything else about
/// users (stores, orders, favorites) belongs to other subsystems.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub user_id: UserId,
    pub email: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub password_hash: String,
    pub roles: Vec<Role>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[async_trait::async_trait]
pub trait UserRepo: Send + Sync {
    async fn get_by_id(&self, user_id: UserId) -> Result<Option<UserRecord>, AuthError>;

    /// Fetch by unique email (for login).
    async fn get_by_email(&self, email: &str) -> Result<Option<UserRecord>, AuthError>;

    async fn email_exists(&self, email: &str) -> Result<bool, AuthError>;

    /// Insert a row. Fails with [`AuthError::Conflict`] when the email is
    /// already taken (unique constraint).
    async fn create_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        record: &UserRecord,
    ) -> Result<(), AuthError>;
}
