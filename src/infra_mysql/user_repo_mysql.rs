use super::util::{downcast, is_dup_key, uuid_from_bytes};
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};

pub struct MySqlUserRepo {
    pool: MySqlPool,
}

impl MySqlUserRepo {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlUserRepo { pool }
    }

    #[inline]
    fn uid_as_bytes(id: &UserId) -> &[u8] {
        id.0.as_bytes()
    }

    fn row_to_record(row: MySqlRow) -> Result<UserRecord, AuthError> {
        let user_id_bytes: Vec<u8> = row
            .try_get("user_id")
            .map_err(|e| AuthError::Store(e.to_string()))?;
        let user_id = UserId(uuid_from_bytes(&user_id_bytes)?);

        let email: String = row
            .try_get("email")
            .map_err(|e| AuthError::Store(e.to_string()))?;
        let full_name: String = row
            .try_get("full_name")
            .map_err(|e| AuthError::Store(e.to_string()))?;
        let phone: Option<String> = row
            .try_get("phone")
            .map_err(|e| AuthError::Store(e.to_string()))?;
        let password_hash: String = row
            .try_get("password_hash")
            .map_err(|e| AuthError::Store(e.to_string()))?;

        let roles_raw: String = row
            .try_get("roles")
            .map_err(|e| AuthError::Store(e.to_string()))?;
        let roles: Vec<Role> =
            serde_json::from_str(&roles_raw).map_err(|e| AuthError::Store(e.to_string()))?;

        let is_active: bool = row
            .try_get("is_active")
            .map_err(|e| AuthError::Store(e.to_string()))?;
        let created_at: DateTime<Utc> = row
            .try_get("created_at")
            .map_err(|e| AuthError::Store(e.to_string()))?;

        Ok(UserRecord {
            user_id,
            email,
            full_name,
            phone,
            password_hash,
            roles,
            is_active,
            created_at,
        })
    }
}

const SELECT_COLUMNS: &str =
    "user_id, email, full_name, phone, password_hash, roles, is_active, created_at";

#[async_trait::async_trait]
impl UserRepo for MySqlUserRepo {
    async fn get_by_id(&self, user_id: UserId) -> Result<Option<UserRecord>, AuthError> {
        let row_opt: Option<MySqlRow> = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM user WHERE user_id = ?"
        ))
        .bind(Self::uid_as_bytes(&user_id))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AuthError::Store(e.to_string()))?;

        row_opt.map(Self::row_to_record).transpose()
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<UserRecord>, AuthError> {
        let row_opt: Option<MySqlRow> =
            sqlx::query(&format!("SELECT {SELECT_COLUMNS} FROM user WHERE email = ?"))
                .bind(email)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| AuthError::Store(e.to_string()))?;

        row_opt.map(Self::row_to_record).transpose()
    }

    async fn email_exists(&self, email: &str) -> Result<bool, AuthError> {
        let count: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM user WHERE email = ?"#)
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?;

        Ok(count > 0)
    }

    async fn create_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        record: &UserRecord,
    ) -> Result<(), AuthError> {
        let tx = downcast(tx);
        let roles =
            serde_json::to_string(&record.roles).map_err(|e| AuthError::Store(e.to_string()))?;

        sqlx::query(
            r#"
INSERT INTO user (user_id, email, full_name, phone, password_hash, roles, is_active, created_at)
VALUES (?, ?, ?, ?, ?, ?, ?, ?)
"#,
        )
        .bind(Self::uid_as_bytes(&record.user_id))
        .bind(&record.email)
        .bind(&record.full_name)
        .bind(record.phone.as_deref())
        .bind(&record.password_hash)
        .bind(roles)
        .bind(record.is_active)
        .bind(record.created_at)
        .execute(tx.conn())
        .await
        .map_err(|e| {
            if is_dup_key(&e) {
                AuthError::Conflict
            } else {
                AuthError::Store(e.to_string())
            }
        })?;

        Ok(())
    }
}
