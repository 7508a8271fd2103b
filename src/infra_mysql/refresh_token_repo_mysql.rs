use super::util::{downcast, uuid_from_bytes};
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlConnection, MySqlPool, Row};

pub struct MySqlRefreshTokenRepo {
    pool: MySqlPool,
}

impl MySqlRefreshTokenRepo {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlRefreshTokenRepo { pool }
    }

    #[inline]
    fn id_as_bytes(id: &TokenId) -> &[u8] {
        id.0.as_bytes()
    }

    fn row_to_record(row: MySqlRow) -> Result<RefreshTokenRecord, AuthError> {
        let id_bytes: Vec<u8> = row
            .try_get("id")
            .map_err(|e| AuthError::Store(e.to_string()))?;
        let user_id_bytes: Vec<u8> = row
            .try_get("user_id")
            .map_err(|e| AuthError::Store(e.to_string()))?;
        let replaced_by_bytes: Option<Vec<u8>> = row
            .try_get("replaced_by")
            .map_err(|e| AuthError::Store(e.to_string()))?;

        let replaced_by = replaced_by_bytes
            .as_deref()
            .map(uuid_from_bytes)
            .transpose()?
            .map(TokenId);

        Ok(RefreshTokenRecord {
            id: TokenId(uuid_from_bytes(&id_bytes)?),
            user_id: UserId(uuid_from_bytes(&user_id_bytes)?),
            token_hash: row
                .try_get("token_hash")
                .map_err(|e| AuthError::Store(e.to_string()))?,
            issued_at: row
                .try_get("issued_at")
                .map_err(|e| AuthError::Store(e.to_string()))?,
            expires_at: row
                .try_get("expires_at")
                .map_err(|e| AuthError::Store(e.to_string()))?,
            revoked_at: row
                .try_get("revoked_at")
                .map_err(|e| AuthError::Store(e.to_string()))?,
            replaced_by,
            user_agent: row
                .try_get("user_agent")
                .map_err(|e| AuthError::Store(e.to_string()))?,
            ip: row
                .try_get("ip")
                .map_err(|e| AuthError::Store(e.to_string()))?,
        })
    }

    async fn insert_on(
        conn: &mut MySqlConnection,
        record: &RefreshTokenRecord,
    ) -> Result<(), AuthError> {
        sqlx::query(
            r#"
INSERT INTO refresh_token
    (id, user_id, token_hash, issued_at, expires_at, revoked_at, replaced_by, user_agent, ip)
VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
"#,
        )
        .bind(Self::id_as_bytes(&record.id))
        .bind(record.user_id.0.as_bytes() as &[u8])
        .bind(&record.token_hash)
        .bind(record.issued_at)
        .bind(record.expires_at)
        .bind(record.revoked_at)
        .bind(record.replaced_by.as_ref().map(|id| id.0.as_bytes().to_vec()))
        .bind(record.user_agent.as_deref())
        .bind(record.ip.as_deref())
        .execute(conn)
        .await
        .map_err(|e| AuthError::Store(e.to_string()))?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl RefreshTokenRepo for MySqlRefreshTokenRepo {
    async fn insert(&self, record: &RefreshTokenRecord) -> Result<(), AuthError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?;
        Self::insert_on(&mut conn, record).await
    }

    async fn insert_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        record: &RefreshTokenRecord,
    ) -> Result<(), AuthError> {
        let tx = downcast(tx);
        Self::insert_on(tx.conn(), record).await
    }

    async fn get(&self, id: TokenId) -> Result<Option<RefreshTokenRecord>, AuthError> {
        let row_opt: Option<MySqlRow> = sqlx::query(
            r#"
SELECT id, user_id, token_hash, issued_at, expires_at, revoked_at, replaced_by, user_agent, ip
FROM refresh_token
WHERE id = ?
"#,
        )
        .bind(Self::id_as_bytes(&id))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AuthError::Store(e.to_string()))?;

        row_opt.map(Self::row_to_record).transpose()
    }

    async fn delete_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        id: TokenId,
    ) -> Result<(), AuthError> {
        let tx = downcast(tx);

        sqlx::query("DELETE FROM refresh_token WHERE id = ?")
            .bind(Self::id_as_bytes(&id))
            .execute(tx.conn())
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?;

        Ok(())
    }

    async fn mark_rotated_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        id: TokenId,
        replaced_by: TokenId,
        at: DateTime<Utc>,
    ) -> Result<bool, AuthError> {
        let tx = downcast(tx);

        // The revoked_at IS NULL guard makes this the decision point
        // between two rotations racing on the same record.
        let result = sqlx::query(
            r#"
UPDATE refresh_token
SET revoked_at = ?, replaced_by = ?
WHERE id = ? AND revoked_at IS NULL
"#,
        )
        .bind(at)
        .bind(replaced_by.0.as_bytes() as &[u8])
        .bind(Self::id_as_bytes(&id))
        .execute(tx.conn())
        .await
        .map_err(|e| AuthError::Store(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn revoke(&self, id: TokenId, at: DateTime<Utc>) -> Result<(), AuthError> {
        sqlx::query("UPDATE refresh_token SET revoked_at = ? WHERE id = ? AND revoked_at IS NULL")
            .bind(at)
            .bind(Self::id_as_bytes(&id))
            .execute(&self.pool)
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?;

        Ok(())
    }

    async fn revoke_all_for_user(
        &self,
        user_id: UserId,
        at: DateTime<Utc>,
    ) -> Result<u64, AuthError> {
        let result = sqlx::query(
            "UPDATE refresh_token SET revoked_at = ? WHERE user_id = ? AND revoked_at IS NULL",
        )
        .bind(at)
        .bind(user_id.0.as_bytes() as &[u8])
        .execute(&self.pool)
        .await
        .map_err(|e| AuthError::Store(e.to_string()))?;

        Ok(result.rows_affected())
    }

    async fn delete_expired(&self, before: DateTime<Utc>) -> Result<u64, AuthError> {
        let result = sqlx::query("DELETE FROM refresh_token WHERE expires_at <= ?")
            .bind(before)
            .execute(&self.pool)
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?;

        Ok(result.rows_affected())
    }
}
