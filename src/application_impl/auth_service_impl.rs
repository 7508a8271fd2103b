use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::Utc;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Login, registration and session renewal over the injected ports.
pub struct RealAuthService {
    user_repo: Arc<dyn UserRepo>,
    credential_hasher: Arc<dyn CredentialHasher>,
    token_codec: Arc<dyn TokenCodec>,
    refresh_store: Arc<dyn RefreshTokenStore>,
    tx_manager: Arc<dyn TxManager>,
}

impl RealAuthService {
    pub fn new(
        user_repo: Arc<dyn UserRepo>,
        credential_hasher: Arc<dyn CredentialHasher>,
        token_codec: Arc<dyn TokenCodec>,
        refresh_store: Arc<dyn RefreshTokenStore>,
        tx_manager: Arc<dyn TxManager>,
    ) -> Self {
        Self {
            user_repo,
            credential_hasher,
            token_codec,
            refresh_store,
            tx_manager,
        }
    }

    /// Issue a fresh access/refresh pair for `user` and persist the
    /// refresh record.
    async fn issue_session(
        &self,
        user: &UserRecord,
        meta: &SessionMeta,
    ) -> Result<AuthSession, AuthError> {
        let (access_token, access_expires_at) = self
            .token_codec
            .issue_access(user.user_id, &user.roles)
            .await?;
        let (refresh_token, _, refresh_expires_at) = self
            .token_codec
            .issue_refresh(user.user_id, &user.roles)
            .await?;

        self.refresh_store
            .create(user.user_id, &refresh_token, meta)
            .await?;

        Ok(AuthSession {
            identity: Identity {
                user_id: user.user_id,
                roles: user.roles.clone(),
            },
            tokens: SessionTokens {
                access_token,
                refresh_token,
                access_expires_at,
                refresh_expires_at,
            },
        })
    }

    async fn register(
        &self,
        input: RegisterInput,
        role: Role,
        meta: &SessionMeta,
    ) -> Result<AuthSession, AuthError> {
        if self.user_repo.email_exists(&input.email).await? {
            return Err(AuthError::Conflict);
        }

        let password_hash = self.credential_hasher.hash(&input.password).await?;
        let record = UserRecord {
            user_id: UserId(Uuid::new_v4()),
            email: input.email,
            full_name: input.full_name,
            phone: input.phone,
            password_hash,
            roles: vec![role],
            is_active: true,
            created_at: Utc::now(),
        };

        let mut tx = self
            .tx_manager
            .begin()
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?;
        self.user_repo.create_in_tx(tx.as_mut(), &record).await?;
        tx.commit()
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?;

        self.issue_session(&record, meta).await
    }
}

#[async_trait::async_trait]
impl AuthService for RealAuthService {
    async fn login(&self, input: LoginInput, meta: SessionMeta) -> Result<AuthSession, AuthError> {
        let user = self
            .user_repo
            .get_by_email(&input.email)
            .await?
            .ok_or(AuthError::NotFound)?;

        if !user.is_active {
            return Err(AuthError::InvalidCredential);
        }
        let ok = self
            .credential_hasher
            .verify(&input.password, &user.password_hash)
            .await?;
        if !ok {
            return Err(AuthError::InvalidCredential);
        }

        self.issue_session(&user, &meta).await
    }

    async fn register_client(
        &self,
        input: RegisterInput,
        meta: SessionMeta,
    ) -> Result<AuthSession, AuthError> {
        self.register(input, Role::Client, &meta).await
    }

    async fn register_seller(
        &self,
        input: RegisterInput,
        meta: SessionMeta,
    ) -> Result<AuthSession, AuthError> {
        self.register(input, Role::Seller, &meta).await
    }

    async fn register_admin(
        &self,
        input: RegisterInput,
        actor: &Identity,
        meta: SessionMeta,
    ) -> Result<AuthSession, AuthError> {
        if !actor.roles.contains(&Role::Admin) {
            return Err(AuthError::Forbidden);
        }
        self.register(input, Role::Admin, &meta).await
    }

    async fn refresh(
        &self,
        refresh_token: &RefreshToken,
        meta: SessionMeta,
    ) -> Result<AuthSession, AuthError> {
        let verified = self
            .token_codec
            .verify_refresh(refresh_token)
            .await
            .map_err(|_| AuthError::Unauthorized)?;

        if !self.refresh_store.exists(refresh_token).await? {
            return Err(AuthError::Unauthorized);
        }

        // The directory's current role set is authoritative; the claims in
        // the old token are a snapshot from its issuance.
        let user = self
            .user_repo
            .get_by_id(verified.user_id)
            .await?
            .ok_or(AuthError::Unauthorized)?;
        if !user.is_active {
            return Err(AuthError::Unauthorized);
        }

        let (access_token, access_expires_at) = self
            .token_codec
            .issue_access(user.user_id, &user.roles)
            .await?;
        let (new_refresh, _, refresh_expires_at) = self
            .token_codec
            .issue_refresh(user.user_id, &user.roles)
            .await?;

        self.refresh_store
            .rotate(refresh_token, &new_refresh, &meta)
            .await?;

        Ok(AuthSession {
            identity: Identity {
                user_id: user.user_id,
                roles: user.roles,
            },
            tokens: SessionTokens {
                access_token,
                refresh_token: new_refresh,
                access_expires_at,
                refresh_expires_at,
            },
        })
    }

    async fn logout(&self, refresh_token: &RefreshToken) {
        if let Err(e) = self.refresh_store.remove(refresh_token).await {
            debug!("logout: refresh token not revoked: {e}");
        }
    }

    async fn authenticate(&self, token: &AccessToken) -> Result<Identity, AuthError> {
        let verified = self
            .token_codec
            .verify_access(token)
            .await
            .map_err(|_| AuthError::Unauthorized)?;
        Ok(Identity {
            user_id: verified.user_id,
            roles: verified.roles,
        })
    }

    async fn revoke_all_sessions(&self, user_id: UserId) -> Result<u64, AuthError> {
        self.refresh_store.revoke_all_for_user(user_id).await
    }
}
