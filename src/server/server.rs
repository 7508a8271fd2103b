use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_port::*;
use crate::infra_memory::MemoryBackend;
use crate::infra_mysql::*;
use crate::logger::*;
use crate::server::Sweeper;
use crate::settings::Settings;
use sqlx::{MySql, Pool};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub struct Server {
    pub auth_service: Arc<dyn AuthService>,
    sweeper_handle: Mutex<Option<JoinHandle<()>>>,
    cancel: CancellationToken,
    pool: Option<Pool<MySql>>,
}

impl Server {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let (user_repo, refresh_token_repo, tx_manager, pool): (
            Arc<dyn UserRepo>,
            Arc<dyn RefreshTokenRepo>,
            Arc<dyn TxManager>,
            Option<Pool<MySql>>,
        ) = match settings.storage.backend.as_str() {
            "memory" => {
                let backend = MemoryBackend::new();
                (
                    Arc::new(backend.user_repo()),
                    Arc::new(backend.refresh_token_repo()),
                    Arc::new(backend.tx_manager()),
                    None,
                )
            }
            "mysql" => {
                let dsn = settings.storage.mysql_dsn.as_deref().ok_or_else(|| {
                    anyhow::anyhow!("storage.mysql_dsn is required for the mysql backend")
                })?;
                let pool = Pool::<MySql>::connect(dsn).await?;
                (
                    Arc::new(MySqlUserRepo::new(pool.clone())),
                    Arc::new(MySqlRefreshTokenRepo::new(pool.clone())),
                    Arc::new(MySqlTxManager::new(pool.clone())),
                    Some(pool),
                )
            }
            other => return Err(anyhow::anyhow!("Unknown storage backend: {}", other)),
        };

        let credential_hasher: Arc<dyn CredentialHasher> = Arc::new(Argon2CredentialHasher);

        // Distinct secrets per token class; sharing one is a deployment
        // fallback, not a recommendation.
        let shared =
            std::env::var("JWT_SECRET").unwrap_or_else(|_| "my-dev-secret-key".to_string());
        let access_key = std::env::var("JWT_ACCESS_SECRET")
            .unwrap_or_else(|_| shared.clone())
            .into_bytes();
        let refresh_key = std::env::var("JWT_REFRESH_SECRET")
            .unwrap_or_else(|_| shared.clone())
            .into_bytes();
        let token_codec: Arc<dyn TokenCodec> =
            Arc::new(JwtHs256Codec::new(JwtConfig::new(access_key, refresh_key)));

        let refresh_store: Arc<dyn RefreshTokenStore> = Arc::new(RealRefreshTokenStore::new(
            refresh_token_repo.clone(),
            token_codec.clone(),
            credential_hasher.clone(),
            tx_manager.clone(),
        ));

        let auth_service: Arc<dyn AuthService> = Arc::new(RealAuthService::new(
            user_repo,
            credential_hasher,
            token_codec,
            refresh_store,
            tx_manager,
        ));

        let cancel = CancellationToken::new();
        let sweeper_handle = if settings.sweeper.enabled {
            let sweeper = Sweeper::new(
                refresh_token_repo.clone(),
                Duration::from_secs(settings.sweeper.interval_secs),
                cancel.clone(),
            );
            Some(tokio::spawn(sweeper.run()))
        } else {
            None
        };

        info!("server started");

        Ok(Self {
            auth_service,
            sweeper_handle: Mutex::new(sweeper_handle),
            cancel,
            pool,
        })
    }

    pub async fn shutdown(&self) {
        self.cancel.cancel();

        let handle = self
            .sweeper_handle
            .lock()
            .ok()
            .and_then(|mut guard| guard.take());
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!("sweeper task join: {}", e);
            }
        }

        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}
