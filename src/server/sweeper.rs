use crate::domain_port::RefreshTokenRepo;
use crate::logger::*;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Deletes expired refresh-token records in the background. Storage
/// hygiene only: expiry is enforced lazily at read time whether or not
/// this task runs.
pub struct Sweeper {
    repo: Arc<dyn RefreshTokenRepo>,
    interval: Duration,
    cancel: CancellationToken,
}

impl Sweeper {
    pub fn new(
        repo: Arc<dyn RefreshTokenRepo>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Sweeper {
            repo,
            interval,
            cancel,
        }
    }

    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => {
                    match self.repo.delete_expired(Utc::now()).await {
                        Ok(0) => {}
                        Ok(n) => info!("sweeper: removed {} expired refresh token records", n),
                        Err(e) => warn!("sweeper: {}", e),
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain_model::*;
    use crate::domain_port::RefreshTokenRecord;
    use crate::infra_memory::MemoryBackend;
    use chrono::Duration as ChronoDuration;

    fn record(expires_at: chrono::DateTime<Utc>) -> RefreshTokenRecord {
        RefreshTokenRecord {
            id: TokenId::generate(),
            user_id: UserId(uuid::Uuid::new_v4()),
            token_hash: "hash".to_string(),
            issued_at: Utc::now(),
            expires_at,
            revoked_at: None,
            replaced_by: None,
            user_agent: None,
            ip: None,
        }
    }

    #[tokio::test]
    async fn sweeps_only_expired_records_and_stops_on_cancel() {
        let backend = MemoryBackend::new();
        let repo: Arc<dyn RefreshTokenRepo> = Arc::new(backend.refresh_token_repo());

        let expired = record(Utc::now() - ChronoDuration::hours(1));
        let live = record(Utc::now() + ChronoDuration::hours(1));
        repo.insert(&expired).await.unwrap();
        repo.insert(&live).await.unwrap();

        let cancel = CancellationToken::new();
        let sweeper = Sweeper::new(repo.clone(), Duration::from_millis(10), cancel.clone());
        let handle = tokio::spawn(sweeper.run());

        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
        handle.await.unwrap();

        assert!(repo.get(expired.id).await.unwrap().is_none());
        assert!(repo.get(live.id).await.unwrap().is_some());
    }
}
