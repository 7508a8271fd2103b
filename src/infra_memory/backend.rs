use super::{MemoryRefreshTokenRepo, MemoryTxManager, MemoryUserRepo};
use crate::application_port::AuthError;
use crate::domain_model::*;
use crate::domain_port::*;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Process-local storage backend: mutex-guarded maps behind the same ports
/// as the MySQL adapters. Selected with `storage.backend = "memory"` and
/// used by the test suite.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    pub(crate) inner: Arc<MemoryInner>,
}

#[derive(Default)]
pub(crate) struct MemoryInner {
    pub(crate) users: Mutex<HashMap<UserId, UserRecord>>,
    pub(crate) tokens: Mutex<HashMap<TokenId, RefreshTokenRecord>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user_repo(&self) -> MemoryUserRepo {
        MemoryUserRepo {
            inner: self.inner.clone(),
        }
    }

    pub fn refresh_token_repo(&self) -> MemoryRefreshTokenRepo {
        MemoryRefreshTokenRepo {
            inner: self.inner.clone(),
        }
    }

    pub fn tx_manager(&self) -> MemoryTxManager {
        MemoryTxManager
    }
}

pub(crate) fn lock<T>(m: &Mutex<T>) -> Result<MutexGuard<'_, T>, AuthError> {
    m.lock()
        .map_err(|_| AuthError::Store("lock poisoned".to_string()))
}
