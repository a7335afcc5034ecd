//! Scoped ownership of a named store lock.
//!
//! [`LockGuard`] is the only way cluster components hold a lock: the happy
//! path calls [`LockGuard::release`] and observes unlock failures, every
//! other exit path (early return, `?`, panic unwinding) drops the guard and
//! the unlock is scheduled on the current Tokio runtime.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::KvdbError;
use crate::store::Kvdb;
use crate::types::KvLock;

/// A held lock that is released when the guard goes away.
pub struct LockGuard {
    store: Arc<dyn Kvdb>,
    lock: Option<KvLock>,
}

impl LockGuard {
    /// Acquire `key` anonymously.
    pub async fn acquire(store: Arc<dyn Kvdb>, key: &str) -> Result<Self, KvdbError> {
        let lock = store.lock(key).await?;
        debug!(%lock, "lock acquired");
        Ok(Self {
            store,
            lock: Some(lock),
        })
    }

    /// Acquire `key` on behalf of `owner` so lock ownership is attributable.
    pub async fn acquire_with_id(
        store: Arc<dyn Kvdb>,
        key: &str,
        owner: &str,
    ) -> Result<Self, KvdbError> {
        let lock = store.lock_with_id(key, owner).await?;
        debug!(%lock, "lock acquired");
        Ok(Self {
            store,
            lock: Some(lock),
        })
    }

    /// The underlying lock handle.
    pub fn lock(&self) -> Option<&KvLock> {
        self.lock.as_ref()
    }

    /// Release the lock now and report the outcome.
    ///
    /// The guard keeps the handle until the store answers, so a release
    /// future dropped mid-unlock still leaves the unlock to `Drop`.
    pub async fn release(mut self) -> Result<(), KvdbError> {
        let Some(lock) = self.lock.clone() else {
            return Ok(());
        };
        let result = self.store.unlock(lock).await;
        if let Some(lock) = self.lock.take() {
            debug!(%lock, "lock released");
        }
        result
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let Some(lock) = self.lock.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let store = Arc::clone(&self.store);
                handle.spawn(async move {
                    if let Err(e) = store.unlock(lock.clone()).await {
                        warn!(%lock, error = %e, "deferred unlock failed");
                    }
                });
            }
            Err(_) => warn!(%lock, "lock guard dropped outside a runtime, lock leaked"),
        }
    }
}

impl std::fmt::Debug for LockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockGuard").field("lock", &self.lock).finish()
    }
}
