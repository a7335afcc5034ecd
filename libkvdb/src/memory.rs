//! In-process [`Kvdb`] implementation.
//!
//! [`MemKvdb`] keeps every key in a single ordered map behind a Tokio mutex
//! and models named locks as a lock table with waiters parked on a
//! [`Notify`].  It is linearizable by construction and is the store used by
//! single-node deployments and by every test in the workspace.
//!
//! Fault injection lets tests exercise the failure paths of components that
//! sit on top of the store:
//!
//! * [`MemKvdb::set_unavailable`] fails every operation except `unlock` with
//!   [`KvdbError::Unavailable`].  Locks taken before an outage can still be
//!   released during it.
//! * [`MemKvdb::fail_get`] fails reads of a single key with
//!   [`KvdbError::Unavailable`].
//! * [`MemKvdb::fail_lock`] fails only lock acquisition with
//!   [`KvdbError::LockFailed`].
//! * [`MemKvdb::with_unlock_delay`] stalls every `unlock` before it takes
//!   effect.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex as SyncMutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;
use tracing::trace;

use crate::error::KvdbError;
use crate::store::Kvdb;
use crate::types::{KvLock, KvPair};

/// Default time a lock request waits before failing.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
struct Entry {
    value: Vec<u8>,
    modified_index: u64,
}

#[derive(Debug, Default)]
struct State {
    data: BTreeMap<String, Entry>,
    revision: u64,
    locks: HashMap<String, KvLock>,
    next_lock_id: u64,
}

impl State {
    fn write(&mut self, key: &str, value: Vec<u8>) -> KvPair {
        self.revision += 1;
        self.data.insert(
            key.to_owned(),
            Entry {
                value: value.clone(),
                modified_index: self.revision,
            },
        );
        KvPair {
            key: key.to_owned(),
            value,
            modified_index: self.revision,
        }
    }
}

/// Ordered in-memory coordination store.
#[derive(Debug)]
pub struct MemKvdb {
    state: Mutex<State>,
    released: Notify,
    lock_timeout: Duration,
    unavailable: AtomicBool,
    lock_failure: AtomicBool,
    failing_gets: SyncMutex<HashSet<String>>,
    unlock_delay: Duration,
}

impl Default for MemKvdb {
    fn default() -> Self {
        Self::new()
    }
}

impl MemKvdb {
    /// Create an empty store with [`DEFAULT_LOCK_TIMEOUT`].
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            released: Notify::new(),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            unavailable: AtomicBool::new(false),
            lock_failure: AtomicBool::new(false),
            failing_gets: SyncMutex::new(HashSet::new()),
            unlock_delay: Duration::ZERO,
        }
    }

    /// Override how long lock requests wait before failing.
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Hold every `unlock` for `delay` before the lock is dropped.
    pub fn with_unlock_delay(mut self, delay: Duration) -> Self {
        self.unlock_delay = delay;
        self
    }

    /// Make every subsequent operation except `unlock` fail with
    /// [`KvdbError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make every subsequent lock request fail with [`KvdbError::LockFailed`].
    pub fn fail_lock(&self, fail: bool) {
        self.lock_failure.store(fail, Ordering::SeqCst);
    }

    /// Make `get` of `key` fail with [`KvdbError::Unavailable`].
    pub fn fail_get(&self, key: &str, fail: bool) {
        let mut failing = self
            .failing_gets
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if fail {
            failing.insert(key.to_owned());
        } else {
            failing.remove(key);
        }
    }

    /// Number of locks currently held.
    pub async fn held_locks(&self) -> usize {
        self.state.lock().await.locks.len()
    }

    /// Number of keys currently stored.
    pub async fn len(&self) -> usize {
        self.state.lock().await.data.len()
    }

    /// Returns `true` when no key is stored.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn check_available(&self) -> Result<(), KvdbError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(KvdbError::Unavailable("store is offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl Kvdb for MemKvdb {
    async fn get(&self, key: &str) -> Result<KvPair, KvdbError> {
        self.check_available()?;
        if self
            .failing_gets
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains(key)
        {
            return Err(KvdbError::Unavailable(format!("read of {key} failed")));
        }
        let state = self.state.lock().await;
        state
            .data
            .get(key)
            .map(|entry| KvPair {
                key: key.to_owned(),
                value: entry.value.clone(),
                modified_index: entry.modified_index,
            })
            .ok_or_else(|| KvdbError::NotFound(key.to_owned()))
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<KvPair, KvdbError> {
        self.check_available()?;
        Ok(self.state.lock().await.write(key, value))
    }

    async fn create(&self, key: &str, value: Vec<u8>) -> Result<KvPair, KvdbError> {
        self.check_available()?;
        let mut state = self.state.lock().await;
        if state.data.contains_key(key) {
            return Err(KvdbError::KeyExists(key.to_owned()));
        }
        Ok(state.write(key, value))
    }

    async fn update(&self, key: &str, value: Vec<u8>) -> Result<KvPair, KvdbError> {
        self.check_available()?;
        let mut state = self.state.lock().await;
        if !state.data.contains_key(key) {
            return Err(KvdbError::NotFound(key.to_owned()));
        }
        Ok(state.write(key, value))
    }

    async fn delete(&self, key: &str) -> Result<KvPair, KvdbError> {
        self.check_available()?;
        let mut state = self.state.lock().await;
        let entry = state
            .data
            .remove(key)
            .ok_or_else(|| KvdbError::NotFound(key.to_owned()))?;
        state.revision += 1;
        Ok(KvPair {
            key: key.to_owned(),
            value: entry.value,
            modified_index: entry.modified_index,
        })
    }

    async fn enumerate(&self, prefix: &str) -> Result<Vec<KvPair>, KvdbError> {
        self.check_available()?;
        let state = self.state.lock().await;
        let children = format!("{}/", prefix.trim_end_matches('/'));
        Ok(state
            .data
            .range(prefix.to_owned()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .filter(|(key, _)| key.as_str() == prefix || key.starts_with(&children))
            .map(|(key, entry)| KvPair {
                key: key.clone(),
                value: entry.value.clone(),
                modified_index: entry.modified_index,
            })
            .collect())
    }

    async fn lock_with_id(&self, key: &str, owner: &str) -> Result<KvLock, KvdbError> {
        self.check_available()?;
        if self.lock_failure.load(Ordering::SeqCst) {
            return Err(KvdbError::LockFailed {
                key: key.to_owned(),
                reason: "lock service rejected the request".into(),
            });
        }

        let deadline = Instant::now() + self.lock_timeout;
        loop {
            // Register interest before inspecting the table so a release
            // between the check and the wait is not missed.
            let released = self.released.notified();
            tokio::pin!(released);
            released.as_mut().enable();

            {
                let mut state = self.state.lock().await;
                if !state.locks.contains_key(key) {
                    state.next_lock_id += 1;
                    let lock = KvLock {
                        key: key.to_owned(),
                        owner: owner.to_owned(),
                        id: state.next_lock_id,
                    };
                    state.locks.insert(key.to_owned(), lock.clone());
                    return Ok(lock);
                }
                trace!(%key, %owner, "lock busy, waiting");
            }

            if tokio::time::timeout_at(deadline, released).await.is_err() {
                return Err(KvdbError::LockFailed {
                    key: key.to_owned(),
                    reason: format!("timed out after {:?}", self.lock_timeout),
                });
            }
        }
    }

    async fn unlock(&self, lock: KvLock) -> Result<(), KvdbError> {
        if !self.unlock_delay.is_zero() {
            tokio::time::sleep(self.unlock_delay).await;
        }
        let mut state = self.state.lock().await;
        match state.locks.get(&lock.key) {
            Some(held) if held.id == lock.id => {
                state.locks.remove(&lock.key);
                drop(state);
                self.released.notify_waiters();
                Ok(())
            }
            _ => Err(KvdbError::LockNotHeld(lock.key)),
        }
    }
}
