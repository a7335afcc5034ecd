//! The coordination store interface.
//!
//! [`Kvdb`] is the capability set every cluster component is handed at
//! construction time: atomic single-key CRUD, ordered prefix enumeration and
//! named distributed locks.  Replication and consensus are the concern of the
//! implementation behind the trait.

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::KvdbError;
use crate::types::{KvLock, KvPair};

/// Distributed, strongly consistent key-value store.
#[async_trait]
pub trait Kvdb: Send + Sync {
    /// Fetch the value stored under `key`.
    async fn get(&self, key: &str) -> Result<KvPair, KvdbError>;

    /// Store `value` under `key`, replacing any previous value.
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<KvPair, KvdbError>;

    /// Store `value` under `key` only if the key is absent.
    async fn create(&self, key: &str, value: Vec<u8>) -> Result<KvPair, KvdbError>;

    /// Replace the value under `key` only if the key is present.
    async fn update(&self, key: &str, value: Vec<u8>) -> Result<KvPair, KvdbError>;

    /// Remove `key`, returning the value it held.
    async fn delete(&self, key: &str) -> Result<KvPair, KvdbError>;

    /// List every key equal to `prefix` or below `prefix/`, ordered by key.
    async fn enumerate(&self, prefix: &str) -> Result<Vec<KvPair>, KvdbError>;

    /// Acquire the named lock anonymously.
    async fn lock(&self, key: &str) -> Result<KvLock, KvdbError> {
        self.lock_with_id(key, "").await
    }

    /// Acquire the named lock on behalf of `owner`.
    ///
    /// Blocks until the lock is granted or the store gives up.
    async fn lock_with_id(&self, key: &str, owner: &str) -> Result<KvLock, KvdbError>;

    /// Release a lock previously returned by `lock`/`lock_with_id`.
    async fn unlock(&self, lock: KvLock) -> Result<(), KvdbError>;
}

#[async_trait]
impl<T: Kvdb + ?Sized> Kvdb for std::sync::Arc<T> {
    async fn get(&self, key: &str) -> Result<KvPair, KvdbError> {
        (**self).get(key).await
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<KvPair, KvdbError> {
        (**self).put(key, value).await
    }

    async fn create(&self, key: &str, value: Vec<u8>) -> Result<KvPair, KvdbError> {
        (**self).create(key, value).await
    }

    async fn update(&self, key: &str, value: Vec<u8>) -> Result<KvPair, KvdbError> {
        (**self).update(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<KvPair, KvdbError> {
        (**self).delete(key).await
    }

    async fn enumerate(&self, prefix: &str) -> Result<Vec<KvPair>, KvdbError> {
        (**self).enumerate(prefix).await
    }

    async fn lock_with_id(&self, key: &str, owner: &str) -> Result<KvLock, KvdbError> {
        (**self).lock_with_id(key, owner).await
    }

    async fn unlock(&self, lock: KvLock) -> Result<(), KvdbError> {
        (**self).unlock(lock).await
    }
}

/// JSON convenience layer over any [`Kvdb`].
#[async_trait]
pub trait KvdbExt: Kvdb {
    /// Fetch and decode the JSON value under `key`.
    async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<T, KvdbError> {
        let kv = self.get(key).await?;
        serde_json::from_slice(&kv.value).map_err(KvdbError::serialization)
    }

    /// Encode `value` as JSON and `put` it.
    async fn put_json<T: Serialize + Sync>(&self, key: &str, value: &T) -> Result<KvPair, KvdbError> {
        let bytes = serde_json::to_vec(value).map_err(KvdbError::serialization)?;
        self.put(key, bytes).await
    }

    /// Encode `value` as JSON and `create` it.
    async fn create_json<T: Serialize + Sync>(
        &self,
        key: &str,
        value: &T,
    ) -> Result<KvPair, KvdbError> {
        let bytes = serde_json::to_vec(value).map_err(KvdbError::serialization)?;
        self.create(key, bytes).await
    }

    /// Encode `value` as JSON and `update` it.
    async fn update_json<T: Serialize + Sync>(
        &self,
        key: &str,
        value: &T,
    ) -> Result<KvPair, KvdbError> {
        let bytes = serde_json::to_vec(value).map_err(KvdbError::serialization)?;
        self.update(key, bytes).await
    }
}

impl<K: Kvdb + ?Sized> KvdbExt for K {}
