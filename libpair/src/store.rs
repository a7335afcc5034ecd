//! Pair record persistence.
//!
//! [`PairStore`] keeps one JSON document per paired cluster under
//! [`PAIR_KEY_PREFIX`] and the id of the default pair under
//! [`DEFAULT_PAIR_KEY`].
//!
//! # Store layout
//!
//! ```text
//! cluster/pair/<id>      # JSON-encoded ClusterPairInfo
//! cluster/pair/default   # raw id of the default pair
//! ```
//!
//! Every mutating sequence, and `get`, runs under the store lock named
//! [`PAIR_KEY_PREFIX`] so concurrent pairing operations on all nodes of the
//! cluster serialize.  `list` reads without the lock.  The default pointer
//! accessors are unguarded single-key operations; `create` and `delete`
//! compose them under the lock so the pointer never names a missing record.

use std::collections::HashMap;
use std::sync::Arc;

use libkvdb::{Kvdb, KvdbError, KvdbExt, LockGuard};
use tracing::{debug, warn};

use crate::error::PairError;
use crate::types::ClusterPairInfo;

/// Prefix under which pair records are stored; also the name of the lock
/// guarding them.
pub const PAIR_KEY_PREFIX: &str = "cluster/pair";

/// Key holding the id of the default pair.
pub const DEFAULT_PAIR_KEY: &str = "cluster/pair/default";

/// Id that would collide with [`DEFAULT_PAIR_KEY`].
const RESERVED_PAIR_ID: &str = "default";

/// Store key of the record for `id`.
pub fn pair_key(id: &str) -> String {
    format!("{PAIR_KEY_PREFIX}/{id}")
}

fn validate_pair_id(id: &str) -> Result<(), PairError> {
    if id.is_empty() {
        return Err(PairError::InvalidArgument("cluster pair id must not be empty".into()));
    }
    if id.contains('/') {
        return Err(PairError::InvalidArgument(format!(
            "cluster pair id {id} must not contain '/'"
        )));
    }
    if id == RESERVED_PAIR_ID {
        return Err(PairError::InvalidArgument(format!(
            "cluster pair id {id} is reserved"
        )));
    }
    Ok(())
}

fn not_found(id: &str) -> impl FnOnce(KvdbError) -> PairError + '_ {
    move |e| match e {
        KvdbError::NotFound(_) => PairError::NotFound(format!("cluster pair {id}")),
        other => other.into(),
    }
}

/// Release `guard`, logging rather than failing on unlock errors.
pub(crate) async fn release(guard: LockGuard) {
    if let Err(e) = guard.release().await {
        warn!(error = %e, "failed to release lock");
    }
}

/// CRUD over [`ClusterPairInfo`] records and the default pair pointer.
#[derive(Clone)]
pub struct PairStore {
    kv: Arc<dyn Kvdb>,
}

impl PairStore {
    pub fn new(kv: Arc<dyn Kvdb>) -> Self {
        Self { kv }
    }

    /// Persist a new pair record.
    ///
    /// The record becomes the default when `set_default` is set or when no
    /// default exists yet, so the first pair of a cluster is always the
    /// default.
    pub async fn create(&self, info: &ClusterPairInfo, set_default: bool) -> Result<(), PairError> {
        validate_pair_id(&info.id)?;
        let guard = LockGuard::acquire(Arc::clone(&self.kv), PAIR_KEY_PREFIX).await?;
        let result = self.create_locked(info, set_default).await;
        release(guard).await;
        result
    }

    async fn create_locked(&self, info: &ClusterPairInfo, set_default: bool) -> Result<(), PairError> {
        self.kv
            .create_json(&pair_key(&info.id), info)
            .await
            .map_err(|e| match e {
                KvdbError::KeyExists(_) => {
                    PairError::AlreadyExists(format!("cluster pair {}", info.id))
                }
                other => other.into(),
            })?;

        // A failed read is treated like a missing pointer so the new record
        // still gets a chance to become the default.
        let has_default = matches!(self.get_default_id().await, Ok(Some(_)));
        if set_default || !has_default {
            self.set_default_id(&info.id).await?;
        }
        debug!(pair_id = %info.id, set_default, "cluster pair record created");
        Ok(())
    }

    /// Fetch the record for `id`.
    pub async fn get(&self, id: &str) -> Result<ClusterPairInfo, PairError> {
        validate_pair_id(id)?;
        let guard = LockGuard::acquire(Arc::clone(&self.kv), PAIR_KEY_PREFIX).await?;
        let result: Result<ClusterPairInfo, PairError> =
            self.kv.get_json(&pair_key(id)).await.map_err(not_found(id));
        release(guard).await;
        result
    }

    /// Replace an existing record.  Never touches the default pointer.
    pub async fn update(&self, info: &ClusterPairInfo) -> Result<(), PairError> {
        validate_pair_id(&info.id)?;
        let guard = LockGuard::acquire(Arc::clone(&self.kv), PAIR_KEY_PREFIX).await?;
        let result = self
            .kv
            .update_json(&pair_key(&info.id), info)
            .await
            .map(|_| ())
            .map_err(not_found(&info.id));
        release(guard).await;
        result
    }

    /// Snapshot of every record, keyed by id.
    pub async fn list(&self) -> Result<HashMap<String, ClusterPairInfo>, PairError> {
        let mut pairs = HashMap::new();
        for kv in self.kv.enumerate(PAIR_KEY_PREFIX).await? {
            if kv.key == DEFAULT_PAIR_KEY {
                continue;
            }
            let info: ClusterPairInfo = serde_json::from_slice(&kv.value).map_err(|e| {
                PairError::Internal(format!("decode {}: {e}", kv.key))
            })?;
            pairs.insert(info.id.clone(), info);
        }
        Ok(pairs)
    }

    /// Remove the record for `id`, clearing the default pointer first if it
    /// names `id`.
    pub async fn delete(&self, id: &str) -> Result<(), PairError> {
        validate_pair_id(id)?;
        let guard = LockGuard::acquire(Arc::clone(&self.kv), PAIR_KEY_PREFIX).await?;
        let result = self.delete_locked(id).await;
        release(guard).await;
        result
    }

    async fn delete_locked(&self, id: &str) -> Result<(), PairError> {
        if self.get_default_id().await?.as_deref() == Some(id) {
            self.clear_default_id().await?;
        }
        self.kv.delete(&pair_key(id)).await.map_err(not_found(id))?;
        debug!(pair_id = %id, "cluster pair record deleted");
        Ok(())
    }

    /// Id of the default pair, `None` when not set.
    pub async fn get_default_id(&self) -> Result<Option<String>, PairError> {
        match self.kv.get(DEFAULT_PAIR_KEY).await {
            Ok(kv) => {
                let id = kv.value_string();
                Ok((!id.is_empty()).then_some(id))
            }
            Err(KvdbError::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn set_default_id(&self, id: &str) -> Result<(), PairError> {
        if id.is_empty() {
            return Err(PairError::InvalidArgument("default pair id must not be empty".into()));
        }
        self.kv.put(DEFAULT_PAIR_KEY, id.as_bytes().to_vec()).await?;
        Ok(())
    }

    /// Remove the default pointer.  Clearing an unset pointer succeeds.
    pub async fn clear_default_id(&self) -> Result<(), PairError> {
        match self.kv.delete(DEFAULT_PAIR_KEY).await {
            Ok(_) | Err(KvdbError::NotFound(_)) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
