//! The local cluster's pair token.
//!
//! The token lives in the cluster configuration document at
//! [`CLUSTER_INFO_KEY`] rather than under the pair prefix: it authenticates
//! this cluster independent of any pair and must outlive all of them.
//! Reads and writes of the document go through the configuration lock
//! [`CLUSTER_LOCK_KEY`], taken on behalf of this node so lock ownership is
//! attributable.

use std::sync::Arc;

use libkvdb::{Kvdb, KvdbError, KvdbExt, LockGuard};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::PairError;
use crate::store::release;

/// Key of the cluster configuration document.
pub const CLUSTER_INFO_KEY: &str = "cluster/database";

/// Name of the cluster-wide configuration lock.
pub const CLUSTER_LOCK_KEY: &str = "cluster/lock";

/// Number of random bytes in a pair token.
pub const PAIR_TOKEN_BYTES: usize = 64;

/// Cluster configuration document.
///
/// Only the fields this crate owns are typed; everything else written by
/// other subsystems is carried through untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ClusterInfo {
    #[serde(default)]
    pub cluster_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub pair_token: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Generate a fresh hex-encoded token from the OS-seeded CSPRNG.
pub fn generate_token() -> String {
    let mut bytes = [0u8; PAIR_TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Compare tokens without short-circuiting on the first differing byte.
pub(crate) fn tokens_match(expected: &str, presented: &str) -> bool {
    expected.len() == presented.len()
        && expected
            .bytes()
            .zip(presented.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

/// Maintains the pairing secret of the local cluster.
#[derive(Clone)]
pub struct TokenManager {
    kv: Arc<dyn Kvdb>,
    cluster_id: String,
    node_id: String,
}

impl TokenManager {
    pub fn new(kv: Arc<dyn Kvdb>, cluster_id: impl Into<String>, node_id: impl Into<String>) -> Self {
        Self {
            kv,
            cluster_id: cluster_id.into(),
            node_id: node_id.into(),
        }
    }

    /// Return the pair token, generating it when absent or when `reset` is
    /// set.
    pub async fn get_token(&self, reset: bool) -> Result<String, PairError> {
        let guard =
            LockGuard::acquire_with_id(Arc::clone(&self.kv), CLUSTER_LOCK_KEY, &self.node_id)
                .await?;
        let result = self.get_token_locked(reset).await;
        release(guard).await;
        result
    }

    async fn get_token_locked(&self, reset: bool) -> Result<String, PairError> {
        let mut db = self.read_cluster_info().await?;
        if db.pair_token.is_empty() || reset {
            db.pair_token = generate_token();
            if db.cluster_id.is_empty() {
                db.cluster_id = self.cluster_id.clone();
            }
            self.kv.put_json(CLUSTER_INFO_KEY, &db).await?;
            info!(cluster_id = %db.cluster_id, reset, "cluster pair token generated");
        }
        Ok(db.pair_token)
    }

    /// An absent document reads as an empty one; it is created on first write.
    async fn read_cluster_info(&self) -> Result<ClusterInfo, PairError> {
        match self.kv.get_json::<ClusterInfo>(CLUSTER_INFO_KEY).await {
            Ok(db) => Ok(db),
            Err(KvdbError::NotFound(_)) => Ok(ClusterInfo::default()),
            Err(e) => Err(e.into()),
        }
    }
}
