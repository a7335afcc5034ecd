//! Cluster pairing service trait.
//!
//! [`ClusterPairing`] is the API the outer RPC/REST layer calls.  It is
//! implemented by [`ClusterManager`](crate::ClusterManager) for the local
//! cluster and by [`PairClient`](crate::transport::client::PairClient) for a
//! cluster reached over the network.

use async_trait::async_trait;

use crate::error::PairError;
use crate::types::*;

/// Pairing API of one cluster.
#[async_trait]
pub trait ClusterPairing: Send + Sync {
    /// Pair this cluster with the remote cluster named in `request`.
    async fn create_pair(
        &self,
        request: ClusterPairCreateRequest,
    ) -> Result<ClusterPairCreateResponse, PairError>;

    /// Accept (or refuse) a pairing handshake from a remote cluster.
    async fn process_pair_request(
        &self,
        request: ClusterPairProcessRequest,
    ) -> Result<ClusterPairProcessResponse, PairError>;

    /// Replace the stored record of an existing pair.
    async fn update_pair(&self, info: ClusterPairInfo) -> Result<(), PairError>;

    /// Forget the pair with `pair_id`.
    async fn delete_pair(&self, pair_id: &str) -> Result<(), PairError>;

    /// Fetch one pair; an empty `pair_id` selects the default pair.
    async fn get_pair(&self, pair_id: &str) -> Result<ClusterPairGetResponse, PairError>;

    /// All pairs plus the id of the default pair.
    async fn enumerate_pairs(&self) -> Result<ClusterPairsEnumerateResponse, PairError>;

    /// This cluster's pair token, regenerated when `reset` is set.
    async fn get_pair_token(&self, reset: bool) -> Result<ClusterPairTokenGetResponse, PairError>;
}
