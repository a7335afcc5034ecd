//! SDK service for cluster pairing.
//!
//! Checks request arguments, forwards to a [`ClusterPairing`] implementation
//! and turns [`PairError`](libpair::PairError) into [`Status`].

use std::sync::Arc;

use libpair::{
    ClusterPairCreateRequest, ClusterPairCreateResponse, ClusterPairGetResponse, ClusterPairing,
    ClusterPairsEnumerateResponse, ClusterPairTokenGetResponse,
};
use tracing::instrument;

use crate::status::Status;

/// Cluster pairing API as exposed to SDK clients.
pub struct ClusterPairServer<T: ?Sized> {
    cluster: Arc<T>,
}

impl<T: ClusterPairing + ?Sized> ClusterPairServer<T> {
    pub fn new(cluster: Arc<T>) -> Self {
        Self { cluster }
    }

    /// Pair with the cluster reachable at the request's address.
    #[instrument(skip_all, fields(remote = %req.remote_cluster_ip))]
    pub async fn create(
        &self,
        req: ClusterPairCreateRequest,
    ) -> Result<ClusterPairCreateResponse, Status> {
        if req.remote_cluster_ip.is_empty() {
            return Err(Status::invalid_argument(
                "Must supply valid remote cluster IP",
            ));
        }
        if req.remote_cluster_token.is_empty() {
            return Err(Status::invalid_argument("Must supply remote cluster token"));
        }
        Ok(self.cluster.create_pair(req).await?)
    }

    /// An empty `cluster_id` returns the default pair.
    pub async fn inspect(&self, cluster_id: &str) -> Result<ClusterPairGetResponse, Status> {
        Ok(self.cluster.get_pair(cluster_id).await?)
    }

    pub async fn enumerate(&self) -> Result<ClusterPairsEnumerateResponse, Status> {
        Ok(self.cluster.enumerate_pairs().await?)
    }

    pub async fn get_token(&self) -> Result<ClusterPairTokenGetResponse, Status> {
        Ok(self.cluster.get_pair_token(false).await?)
    }

    /// Invalidate the current token and return a fresh one.
    pub async fn reset_token(&self) -> Result<ClusterPairTokenGetResponse, Status> {
        Ok(self.cluster.get_pair_token(true).await?)
    }

    pub async fn delete(&self, cluster_id: &str) -> Result<(), Status> {
        if cluster_id.is_empty() {
            return Err(Status::invalid_argument("Must supply cluster ID"));
        }
        Ok(self.cluster.delete_pair(cluster_id).await?)
    }
}
