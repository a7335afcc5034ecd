//! Listener that records pairing events in the daemon log.

use async_trait::async_trait;
use libpair::{ClusterListener, ClusterPairProcessResponse, NodeInfo, PairError};
use tracing::info;

pub struct LoggingListener;

#[async_trait]
impl ClusterListener for LoggingListener {
    fn name(&self) -> &str {
        "logging"
    }

    async fn create_pair(
        &self,
        self_node: &NodeInfo,
        response: &ClusterPairProcessResponse,
    ) -> Result<(), PairError> {
        info!(
            node_id = %self_node.id,
            remote_cluster_id = %response.remote_cluster_id,
            remote_cluster_name = %response.remote_cluster_name,
            "pairing with remote cluster"
        );
        Ok(())
    }

    async fn process_pair_request(
        &self,
        self_node: &NodeInfo,
        response: &mut ClusterPairProcessResponse,
    ) -> Result<(), PairError> {
        info!(
            node_id = %self_node.id,
            options = response.options.len(),
            "accepting pair request"
        );
        Ok(())
    }
}
