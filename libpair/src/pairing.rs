//! The two-party pairing handshake.
//!
//! [`PairingEngine`] holds no state of its own between calls; everything
//! durable lives in the [`PairStore`] and the [`TokenManager`].
//!
//! Initiator (`create_pair`):
//!
//! 1. **Dial** the remote pairing API.
//! 2. **Handshake**: send our cluster id and the caller's token; the remote
//!    validates the token and answers with its id, name and options.
//! 3. **Notify** local listeners in order, stopping at the first failure.
//! 4. **Persist** the pair record.
//! 5. **Respond** with the remote id and name.
//!
//! Failures in steps 1–2 leave no local state behind.  A failure in step 4
//! happens after listeners already observed the pair; nothing is rolled back.
//!
//! Acceptor (`process_pair_request`): validate the token, let listeners
//! enrich the response, respond.  The acceptor does not record a reciprocal
//! pair.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

use crate::error::PairError;
use crate::listener::ListenerRegistry;
use crate::remote::RemoteDialer;
use crate::store::PairStore;
use crate::token::{TokenManager, tokens_match};
use crate::types::*;

/// Drives pairing handshakes on behalf of the local cluster.
#[derive(Clone)]
pub struct PairingEngine {
    cluster_id: String,
    cluster_name: String,
    self_node: NodeInfo,
    listeners: Arc<ListenerRegistry>,
    pairs: PairStore,
    tokens: TokenManager,
    dialer: Arc<dyn RemoteDialer>,
}

impl PairingEngine {
    pub fn new(
        cluster_id: impl Into<String>,
        cluster_name: impl Into<String>,
        self_node: NodeInfo,
        listeners: Arc<ListenerRegistry>,
        pairs: PairStore,
        tokens: TokenManager,
        dialer: Arc<dyn RemoteDialer>,
    ) -> Self {
        Self {
            cluster_id: cluster_id.into(),
            cluster_name: cluster_name.into(),
            self_node,
            listeners,
            pairs,
            tokens,
            dialer,
        }
    }

    pub async fn create_pair(
        &self,
        request: ClusterPairCreateRequest,
    ) -> Result<ClusterPairCreateResponse, PairError> {
        let remote_ip = request.remote_cluster_ip.as_str();
        let remote_port = request.remote_cluster_port;
        info!(%remote_ip, remote_port, "attempting to pair with cluster");

        let remote = self.dialer.dial(remote_ip, remote_port).await.inspect_err(|e| {
            warn!(%remote_ip, remote_port, error = %e, "unable to reach cluster");
        })?;

        let process_request = ClusterPairProcessRequest {
            source_cluster_id: self.cluster_id.clone(),
            remote_cluster_token: request.remote_cluster_token.clone(),
        };
        let response = remote
            .process_pair_request(process_request)
            .await
            .inspect_err(|e| warn!(%remote_ip, error = %e, "unable to pair with cluster"))?;

        self.listeners
            .notify_create_pair(&self.self_node, &response)
            .await?;

        let pair_info = ClusterPairInfo {
            id: response.remote_cluster_id,
            name: response.remote_cluster_name,
            ip: request.remote_cluster_ip,
            port: request.remote_cluster_port,
            token: request.remote_cluster_token,
            options: response.options,
        };
        self.pairs.create(&pair_info, request.set_default).await?;
        info!(remote_cluster_id = %pair_info.id, "successfully paired with cluster");

        Ok(ClusterPairCreateResponse {
            remote_cluster_id: pair_info.id,
            remote_cluster_name: pair_info.name,
        })
    }

    pub async fn process_pair_request(
        &self,
        request: ClusterPairProcessRequest,
    ) -> Result<ClusterPairProcessResponse, PairError> {
        let token = self.tokens.get_token(false).await?;
        if !tokens_match(&token, &request.remote_cluster_token) {
            warn!(
                source_cluster_id = %request.source_cluster_id,
                "pair token mismatch"
            );
            return Err(PairError::AuthenticationFailed(
                "token mismatch during pairing".into(),
            ));
        }

        let mut response = ClusterPairProcessResponse {
            remote_cluster_id: self.cluster_id.clone(),
            remote_cluster_name: self.cluster_name.clone(),
            options: HashMap::new(),
        };
        self.listeners
            .notify_process_pair_request(&self.self_node, &mut response)
            .await?;

        info!(
            source_cluster_id = %request.source_cluster_id,
            "successfully processed pair request from remote cluster"
        );
        Ok(response)
    }

    pub async fn update_pair(&self, info: ClusterPairInfo) -> Result<(), PairError> {
        self.pairs.update(&info).await?;
        info!(pair_id = %info.id, "updated pairing with cluster");
        Ok(())
    }

    /// Listeners are not told about deletions.
    pub async fn delete_pair(&self, pair_id: &str) -> Result<(), PairError> {
        self.pairs.delete(pair_id).await?;
        info!(%pair_id, "successfully deleted pairing with cluster");
        Ok(())
    }

    pub async fn get_pair(&self, pair_id: &str) -> Result<ClusterPairGetResponse, PairError> {
        let pair_id = if pair_id.is_empty() {
            self.pairs
                .get_default_id()
                .await?
                .ok_or_else(|| PairError::NotFound("default cluster pair".into()))?
        } else {
            pair_id.to_owned()
        };
        let pair_info = self.pairs.get(&pair_id).await?;
        Ok(ClusterPairGetResponse { pair_info })
    }

    /// Fails as a whole when the default id cannot be read, even though the
    /// pairs themselves were.
    pub async fn enumerate_pairs(&self) -> Result<ClusterPairsEnumerateResponse, PairError> {
        let pairs = self.pairs.list().await?;
        let default_id = self
            .pairs
            .get_default_id()
            .await
            .inspect_err(|e| warn!(error = %e, "error getting default cluster pair"))?
            .unwrap_or_default();
        Ok(ClusterPairsEnumerateResponse { default_id, pairs })
    }

    pub async fn get_pair_token(&self, reset: bool) -> Result<ClusterPairTokenGetResponse, PairError> {
        let token = self.tokens.get_token(reset).await?;
        Ok(ClusterPairTokenGetResponse { token })
    }
}
