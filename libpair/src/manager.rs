//! Composition root of the pairing subsystem.

use std::sync::Arc;

use async_trait::async_trait;
use libkvdb::Kvdb;

use crate::api::ClusterPairing;
use crate::config::ClusterConfig;
use crate::error::PairError;
use crate::listener::{ClusterListener, ListenerRegistry};
use crate::pairing::PairingEngine;
use crate::remote::RemoteDialer;
use crate::store::PairStore;
use crate::token::TokenManager;
use crate::types::*;

/// Owns the cluster identity and the listener list and exposes the pairing
/// API of the local cluster.
pub struct ClusterManager {
    config: ClusterConfig,
    self_node: NodeInfo,
    listeners: Arc<ListenerRegistry>,
    engine: PairingEngine,
}

impl ClusterManager {
    pub fn builder(
        config: ClusterConfig,
        kv: Arc<dyn Kvdb>,
        dialer: Arc<dyn RemoteDialer>,
    ) -> ClusterManagerBuilder {
        ClusterManagerBuilder {
            config,
            kv,
            dialer,
            listeners: ListenerRegistry::new(),
        }
    }

    pub fn cluster_id(&self) -> &str {
        &self.config.cluster_id
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    pub fn self_node(&self) -> &NodeInfo {
        &self.self_node
    }

    pub fn listeners(&self) -> &ListenerRegistry {
        &self.listeners
    }
}

impl std::fmt::Debug for ClusterManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterManager")
            .field("config", &self.config)
            .field("listeners", &self.listeners)
            .finish_non_exhaustive()
    }
}

/// Collects listeners before the manager is shared; the list is read-only
/// afterwards.
pub struct ClusterManagerBuilder {
    config: ClusterConfig,
    kv: Arc<dyn Kvdb>,
    dialer: Arc<dyn RemoteDialer>,
    listeners: ListenerRegistry,
}

impl ClusterManagerBuilder {
    /// Register `listener` after all previously registered ones.
    pub fn listener(mut self, listener: Arc<dyn ClusterListener>) -> Self {
        self.listeners.register(listener);
        self
    }

    pub fn build(self) -> Result<ClusterManager, PairError> {
        self.config.validate()?;
        let self_node = self.config.self_node();
        let listeners = Arc::new(self.listeners);
        let engine = PairingEngine::new(
            self.config.cluster_id.clone(),
            self.config.name(),
            self_node.clone(),
            Arc::clone(&listeners),
            PairStore::new(Arc::clone(&self.kv)),
            TokenManager::new(self.kv, self.config.cluster_id.clone(), self.config.node_id.clone()),
            self.dialer,
        );
        Ok(ClusterManager {
            config: self.config,
            self_node,
            listeners,
            engine,
        })
    }
}

#[async_trait]
impl ClusterPairing for ClusterManager {
    async fn create_pair(
        &self,
        request: ClusterPairCreateRequest,
    ) -> Result<ClusterPairCreateResponse, PairError> {
        self.engine.create_pair(request).await
    }

    async fn process_pair_request(
        &self,
        request: ClusterPairProcessRequest,
    ) -> Result<ClusterPairProcessResponse, PairError> {
        self.engine.process_pair_request(request).await
    }

    async fn update_pair(&self, info: ClusterPairInfo) -> Result<(), PairError> {
        self.engine.update_pair(info).await
    }

    async fn delete_pair(&self, pair_id: &str) -> Result<(), PairError> {
        self.engine.delete_pair(pair_id).await
    }

    async fn get_pair(&self, pair_id: &str) -> Result<ClusterPairGetResponse, PairError> {
        self.engine.get_pair(pair_id).await
    }

    async fn enumerate_pairs(&self) -> Result<ClusterPairsEnumerateResponse, PairError> {
        self.engine.enumerate_pairs().await
    }

    async fn get_pair_token(&self, reset: bool) -> Result<ClusterPairTokenGetResponse, PairError> {
        self.engine.get_pair_token(reset).await
    }
}
