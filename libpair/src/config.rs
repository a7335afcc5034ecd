//! Cluster identity configuration.

use serde::{Deserialize, Serialize};

use crate::error::PairError;
use crate::types::NodeInfo;

/// Identity of the local cluster and node.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClusterConfig {
    /// Unique id of this cluster, shared by all of its nodes.
    pub cluster_id: String,
    /// Display name reported to peers; falls back to `cluster_id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_name: Option<String>,
    /// Unique id of this node, used to attribute lock ownership.
    pub node_id: String,
    /// Management address of this node.
    #[serde(default)]
    pub mgmt_ip: String,
}

impl ClusterConfig {
    pub fn new(cluster_id: impl Into<String>, node_id: impl Into<String>) -> Self {
        Self {
            cluster_id: cluster_id.into(),
            node_id: node_id.into(),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.cluster_name = Some(name.into());
        self
    }

    pub fn with_mgmt_ip(mut self, ip: impl Into<String>) -> Self {
        self.mgmt_ip = ip.into();
        self
    }

    /// Name reported to peers during pairing.
    pub fn name(&self) -> &str {
        match self.cluster_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => &self.cluster_id,
        }
    }

    pub fn validate(&self) -> Result<(), PairError> {
        if self.cluster_id.is_empty() {
            return Err(PairError::InvalidArgument("cluster id must not be empty".into()));
        }
        if self.node_id.is_empty() {
            return Err(PairError::InvalidArgument("node id must not be empty".into()));
        }
        Ok(())
    }

    /// The [`NodeInfo`] handed to listeners.
    pub fn self_node(&self) -> NodeInfo {
        NodeInfo {
            id: self.node_id.clone(),
            cluster_id: self.cluster_id.clone(),
            mgmt_ip: self.mgmt_ip.clone(),
        }
    }
}
