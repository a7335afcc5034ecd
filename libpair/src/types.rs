//! Core pairing types: pair records, node identity, requests and responses.
//!
//! These types form the data model shared by the pairing engine, the
//! persistence layer and the transport.  They are all
//! [`Serialize`]/[`Deserialize`]: pair records are stored in the coordination
//! store as JSON, and requests travel over QUIC as JSON.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Persisted pairing record
// ---------------------------------------------------------------------------

/// One established federation with a remote cluster.
///
/// Stored under `cluster/pair/<id>`.  `id` never changes once written.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClusterPairInfo {
    /// Remote cluster's unique identifier.
    pub id: String,
    /// Remote cluster's display name.
    pub name: String,
    /// Address the remote cluster's pairing API is dialed at.
    pub ip: String,
    /// Port the remote cluster's pairing API is dialed at.
    pub port: u16,
    /// Token presented to the remote side when the pair was created.
    pub token: String,
    /// Pairing metadata returned by the remote side.
    #[serde(default)]
    pub options: HashMap<String, String>,
}

impl fmt::Display for ClusterPairInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}) at {}:{}", self.id, self.name, self.ip, self.port)
    }
}

// ---------------------------------------------------------------------------
// Node identity
// ---------------------------------------------------------------------------

/// Identity of the node handling a pairing call, handed to listeners.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeInfo {
    /// Unique node identifier.
    pub id: String,
    /// Cluster the node belongs to.
    pub cluster_id: String,
    /// Management address of the node.
    #[serde(default)]
    pub mgmt_ip: String,
}

// ---------------------------------------------------------------------------
// Requests & responses
// ---------------------------------------------------------------------------

/// Request to pair this cluster with a remote cluster.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterPairCreateRequest {
    /// Address of the remote cluster's pairing API.
    pub remote_cluster_ip: String,
    /// Port of the remote cluster's pairing API.
    pub remote_cluster_port: u16,
    /// Pair token of the remote cluster, obtained out of band.
    pub remote_cluster_token: String,
    /// Make the new pair the default pair.
    #[serde(default)]
    pub set_default: bool,
}

/// Result of a successful [`ClusterPairCreateRequest`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClusterPairCreateResponse {
    /// Id of the cluster we paired with.
    pub remote_cluster_id: String,
    /// Name of the cluster we paired with.
    pub remote_cluster_name: String,
}

/// Handshake sent by the initiator to the acceptor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterPairProcessRequest {
    /// Id of the initiating cluster.
    pub source_cluster_id: String,
    /// Token the initiator believes the acceptor holds.
    pub remote_cluster_token: String,
}

/// Acceptor's answer to a [`ClusterPairProcessRequest`].
///
/// Listeners on the acceptor may enrich `options` before it is returned.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClusterPairProcessResponse {
    /// Id of the accepting cluster.
    pub remote_cluster_id: String,
    /// Name of the accepting cluster.
    pub remote_cluster_name: String,
    /// Capabilities and endpoints contributed by the acceptor's listeners.
    #[serde(default)]
    pub options: HashMap<String, String>,
}

/// A single pair record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClusterPairGetResponse {
    /// The requested record.
    pub pair_info: ClusterPairInfo,
}

/// All pair records plus the default pointer.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClusterPairsEnumerateResponse {
    /// Id of the default pair, empty when none is set.
    #[serde(default)]
    pub default_id: String,
    /// Pair records keyed by remote cluster id.
    #[serde(default)]
    pub pairs: HashMap<String, ClusterPairInfo>,
}

/// This cluster's pair token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClusterPairTokenGetResponse {
    /// Hex-encoded shared secret.
    pub token: String,
}
