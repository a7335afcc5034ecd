//! Reaching a peer cluster's pairing API.
//!
//! The pairing engine never talks to the network directly: it asks a
//! [`RemoteDialer`] for a [`RemoteCluster`] handle.  The QUIC transport
//! provides the production dialer; tests wire clusters together in-process.

use async_trait::async_trait;

use crate::error::PairError;
use crate::types::{ClusterPairProcessRequest, ClusterPairProcessResponse};

/// Version of the pairing protocol spoken by this crate.
pub const API_VERSION: &str = "v1";

/// A connected peer cluster.
#[async_trait]
pub trait RemoteCluster: Send + Sync {
    /// Ask the peer to accept a pairing handshake.
    async fn process_pair_request(
        &self,
        request: ClusterPairProcessRequest,
    ) -> Result<ClusterPairProcessResponse, PairError>;
}

/// Opens connections to peer clusters.
#[async_trait]
pub trait RemoteDialer: Send + Sync {
    /// Connect to the pairing API at `ip:port`.
    ///
    /// Unreachable endpoints fail with [`PairError::RemoteUnreachable`].
    async fn dial(&self, ip: &str, port: u16) -> Result<Box<dyn RemoteCluster>, PairError>;
}
