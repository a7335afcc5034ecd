//! Pairing protocol messages transmitted over QUIC.
//!
//! [`PairEnvelope`] is what actually travels on a stream: the protocol
//! version of the sender plus one [`PairMessage`].  The client sends a
//! *request* variant and the server replies with the corresponding
//! *response* variant (or [`PairMessage::Error`]).

use serde::{Deserialize, Serialize};

use crate::error::PairError;
use crate::remote::API_VERSION;
use crate::types::*;

/// Versioned wrapper around every message on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairEnvelope {
    /// Protocol version of the sender, see [`API_VERSION`].
    pub version: String,
    pub message: PairMessage,
}

impl PairEnvelope {
    /// Wrap `message` with the local protocol version.
    pub fn new(message: PairMessage) -> Self {
        Self {
            version: API_VERSION.to_owned(),
            message,
        }
    }
}

/// Top-level message for the pairing API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PairMessage {
    // ----- Requests --------------------------------------------------------
    /// Pair the receiving cluster with another cluster.
    CreatePair(ClusterPairCreateRequest),
    /// Pairing handshake from an initiating cluster.
    ProcessPairRequest(ClusterPairProcessRequest),
    /// Replace a stored pair record.
    UpdatePair(ClusterPairInfo),
    /// Remove a pair.
    DeletePair(String),
    /// Fetch a pair; an empty id selects the default.
    GetPair(String),
    /// List all pairs.
    EnumeratePairs,
    /// Fetch (and optionally reset) the pair token.
    GetPairToken { reset: bool },

    // ----- Responses -------------------------------------------------------
    /// A pair was created.
    PairCreated(ClusterPairCreateResponse),
    /// The handshake was accepted.
    PairRequestProcessed(ClusterPairProcessResponse),
    /// A single pair.
    Pair(ClusterPairGetResponse),
    /// All pairs.
    Pairs(ClusterPairsEnumerateResponse),
    /// The pair token.
    Token(ClusterPairTokenGetResponse),

    /// Generic success acknowledgement (no payload).
    Ok,
    /// An error occurred.
    Error(PairError),
}

impl std::fmt::Display for PairMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CreatePair(req) => write!(
                f,
                "CreatePair({}:{})",
                req.remote_cluster_ip, req.remote_cluster_port
            ),
            Self::ProcessPairRequest(req) => {
                write!(f, "ProcessPairRequest(source={})", req.source_cluster_id)
            }
            Self::UpdatePair(info) => write!(f, "UpdatePair({})", info.id),
            Self::DeletePair(id) => write!(f, "DeletePair({id})"),
            Self::GetPair(id) if id.is_empty() => f.write_str("GetPair(default)"),
            Self::GetPair(id) => write!(f, "GetPair({id})"),
            Self::EnumeratePairs => f.write_str("EnumeratePairs"),
            Self::GetPairToken { reset } => write!(f, "GetPairToken(reset={reset})"),
            Self::PairCreated(resp) => write!(f, "PairCreated({})", resp.remote_cluster_id),
            Self::PairRequestProcessed(resp) => {
                write!(f, "PairRequestProcessed({})", resp.remote_cluster_id)
            }
            Self::Pair(resp) => write!(f, "Pair({})", resp.pair_info.id),
            Self::Pairs(resp) => write!(f, "Pairs(count={})", resp.pairs.len()),
            // Never print the secret.
            Self::Token(_) => f.write_str("Token"),
            Self::Ok => f.write_str("Ok"),
            Self::Error(e) => write!(f, "Error({e})"),
        }
    }
}
