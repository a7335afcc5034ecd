//! QUIC client used to reach a peer cluster's pairing API.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use quinn::crypto::rustls::QuicClientConfig;
use tracing::{debug, instrument};

use crate::api::ClusterPairing;
use crate::error::PairError;
use crate::message::{PairEnvelope, PairMessage};
use crate::remote::{RemoteCluster, RemoteDialer};
use crate::types::*;

use super::MAX_MESSAGE_SIZE;

/// A pairing client that sends [`PairMessage`] requests over a single QUIC
/// connection and returns the server's response.
pub struct PairClient {
    connection: quinn::Connection,
}

impl PairClient {
    /// Establish a new QUIC connection to the pairing server at `addr`.
    ///
    /// * `server_name`: TLS SNI name that must match a SAN in the server's
    ///   certificate
    /// * `tls_config`: client TLS configuration trusting the peer's CA
    pub async fn connect(
        addr: SocketAddr,
        server_name: &str,
        tls_config: rustls::ClientConfig,
    ) -> Result<Self, PairError> {
        let quic_client_config = QuicClientConfig::try_from(tls_config)
            .map_err(|e| PairError::InvalidArgument(format!("invalid TLS config: {e}")))?;
        let client_config = quinn::ClientConfig::new(Arc::new(quic_client_config));

        let bind = SocketAddr::from(([0, 0, 0, 0], 0));
        let mut endpoint = quinn::Endpoint::client(bind).map_err(PairError::remote)?;
        endpoint.set_default_client_config(client_config);

        let connection = endpoint
            .connect(addr, server_name)
            .map_err(PairError::remote)?
            .await
            .map_err(PairError::remote)?;

        debug!(%addr, %server_name, "pairing QUIC connection established");
        Ok(Self { connection })
    }

    /// Send a request and wait for the corresponding response.
    ///
    /// Each call opens a new bi-directional QUIC stream, writes the
    /// JSON-serialized envelope, finishes the send side, then reads the
    /// full response and deserializes it.
    #[instrument(skip_all, fields(msg = %msg))]
    pub async fn request(&self, msg: PairMessage) -> Result<PairMessage, PairError> {
        let (mut send, mut recv) = self
            .connection
            .open_bi()
            .await
            .map_err(PairError::remote)?;

        let payload = serde_json::to_vec(&PairEnvelope::new(msg)).map_err(PairError::internal)?;
        send.write_all(&payload).await.map_err(PairError::remote)?;
        send.finish().map_err(PairError::remote)?;

        let buf = recv
            .read_to_end(MAX_MESSAGE_SIZE)
            .await
            .map_err(PairError::remote)?;

        let response: PairMessage = serde_json::from_slice(&buf)
            .map_err(|e| PairError::RemoteUnreachable(format!("malformed response: {e}")))?;
        debug!(%response, "pairing response received");
        Ok(response)
    }

    /// Close the underlying QUIC connection gracefully.
    pub fn close(&self) {
        self.connection
            .close(quinn::VarInt::from_u32(0), b"client shutdown");
    }
}

/// Turn a response that does not match the request into an error.
fn unexpected(response: PairMessage) -> PairError {
    match response {
        PairMessage::Error(e) => e,
        other => PairError::Internal(format!("unexpected response: {other}")),
    }
}

#[async_trait]
impl RemoteCluster for PairClient {
    async fn process_pair_request(
        &self,
        request: ClusterPairProcessRequest,
    ) -> Result<ClusterPairProcessResponse, PairError> {
        ClusterPairing::process_pair_request(self, request).await
    }
}

#[async_trait]
impl ClusterPairing for PairClient {
    async fn create_pair(
        &self,
        request: ClusterPairCreateRequest,
    ) -> Result<ClusterPairCreateResponse, PairError> {
        match self.request(PairMessage::CreatePair(request)).await? {
            PairMessage::PairCreated(resp) => Ok(resp),
            other => Err(unexpected(other)),
        }
    }

    async fn process_pair_request(
        &self,
        request: ClusterPairProcessRequest,
    ) -> Result<ClusterPairProcessResponse, PairError> {
        match self.request(PairMessage::ProcessPairRequest(request)).await? {
            PairMessage::PairRequestProcessed(resp) => Ok(resp),
            other => Err(unexpected(other)),
        }
    }

    async fn update_pair(&self, info: ClusterPairInfo) -> Result<(), PairError> {
        match self.request(PairMessage::UpdatePair(info)).await? {
            PairMessage::Ok => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    async fn delete_pair(&self, pair_id: &str) -> Result<(), PairError> {
        match self.request(PairMessage::DeletePair(pair_id.to_owned())).await? {
            PairMessage::Ok => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    async fn get_pair(&self, pair_id: &str) -> Result<ClusterPairGetResponse, PairError> {
        match self.request(PairMessage::GetPair(pair_id.to_owned())).await? {
            PairMessage::Pair(resp) => Ok(resp),
            other => Err(unexpected(other)),
        }
    }

    async fn enumerate_pairs(&self) -> Result<ClusterPairsEnumerateResponse, PairError> {
        match self.request(PairMessage::EnumeratePairs).await? {
            PairMessage::Pairs(resp) => Ok(resp),
            other => Err(unexpected(other)),
        }
    }

    async fn get_pair_token(&self, reset: bool) -> Result<ClusterPairTokenGetResponse, PairError> {
        match self.request(PairMessage::GetPairToken { reset }).await? {
            PairMessage::Token(resp) => Ok(resp),
            other => Err(unexpected(other)),
        }
    }
}

/// [`RemoteDialer`] that connects to peers over QUIC.
///
/// Every peer is expected to present a certificate for `server_name` signed
/// by a CA trusted by `tls_config`.
pub struct QuicDialer {
    tls_config: rustls::ClientConfig,
    server_name: String,
}

impl QuicDialer {
    pub fn new(tls_config: rustls::ClientConfig, server_name: impl Into<String>) -> Self {
        Self {
            tls_config,
            server_name: server_name.into(),
        }
    }
}

#[async_trait]
impl RemoteDialer for QuicDialer {
    async fn dial(&self, ip: &str, port: u16) -> Result<Box<dyn RemoteCluster>, PairError> {
        let addr = tokio::net::lookup_host((ip, port))
            .await
            .map_err(|e| PairError::RemoteUnreachable(format!("resolve {ip}:{port}: {e}")))?
            .next()
            .ok_or_else(|| PairError::RemoteUnreachable(format!("no address for {ip}:{port}")))?;
        let client = PairClient::connect(addr, &self.server_name, self.tls_config.clone()).await?;
        Ok(Box::new(client))
    }
}
