//! QUIC server that exposes a cluster's pairing API and dispatches incoming
//! requests to a [`ClusterPairing`] implementation.

use std::net::SocketAddr;
use std::sync::Arc;

use quinn::crypto::rustls::QuicServerConfig;
use tracing::{debug, error, info, instrument, warn};

use crate::api::ClusterPairing;
use crate::error::PairError;
use crate::message::{PairEnvelope, PairMessage};
use crate::remote::API_VERSION;

use super::MAX_MESSAGE_SIZE;

/// A pairing server that accepts QUIC connections and dispatches
/// [`PairMessage`] requests to a [`ClusterPairing`] implementation.
pub struct PairServer<T> {
    endpoint: quinn::Endpoint,
    handler: Arc<T>,
}

impl<T> PairServer<T>
where
    T: ClusterPairing + 'static,
{
    /// Create a new server bound to `addr`.
    pub fn new(
        addr: SocketAddr,
        tls_config: rustls::ServerConfig,
        handler: Arc<T>,
    ) -> Result<Self, PairError> {
        let quic_server_config = QuicServerConfig::try_from(tls_config)
            .map_err(|e| PairError::InvalidArgument(format!("invalid TLS config: {e}")))?;
        let server_config = quinn::ServerConfig::with_crypto(Arc::new(quic_server_config));
        let endpoint = quinn::Endpoint::server(server_config, addr).map_err(PairError::remote)?;
        info!(%addr, "pairing QUIC server listening");
        Ok(Self { endpoint, handler })
    }

    /// Accept connections in a loop until the endpoint is closed.
    ///
    /// Each accepted connection spawns a Tokio task, and each bi-stream
    /// within a connection is handled concurrently.
    pub async fn serve(&self) -> Result<(), PairError> {
        while let Some(incoming) = self.endpoint.accept().await {
            let handler = Arc::clone(&self.handler);
            tokio::spawn(async move {
                match incoming.await {
                    Ok(conn) => {
                        let remote = conn.remote_address();
                        debug!(%remote, "pairing connection accepted");
                        if let Err(e) = Self::handle_connection(conn, handler).await {
                            warn!(%remote, error = %e, "pairing connection error");
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "pairing incoming connection failed");
                    }
                }
            });
        }
        Ok(())
    }

    async fn handle_connection(conn: quinn::Connection, handler: Arc<T>) -> Result<(), PairError> {
        loop {
            let (send, recv) = match conn.accept_bi().await {
                Ok(stream) => stream,
                Err(quinn::ConnectionError::ApplicationClosed(_))
                | Err(quinn::ConnectionError::LocallyClosed) => return Ok(()),
                Err(e) => return Err(PairError::remote(e)),
            };

            let handler = Arc::clone(&handler);
            tokio::spawn(async move {
                if let Err(e) = Self::handle_stream(send, recv, &handler).await {
                    error!(error = %e, "pairing stream handler error");
                }
            });
        }
    }

    /// Process a single bi-stream: read request → dispatch → write response.
    #[instrument(skip_all)]
    async fn handle_stream(
        mut send: quinn::SendStream,
        mut recv: quinn::RecvStream,
        handler: &T,
    ) -> Result<(), PairError> {
        let buf = recv
            .read_to_end(MAX_MESSAGE_SIZE)
            .await
            .map_err(PairError::remote)?;

        let response = match serde_json::from_slice::<PairEnvelope>(&buf) {
            Ok(envelope) => {
                debug!(version = %envelope.version, request = %envelope.message, "pairing request received");
                Self::dispatch(handler, envelope).await
            }
            Err(e) => PairMessage::Error(PairError::InvalidArgument(format!(
                "malformed request: {e}"
            ))),
        };

        let payload = serde_json::to_vec(&response).map_err(PairError::internal)?;
        send.write_all(&payload).await.map_err(PairError::remote)?;
        send.finish().map_err(PairError::remote)?;
        Ok(())
    }

    /// Map a request to the matching [`ClusterPairing`] call and wrap the
    /// result in a response [`PairMessage`].
    pub async fn dispatch(handler: &T, envelope: PairEnvelope) -> PairMessage {
        if envelope.version != API_VERSION {
            warn!(version = %envelope.version, "rejecting request with unsupported protocol version");
            return PairMessage::Error(PairError::InvalidArgument(format!(
                "unsupported protocol version {}, expected {API_VERSION}",
                envelope.version
            )));
        }

        match envelope.message {
            PairMessage::CreatePair(req) => match handler.create_pair(req).await {
                Ok(resp) => PairMessage::PairCreated(resp),
                Err(e) => PairMessage::Error(e),
            },
            PairMessage::ProcessPairRequest(req) => {
                match handler.process_pair_request(req).await {
                    Ok(resp) => PairMessage::PairRequestProcessed(resp),
                    Err(e) => PairMessage::Error(e),
                }
            }
            PairMessage::UpdatePair(info) => match handler.update_pair(info).await {
                Ok(()) => PairMessage::Ok,
                Err(e) => PairMessage::Error(e),
            },
            PairMessage::DeletePair(id) => match handler.delete_pair(&id).await {
                Ok(()) => PairMessage::Ok,
                Err(e) => PairMessage::Error(e),
            },
            PairMessage::GetPair(id) => match handler.get_pair(&id).await {
                Ok(resp) => PairMessage::Pair(resp),
                Err(e) => PairMessage::Error(e),
            },
            PairMessage::EnumeratePairs => match handler.enumerate_pairs().await {
                Ok(resp) => PairMessage::Pairs(resp),
                Err(e) => PairMessage::Error(e),
            },
            PairMessage::GetPairToken { reset } => match handler.get_pair_token(reset).await {
                Ok(resp) => PairMessage::Token(resp),
                Err(e) => PairMessage::Error(e),
            },

            // --- Response variants should never arrive as requests ----------
            other => {
                warn!(msg = %other, "unexpected message variant received as request");
                PairMessage::Error(PairError::InvalidArgument(format!(
                    "unexpected message: {other}"
                )))
            }
        }
    }

    /// Address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, PairError> {
        self.endpoint.local_addr().map_err(PairError::internal)
    }

    /// Return a reference to the underlying QUIC endpoint, useful for
    /// shutting down.
    pub fn endpoint(&self) -> &quinn::Endpoint {
        &self.endpoint
    }
}
