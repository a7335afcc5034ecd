//! # libpair: cluster pairing for storage clusters
//!
//! `libpair` lets two independently operated storage clusters establish
//! mutual trust ("pair"), persists the resulting relationship in the
//! coordination store shared by every node of a cluster, and propagates
//! pairing events to an ordered set of pluggable listeners.  It follows the
//! workspace conventions: Tokio async runtime, `tracing` for observability,
//! `thiserror` for structured errors, QUIC (via [`quinn`]) for transport.
//!
//! ## Module overview
//!
//! | Module | Purpose |
//! |---|---|
//! | [`types`] | Data model: `ClusterPairInfo`, `NodeInfo`, requests/responses. |
//! | [`error`] | [`PairError`] enum covering all failure modes. |
//! | [`config`] | [`ClusterConfig`]: cluster and node identity. |
//! | [`store`] | [`PairStore`]: pair records and the default pointer. |
//! | [`token`] | [`TokenManager`]: the pair token in the cluster document. |
//! | [`listener`] | [`ClusterListener`] trait and ordered [`ListenerRegistry`]. |
//! | [`remote`] | [`RemoteDialer`]/[`RemoteCluster`]: reaching peers. |
//! | [`pairing`] | [`PairingEngine`]: initiator and acceptor handshakes. |
//! | [`api`] | [`ClusterPairing`] trait: the pairing API. |
//! | [`manager`] | [`ClusterManager`]: composition root. |
//! | [`message`] | [`PairMessage`] protocol envelope for QUIC transport. |
//! | [`transport`] | QUIC client/server built on `quinn`. |

pub mod api;
pub mod config;
pub mod error;
pub mod listener;
pub mod manager;
pub mod message;
pub mod pairing;
pub mod remote;
pub mod store;
pub mod token;
pub mod transport;
pub mod types;

pub use api::ClusterPairing;
pub use config::ClusterConfig;
pub use error::PairError;
pub use listener::{ClusterListener, ListenerRegistry};
pub use manager::{ClusterManager, ClusterManagerBuilder};
pub use message::{PairEnvelope, PairMessage};
pub use pairing::PairingEngine;
pub use remote::{API_VERSION, RemoteCluster, RemoteDialer};
pub use store::{DEFAULT_PAIR_KEY, PAIR_KEY_PREFIX, PairStore};
pub use token::{CLUSTER_INFO_KEY, CLUSTER_LOCK_KEY, ClusterInfo, TokenManager};
pub use types::*;
