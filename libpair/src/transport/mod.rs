//! QUIC transport layer for the pairing API.
//!
//! This module provides [`PairClient`](client::PairClient),
//! [`QuicDialer`](client::QuicDialer) and [`PairServer`](server::PairServer)
//! that exchange [`PairMessage`](crate::PairMessage) values over QUIC
//! bi-directional streams using `quinn`.

pub mod client;
pub mod server;

/// Upper bound on a single request or response body.
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;
