//! paird: cluster pairing daemon.
//!
//! Serves the pairing API of one cluster node over QUIC and dials peer
//! clusters on behalf of `CreatePair` requests.

mod config;
mod listener;
mod tls;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use libkvdb::MemKvdb;
use libpair::ClusterManager;
use libpair::transport::client::QuicDialer;
use libpair::transport::server::PairServer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::{ENV_OVERRIDES, LogConfig, PairdConfig};
use crate::listener::LoggingListener;

#[derive(Parser, Debug)]
#[command(name = "paird", version, about = "Storage cluster pairing daemon")]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, default_value = "/etc/paird/paird.yaml")]
    config: PathBuf,

    /// Address of the QUIC pairing endpoint; overrides file and environment.
    #[arg(short, long)]
    listen: Option<SocketAddr>,
}

fn init_logging(log: &LogConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if log.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn report_failure(e: &anyhow::Error) {
    error!(error = ?e, "paird exited with error");
}

async fn run(config: PairdConfig) -> Result<()> {
    let _ = rustls::crypto::ring::default_provider().install_default();

    let cluster = config.cluster_config();
    info!(
        cluster_id = %cluster.cluster_id,
        node_id = %cluster.node_id,
        listen = %config.listen,
        "starting paird"
    );

    let dialer = Arc::new(QuicDialer::new(
        tls::client_config(&config.tls)?,
        config.server_name.clone(),
    ));
    let manager = ClusterManager::builder(cluster, Arc::new(MemKvdb::new()), dialer)
        .listener(Arc::new(LoggingListener))
        .build()
        .context("invalid cluster identity")?;

    let server = Arc::new(PairServer::new(
        config.listen,
        tls::server_config(&config.tls)?,
        Arc::new(manager),
    )?);

    let serving = Arc::clone(&server);
    let handle = tokio::spawn(async move { serving.serve().await });

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("shutting down paird");
    server.endpoint().close(0u32.into(), b"shutdown");
    server.endpoint().wait_idle().await;

    match handle.await {
        Ok(result) => result.context("pairing server failed"),
        Err(e) => Err(e).context("pairing server task panicked"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = PairdConfig::load(&cli.config)?;
    config.apply_env(&ENV_OVERRIDES)?;
    if let Some(listen) = cli.listen {
        config.listen = listen;
    }

    init_logging(&config.log);

    if let Err(e) = run(config).await {
        report_failure(&e);
        return Err(e);
    }
    Ok(())
}
