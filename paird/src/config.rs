//! paird configuration.
//!
//! Read from a YAML document, then adjusted by environment variables and
//! finally by command-line flags.
//!
//! Environment variables:
//! - `PAIRD_LISTEN`: socket address of the QUIC pairing endpoint, overrides
//!   `listen` from the file.
//! - `PAIRD_LOG_JSON`: set to `1` for JSON log lines, `0` for plain text.
//!   Defaults to the file's `log.json`.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use libpair::ClusterConfig;
use serde::{Deserialize, Serialize};

fn default_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 9001))
}

fn default_server_name() -> String {
    "paird.local".to_owned()
}

fn default_log_level() -> String {
    "info".to_owned()
}

/// PEM files used by the pairing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TlsPaths {
    /// Certificate chain presented to peers.
    pub cert: PathBuf,
    /// PKCS#8 private key for `cert`.
    pub key: PathBuf,
    /// CA bundle used to verify peers this node dials.
    pub ca: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogConfig {
    /// Filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Top-level configuration document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PairdConfig {
    pub cluster_id: String,
    #[serde(default)]
    pub cluster_name: Option<String>,
    /// A random id is generated at startup when unset.
    #[serde(default)]
    pub node_id: Option<String>,
    #[serde(default)]
    pub mgmt_ip: String,
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
    /// TLS server name peers present and dialers expect.
    #[serde(default = "default_server_name")]
    pub server_name: String,
    pub tls: TlsPaths,
    #[serde(default)]
    pub log: LogConfig,
}

/// Settings taken from the process environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    pub listen: Option<String>,
    pub log_json: Option<bool>,
}

impl EnvOverrides {
    fn from_env() -> Self {
        Self {
            listen: std::env::var("PAIRD_LISTEN").ok().filter(|v| !v.is_empty()),
            log_json: std::env::var("PAIRD_LOG_JSON").ok().map(|v| v == "1"),
        }
    }
}

/// Environment overrides, read at first access.
pub static ENV_OVERRIDES: LazyLock<EnvOverrides> = LazyLock::new(EnvOverrides::from_env);

impl PairdConfig {
    pub fn from_yaml(text: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(text).context("invalid paird configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("failed to load {}", path.display()))
    }

    fn validate(&self) -> Result<()> {
        anyhow::ensure!(!self.cluster_id.is_empty(), "cluster_id must not be empty");
        anyhow::ensure!(!self.server_name.is_empty(), "server_name must not be empty");
        Ok(())
    }

    pub fn apply_env(&mut self, env: &EnvOverrides) -> Result<()> {
        if let Some(listen) = &env.listen {
            self.listen = listen
                .parse()
                .with_context(|| format!("invalid PAIRD_LISTEN {listen}"))?;
        }
        if let Some(json) = env.log_json {
            self.log.json = json;
        }
        Ok(())
    }

    /// Identity handed to the pairing core; fills in a random node id when
    /// none is configured.
    pub fn cluster_config(&self) -> ClusterConfig {
        let node_id = self
            .node_id
            .clone()
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        ClusterConfig {
            cluster_id: self.cluster_id.clone(),
            cluster_name: self.cluster_name.clone(),
            node_id,
            mgmt_ip: self.mgmt_ip.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const FULL: &str = r#"
cluster_id: "c1"
cluster_name: "east"
node_id: "node-1"
mgmt_ip: "10.0.0.1"
listen: "127.0.0.1:9100"
server_name: "pair.east"
tls:
  cert: /etc/paird/cert.pem
  key: /etc/paird/key.pem
  ca: /etc/paird/ca.pem
log:
  level: debug
  json: true
"#;

    const MINIMAL: &str = r#"
cluster_id: "c1"
tls: { cert: c.pem, key: k.pem, ca: ca.pem }
"#;

    #[test]
    fn parse_full_document() {
        let config = PairdConfig::from_yaml(FULL).unwrap();
        assert_eq!(config.cluster_name.as_deref(), Some("east"));
        assert_eq!(config.listen, "127.0.0.1:9100".parse().unwrap());
        assert_eq!(config.server_name, "pair.east");
        assert_eq!(config.tls.ca, PathBuf::from("/etc/paird/ca.pem"));
        assert_eq!(config.log.level, "debug");
        assert!(config.log.json);

        let cluster = config.cluster_config();
        assert_eq!(cluster.node_id, "node-1");
        assert_eq!(cluster.name(), "east");
        assert_eq!(cluster.mgmt_ip, "10.0.0.1");
    }

    #[test]
    fn defaults_fill_missing_fields() {
        let config = PairdConfig::from_yaml(MINIMAL).unwrap();
        assert_eq!(config.listen, default_listen());
        assert_eq!(config.server_name, "paird.local");
        assert_eq!(config.log, LogConfig::default());

        let cluster = config.cluster_config();
        assert_eq!(cluster.name(), "c1");
        assert!(uuid::Uuid::parse_str(&cluster.node_id).is_ok());
    }

    #[test]
    fn rejects_bad_documents() {
        assert!(PairdConfig::from_yaml("cluster_id: c1\n").is_err());
        assert!(PairdConfig::from_yaml(&MINIMAL.replace("\"c1\"", "\"\"")).is_err());
        assert!(PairdConfig::from_yaml(&format!("{MINIMAL}bogus: 1\n")).is_err());
    }

    #[test]
    fn env_overrides_file() {
        let mut config = PairdConfig::from_yaml(FULL).unwrap();
        config
            .apply_env(&EnvOverrides {
                listen: Some("0.0.0.0:7000".into()),
                log_json: Some(false),
            })
            .unwrap();
        assert_eq!(config.listen.port(), 7000);
        assert!(!config.log.json);

        config.apply_env(&EnvOverrides::default()).unwrap();
        assert_eq!(config.listen.port(), 7000);

        let bad = EnvOverrides {
            listen: Some("not-an-addr".into()),
            log_json: None,
        };
        assert!(config.apply_env(&bad).is_err());
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FULL.as_bytes()).unwrap();
        let config = PairdConfig::load(file.path()).unwrap();
        assert_eq!(config.cluster_id, "c1");

        let missing = file.path().with_extension("missing");
        assert!(PairdConfig::load(&missing).is_err());
    }
}
