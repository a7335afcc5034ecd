//! TLS material for the pairing endpoint.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result, bail};
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls_pemfile::{certs, pkcs8_private_keys};

use crate::config::TlsPaths;

fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let chain = certs(&mut BufReader::new(file))
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("failed to parse certificates in {}", path.display()))?;
    if chain.is_empty() {
        bail!("no certificates found in {}", path.display());
    }
    Ok(chain)
}

fn load_key(path: &Path) -> Result<PrivateKeyDer<'static>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let key = pkcs8_private_keys(&mut BufReader::new(file))
        .next()
        .with_context(|| format!("no PKCS#8 private key found in {}", path.display()))?
        .with_context(|| format!("failed to parse private key in {}", path.display()))?;
    Ok(PrivateKeyDer::Pkcs8(key))
}

/// Server side of the pairing endpoint.
pub fn server_config(paths: &TlsPaths) -> Result<rustls::ServerConfig> {
    let chain = load_certs(&paths.cert)?;
    let key = load_key(&paths.key)?;
    rustls::ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(chain, key)
        .context("failed to build TLS server config")
}

/// Client side used when dialing peers; trusts only the configured CA.
pub fn client_config(paths: &TlsPaths) -> Result<rustls::ClientConfig> {
    let mut roots = rustls::RootCertStore::empty();
    for cert in load_certs(&paths.ca)? {
        roots
            .add(cert)
            .with_context(|| format!("invalid CA certificate in {}", paths.ca.display()))?;
    }
    Ok(rustls::ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use rcgen::{CertificateParams, KeyPair};

    use super::*;

    fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn self_signed(dir: &Path) -> TlsPaths {
        let key = KeyPair::generate().unwrap();
        let cert = CertificateParams::new(vec!["paird.local".to_owned()])
            .unwrap()
            .self_signed(&key)
            .unwrap();
        let cert_path = write(dir, "cert.pem", &cert.pem());
        TlsPaths {
            cert: cert_path.clone(),
            key: write(dir, "key.pem", &key.serialize_pem()),
            ca: cert_path,
        }
    }

    #[test]
    fn loads_pem_material() {
        let _ = rustls::crypto::ring::default_provider().install_default();
        let dir = tempfile::tempdir().unwrap();
        let paths = self_signed(dir.path());
        assert!(server_config(&paths).is_ok());
        assert!(client_config(&paths).is_ok());
    }

    #[test]
    fn reports_missing_or_empty_files() {
        let _ = rustls::crypto::ring::default_provider().install_default();
        let dir = tempfile::tempdir().unwrap();
        let mut paths = self_signed(dir.path());

        paths.key = write(dir.path(), "empty.pem", "");
        let err = server_config(&paths).unwrap_err();
        assert!(err.to_string().contains("no PKCS#8 private key"), "{err}");

        paths.ca = dir.path().join("absent.pem");
        assert!(client_config(&paths).is_err());

        paths.cert = write(dir.path(), "garbage.pem", "not a certificate");
        let err = load_certs(&paths.cert).unwrap_err();
        assert!(err.to_string().contains("no certificates"), "{err}");
    }
}
