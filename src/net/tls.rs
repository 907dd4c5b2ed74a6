//! TLS configuration for secure connectors.

use axum_server::tls_rustls::RustlsConfig;
use rustls::crypto::{aws_lc_rs, CryptoProvider};
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::server::{ClientHello, ResolvesServerCert, WebPkiClientVerifier};
use rustls::sign::CertifiedKey;
use rustls::{RootCertStore, ServerConfig, SupportedProtocolVersion};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::config::schema::TlsCredentials;

#[derive(Debug, Error)]
pub enum TlsError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("no certificates found in {0:?}")]
    NoCertificates(PathBuf),

    #[error("no private key found in {0:?}")]
    NoPrivateKey(PathBuf),

    #[error("unsupported TLS protocol {0:?}")]
    UnknownProtocol(String),

    #[error("none of the configured cipher suites is supported")]
    NoCipherSuites,

    #[error(transparent)]
    Rustls(#[from] rustls::Error),

    #[error("client certificate verifier: {0}")]
    Verifier(#[from] rustls::server::VerifierBuilderError),
}

/// Build the rustls server configuration for a TLS connector.
pub fn load_tls_config(credentials: &TlsCredentials) -> Result<RustlsConfig, TlsError> {
    let provider = Arc::new(crypto_provider(&credentials.supported_cipher_suites)?);
    let versions = protocol_versions(&credentials.supported_protocols)?;

    let certs = load_certs(&credentials.cert_path)?;
    let key = load_private_key(&credentials.key_path)?;
    let signing_key = provider.key_provider.load_private_key(key)?;
    let resolver = SniPolicyResolver {
        key: Arc::new(CertifiedKey::new(certs, signing_key)),
        sni_required: credentials.sni_required,
    };

    let builder =
        ServerConfig::builder_with_provider(provider.clone()).with_protocol_versions(&versions)?;
    let builder = match &credentials.trust_store_path {
        Some(path) => {
            let roots = load_roots(path)?;
            let verifier =
                WebPkiClientVerifier::builder_with_provider(Arc::new(roots), provider).build()?;
            builder.with_client_cert_verifier(verifier)
        }
        None => builder.with_no_client_auth(),
    };

    let mut config = builder.with_cert_resolver(Arc::new(resolver));
    config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

    tracing::debug!(
        cert_path = %credentials.cert_path.display(),
        protocols = ?credentials.supported_protocols,
        client_auth = credentials.trust_store_path.is_some(),
        sni_required = credentials.sni_required,
        "TLS configuration loaded"
    );
    Ok(RustlsConfig::from_config(Arc::new(config)))
}

fn crypto_provider(cipher_suites: &[String]) -> Result<CryptoProvider, TlsError> {
    let mut provider = aws_lc_rs::default_provider();
    if cipher_suites.is_empty() {
        return Ok(provider);
    }

    provider.cipher_suites.retain(|suite| {
        let name = format!("{:?}", suite.suite());
        cipher_suites.iter().any(|wanted| *wanted == name)
    });
    if provider.cipher_suites.is_empty() {
        return Err(TlsError::NoCipherSuites);
    }
    Ok(provider)
}

fn protocol_versions(
    names: &[String],
) -> Result<Vec<&'static SupportedProtocolVersion>, TlsError> {
    names
        .iter()
        .map(|name| match name.as_str() {
            "TLSv1.2" => Ok(&rustls::version::TLS12),
            "TLSv1.3" => Ok(&rustls::version::TLS13),
            other => Err(TlsError::UnknownProtocol(other.to_string())),
        })
        .collect()
}

fn open(path: &Path) -> Result<BufReader<File>, TlsError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| TlsError::Io {
            path: path.to_path_buf(),
            source,
        })
}

fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, TlsError> {
    let certs = rustls_pemfile::certs(&mut open(path)?)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| TlsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    if certs.is_empty() {
        return Err(TlsError::NoCertificates(path.to_path_buf()));
    }
    Ok(certs)
}

fn load_private_key(path: &Path) -> Result<PrivateKeyDer<'static>, TlsError> {
    rustls_pemfile::private_key(&mut open(path)?)
        .map_err(|source| TlsError::Io {
            path: path.to_path_buf(),
            source,
        })?
        .ok_or_else(|| TlsError::NoPrivateKey(path.to_path_buf()))
}

fn load_roots(path: &Path) -> Result<RootCertStore, TlsError> {
    let mut roots = RootCertStore::empty();
    for cert in load_certs(path)? {
        roots.add(cert)?;
    }
    Ok(roots)
}

/// Serves one certificate, optionally refusing clients that send no SNI.
#[derive(Debug)]
struct SniPolicyResolver {
    key: Arc<CertifiedKey>,
    sni_required: bool,
}

impl ResolvesServerCert for SniPolicyResolver {
    fn resolve(&self, client_hello: ClientHello<'_>) -> Option<Arc<CertifiedKey>> {
        if self.sni_required && client_hello.server_name().is_none() {
            tracing::debug!("Rejecting TLS handshake without SNI");
            return None;
        }
        Some(self.key.clone())
    }
}
