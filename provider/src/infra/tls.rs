//! rustls configuration for LXD's self-signed server certificates.
//!
//! LXD daemons present certificates no public root vouches for. A remote is
//! therefore trusted by pinning: the stored certificate must equal the leaf
//! the server presents, byte for byte. The first contact uses a verifier that
//! accepts anything so the leaf can be captured.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{CryptoProvider, verify_tls12_signature, verify_tls13_signature};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime};
use rustls::{CertificateError, ClientConfig, DigitallySignedStruct, SignatureScheme};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;

use crate::domain::trust::certificate_fingerprint;

fn crypto_provider() -> Arc<CryptoProvider> {
    Arc::new(rustls::crypto::ring::default_provider())
}

// ── Verifiers ─────────────────────────────────────────────────────────────────

/// Accepts exactly one server certificate.
#[derive(Debug)]
pub struct PinnedCertVerifier {
    pinned: Vec<u8>,
    provider: Arc<CryptoProvider>,
}

impl PinnedCertVerifier {
    #[must_use]
    pub fn new(pinned: Vec<u8>) -> Self {
        Self {
            pinned,
            provider: crypto_provider(),
        }
    }
}

impl ServerCertVerifier for PinnedCertVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        if end_entity.as_ref() == self.pinned.as_slice() {
            return Ok(ServerCertVerified::assertion());
        }
        tracing::warn!(
            expected = %certificate_fingerprint(&self.pinned),
            presented = %certificate_fingerprint(end_entity.as_ref()),
            "server certificate does not match the stored certificate"
        );
        Err(rustls::Error::InvalidCertificate(
            CertificateError::ApplicationVerificationFailure,
        ))
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(message, cert, dss, &self.provider.signature_verification_algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.provider.signature_verification_algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider.signature_verification_algorithms.supported_schemes()
    }
}

/// Accepts any server certificate. Only for capturing a leaf on first use.
#[derive(Debug)]
struct AcceptAnyCert {
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for AcceptAnyCert {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(message, cert, dss, &self.provider.signature_verification_algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.provider.signature_verification_algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider.signature_verification_algorithms.supported_schemes()
    }
}

// ── Client identity ───────────────────────────────────────────────────────────

/// Client certificate chain and key, in PEM.
#[derive(Clone)]
pub struct ClientIdentity {
    cert_pem: Vec<u8>,
    key_pem: Vec<u8>,
}

impl ClientIdentity {
    /// Read the pair if both files exist.
    ///
    /// # Errors
    ///
    /// Returns an error if either file exists but cannot be read.
    pub fn load(cert: &Path, key: &Path) -> Result<Option<Self>> {
        if !cert.is_file() || !key.is_file() {
            return Ok(None);
        }
        Ok(Some(Self {
            cert_pem: std::fs::read(cert).with_context(|| format!("read {}", cert.display()))?,
            key_pem: std::fs::read(key).with_context(|| format!("read {}", key.display()))?,
        }))
    }

    /// Certificate followed by key, the form `reqwest::Identity::from_pem` expects.
    #[must_use]
    pub fn combined_pem(&self) -> Vec<u8> {
        let mut pem = self.cert_pem.clone();
        if !pem.ends_with(b"\n") {
            pem.push(b'\n');
        }
        pem.extend_from_slice(&self.key_pem);
        pem
    }

    fn chain(&self) -> Result<Vec<CertificateDer<'static>>> {
        let chain = rustls_pemfile::certs(&mut self.cert_pem.as_slice())
            .collect::<Result<Vec<_>, _>>()
            .context("parse client certificate")?;
        anyhow::ensure!(!chain.is_empty(), "no certificate in client certificate file");
        Ok(chain)
    }

    fn key(&self) -> Result<PrivateKeyDer<'static>> {
        rustls_pemfile::private_key(&mut self.key_pem.as_slice())
            .context("parse client key")?
            .context("no private key in client key file")
    }
}

// ── Configs ───────────────────────────────────────────────────────────────────

fn builder_with(
    verifier: Arc<dyn ServerCertVerifier>,
) -> Result<rustls::ConfigBuilder<ClientConfig, rustls::client::WantsClientCert>> {
    Ok(ClientConfig::builder_with_provider(crypto_provider())
        .with_safe_default_protocol_versions()
        .context("configure TLS protocol versions")?
        .dangerous()
        .with_custom_certificate_verifier(verifier))
}

/// Client config trusting only `pinned`, presenting `identity` when given.
///
/// # Errors
///
/// Returns an error if the client identity cannot be parsed.
pub fn pinned_client_config(
    pinned: &[u8],
    identity: Option<&ClientIdentity>,
) -> Result<ClientConfig> {
    let builder = builder_with(Arc::new(PinnedCertVerifier::new(pinned.to_vec())))?;
    match identity {
        Some(id) => builder
            .with_client_auth_cert(id.chain()?, id.key()?)
            .context("invalid client certificate/key pair"),
        None => Ok(builder.with_no_client_auth()),
    }
}

/// Complete a TLS handshake with `host:port`, accepting any certificate,
/// and return the leaf the server presented (DER). `host` is bare, without
/// IPv6 brackets.
///
/// # Errors
///
/// Returns an error on connect failure, handshake failure, timeout, or when
/// the server presents no certificate.
pub async fn fetch_peer_certificate(host: &str, port: u16, timeout: Duration) -> Result<Vec<u8>> {
    let config = builder_with(Arc::new(AcceptAnyCert {
        provider: crypto_provider(),
    }))?
    .with_no_client_auth();
    let connector = TlsConnector::from(Arc::new(config));

    let server_name = ServerName::try_from(host.to_string())
        .with_context(|| format!("invalid server name '{host}'"))?;
    let addr = if host.contains(':') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    };

    let handshake = async {
        let tcp = TcpStream::connect(&addr)
            .await
            .with_context(|| format!("connect {addr}"))?;
        connector
            .connect(server_name, tcp)
            .await
            .with_context(|| format!("TLS handshake with {addr}"))
    };
    let stream = tokio::time::timeout(timeout, handshake)
        .await
        .with_context(|| format!("TLS handshake with {addr} timed out"))??;

    let (_, session) = stream.get_ref();
    let leaf = session
        .peer_certificates()
        .and_then(|certs| certs.first())
        .with_context(|| format!("{addr} presented no certificate"))?;
    Ok(leaf.as_ref().to_vec())
}
