//! Trust bootstrap states and certificate encoding helpers.
//!
//! Pure helpers over DER bytes.

use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use sha2::{Digest, Sha256};

/// Progress of trust bootstrap for one remote.
///
/// `Bootstrapped` is terminal; re-entering bootstrap from it is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapState {
    Unbootstrapped,
    AddressResolved,
    CertificateChecked,
    Bootstrapped,
}

impl fmt::Display for BootstrapState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unbootstrapped => "unbootstrapped",
            Self::AddressResolved => "address-resolved",
            Self::CertificateChecked => "certificate-checked",
            Self::Bootstrapped => "bootstrapped",
        })
    }
}

/// User opt-ins that widen what bootstrap may do on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrustPolicy {
    /// Trust a remote's certificate on first contact.
    pub accept_remote_certificate: bool,
    /// Create the client certificate pair when it is missing.
    pub generate_client_certificates: bool,
}

/// Lowercase hex encoding.
#[must_use]
pub fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for &b in bytes {
        out.push(char::from(HEX[(b >> 4) as usize]));
        out.push(char::from(HEX[(b & 0xf) as usize]));
    }
    out
}

/// SHA-256 fingerprint of a DER certificate, as LXD prints it.
#[must_use]
pub fn certificate_fingerprint(der: &[u8]) -> String {
    hex_encode(&Sha256::digest(der))
}

/// Wrap a DER certificate in a PEM `CERTIFICATE` block (64-column body).
#[must_use]
pub fn encode_certificate_pem(der: &[u8]) -> String {
    let body = STANDARD.encode(der);
    let mut pem = String::with_capacity(body.len() + body.len() / 64 + 64);
    pem.push_str("-----BEGIN CERTIFICATE-----\n");
    for chunk in body.as_bytes().chunks(64) {
        pem.push_str(&String::from_utf8_lossy(chunk));
        pem.push('\n');
    }
    pem.push_str("-----END CERTIFICATE-----\n");
    pem
}
