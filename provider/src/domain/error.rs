//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator; callers recover the kind with `downcast_ref`.

use thiserror::Error;

// ── Configuration errors ─────────────────────────────────────────────────────

/// Defects in the provider or remote configuration. Never retried.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Remote '{name}' not found (default: '{default}')")]
    UnknownRemote { name: String, default: String },

    #[error(
        "Address '{address}' already contains a scheme. Remove the scheme setting or use a bare address."
    )]
    DuplicateScheme { address: String },

    #[error("Address '{address}' already contains a port. Remove the port setting ('{port}').")]
    DuplicatePort { address: String, port: String },

    #[error("Unsupported scheme '{0}'. Valid schemes: unix, https")]
    UnsupportedScheme(String),

    #[error("Invalid port '{0}'")]
    InvalidPort(String),

    #[error("Invalid address '{0}'")]
    InvalidAddress(String),

    #[error("Remote '{0}': password and token are mutually exclusive")]
    ConflictingCredentials(String),

    #[error("Remote '{0}': simplestreams remotes require an https address")]
    SocketImageRemote(String),
}

// ── Local socket discovery ───────────────────────────────────────────────────

/// No usable local control socket.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SocketError {
    #[error(
        "Environment variable LXD_SOCKET points to either a non-existing or non-writable unix socket ({0})"
    )]
    SocketOverride(String),

    #[error(
        "Environment variable LXD_DIR points to a LXD directory that does not contain a writable unix socket ({0})"
    )]
    DirOverride(String),

    #[error("LXD socket with write permissions not found. Searched LXD directories: {searched}")]
    NoWritableSocket { searched: String },
}

// ── Trust establishment ──────────────────────────────────────────────────────

/// Trust between this client and a remote could not be established.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TrustError {
    #[error(
        "Unable to communicate with remote '{remote}' ({cause}). Either set accept_remote_certificate to true or add the remote out of band and try again."
    )]
    UntrustedRemote { remote: String, cause: String },

    #[error(
        "Client certificate not found in {dir}. Set generate_client_certificates to true or create it out of band."
    )]
    MissingClientCertificate { dir: String },
}

// ── Authentication ───────────────────────────────────────────────────────────

/// The remote refused to trust this client.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Unable to authenticate with remote '{remote}': {reason}")]
    Rejected { remote: String, reason: String },

    #[error("Remote '{remote}' still does not trust this client after certificate registration")]
    StillUntrusted { remote: String },

    #[error("Remote '{remote}' does not trust this client and no password or token is configured")]
    MissingCredential { remote: String },
}

// ── Version gate ─────────────────────────────────────────────────────────────

/// Server version outside the supported range.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VersionError {
    #[error(
        "LXD server with version '{reported}' does not meet the required version constraint '{required}'"
    )]
    Unsupported { reported: String, required: String },

    #[error("Cannot parse LXD server version '{0}'")]
    Invalid(String),
}

// ── Connection ───────────────────────────────────────────────────────────────

/// A cached connection cannot serve the kind of access requested.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConnectError {
    #[error("Remote '{remote}' speaks '{actual}', but a '{requested}' connection was requested")]
    ProtocolMismatch {
        remote: String,
        requested: String,
        actual: String,
    },
}
