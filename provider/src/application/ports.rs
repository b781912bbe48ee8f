//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain` and the shared wire types;
//! never from `crate::infra`, `crate::commands`, or `crate::output`.
//!
//! Async ports return `impl Future + Send` so the connection cache can be
//! shared across the worker threads of a multi-threaded runtime.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;

use anyhow::Result;
use lxd_common::{CertificatesPost, Server, StreamsIndex};

use crate::domain::address::Endpoint;
use crate::domain::config::ProviderConfig;

// ── Value Types ───────────────────────────────────────────────────────────────

/// Everything a connector needs to open a connection to one remote.
#[derive(Debug, Clone)]
pub struct ConnectTarget {
    /// Remote name, for error context and certificate lookup.
    pub remote: String,
    /// Resolved endpoint. Never [`Endpoint::LocalSocket`]; the cache resolves
    /// that to a concrete socket path first.
    pub endpoint: Endpoint,
    /// Pinned server certificate (DER), when one is stored for the remote.
    pub server_cert: Option<Vec<u8>>,
}

// ── Server Handle Ports ───────────────────────────────────────────────────────

/// Read/write LXD API client.
pub trait InstanceServer: Clone + Send + Sync + 'static {
    /// `GET /1.0`.
    fn get_server(&self) -> impl Future<Output = Result<Server>> + Send;
    /// `POST /1.0/certificates`.
    fn create_certificate(&self, req: &CertificatesPost)
    -> impl Future<Output = Result<()>> + Send;
}

/// Read-only image distribution client.
pub trait ImageServer: Clone + Send + Sync + 'static {
    /// Fetch the simplestreams index.
    fn image_index(&self) -> impl Future<Output = Result<StreamsIndex>> + Send;
}

/// Opens connections to remotes.
pub trait ServerConnector: Send + Sync {
    type Instance: InstanceServer;
    type Image: ImageServer;

    /// Create a control-plane client. Does not contact the server.
    fn connect_instance(
        &self,
        target: &ConnectTarget,
    ) -> impl Future<Output = Result<Self::Instance>> + Send;

    /// Create an image-only client. Does not contact the server.
    fn connect_image(
        &self,
        target: &ConnectTarget,
    ) -> impl Future<Output = Result<Self::Image>> + Send;

    /// Complete a TLS handshake with an https `endpoint` without verifying
    /// the peer and return the leaf certificate it presented (DER).
    fn fetch_certificate(&self, endpoint: &Endpoint)
    -> impl Future<Output = Result<Vec<u8>>> + Send;
}

// ── Certificate Ports ─────────────────────────────────────────────────────────

/// On-disk trust material under the provider's config directory.
pub trait CertificateStore: Send + Sync {
    /// Config directory holding the client pair and `servercerts/`.
    fn config_dir(&self) -> PathBuf;
    /// Path of the pinned certificate for `remote`.
    fn server_cert_path(&self, remote: &str) -> PathBuf;
    /// Whether a pinned certificate exists for `remote`.
    fn has_server_cert(&self, remote: &str) -> bool;
    /// Pinned certificate for `remote` (DER), if present.
    fn load_server_cert(&self, remote: &str) -> Result<Option<Vec<u8>>>;
    /// Persist `der` as the pinned certificate for `remote`.
    fn save_server_cert(&self, remote: &str, der: &[u8]) -> Result<PathBuf>;
    /// `(client.crt, client.key)` paths.
    fn client_cert_paths(&self) -> (PathBuf, PathBuf);
    /// Whether both halves of the client pair exist.
    fn has_client_cert(&self) -> bool;
}

/// Creates the client certificate pair.
pub trait ClientCertGenerator: Send + Sync {
    /// Write a fresh self-signed certificate and key to the given paths.
    fn generate(&self, cert: &Path, key: &Path) -> impl Future<Output = Result<()>> + Send;
}

// ── Local Socket Port ─────────────────────────────────────────────────────────

/// Checks candidate control sockets.
pub trait SocketProbe: Send + Sync {
    /// `true` if `path` is a Unix socket this process can connect to.
    fn is_writable_socket(&self, path: &Path) -> bool;
}

// ── Command Runner Port ───────────────────────────────────────────────────────

/// Abstracts process execution so infrastructure can be swapped or mocked.
pub trait CommandRunner: Send + Sync {
    /// Run a program and capture its output.
    ///
    /// Implementations should delegate to `run_with_timeout` using the
    /// instance's configured default timeout.
    fn run(&self, program: &str, args: &[&str]) -> impl Future<Output = Result<Output>> + Send;
    /// Run a program with a custom timeout override.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or exceeds `timeout`.
    /// On timeout, the child process must be killed (not left orphaned).
    fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> impl Future<Output = Result<Output>> + Send;
}

// ── Config Port ───────────────────────────────────────────────────────────────

/// Loads the provider configuration file.
pub trait ConfigStore {
    /// Load the configuration, returning defaults when the file is absent.
    fn load(&self) -> Result<ProviderConfig>;
    /// Path of the configuration file.
    fn path(&self) -> Result<PathBuf>;
}
