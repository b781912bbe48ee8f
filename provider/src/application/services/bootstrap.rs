//! Trust bootstrap: establish mutual certificate trust with one remote.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use anyhow::{Context, Result};
use lxd_common::{CertificatesPost, Protocol};
use tokio::sync::Mutex;

use crate::application::ports::{
    CertificateStore, ClientCertGenerator, ConnectTarget, InstanceServer, ServerConnector,
};
use crate::domain::address::Endpoint;
use crate::domain::error::{AuthError, TrustError};
use crate::domain::remote::{Credential, RemoteDefinition};
use crate::domain::trust::{BootstrapState, TrustPolicy, certificate_fingerprint};

/// Runs the one-time trust handshake for remotes.
///
/// Owns the connector and the certificate store so the connection cache can
/// reuse them after bootstrap. Authentication is serialised across all
/// remotes by a single lock because it may create the shared client
/// certificate pair.
pub struct TrustBootstrapper<C, S, G> {
    connector: C,
    store: S,
    generator: G,
    policy: TrustPolicy,
    auth_lock: Mutex<()>,
}

impl<C, S, G> TrustBootstrapper<C, S, G>
where
    C: ServerConnector,
    S: CertificateStore,
    G: ClientCertGenerator,
{
    #[must_use]
    pub fn new(connector: C, store: S, generator: G, policy: TrustPolicy) -> Self {
        Self {
            connector,
            store,
            generator,
            policy,
            auth_lock: Mutex::new(()),
        }
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Connection target for `endpoint`, with the stored certificate pinned
    /// for https endpoints.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored certificate cannot be read.
    pub fn target(&self, remote: &str, endpoint: &Endpoint) -> Result<ConnectTarget> {
        let server_cert = if endpoint.is_https() {
            self.store.load_server_cert(remote)?
        } else {
            None
        };
        Ok(ConnectTarget {
            remote: remote.to_string(),
            endpoint: endpoint.clone(),
            server_cert,
        })
    }

    /// Bring `remote` to [`BootstrapState::Bootstrapped`].
    ///
    /// `endpoint` is the remote's resolved endpoint with the local socket
    /// already located. `mark` records the bootstrapped flag in the registry;
    /// it is called before authentication starts, at most once.
    ///
    /// # Errors
    ///
    /// - [`TrustError::UntrustedRemote`] when the remote is not trusted and
    ///   automatic acceptance is off.
    /// - [`TrustError::MissingClientCertificate`] when no client certificate
    ///   exists and generation is off.
    /// - [`AuthError`] when the remote refuses to trust this client.
    /// - Transport errors from the connector, unchanged.
    pub async fn run(
        &self,
        remote: &RemoteDefinition,
        endpoint: &Endpoint,
        mark: impl FnOnce(&str),
    ) -> Result<BootstrapState> {
        if remote.bootstrapped {
            return Ok(BootstrapState::Bootstrapped);
        }

        if !endpoint.is_https() {
            tracing::debug!(remote = %remote.name, %endpoint, "socket remote, no trust to establish");
            mark(&remote.name);
            return Ok(BootstrapState::Bootstrapped);
        }
        tracing::debug!(remote = %remote.name, state = %BootstrapState::AddressResolved, %endpoint);

        // Image servers are public and verified through the system roots.
        if remote.protocol == Protocol::Simplestreams {
            mark(&remote.name);
            return Ok(BootstrapState::Bootstrapped);
        }

        self.check_certificate(remote, endpoint).await?;
        tracing::debug!(remote = %remote.name, state = %BootstrapState::CertificateChecked);

        mark(&remote.name);
        self.authenticate(remote, endpoint).await?;
        tracing::debug!(remote = %remote.name, state = %BootstrapState::Bootstrapped);
        Ok(BootstrapState::Bootstrapped)
    }

    /// Make sure a server certificate is stored or trust exists out of band.
    async fn check_certificate(&self, remote: &RemoteDefinition, endpoint: &Endpoint) -> Result<()> {
        if self.store.has_server_cert(&remote.name) {
            tracing::debug!(remote = %remote.name, "server certificate already stored");
            return Ok(());
        }

        let probe_err = match self.probe(remote, endpoint).await {
            Ok(()) => {
                tracing::debug!(remote = %remote.name, "remote reachable without a stored certificate");
                return Ok(());
            }
            Err(e) => e,
        };
        tracing::debug!(remote = %remote.name, error = %format!("{probe_err:#}"), "probe failed");

        if !self.policy.accept_remote_certificate {
            return Err(TrustError::UntrustedRemote {
                remote: remote.name.clone(),
                cause: format!("{probe_err:#}"),
            }
            .into());
        }

        let der = self
            .connector
            .fetch_certificate(endpoint)
            .await
            .with_context(|| format!("Failed to get remote server certificate for '{}'", remote.name))?;
        let path = self
            .store
            .save_server_cert(&remote.name, &der)
            .with_context(|| format!("Failed to store server certificate for '{}'", remote.name))?;
        tracing::info!(
            remote = %remote.name,
            fingerprint = %certificate_fingerprint(&der),
            path = %path.display(),
            "accepted remote certificate"
        );
        Ok(())
    }

    /// Unauthenticated `GET /1.0` with the system trust roots.
    async fn probe(&self, remote: &RemoteDefinition, endpoint: &Endpoint) -> Result<()> {
        let target = ConnectTarget {
            remote: remote.name.clone(),
            endpoint: endpoint.clone(),
            server_cert: None,
        };
        let client = self.connector.connect_instance(&target).await?;
        client.get_server().await?;
        Ok(())
    }

    /// Register this client's certificate with `remote` unless it is already
    /// trusted.
    async fn authenticate(&self, remote: &RemoteDefinition, endpoint: &Endpoint) -> Result<()> {
        let _guard = self.auth_lock.lock().await;
        self.ensure_client_certificate_locked().await?;

        let target = self.target(&remote.name, endpoint)?;
        let client = self.connector.connect_instance(&target).await?;
        let server = client
            .get_server()
            .await
            .with_context(|| format!("Remote '{}': fetching server info", remote.name))?;
        if server.is_trusted() {
            return Ok(());
        }

        let req = match &remote.credential {
            Credential::None => {
                return Err(AuthError::MissingCredential {
                    remote: remote.name.clone(),
                }
                .into());
            }
            Credential::Password(password) => CertificatesPost::client().with_password(password),
            Credential::Token(token) => CertificatesPost::client().with_trust_token(token),
        };

        client
            .create_certificate(&req)
            .await
            .map_err(|e| AuthError::Rejected {
                remote: remote.name.clone(),
                reason: format!("{e:#}"),
            })?;

        let server = client
            .get_server()
            .await
            .with_context(|| format!("Remote '{}': fetching server info", remote.name))?;
        if !server.is_trusted() {
            return Err(AuthError::StillUntrusted {
                remote: remote.name.clone(),
            }
            .into());
        }
        tracing::info!(remote = %remote.name, "client certificate registered");
        Ok(())
    }

    /// Create the client certificate pair if it is missing and generation is
    /// allowed.
    ///
    /// # Errors
    ///
    /// Returns [`TrustError::MissingClientCertificate`] when the pair is
    /// missing and generation is off, or the generator's error.
    pub async fn ensure_client_certificate(&self) -> Result<()> {
        let _guard = self.auth_lock.lock().await;
        self.ensure_client_certificate_locked().await
    }

    async fn ensure_client_certificate_locked(&self) -> Result<()> {
        if self.store.has_client_cert() {
            return Ok(());
        }
        if !self.policy.generate_client_certificates {
            return Err(TrustError::MissingClientCertificate {
                dir: self.store.config_dir().display().to_string(),
            }
            .into());
        }
        let (cert, key) = self.store.client_cert_paths();
        tracing::info!(cert = %cert.display(), "generating client certificate");
        self.generator
            .generate(&cert, &key)
            .await
            .context("Failed to generate client certificate")
    }
}
