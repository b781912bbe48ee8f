//! Connection cache: one bootstrapped, version-checked handle per remote.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{Context, Result};
use lxd_common::Protocol;
use tokio::sync::OnceCell;

use crate::application::ports::{
    CertificateStore, ClientCertGenerator, InstanceServer, ServerConnector, SocketProbe,
};
use crate::application::services::bootstrap::TrustBootstrapper;
use crate::application::services::socket_locator::SocketLocator;
use crate::domain::address::Endpoint;
use crate::domain::error::{AuthError, ConnectError};
use crate::domain::remote::{RemoteDefinition, RemoteRegistry};
use crate::domain::version::check_server_version;

// ── Handles ───────────────────────────────────────────────────────────────────

/// Kind of connection a caller needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WantProtocol {
    #[default]
    Any,
    /// Read/write LXD API.
    ControlPlane,
    /// Read-only image distribution.
    ImageOnly,
}

impl WantProtocol {
    fn accepts(self, actual: Protocol) -> bool {
        match self {
            Self::Any => true,
            Self::ControlPlane => actual == Protocol::Lxd,
            Self::ImageOnly => actual == Protocol::Simplestreams,
        }
    }
}

impl From<Protocol> for WantProtocol {
    fn from(protocol: Protocol) -> Self {
        match protocol {
            Protocol::Lxd => Self::ControlPlane,
            Protocol::Simplestreams => Self::ImageOnly,
        }
    }
}

impl fmt::Display for WantProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Any => "any",
            Self::ControlPlane => Protocol::Lxd.as_str(),
            Self::ImageOnly => Protocol::Simplestreams.as_str(),
        })
    }
}

/// A cached connection, tagged with the capability it offers.
#[derive(Clone)]
pub enum ServerHandle<I, M> {
    Instance(I),
    Image(M),
}

impl<I, M> ServerHandle<I, M> {
    #[must_use]
    pub fn protocol(&self) -> Protocol {
        match self {
            Self::Instance(_) => Protocol::Lxd,
            Self::Image(_) => Protocol::Simplestreams,
        }
    }
}

impl<I, M> fmt::Debug for ServerHandle<I, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Instance(_) => f.write_str("ServerHandle::Instance"),
            Self::Image(_) => f.write_str("ServerHandle::Image"),
        }
    }
}

// ── Cache ─────────────────────────────────────────────────────────────────────

type Slot<I, M> = Arc<OnceCell<ServerHandle<I, M>>>;

struct State<I, M> {
    registry: RemoteRegistry,
    servers: HashMap<String, Slot<I, M>>,
}

/// Registry of remotes plus the connections opened to them.
///
/// Both maps sit behind one reader/writer lock that is never held across an
/// await. Each remote name owns a [`OnceCell`] slot, inserted under the write
/// lock, so concurrent first requests for the same remote share a single
/// bootstrap-and-connect sequence. A failed sequence leaves the slot empty
/// and the next caller retries.
pub struct ConnectionCache<C: ServerConnector, S, G, P> {
    state: RwLock<State<C::Instance, C::Image>>,
    bootstrapper: TrustBootstrapper<C, S, G>,
    locator: SocketLocator<P>,
}

impl<C, S, G, P> ConnectionCache<C, S, G, P>
where
    C: ServerConnector,
    S: CertificateStore,
    G: ClientCertGenerator,
    P: SocketProbe,
{
    #[must_use]
    pub fn new(
        registry: RemoteRegistry,
        bootstrapper: TrustBootstrapper<C, S, G>,
        locator: SocketLocator<P>,
    ) -> Self {
        Self {
            state: RwLock::new(State {
                registry,
                servers: HashMap::new(),
            }),
            bootstrapper,
            locator,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, State<C::Instance, C::Image>> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, State<C::Instance, C::Image>> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn bootstrapper(&self) -> &TrustBootstrapper<C, S, G> {
        &self.bootstrapper
    }

    pub fn locator(&self) -> &SocketLocator<P> {
        &self.locator
    }

    // ── Registry access ──────────────────────────────────────────────────────

    /// Insert or overwrite a remote. A connection already cached under the
    /// same name stays in use.
    pub fn register(&self, def: RemoteDefinition, is_default: bool) {
        self.write().registry.register(def, is_default);
    }

    /// Copy of the definition `name` resolves to.
    ///
    /// # Errors
    ///
    /// Returns [`crate::domain::error::ConfigError::UnknownRemote`] when
    /// neither `name` nor the default remote exists.
    pub fn remote(&self, name: &str) -> Result<RemoteDefinition> {
        Ok(self.read().registry.resolve(name)?)
    }

    #[must_use]
    pub fn remotes(&self) -> Vec<RemoteDefinition> {
        self.read().registry.definitions()
    }

    #[must_use]
    pub fn default_remote(&self) -> String {
        self.read().registry.default_remote().to_string()
    }

    /// Whether a connection for `name` has been established.
    #[must_use]
    pub fn is_cached(&self, name: &str) -> bool {
        self.read()
            .servers
            .get(name)
            .is_some_and(|slot| slot.initialized())
    }

    // ── Connections ──────────────────────────────────────────────────────────

    /// Connection for `name` (or the default remote), established on first use.
    ///
    /// # Errors
    ///
    /// Returns the first failure of resolution, socket discovery, bootstrap,
    /// connection, or the version gate, with the remote name attached; or
    /// [`ConnectError::ProtocolMismatch`] when `want` does not match the
    /// remote's protocol.
    pub async fn get_server(
        &self,
        name: &str,
        want: WantProtocol,
    ) -> Result<ServerHandle<C::Instance, C::Image>> {
        let (remote, handle) = self.handle(name).await?;
        if want.accepts(handle.protocol()) {
            Ok(handle)
        } else {
            Err(mismatch(remote, want, handle.protocol()))
        }
    }

    /// Control-plane client for `name`.
    ///
    /// # Errors
    ///
    /// See [`ConnectionCache::get_server`]; image-only remotes fail with
    /// [`ConnectError::ProtocolMismatch`].
    pub async fn instance_server(&self, name: &str) -> Result<C::Instance> {
        let (remote, handle) = self.handle(name).await?;
        match handle {
            ServerHandle::Instance(client) => Ok(client),
            ServerHandle::Image(_) => Err(mismatch(
                remote,
                WantProtocol::ControlPlane,
                Protocol::Simplestreams,
            )),
        }
    }

    /// Image-only client for `name`.
    ///
    /// # Errors
    ///
    /// See [`ConnectionCache::get_server`]; control-plane remotes fail with
    /// [`ConnectError::ProtocolMismatch`].
    pub async fn image_server(&self, name: &str) -> Result<C::Image> {
        let (remote, handle) = self.handle(name).await?;
        match handle {
            ServerHandle::Image(client) => Ok(client),
            ServerHandle::Instance(_) => {
                Err(mismatch(remote, WantProtocol::ImageOnly, Protocol::Lxd))
            }
        }
    }

    /// Resolve `name` and return its cached handle, establishing it once.
    async fn handle(&self, name: &str) -> Result<(String, ServerHandle<C::Instance, C::Image>)> {
        let remote = self.remote(name)?;
        let slot = self.slot(&remote.name);
        let handle = slot
            .get_or_try_init(|| self.establish(&remote.name))
            .await
            .with_context(|| format!("Unable to create client for remote '{}'", remote.name))?;
        Ok((remote.name, handle.clone()))
    }

    /// The single-flight slot for `name`, created under the write lock.
    fn slot(&self, name: &str) -> Slot<C::Instance, C::Image> {
        if let Some(slot) = self.read().servers.get(name) {
            return Arc::clone(slot);
        }
        Arc::clone(self.write().servers.entry(name.to_string()).or_default())
    }

    /// Bootstrap `name` if needed and open its connection.
    async fn establish(&self, name: &str) -> Result<ServerHandle<C::Instance, C::Image>> {
        // Re-read so a bootstrap finished by an earlier caller is seen.
        let remote = self.read().registry.resolve(name)?;

        let endpoint = match remote.endpoint()? {
            Endpoint::LocalSocket => Endpoint::UnixSocket(self.locator.locate_socket()?),
            other => other,
        };
        tracing::debug!(remote = %remote.name, %endpoint, protocol = %remote.protocol, "connecting");

        self.bootstrapper
            .run(&remote, &endpoint, |n| {
                self.write().registry.mark_bootstrapped(n);
            })
            .await?;

        let target = self.bootstrapper.target(&remote.name, &endpoint)?;
        let connector = self.bootstrapper.connector();
        match remote.protocol {
            Protocol::Simplestreams => Ok(ServerHandle::Image(connector.connect_image(&target).await?)),
            Protocol::Lxd => {
                let client = connector.connect_instance(&target).await?;
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
                check_server_version(&server.environment.server_version)
                    .with_context(|| format!("Remote '{}'", remote.name))?;
                tracing::info!(
                    remote = %remote.name,
                    version = %server.environment.server_version,
                    "connected"
                );
                Ok(ServerHandle::Instance(client))
            }
        }
    }
}

fn mismatch(remote: String, want: WantProtocol, actual: Protocol) -> anyhow::Error {
    ConnectError::ProtocolMismatch {
        remote,
        requested: want.to_string(),
        actual: actual.to_string(),
    }
    .into()
}
