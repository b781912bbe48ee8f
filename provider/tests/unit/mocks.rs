//! Shared mock infrastructure for unit tests.
//!
//! One [`FakeRemote`] models the server side: its trust state, version and
//! certificate. [`MockConnector`] hands out clients bound to it and counts
//! every call so tests can assert how often each step ran.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use lxd_common::{AuthState, CertificatesPost, Server, ServerEnvironment, StreamsIndex};

use lxd_provider::application::ports::{
    CertificateStore, ClientCertGenerator, ConnectTarget, ImageServer, InstanceServer,
    ServerConnector, SocketProbe,
};
use lxd_provider::application::services::{ConnectionCache, SocketLocator, TrustBootstrapper};
use lxd_provider::domain::address::Endpoint;
use lxd_provider::domain::remote::{RemoteDefinition, RemoteRegistry};
use lxd_provider::domain::trust::TrustPolicy;

// ── Fake server ───────────────────────────────────────────────────────────────

/// Server-side state shared by every client of one test.
pub struct FakeRemote {
    pub version: String,
    pub trusted: AtomicBool,
    /// Password or token that registration accepts.
    pub secret: Option<String>,
    /// Registration succeeds but trust is never granted.
    pub ignore_registration: bool,
    /// Unpinned https requests succeed (public PKI).
    pub public_pki: bool,
    /// `connect_instance` fails while set.
    pub refuse_connections: AtomicBool,
    pub certificate: Vec<u8>,

    pub get_server_calls: AtomicUsize,
    pub registrations: Mutex<Vec<CertificatesPost>>,
}

impl FakeRemote {
    pub fn new(version: &str) -> Self {
        Self {
            version: version.to_string(),
            trusted: AtomicBool::new(true),
            secret: None,
            ignore_registration: false,
            public_pki: false,
            refuse_connections: AtomicBool::new(false),
            certificate: vec![0x30, 0x82, 0x01, 0x0a, 0xde, 0xad],
            get_server_calls: AtomicUsize::new(0),
            registrations: Mutex::new(Vec::new()),
        }
    }

    pub fn untrusted(mut self, secret: &str) -> Self {
        self.trusted = AtomicBool::new(false);
        self.secret = Some(secret.to_string());
        self
    }

    pub fn registrations(&self) -> Vec<CertificatesPost> {
        self.registrations.lock().unwrap().clone()
    }
}

// ── Clients ───────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct MockInstance {
    /// Sequence number of the `connect_instance` call that created it.
    pub id: usize,
    pub endpoint: Endpoint,
    pinned: bool,
    remote: Arc<FakeRemote>,
}

impl std::fmt::Debug for MockInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MockInstance#{}", self.id)
    }
}

impl InstanceServer for MockInstance {
    async fn get_server(&self) -> Result<Server> {
        tokio::task::yield_now().await;
        self.remote.get_server_calls.fetch_add(1, Ordering::SeqCst);
        if self.endpoint.is_https() && !self.pinned && !self.remote.public_pki {
            anyhow::bail!("invalid peer certificate: UnknownIssuer");
        }
        let trusted = self.remote.trusted.load(Ordering::SeqCst);
        Ok(Server {
            auth: if trusted { AuthState::Trusted } else { AuthState::Untrusted },
            api_version: "1.0".to_string(),
            auth_methods: vec!["tls".to_string()],
            environment: if trusted {
                ServerEnvironment {
                    server_version: self.remote.version.clone(),
                    ..ServerEnvironment::default()
                }
            } else {
                ServerEnvironment::default()
            },
        })
    }

    async fn create_certificate(&self, req: &CertificatesPost) -> Result<()> {
        tokio::task::yield_now().await;
        self.remote.registrations.lock().unwrap().push(req.clone());
        let offered = req.password.as_ref().or(req.trust_token.as_ref());
        match (&self.remote.secret, offered) {
            (Some(secret), Some(offered)) if secret == offered => {
                if !self.remote.ignore_registration {
                    self.remote.trusted.store(true, Ordering::SeqCst);
                }
                Ok(())
            }
            _ => anyhow::bail!("not authorized"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MockImage {
    pub id: usize,
}

impl ImageServer for MockImage {
    async fn image_index(&self) -> Result<StreamsIndex> {
        Ok(StreamsIndex::default())
    }
}

// ── Connector ─────────────────────────────────────────────────────────────────

pub struct MockConnector {
    pub remote: Arc<FakeRemote>,
    pub instance_connects: AtomicUsize,
    pub image_connects: AtomicUsize,
    pub fetches: AtomicUsize,
    pub targets: Mutex<Vec<ConnectTarget>>,
}

impl MockConnector {
    pub fn new(remote: Arc<FakeRemote>) -> Self {
        Self {
            remote,
            instance_connects: AtomicUsize::new(0),
            image_connects: AtomicUsize::new(0),
            fetches: AtomicUsize::new(0),
            targets: Mutex::new(Vec::new()),
        }
    }

    pub fn instance_connects(&self) -> usize {
        self.instance_connects.load(Ordering::SeqCst)
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn last_target(&self) -> ConnectTarget {
        self.targets.lock().unwrap().last().cloned().expect("no connect call")
    }
}

impl ServerConnector for MockConnector {
    type Instance = MockInstance;
    type Image = MockImage;

    async fn connect_instance(&self, target: &ConnectTarget) -> Result<MockInstance> {
        // Yield so concurrent callers interleave.
        for _ in 0..3 {
            tokio::task::yield_now().await;
        }
        let id = self.instance_connects.fetch_add(1, Ordering::SeqCst) + 1;
        self.targets.lock().unwrap().push(target.clone());
        if self.remote.refuse_connections.load(Ordering::SeqCst) {
            anyhow::bail!("connection refused");
        }
        Ok(MockInstance {
            id,
            endpoint: target.endpoint.clone(),
            pinned: target.server_cert.is_some(),
            remote: Arc::clone(&self.remote),
        })
    }

    async fn connect_image(&self, target: &ConnectTarget) -> Result<MockImage> {
        tokio::task::yield_now().await;
        let id = self.image_connects.fetch_add(1, Ordering::SeqCst) + 1;
        self.targets.lock().unwrap().push(target.clone());
        Ok(MockImage { id })
    }

    async fn fetch_certificate(&self, _endpoint: &Endpoint) -> Result<Vec<u8>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.remote.certificate.clone())
    }
}

// ── Certificate store ─────────────────────────────────────────────────────────

/// In-memory store. Clones share state.
#[derive(Clone, Default)]
pub struct MemStore {
    server_certs: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    client_cert: Arc<AtomicBool>,
}

impl MemStore {
    pub fn with_client_cert() -> Self {
        let store = Self::default();
        store.client_cert.store(true, Ordering::SeqCst);
        store
    }

    pub fn insert_server_cert(&self, remote: &str, der: &[u8]) {
        self.server_certs
            .lock()
            .unwrap()
            .insert(remote.to_string(), der.to_vec());
    }

    pub fn server_cert(&self, remote: &str) -> Option<Vec<u8>> {
        self.server_certs.lock().unwrap().get(remote).cloned()
    }
}

impl CertificateStore for MemStore {
    fn config_dir(&self) -> PathBuf {
        PathBuf::from("/mem")
    }

    fn server_cert_path(&self, remote: &str) -> PathBuf {
        PathBuf::from(format!("/mem/servercerts/{remote}.crt"))
    }

    fn has_server_cert(&self, remote: &str) -> bool {
        self.server_certs.lock().unwrap().contains_key(remote)
    }

    fn load_server_cert(&self, remote: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.server_cert(remote))
    }

    fn save_server_cert(&self, remote: &str, der: &[u8]) -> Result<PathBuf> {
        self.insert_server_cert(remote, der);
        Ok(self.server_cert_path(remote))
    }

    fn client_cert_paths(&self) -> (PathBuf, PathBuf) {
        (PathBuf::from("/mem/client.crt"), PathBuf::from("/mem/client.key"))
    }

    fn has_client_cert(&self) -> bool {
        self.client_cert.load(Ordering::SeqCst)
    }
}

mockall::mock! {
    pub Store {}

    impl CertificateStore for Store {
        fn config_dir(&self) -> PathBuf;
        fn server_cert_path(&self, remote: &str) -> PathBuf;
        fn has_server_cert(&self, remote: &str) -> bool;
        fn load_server_cert(&self, remote: &str) -> Result<Option<Vec<u8>>>;
        fn save_server_cert(&self, remote: &str, der: &[u8]) -> Result<PathBuf>;
        fn client_cert_paths(&self) -> (PathBuf, PathBuf);
        fn has_client_cert(&self) -> bool;
    }
}

// ── Client certificate generator ──────────────────────────────────────────────

/// Marks the paired [`MemStore`] as holding a client certificate.
pub struct MockGenerator {
    store: MemStore,
    pub calls: Arc<AtomicUsize>,
}

impl MockGenerator {
    pub fn for_store(store: &MemStore) -> Self {
        Self {
            store: store.clone(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl ClientCertGenerator for MockGenerator {
    async fn generate(&self, _cert: &Path, _key: &Path) -> Result<()> {
        tokio::task::yield_now().await;
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.store.client_cert.store(true, Ordering::SeqCst);
        Ok(())
    }
}

// ── Socket probe ──────────────────────────────────────────────────────────────

/// Treats exactly the listed paths as writable sockets.
#[derive(Clone, Default)]
pub struct StubProbe {
    sockets: HashSet<PathBuf>,
}

impl StubProbe {
    pub fn with(paths: &[&str]) -> Self {
        Self {
            sockets: paths.iter().map(PathBuf::from).collect(),
        }
    }
}

impl SocketProbe for StubProbe {
    fn is_writable_socket(&self, path: &Path) -> bool {
        self.sockets.contains(path)
    }
}

// ── Builders ──────────────────────────────────────────────────────────────────

pub const SOCKET: &str = "/var/snap/lxd/common/lxd/unix.socket";

pub type TestCache = ConnectionCache<MockConnector, MemStore, MockGenerator, StubProbe>;

pub fn https_remote(name: &str, address: &str) -> RemoteDefinition {
    RemoteDefinition {
        name: name.to_string(),
        address: address.to_string(),
        scheme: "https".to_string(),
        ..RemoteDefinition::default()
    }
}

pub fn socket_remote(name: &str) -> RemoteDefinition {
    RemoteDefinition {
        name: name.to_string(),
        ..RemoteDefinition::default()
    }
}

pub fn locator(probe: StubProbe) -> SocketLocator<StubProbe> {
    SocketLocator::new(
        probe,
        None,
        None,
        vec![PathBuf::from("/var/lib/lxd"), PathBuf::from("/var/snap/lxd/common/lxd")],
    )
}

pub fn bootstrapper(
    remote: &Arc<FakeRemote>,
    store: &MemStore,
    policy: TrustPolicy,
) -> TrustBootstrapper<MockConnector, MemStore, MockGenerator> {
    TrustBootstrapper::new(
        MockConnector::new(Arc::clone(remote)),
        store.clone(),
        MockGenerator::for_store(store),
        policy,
    )
}

/// Cache over `remotes`; the first one is the default.
pub fn cache(
    remotes: Vec<RemoteDefinition>,
    remote: &Arc<FakeRemote>,
    store: &MemStore,
    policy: TrustPolicy,
) -> TestCache {
    let mut registry = RemoteRegistry::new();
    for (i, def) in remotes.into_iter().enumerate() {
        registry.register(def, i == 0);
    }
    ConnectionCache::new(
        registry,
        bootstrapper(remote, store, policy),
        locator(StubProbe::with(&[SOCKET])),
    )
}

pub fn accept_all() -> TrustPolicy {
    TrustPolicy {
        accept_remote_certificate: true,
        generate_client_certificates: true,
    }
}
