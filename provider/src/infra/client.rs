//! LXD and simplestreams clients.
//!
//! `LxdClient` speaks the `/1.0` REST API over https (reqwest) or over the
//! local control socket (hyper on a `UnixStream`). `SimpleStreamsClient` reads
//! the public image index over https.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use bytes::Bytes;
use http::{Method, Request, header};
use http_body_util::{BodyExt, Full};
use hyper_util::rt::TokioIo;
use lxd_common::api::API_PREFIX;
use lxd_common::streams::INDEX_PATH;
use lxd_common::{CertificatesPost, Response, Server, StreamsIndex};
use tokio::net::UnixStream;

use crate::application::ports::{
    CertificateStore, ConnectTarget, ImageServer, InstanceServer, ServerConnector,
};
use crate::domain::address::Endpoint;
use crate::infra::tls::{self, ClientIdentity};

/// Default timeout for a single API request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = concat!("lxd-provider/", env!("CARGO_PKG_VERSION"));

// ── Connector ─────────────────────────────────────────────────────────────────

/// Production [`ServerConnector`].
#[derive(Debug, Clone)]
pub struct LxdConnector {
    client_cert: PathBuf,
    client_key: PathBuf,
    timeout: Duration,
}

impl LxdConnector {
    /// Connector presenting the client pair kept in `store`.
    #[must_use]
    pub fn new(store: &impl CertificateStore, timeout: Duration) -> Self {
        let (client_cert, client_key) = store.client_cert_paths();
        Self {
            client_cert,
            client_key,
            timeout,
        }
    }

    fn https_client(&self, target: &ConnectTarget) -> Result<reqwest::Client> {
        // Read on every connect: bootstrap may generate the pair after the
        // connector was built.
        let identity = ClientIdentity::load(&self.client_cert, &self.client_key)?;
        let builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT);

        let builder = match &target.server_cert {
            Some(pinned) => {
                builder.use_preconfigured_tls(tls::pinned_client_config(pinned, identity.as_ref())?)
            }
            None => {
                let builder = builder.use_rustls_tls();
                match identity {
                    Some(id) => builder.identity(
                        reqwest::Identity::from_pem(&id.combined_pem())
                            .context("invalid client certificate/key pair")?,
                    ),
                    None => builder,
                }
            }
        };
        builder
            .build()
            .with_context(|| format!("building https client for '{}'", target.remote))
    }
}

fn https_base(target: &ConnectTarget) -> Result<String> {
    match &target.endpoint {
        Endpoint::Https { host, port } => Ok(format!("https://{host}:{port}")),
        other => anyhow::bail!("remote '{}': {other} is not an https endpoint", target.remote),
    }
}

impl ServerConnector for LxdConnector {
    type Instance = LxdClient;
    type Image = SimpleStreamsClient;

    async fn connect_instance(&self, target: &ConnectTarget) -> Result<LxdClient> {
        let transport = match &target.endpoint {
            Endpoint::UnixSocket(socket) => Transport::Unix {
                socket: socket.clone(),
                timeout: self.timeout,
            },
            Endpoint::Https { .. } => Transport::Https {
                http: self.https_client(target)?,
                base: https_base(target)?,
            },
            Endpoint::LocalSocket => {
                anyhow::bail!("remote '{}': local socket has not been located", target.remote)
            }
        };
        Ok(LxdClient { transport })
    }

    async fn connect_image(&self, target: &ConnectTarget) -> Result<SimpleStreamsClient> {
        let http = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .use_rustls_tls()
            .build()
            .with_context(|| format!("building https client for '{}'", target.remote))?;
        Ok(SimpleStreamsClient {
            http,
            base: https_base(target)?,
        })
    }

    async fn fetch_certificate(&self, endpoint: &Endpoint) -> Result<Vec<u8>> {
        let (Some(host), Endpoint::Https { port, .. }) = (endpoint.tls_host(), endpoint) else {
            anyhow::bail!("{endpoint} has no TLS certificate to fetch");
        };
        tls::fetch_peer_certificate(host, *port, self.timeout).await
    }
}

// ── LXD client ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Transport {
    Https { http: reqwest::Client, base: String },
    Unix { socket: PathBuf, timeout: Duration },
}

/// Client for the LXD REST API.
#[derive(Debug, Clone)]
pub struct LxdClient {
    transport: Transport,
}

impl LxdClient {
    /// Address this client talks to, for display.
    #[must_use]
    pub fn address(&self) -> String {
        match &self.transport {
            Transport::Https { base, .. } => base.clone(),
            Transport::Unix { socket, .. } => format!("unix://{}", socket.display()),
        }
    }

    async fn request(&self, method: Method, path: &str, body: Option<Vec<u8>>) -> Result<Response> {
        let raw = match &self.transport {
            Transport::Https { http, base } => {
                let mut req = http.request(method.clone(), format!("{base}{path}"));
                if let Some(body) = body {
                    req = req.header(header::CONTENT_TYPE, "application/json").body(body);
                }
                let resp = req
                    .send()
                    .await
                    .with_context(|| format!("{method} {base}{path}"))?;
                resp.bytes()
                    .await
                    .with_context(|| format!("reading {method} {path} response"))?
            }
            Transport::Unix { socket, timeout } => {
                tokio::time::timeout(*timeout, unix_request(socket, &method, path, body))
                    .await
                    .with_context(|| format!("{method} {path} timed out"))??
            }
        };
        serde_json::from_slice(&raw).with_context(|| format!("decoding {method} {path} response"))
    }
}

async fn unix_request(
    socket: &std::path::Path,
    method: &Method,
    path: &str,
    body: Option<Vec<u8>>,
) -> Result<Bytes> {
    let stream = UnixStream::connect(socket)
        .await
        .with_context(|| format!("connect {}", socket.display()))?;
    let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(stream))
        .await
        .context("HTTP handshake over the LXD socket")?;
    tokio::spawn(async move {
        if let Err(e) = conn.await {
            tracing::debug!(error = %e, "LXD socket connection closed");
        }
    });

    let mut builder = Request::builder()
        .method(method.clone())
        .uri(path)
        .header(header::HOST, "lxd")
        .header(header::USER_AGENT, USER_AGENT);
    if body.is_some() {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
    }
    let req = builder
        .body(Full::new(Bytes::from(body.unwrap_or_default())))
        .context("building request")?;

    let resp = sender
        .send_request(req)
        .await
        .with_context(|| format!("{method} {path}"))?;
    Ok(resp
        .into_body()
        .collect()
        .await
        .with_context(|| format!("reading {method} {path} response"))?
        .to_bytes())
}

impl InstanceServer for LxdClient {
    async fn get_server(&self) -> Result<Server> {
        let resp = self.request(Method::GET, API_PREFIX, None).await?;
        Ok(resp.into_metadata()?)
    }

    async fn create_certificate(&self, req: &CertificatesPost) -> Result<()> {
        let body = serde_json::to_vec(req).context("encoding certificate request")?;
        let resp = self
            .request(Method::POST, &format!("{API_PREFIX}/certificates"), Some(body))
            .await?;
        resp.check()?;
        Ok(())
    }
}

// ── Simplestreams client ──────────────────────────────────────────────────────

/// Read-only client for a simplestreams image server.
#[derive(Debug, Clone)]
pub struct SimpleStreamsClient {
    http: reqwest::Client,
    base: String,
}

impl SimpleStreamsClient {
    #[must_use]
    pub fn address(&self) -> &str {
        &self.base
    }
}

impl ImageServer for SimpleStreamsClient {
    async fn image_index(&self) -> Result<StreamsIndex> {
        let url = format!("{}/{INDEX_PATH}", self.base);
        self.http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?
            .error_for_status()
            .with_context(|| format!("GET {url}"))?
            .json()
            .await
            .with_context(|| format!("decoding {url}"))
    }
}
