//! Application context: unified state passed to every command handler.
//!
//! Owns the connection cache built from the configuration file, the `LXD_*`
//! environment overrides and the command-line trust flags.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use crate::application::ports::ConfigStore;
use crate::application::services::{ConnectionCache, SocketLocator, TrustBootstrapper};
use crate::domain::config::{ProviderConfig, RemoteEnv, assemble_remotes};
use crate::domain::remote::RemoteRegistry;
use crate::domain::trust::TrustPolicy;
use crate::infra::certgen::OpensslCertGenerator;
use crate::infra::certs::FsCertificateStore;
use crate::infra::client::{DEFAULT_REQUEST_TIMEOUT, LxdConnector};
use crate::infra::command_runner::TokioCommandRunner;
use crate::infra::config::{YamlConfigStore, default_config_dir, remote_env};
use crate::infra::socket::UnixSocketProbe;
use crate::output::{HumanRenderer, JsonRenderer, OutputContext, Renderer};

/// Connection cache wired to the production adapters.
pub type LxdConnectionCache = ConnectionCache<
    LxdConnector,
    FsCertificateStore,
    OpensslCertGenerator<TokioCommandRunner>,
    UnixSocketProbe,
>;

/// Output rendering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable terminal output (default).
    Human,
    /// Machine-readable JSON output.
    Json,
}

/// Output rendering flags.
pub struct OutputFlags {
    /// Disable ANSI color output.
    pub no_color: bool,
    /// Suppress non-error output.
    pub quiet: bool,
    /// Enable JSON output mode.
    pub json: bool,
}

/// Trust opt-ins given on the command line. They widen, never narrow, what
/// the configuration file allows.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrustFlags {
    pub accept_remote_certificate: bool,
    pub generate_client_certificates: bool,
}

/// Flags passed from the top-level CLI to `AppContext::new`.
pub struct AppFlags {
    /// Output rendering options.
    pub output: OutputFlags,
    /// Trust options.
    pub trust: TrustFlags,
    /// Explicit configuration file.
    pub config: Option<PathBuf>,
}

/// Unified application context passed to every command handler.
pub struct AppContext {
    /// Terminal output context (colors, quiet mode).
    pub output: OutputContext,
    /// Output rendering mode (human vs JSON).
    pub mode: OutputMode,
    /// Remotes and their connections, shared with concurrent callers.
    pub cache: Arc<LxdConnectionCache>,
}

impl AppContext {
    /// Construct an `AppContext` from top-level CLI flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded or is invalid.
    pub fn new(flags: &AppFlags) -> Result<Self> {
        let store = YamlConfigStore::new(flags.config.clone());
        let path = store.path()?;
        let config = store.load()?;
        let env = remote_env()?;
        let cache = build_cache(&config, &env, flags.trust)
            .with_context(|| format!("invalid configuration in {}", path.display()))?;

        let mode = if flags.output.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        };

        Ok(Self {
            output: OutputContext::new(flags.output.no_color, flags.output.quiet),
            mode,
            cache: Arc::new(cache),
        })
    }

    /// Returns `true` when JSON output mode is active.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.mode == OutputMode::Json
    }

    /// Returns the appropriate `Renderer` variant for the current output mode.
    #[must_use]
    pub fn renderer(&self) -> Renderer<'_> {
        match self.mode {
            OutputMode::Human => Renderer::Human(HumanRenderer::new(&self.output)),
            OutputMode::Json => Renderer::Json(JsonRenderer),
        }
    }
}

/// Assemble the registry and the production adapters into a cache.
///
/// # Errors
///
/// Returns a [`crate::domain::error::ConfigError`] for invalid remotes, or an
/// error when no config directory can be determined.
pub fn build_cache(
    config: &ProviderConfig,
    env: &RemoteEnv,
    flags: TrustFlags,
) -> Result<LxdConnectionCache> {
    let mut registry = RemoteRegistry::new();
    for entry in assemble_remotes(config, env)? {
        registry.register(entry.definition, entry.is_default);
    }

    let config_dir = match &config.config_dir {
        Some(dir) => dir.clone(),
        None => default_config_dir()?,
    };
    tracing::debug!(config_dir = %config_dir.display(), default = %registry.default_remote(), "registry loaded");

    let policy = TrustPolicy {
        accept_remote_certificate: config.accept_remote_certificate
            || flags.accept_remote_certificate,
        generate_client_certificates: config.generate_client_certificates
            || flags.generate_client_certificates,
    };

    let store = FsCertificateStore::with_dir(config_dir);
    let connector = LxdConnector::new(&store, DEFAULT_REQUEST_TIMEOUT);
    let generator = OpensslCertGenerator::new(TokioCommandRunner::default());

    Ok(ConnectionCache::new(
        registry,
        TrustBootstrapper::new(connector, store, generator, policy),
        SocketLocator::from_env(UnixSocketProbe),
    ))
}

/// Install the stderr `tracing` subscriber.
///
/// `RUST_LOG` wins when set; otherwise `warn`, or `debug` with `--verbose`.
/// Call once, from `main`.
pub fn init_tracing(verbose: bool) {
    let fallback = if verbose { "lxd_provider=debug,warn" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .with_writer(std::io::stderr)
        .init();
}
