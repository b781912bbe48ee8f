//! Provider configuration schema and its conversion into remote definitions.
//!
//! Nothing here touches the environment or the filesystem.

use std::path::PathBuf;

use lxd_common::Protocol;
use serde::{Deserialize, Serialize};

use crate::domain::error::ConfigError;
use crate::domain::remote::{Credential, LOCAL_REMOTE, RemoteDefinition};

// ── Config schema ────────────────────────────────────────────────────────────

/// Top-level configuration stored in `~/.config/lxd-provider/config.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ProviderConfig {
    /// Directory holding `client.crt`, `client.key` and `servercerts/`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_dir: Option<PathBuf>,
    /// Accept a remote's certificate on first contact.
    pub accept_remote_certificate: bool,
    /// Create the client certificate pair when it is missing.
    pub generate_client_certificates: bool,
    /// Declared remotes.
    pub remotes: Vec<RemoteConfig>,
}

/// One remote as written in the configuration file.
#[derive(Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RemoteConfig {
    pub name: String,
    pub protocol: Protocol,
    pub address: String,
    pub scheme: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Make this the default remote.
    pub default: bool,
}

impl std::fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("name", &self.name)
            .field("protocol", &self.protocol)
            .field("address", &self.address)
            .field("scheme", &self.scheme)
            .field("port", &self.port)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("token", &self.token.as_ref().map(|_| "***"))
            .field("default", &self.default)
            .finish()
    }
}

impl RemoteConfig {
    /// Convert into a [`RemoteDefinition`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ConflictingCredentials`] when both a password
    /// and a token are configured.
    pub fn to_definition(&self) -> Result<RemoteDefinition, ConfigError> {
        Ok(RemoteDefinition {
            name: self.name.clone(),
            address: self.address.clone(),
            port: self.port.map(|p| p.to_string()).unwrap_or_default(),
            scheme: self.scheme.clone(),
            protocol: self.protocol,
            credential: Credential::from_parts(
                &self.name,
                self.password.as_deref(),
                self.token.as_deref(),
            )?,
            bootstrapped: false,
        })
    }
}

// ── Environment overrides ────────────────────────────────────────────────────

/// `LXD_*` environment overrides for a single remote.
///
/// Each field maps to `LXD_<FIELD>`: `LXD_REMOTE`, `LXD_SCHEME`, `LXD_ADDR`,
/// `LXD_PORT`, `LXD_PASSWORD`, `LXD_TOKEN`.
#[derive(Clone, Deserialize, Default, PartialEq, Eq)]
pub struct RemoteEnv {
    pub remote: Option<String>,
    pub scheme: Option<String>,
    pub addr: Option<String>,
    pub port: Option<String>,
    pub password: Option<String>,
    pub token: Option<String>,
}

impl std::fmt::Debug for RemoteEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteEnv")
            .field("remote", &self.remote)
            .field("scheme", &self.scheme)
            .field("addr", &self.addr)
            .field("port", &self.port)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("token", &self.token.as_ref().map(|_| "***"))
            .finish()
    }
}

impl RemoteEnv {
    /// Whether any override is present.
    #[must_use]
    pub fn is_set(&self) -> bool {
        [
            &self.remote,
            &self.scheme,
            &self.addr,
            &self.port,
            &self.password,
            &self.token,
        ]
        .iter()
        .any(|v| v.as_deref().is_some_and(|s| !s.is_empty()))
    }

    fn apply(&self, def: &mut RemoteDefinition) -> Result<(), ConfigError> {
        fn set(target: &mut String, value: Option<&String>) {
            if let Some(v) = value.filter(|v| !v.is_empty()) {
                target.clone_from(v);
            }
        }
        set(&mut def.scheme, self.scheme.as_ref());
        set(&mut def.address, self.addr.as_ref());
        set(&mut def.port, self.port.as_ref());

        let env_credential =
            Credential::from_parts(&def.name, self.password.as_deref(), self.token.as_deref())?;
        if !env_credential.is_none() {
            def.credential = env_credential;
        }
        Ok(())
    }
}

// ── Assembly ─────────────────────────────────────────────────────────────────

/// A remote definition plus whether it should become the default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    pub definition: RemoteDefinition,
    pub is_default: bool,
}

/// Merge configured remotes with environment overrides.
///
/// The environment remote (named by `LXD_REMOTE`, else `local`) overrides the
/// matching configured remote field by field, and becomes the default when no
/// configured remote claims it. If nothing ends up default, the `local`
/// remote is added (when missing) and made default.
///
/// # Errors
///
/// Returns a [`ConfigError`] for conflicting credentials.
pub fn assemble_remotes(
    config: &ProviderConfig,
    env: &RemoteEnv,
) -> Result<Vec<RemoteEntry>, ConfigError> {
    let mut entries = config
        .remotes
        .iter()
        .map(|rc| {
            Ok(RemoteEntry {
                definition: rc.to_definition()?,
                is_default: rc.default,
            })
        })
        .collect::<Result<Vec<_>, ConfigError>>()?;

    if env.is_set() {
        let name = env
            .remote
            .clone()
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| LOCAL_REMOTE.to_string());
        let any_default = entries.iter().any(|e| e.is_default);

        match entries.iter_mut().find(|e| e.definition.name == name) {
            Some(entry) => {
                env.apply(&mut entry.definition)?;
                entry.is_default |= !any_default;
            }
            None => {
                let mut definition = RemoteDefinition {
                    name,
                    ..RemoteDefinition::default()
                };
                env.apply(&mut definition)?;
                entries.push(RemoteEntry {
                    definition,
                    is_default: !any_default,
                });
            }
        }
    }

    if !entries.iter().any(|e| e.is_default) {
        match entries.iter_mut().find(|e| e.definition.name == LOCAL_REMOTE) {
            Some(local) => local.is_default = true,
            None => entries.push(RemoteEntry {
                definition: RemoteDefinition::local(),
                is_default: true,
            }),
        }
    }

    Ok(entries)
}

// ── Unit tests ───────────────────────────────────────────────────────────────
