//! Remote definitions and the registry that owns them.
//!
//! Pure data and lookups only. Locking lives in the connection cache that
//! wraps [`RemoteRegistry`].

use std::collections::BTreeMap;
use std::fmt;

use lxd_common::Protocol;

use crate::domain::address::{Endpoint, resolve_address};
use crate::domain::error::ConfigError;

/// Name of the implicit local remote.
pub const LOCAL_REMOTE: &str = "local";

/// Secret used to register this client with a remote.
#[derive(Clone, PartialEq, Eq, Default)]
pub enum Credential {
    #[default]
    None,
    Password(String),
    Token(String),
}

impl Credential {
    /// Build a credential from the two optional configuration fields.
    ///
    /// Empty strings count as unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ConflictingCredentials`] when both are set.
    pub fn from_parts(
        remote: &str,
        password: Option<&str>,
        token: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let password = password.filter(|p| !p.is_empty());
        let token = token.filter(|t| !t.is_empty());
        match (password, token) {
            (Some(_), Some(_)) => Err(ConfigError::ConflictingCredentials(remote.to_string())),
            (Some(p), None) => Ok(Self::Password(p.to_string())),
            (None, Some(t)) => Ok(Self::Token(t.to_string())),
            (None, None) => Ok(Self::None),
        }
    }

    #[must_use]
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

// Secrets never reach logs.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Password(_) => f.write_str("Password(***)"),
            Self::Token(_) => f.write_str("Token(***)"),
        }
    }
}

/// A remote as declared by the user.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RemoteDefinition {
    pub name: String,
    /// Host, socket path, full URL, or empty for the local socket.
    pub address: String,
    pub port: String,
    /// `unix`, `https`, or empty.
    pub scheme: String,
    pub protocol: Protocol,
    pub credential: Credential,
    /// Set once trust bootstrap has run. Never reset.
    pub bootstrapped: bool,
}

impl RemoteDefinition {
    /// The implicit remote reached through the local control socket.
    #[must_use]
    pub fn local() -> Self {
        Self {
            name: LOCAL_REMOTE.to_string(),
            ..Self::default()
        }
    }

    /// Canonical daemon address for this remote.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the address fields are inconsistent.
    pub fn canonical_address(&self) -> Result<String, ConfigError> {
        resolve_address(self.protocol, &self.scheme, &self.address, &self.port)
    }

    /// Canonical address parsed into a typed endpoint.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the address cannot be resolved, or when a
    /// simplestreams remote points at a unix socket.
    pub fn endpoint(&self) -> Result<Endpoint, ConfigError> {
        let endpoint = Endpoint::parse(&self.canonical_address()?, self.protocol)?;
        if self.protocol == Protocol::Simplestreams && !endpoint.is_https() {
            return Err(ConfigError::SocketImageRemote(self.name.clone()));
        }
        Ok(endpoint)
    }
}

/// Named remotes plus the default selection.
#[derive(Debug, Clone, Default)]
pub struct RemoteRegistry {
    remotes: BTreeMap<String, RemoteDefinition>,
    default_remote: String,
}

impl RemoteRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite `def`, optionally making it the default.
    pub fn register(&mut self, def: RemoteDefinition, is_default: bool) {
        if is_default {
            self.default_remote.clone_from(&def.name);
        }
        self.remotes.insert(def.name.clone(), def);
    }

    /// Look up `name`, falling back to the default remote for empty or
    /// unknown names. Returns a copy.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownRemote`] when the default itself does not
    /// resolve.
    pub fn resolve(&self, name: &str) -> Result<RemoteDefinition, ConfigError> {
        if !name.is_empty()
            && let Some(def) = self.remotes.get(name)
        {
            return Ok(def.clone());
        }
        self.remotes
            .get(&self.default_remote)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownRemote {
                name: name.to_string(),
                default: self.default_remote.clone(),
            })
    }

    /// Flip `bootstrapped` for `name`. Returns `true` on the first call only.
    pub fn mark_bootstrapped(&mut self, name: &str) -> bool {
        match self.remotes.get_mut(name) {
            Some(def) if !def.bootstrapped => {
                def.bootstrapped = true;
                true
            }
            _ => false,
        }
    }

    #[must_use]
    pub fn default_remote(&self) -> &str {
        &self.default_remote
    }

    /// Registered remote names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.remotes.keys().map(String::as_str)
    }

    /// Snapshot of all definitions in name order.
    #[must_use]
    pub fn definitions(&self) -> Vec<RemoteDefinition> {
        self.remotes.values().cloned().collect()
    }
}
