//! Canonical daemon addresses.
//!
//! Pure functions only. No I/O.

use std::fmt;
use std::path::PathBuf;

use lxd_common::Protocol;

use crate::domain::error::ConfigError;

/// Address of the local daemon when no socket path is configured.
pub const LOCAL_SOCKET_ADDR: &str = "unix://";

/// Normalise user-supplied address fields into one canonical address.
///
/// Produces `unix://`, `unix://<path>` or `https://<host>:<port>`. A fully
/// qualified address is returned unchanged.
///
/// # Errors
///
/// - [`ConfigError::DuplicateScheme`] when a scheme accompanies a full URL.
/// - [`ConfigError::DuplicatePort`] when a port accompanies a URL that has one.
/// - [`ConfigError::UnsupportedScheme`] for anything but `unix` and `https`.
/// - [`ConfigError::InvalidPort`] for a non-numeric port.
pub fn resolve_address(
    protocol: Protocol,
    scheme: &str,
    address: &str,
    port: &str,
) -> Result<String, ConfigError> {
    if let Some((prefix, rest)) = address.split_once("://") {
        if !scheme.is_empty() {
            return Err(ConfigError::DuplicateScheme {
                address: address.to_string(),
            });
        }
        match prefix {
            "https" => {
                if port.is_empty() {
                    return Ok(address.to_string());
                }
                if authority_port(rest).is_some() {
                    return Err(ConfigError::DuplicatePort {
                        address: address.to_string(),
                        port: port.to_string(),
                    });
                }
                let port = parse_port(port)?;
                let (host, path) = rest.split_once('/').unwrap_or((rest, ""));
                let path = if path.is_empty() { String::new() } else { format!("/{path}") };
                return Ok(format!("https://{host}:{port}{path}"));
            }
            "unix" => {
                if !port.is_empty() {
                    return Err(ConfigError::InvalidPort(port.to_string()));
                }
                return Ok(address.to_string());
            }
            other => return Err(ConfigError::UnsupportedScheme(other.to_string())),
        }
    }

    if address.is_empty() {
        return Ok(LOCAL_SOCKET_ADDR.to_string());
    }

    match scheme {
        "" | "unix" => Ok(format!("unix://{address}")),
        "https" => {
            let port = if port.is_empty() {
                protocol.default_https_port()
            } else {
                parse_port(port)?
            };
            Ok(format!("https://{address}:{port}"))
        }
        other => Err(ConfigError::UnsupportedScheme(other.to_string())),
    }
}

fn parse_port(port: &str) -> Result<u16, ConfigError> {
    port.parse::<u16>()
        .ok()
        .filter(|p| *p != 0)
        .ok_or_else(|| ConfigError::InvalidPort(port.to_string()))
}

/// Port embedded in the authority part of `rest` (everything after `://`).
fn authority_port(rest: &str) -> Option<&str> {
    let authority = rest.split('/').next().unwrap_or_default();
    let after_host = match authority.strip_prefix('[') {
        Some(v6) => v6.split_once(']').map(|(_, tail)| tail)?,
        None => authority,
    };
    after_host
        .rsplit_once(':')
        .map(|(_, port)| port)
        .filter(|p| !p.is_empty())
}

/// A canonical address in typed form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// `unix://`: the socket found by the local socket locator.
    LocalSocket,
    /// `unix://<path>`.
    UnixSocket(PathBuf),
    /// `https://<host>:<port>`.
    Https { host: String, port: u16 },
}

impl Endpoint {
    /// Parse a canonical address. `protocol` supplies the default port for
    /// `https` URLs that omit one.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for unsupported schemes or malformed hosts/ports.
    pub fn parse(canonical: &str, protocol: Protocol) -> Result<Self, ConfigError> {
        if let Some(path) = canonical.strip_prefix("unix://") {
            if path.is_empty() {
                return Ok(Self::LocalSocket);
            }
            return Ok(Self::UnixSocket(PathBuf::from(path)));
        }
        if let Some(rest) = canonical.strip_prefix("https://") {
            let authority = rest.split('/').next().unwrap_or_default();
            let port = match authority_port(rest) {
                Some(p) => parse_port(p)?,
                None => protocol.default_https_port(),
            };
            let host = match authority_port(rest) {
                Some(p) => &authority[..authority.len() - p.len() - 1],
                None => authority,
            };
            if host.is_empty() {
                return Err(ConfigError::InvalidAddress(canonical.to_string()));
            }
            return Ok(Self::Https {
                host: host.to_string(),
                port,
            });
        }
        let scheme = canonical.split_once("://").map_or(canonical, |(s, _)| s);
        Err(ConfigError::UnsupportedScheme(scheme.to_string()))
    }

    #[must_use]
    pub fn is_https(&self) -> bool {
        matches!(self, Self::Https { .. })
    }

    /// Host name suitable for TLS server-name indication.
    #[must_use]
    pub fn tls_host(&self) -> Option<&str> {
        match self {
            Self::Https { host, .. } => Some(host.trim_start_matches('[').trim_end_matches(']')),
            _ => None,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LocalSocket => f.write_str(LOCAL_SOCKET_ADDR),
            Self::UnixSocket(path) => write!(f, "unix://{}", path.display()),
            Self::Https { host, port } => write!(f, "https://{host}:{port}"),
        }
    }
}
