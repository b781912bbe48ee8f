//! Report types rendered by the command layer.

use serde::Serialize;

use crate::domain::remote::RemoteDefinition;

/// One row of `remote list`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RemoteSummary {
    pub name: String,
    pub protocol: String,
    /// Canonical address, or the resolution error.
    pub address: String,
    pub default: bool,
}

impl RemoteSummary {
    #[must_use]
    pub fn from_definition(def: &RemoteDefinition, default_remote: &str) -> Self {
        Self {
            name: def.name.clone(),
            protocol: def.protocol.to_string(),
            address: def
                .canonical_address()
                .unwrap_or_else(|e| format!("invalid: {e}")),
            default: def.name == default_remote,
        }
    }
}

/// Result of `remote check`.
#[derive(Debug, Clone, Serialize, Default, PartialEq, Eq)]
pub struct CheckReport {
    pub remote: String,
    pub protocol: String,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<String>,
    /// SHA-256 of the pinned or reported server certificate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_fingerprint: Option<String>,
    /// Products listed in a simplestreams index.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<usize>,
}
