//! LXD REST API (`/1.0`) types used during trust bootstrap.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// API prefix every LXD endpoint lives under.
pub const API_PREFIX: &str = "/1.0";

/// Kind of response envelope returned by the daemon.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    Sync,
    Async,
    Error,
}

/// Standard LXD response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    #[serde(rename = "type")]
    pub kind: ResponseType,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub status_code: u16,
    #[serde(default)]
    pub error_code: u16,
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Failure decoding or interpreting a [`Response`].
#[derive(Debug, Error)]
pub enum ApiError {
    /// The daemon answered with an error envelope.
    #[error("{message}")]
    Remote { code: u16, message: String },

    #[error("malformed response metadata: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl Response {
    /// Turn an error envelope into [`ApiError::Remote`], otherwise decode `metadata`.
    pub fn into_metadata<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        self.check()?;
        Ok(serde_json::from_value(self.metadata)?)
    }

    /// Fail on error envelopes, discarding the metadata otherwise.
    pub fn check(&self) -> Result<(), ApiError> {
        if self.kind == ResponseType::Error || self.error_code >= 400 {
            return Err(ApiError::Remote {
                code: self.error_code,
                message: self.error.clone(),
            });
        }
        Ok(())
    }
}

/// Whether the daemon trusts the client certificate of the current connection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AuthState {
    Trusted,
    #[default]
    Untrusted,
}

/// `GET /1.0` metadata.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Server {
    #[serde(default)]
    pub auth: AuthState,
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub auth_methods: Vec<String>,
    #[serde(default)]
    pub environment: ServerEnvironment,
}

impl Server {
    #[must_use]
    pub fn is_trusted(&self) -> bool {
        self.auth == AuthState::Trusted
    }
}

/// Environment block of [`Server`]. Only exposed to trusted clients.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ServerEnvironment {
    #[serde(default)]
    pub server_name: String,
    #[serde(default)]
    pub server_version: String,
    #[serde(default)]
    pub certificate_fingerprint: String,
    #[serde(default)]
    pub addresses: Vec<String>,
}

/// `POST /1.0/certificates` body registering the connection's client certificate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CertificatesPost {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trust_token: Option<String>,
}

impl CertificatesPost {
    /// A `client` registration with no secret attached.
    #[must_use]
    pub fn client() -> Self {
        Self {
            kind: "client".to_string(),
            name: None,
            password: None,
            trust_token: None,
        }
    }

    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    #[must_use]
    pub fn with_trust_token(mut self, token: impl Into<String>) -> Self {
        self.trust_token = Some(token.into());
        self
    }
}
