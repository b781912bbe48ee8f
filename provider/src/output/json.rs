//! JSON renderer and the error-object formatter used by `--json` failures.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::domain::error::{
    AuthError, ConfigError, ConnectError, SocketError, TrustError, VersionError,
};
use crate::domain::{CheckReport, RemoteSummary};

/// Renders reports as pretty-printed JSON on stdout.
pub struct JsonRenderer;

impl JsonRenderer {
    fn print(value: &impl Serialize) -> Result<()> {
        println!(
            "{}",
            serde_json::to_string_pretty(value).context("JSON serialization failed")?
        );
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_remotes(&self, remotes: &[RemoteSummary]) -> Result<()> {
        Self::print(&serde_json::json!({ "remotes": remotes }))
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_check(&self, report: &CheckReport) -> Result<()> {
        Self::print(report)
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_version(&self, version: &str) -> Result<()> {
        Self::print(&serde_json::json!({ "version": version }))
    }
}

/// Stable error code for the typed kind carried by `err`.
#[must_use]
pub fn error_code(err: &anyhow::Error) -> &'static str {
    if err.downcast_ref::<ConfigError>().is_some() {
        "config"
    } else if err.downcast_ref::<SocketError>().is_some() {
        "socket"
    } else if err.downcast_ref::<TrustError>().is_some() {
        "untrusted"
    } else if err.downcast_ref::<AuthError>().is_some() {
        "auth"
    } else if err.downcast_ref::<VersionError>().is_some() {
        "version"
    } else if err.downcast_ref::<ConnectError>().is_some() {
        "protocol"
    } else {
        "error"
    }
}

/// Format a JSON error object.
///
/// ```json
/// { "error": true, "message": "...", "code": "..." }
/// ```
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_error(message: &str, code: &str) -> Result<String> {
    let obj = serde_json::json!({
        "error": true,
        "message": message,
        "code": code,
    });
    serde_json::to_string_pretty(&obj).context("JSON serialization failed")
}
