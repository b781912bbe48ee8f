//! Client certificate generation through the `openssl` CLI.

use std::path::Path;

use anyhow::{Context, Result};

use crate::application::ports::{ClientCertGenerator, CommandRunner};
use crate::infra::certs::set_permissions;

/// Subject of generated client certificates.
pub const CLIENT_CERT_SUBJECT: &str = "/CN=lxd-provider";

/// Validity of generated client certificates, in days.
pub const CLIENT_CERT_DAYS: &str = "3650";

/// Writes a self-signed P-384 certificate and key with `openssl req`.
pub struct OpensslCertGenerator<R> {
    runner: R,
}

impl<R: CommandRunner> OpensslCertGenerator<R> {
    #[must_use]
    pub fn new(runner: R) -> Self {
        Self { runner }
    }
}

/// Arguments passed to `openssl`.
#[must_use]
pub fn openssl_args<'a>(cert: &'a str, key: &'a str) -> Vec<&'a str> {
    vec![
        "req",
        "-x509",
        "-newkey",
        "ec",
        "-pkeyopt",
        "ec_paramgen_curve:secp384r1",
        "-nodes",
        "-keyout",
        key,
        "-out",
        cert,
        "-days",
        CLIENT_CERT_DAYS,
        "-subj",
        CLIENT_CERT_SUBJECT,
    ]
}

impl<R: CommandRunner> ClientCertGenerator for OpensslCertGenerator<R> {
    async fn generate(&self, cert: &Path, key: &Path) -> Result<()> {
        if let Some(parent) = cert.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create dir {}", parent.display()))?;
        }

        let cert_str = cert.to_string_lossy();
        let key_str = key.to_string_lossy();
        let output = self
            .runner
            .run("openssl", &openssl_args(&cert_str, &key_str))
            .await
            .context("openssl is required to generate the client certificate")?;
        anyhow::ensure!(
            output.status.success(),
            "openssl req failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        );

        set_permissions(key, 0o600)?;
        Ok(())
    }
}
