//! Filesystem certificate store.
//!
//! Layout under the config directory:
//!
//! ```text
//! <config_dir>/client.crt
//! <config_dir>/client.key
//! <config_dir>/servercerts/<remote>.crt
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::application::ports::CertificateStore;
use crate::domain::trust::encode_certificate_pem;

const SERVER_CERTS_DIR: &str = "servercerts";
const CLIENT_CERT: &str = "client.crt";
const CLIENT_KEY: &str = "client.key";

/// Certificate store rooted at an LXD-style config directory.
#[derive(Debug, Clone)]
pub struct FsCertificateStore {
    dir: PathBuf,
}

impl FsCertificateStore {
    #[must_use]
    pub fn with_dir(dir: PathBuf) -> Self {
        Self { dir }
    }
}

impl CertificateStore for FsCertificateStore {
    fn config_dir(&self) -> PathBuf {
        self.dir.clone()
    }

    fn server_cert_path(&self, remote: &str) -> PathBuf {
        let file = remote.replace(['/', '\\'], "_");
        self.dir.join(SERVER_CERTS_DIR).join(format!("{file}.crt"))
    }

    fn has_server_cert(&self, remote: &str) -> bool {
        self.server_cert_path(remote).is_file()
    }

    fn load_server_cert(&self, remote: &str) -> Result<Option<Vec<u8>>> {
        let path = self.server_cert_path(remote);
        if !path.is_file() {
            return Ok(None);
        }
        let pem = std::fs::read(&path).with_context(|| format!("read {}", path.display()))?;
        let der = rustls_pemfile::certs(&mut pem.as_slice())
            .next()
            .transpose()
            .with_context(|| format!("parse {}", path.display()))?
            .with_context(|| format!("no certificate in {}", path.display()))?;
        Ok(Some(der.as_ref().to_vec()))
    }

    fn save_server_cert(&self, remote: &str, der: &[u8]) -> Result<PathBuf> {
        let path = self.server_cert_path(remote);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create dir {}", parent.display()))?;
            set_permissions(parent, 0o750)?;
        }
        std::fs::write(&path, encode_certificate_pem(der))
            .with_context(|| format!("write {}", path.display()))?;
        set_permissions(&path, 0o644)?;
        Ok(path)
    }

    fn client_cert_paths(&self) -> (PathBuf, PathBuf) {
        (self.dir.join(CLIENT_CERT), self.dir.join(CLIENT_KEY))
    }

    fn has_client_cert(&self) -> bool {
        let (cert, key) = self.client_cert_paths();
        cert.is_file() && key.is_file()
    }
}

#[cfg(unix)]
pub(crate) fn set_permissions(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .with_context(|| format!("set permissions on {}", path.display()))
}

#[cfg(not(unix))]
pub(crate) fn set_permissions(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}
