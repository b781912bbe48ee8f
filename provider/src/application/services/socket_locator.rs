//! Local control socket discovery.

use std::path::{Path, PathBuf};

use crate::application::ports::SocketProbe;
use crate::domain::error::SocketError;

/// File name of the control socket inside an LXD directory.
pub const SOCKET_FILE: &str = "unix.socket";

/// Well-known LXD directories, in search order.
pub const LXD_DIRS: &[&str] = &["/var/lib/lxd", "/var/snap/lxd/common/lxd"];

/// Finds a writable local control socket.
///
/// Resolution order, first match wins: `LXD_SOCKET`, `LXD_DIR`, then
/// [`LXD_DIRS`]. An override that is set but unusable is an error rather than
/// a reason to keep searching.
#[derive(Debug, Clone)]
pub struct SocketLocator<P> {
    probe: P,
    socket_override: Option<PathBuf>,
    dir_override: Option<PathBuf>,
    search_dirs: Vec<PathBuf>,
}

impl<P: SocketProbe> SocketLocator<P> {
    /// Locator with explicit overrides and search path (used in tests).
    #[must_use]
    pub fn new(
        probe: P,
        socket_override: Option<PathBuf>,
        dir_override: Option<PathBuf>,
        search_dirs: Vec<PathBuf>,
    ) -> Self {
        Self {
            probe,
            socket_override,
            dir_override,
            search_dirs,
        }
    }

    /// Locator reading `LXD_SOCKET` / `LXD_DIR` from the process environment.
    #[must_use]
    pub fn from_env(probe: P) -> Self {
        Self::new(
            probe,
            std::env::var_os("LXD_SOCKET").map(PathBuf::from),
            std::env::var_os("LXD_DIR").map(PathBuf::from),
            LXD_DIRS.iter().map(PathBuf::from).collect(),
        )
    }

    /// Path of the first writable control socket.
    ///
    /// # Errors
    ///
    /// Returns a [`SocketError`] when an override is unusable or no candidate
    /// directory holds a writable socket.
    pub fn locate_socket(&self) -> Result<PathBuf, SocketError> {
        if let Some(socket) = &self.socket_override {
            if self.probe.is_writable_socket(socket) {
                return Ok(socket.clone());
            }
            return Err(SocketError::SocketOverride(socket.display().to_string()));
        }

        if let Some(dir) = &self.dir_override {
            let socket = dir.join(SOCKET_FILE);
            if self.probe.is_writable_socket(&socket) {
                return Ok(socket);
            }
            return Err(SocketError::DirOverride(dir.display().to_string()));
        }

        for dir in &self.search_dirs {
            let socket = dir.join(SOCKET_FILE);
            if self.probe.is_writable_socket(&socket) {
                tracing::debug!(socket = %socket.display(), "found writable LXD socket");
                return Ok(socket);
            }
        }

        Err(SocketError::NoWritableSocket {
            searched: self
                .search_dirs
                .iter()
                .map(|d| d.display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
        })
    }

    /// Directory containing the first writable control socket.
    ///
    /// # Errors
    ///
    /// See [`SocketLocator::locate_socket`].
    pub fn locate(&self) -> Result<PathBuf, SocketError> {
        let socket = self.locate_socket()?;
        Ok(socket
            .parent()
            .map_or_else(|| PathBuf::from("/"), Path::to_path_buf))
    }
}
