//! Unix socket probe backing the local socket locator.

use std::os::unix::fs::FileTypeExt;
use std::os::unix::net::UnixStream;
use std::path::Path;

use crate::application::ports::SocketProbe;

/// Accepts a path when it is a Unix socket that accepts a connection from
/// this process. Connecting needs write permission on the socket, so a
/// successful connect is the writability check.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnixSocketProbe;

impl SocketProbe for UnixSocketProbe {
    fn is_writable_socket(&self, path: &Path) -> bool {
        let is_socket = std::fs::metadata(path)
            .map(|m| m.file_type().is_socket())
            .unwrap_or(false);
        if !is_socket {
            return false;
        }
        match UnixStream::connect(path) {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "socket not usable");
                false
            }
        }
    }
}
