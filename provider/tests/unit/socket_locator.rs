//! Tests for local control socket discovery.

#![allow(clippy::unwrap_used)]

use std::path::PathBuf;

use lxd_provider::application::services::SocketLocator;
use lxd_provider::domain::error::SocketError;

use crate::mocks::StubProbe;

fn search_dirs() -> Vec<PathBuf> {
    vec![PathBuf::from("/var/lib/lxd"), PathBuf::from("/var/snap/lxd/common/lxd")]
}

fn locator(
    sockets: &[&str],
    socket_override: Option<&str>,
    dir_override: Option<&str>,
) -> SocketLocator<StubProbe> {
    SocketLocator::new(
        StubProbe::with(sockets),
        socket_override.map(PathBuf::from),
        dir_override.map(PathBuf::from),
        search_dirs(),
    )
}

#[test]
fn test_first_writable_directory_wins() {
    let loc = locator(
        &["/var/lib/lxd/unix.socket", "/var/snap/lxd/common/lxd/unix.socket"],
        None,
        None,
    );
    assert_eq!(loc.locate_socket().unwrap(), PathBuf::from("/var/lib/lxd/unix.socket"));
    assert_eq!(loc.locate().unwrap(), PathBuf::from("/var/lib/lxd"));
}

#[test]
fn test_falls_through_to_snap_directory() {
    let loc = locator(&["/var/snap/lxd/common/lxd/unix.socket"], None, None);
    assert_eq!(loc.locate().unwrap(), PathBuf::from("/var/snap/lxd/common/lxd"));
}

#[test]
fn test_no_socket_lists_searched_directories() {
    let err = locator(&[], None, None).locate().unwrap_err();
    assert_eq!(
        err,
        SocketError::NoWritableSocket {
            searched: "/var/lib/lxd, /var/snap/lxd/common/lxd".to_string()
        }
    );
}

#[test]
fn test_socket_override_is_used() {
    let loc = locator(&["/run/custom.socket"], Some("/run/custom.socket"), None);
    assert_eq!(loc.locate_socket().unwrap(), PathBuf::from("/run/custom.socket"));
    assert_eq!(loc.locate().unwrap(), PathBuf::from("/run"));
}

#[test]
fn test_unusable_socket_override_does_not_fall_back() {
    let loc = locator(&["/var/lib/lxd/unix.socket"], Some("/run/missing.socket"), None);
    assert_eq!(
        loc.locate_socket().unwrap_err(),
        SocketError::SocketOverride("/run/missing.socket".to_string())
    );
}

#[test]
fn test_socket_override_beats_dir_override() {
    let loc = locator(
        &["/run/custom.socket", "/srv/lxd/unix.socket"],
        Some("/run/custom.socket"),
        Some("/srv/lxd"),
    );
    assert_eq!(loc.locate_socket().unwrap(), PathBuf::from("/run/custom.socket"));
}

#[test]
fn test_dir_override_is_used() {
    let loc = locator(&["/srv/lxd/unix.socket"], None, Some("/srv/lxd"));
    assert_eq!(loc.locate().unwrap(), PathBuf::from("/srv/lxd"));
}

#[test]
fn test_unusable_dir_override_does_not_fall_back() {
    let loc = locator(&["/var/lib/lxd/unix.socket"], None, Some("/srv/lxd"));
    let err = loc.locate().unwrap_err();
    assert_eq!(err, SocketError::DirOverride("/srv/lxd".to_string()));
    assert!(err.to_string().contains("LXD_DIR"), "got: {err}");
}
