//! Property-based tests for address resolution, the version gate and
//! certificate helpers.
//!
//! Uses `proptest` to verify invariants across many random inputs.

#![allow(clippy::unwrap_used)]

use std::path::PathBuf;

use lxd_common::Protocol;
use proptest::prelude::*;

use lxd_provider::domain::address::{Endpoint, resolve_address};
use lxd_provider::domain::error::ConfigError;
use lxd_provider::domain::remote::Credential;
use lxd_provider::domain::trust::certificate_fingerprint;
use lxd_provider::domain::version::{MIN_LXD_VERSION, check_server_version};

// ============================================================================
// resolve_address() property tests
// ============================================================================

proptest! {
    /// Host plus explicit port always yields `https://host:port`.
    #[test]
    fn prop_https_host_and_port_compose(
        host in "[a-z][a-z0-9-]{0,15}(\\.[a-z]{2,5}){0,2}",
        port in 1u16..,
    ) {
        let addr = resolve_address(Protocol::Lxd, "https", &host, &port.to_string()).unwrap();
        prop_assert_eq!(&addr, &format!("https://{host}:{port}"));
        prop_assert_eq!(
            Endpoint::parse(&addr, Protocol::Lxd).unwrap(),
            Endpoint::Https { host: host.clone(), port }
        );
    }

    /// A bare host takes the protocol's default port.
    #[test]
    fn prop_https_default_port_follows_protocol(host in "[a-z][a-z0-9]{0,15}") {
        let lxd = resolve_address(Protocol::Lxd, "https", &host, "").unwrap();
        let images = resolve_address(Protocol::Simplestreams, "https", &host, "").unwrap();
        prop_assert!(lxd.ends_with(":8443"), "{}", lxd);
        prop_assert!(images.ends_with(":443"), "{}", images);
    }

    /// Socket paths become `unix://<path>` and parse back to the same path.
    #[test]
    fn prop_unix_paths_round_trip(path in "(/[a-z0-9_.]{1,10}){1,4}") {
        let addr = resolve_address(Protocol::Lxd, "", &path, "").unwrap();
        prop_assert_eq!(&addr, &format!("unix://{path}"));
        prop_assert_eq!(
            Endpoint::parse(&addr, Protocol::Lxd).unwrap(),
            Endpoint::UnixSocket(PathBuf::from(&path))
        );
    }

    /// Resolving a canonical address again changes nothing.
    #[test]
    fn prop_canonical_address_is_fixed_point(
        host in "[a-z][a-z0-9]{0,15}",
        port in 1u16..,
    ) {
        let once = resolve_address(Protocol::Lxd, "https", &host, &port.to_string()).unwrap();
        let twice = resolve_address(Protocol::Lxd, "", &once, "").unwrap();
        prop_assert_eq!(once, twice);
    }

    /// Any scheme other than `unix` and `https` is rejected.
    #[test]
    fn prop_other_schemes_rejected(scheme in "[a-z]{1,8}", host in "[a-z]{1,10}") {
        prop_assume!(scheme != "unix" && scheme != "https");
        let err = resolve_address(Protocol::Lxd, &scheme, &host, "").unwrap_err();
        prop_assert_eq!(err, ConfigError::UnsupportedScheme(scheme.clone()));
    }
}

// ============================================================================
// Version gate property tests
// ============================================================================

proptest! {
    /// Three-component versions pass exactly when they reach the floor.
    #[test]
    fn prop_version_gate_is_monotonic(major in 0u64..20, minor in 0u64..50, patch in 0u64..20) {
        let reported = format!("{major}.{minor}.{patch}");
        let expected = semver::Version::new(major, minor, patch) >= MIN_LXD_VERSION;
        prop_assert_eq!(check_server_version(&reported).is_ok(), expected, "{}", reported);
    }

    /// `major.minor` releases are judged like `major.minor.0`.
    #[test]
    fn prop_two_component_matches_zero_patch(major in 0u64..20, minor in 0u64..50) {
        prop_assert_eq!(
            check_server_version(&format!("{major}.{minor}")).is_ok(),
            check_server_version(&format!("{major}.{minor}.0")).is_ok()
        );
    }
}

// ============================================================================
// Certificate and credential property tests
// ============================================================================

proptest! {
    /// Fingerprints are 64 lowercase hex characters for any input.
    #[test]
    fn prop_fingerprint_is_sha256_hex(der in proptest::collection::vec(any::<u8>(), 0..512)) {
        let fp = certificate_fingerprint(&der);
        prop_assert_eq!(fp.len(), 64);
        prop_assert!(fp.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)), "{}", fp);
    }

    /// Password and token together are always a conflict.
    #[test]
    fn prop_password_and_token_conflict(pw in "[a-zA-Z0-9]{1,20}", token in "[a-zA-Z0-9]{1,40}") {
        let err = Credential::from_parts("r", Some(&pw), Some(&token)).unwrap_err();
        prop_assert_eq!(err, ConfigError::ConflictingCredentials("r".to_string()));
    }
}
