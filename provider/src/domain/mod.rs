//! Domain layer: pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod address;
pub mod config;
pub mod error;
pub mod remote;
pub mod report;
pub mod trust;
pub mod version;

pub use address::{Endpoint, LOCAL_SOCKET_ADDR, resolve_address};
pub use config::{ProviderConfig, RemoteConfig, RemoteEntry, RemoteEnv, assemble_remotes};
pub use error::{AuthError, ConfigError, ConnectError, SocketError, TrustError, VersionError};
pub use remote::{Credential, LOCAL_REMOTE, RemoteDefinition, RemoteRegistry};
pub use report::{CheckReport, RemoteSummary};
pub use trust::{BootstrapState, TrustPolicy};
pub use version::{MIN_LXD_VERSION, SUPPORTED_LXD_VERSIONS, check_server_version};
