//! Application services: use-case orchestration.
//!
//! Services import only from `crate::domain` and `crate::application::ports`
//! and never from `crate::infra`, `crate::commands`, or `crate::output`.

pub mod bootstrap;
pub mod connection;
pub mod socket_locator;

pub use bootstrap::TrustBootstrapper;
pub use connection::{ConnectionCache, ServerHandle, WantProtocol};
pub use socket_locator::SocketLocator;
