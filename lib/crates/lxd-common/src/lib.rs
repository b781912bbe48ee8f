pub mod api;
pub mod protocol;
pub mod streams;

pub use api::{ApiError, AuthState, CertificatesPost, Response, ResponseType, Server, ServerEnvironment};
pub use protocol::{Protocol, UnknownProtocol};
pub use streams::{StreamsEntry, StreamsIndex};
