//! Infrastructure layer: concrete implementations of application port traits.
//!
//! This module contains all I/O-performing code: process execution, the
//! filesystem certificate store, TLS, and the LXD/simplestreams clients.
//!
//! Imports from `crate::domain` and `crate::application::ports` are allowed.
//! Imports from `crate::commands` or `crate::output` are forbidden.

pub mod certgen;
pub mod certs;
pub mod client;
pub mod command_runner;
pub mod config;
pub mod socket;
pub mod tls;
