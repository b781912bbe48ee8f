//! Command implementations

pub mod remote;
pub mod version;
