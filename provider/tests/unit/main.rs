//! Unit tests for lxd-provider
//!
//! These tests use mocked dependencies and run fast without external I/O.

mod mocks;
mod property_tests;
mod socket_locator;
