//! Shared test utilities for StrataDB lineage crates.
//!
//! This crate provides common test helpers to reduce boilerplate across test modules:
//!
//! - [`TestDir`] - Managed temporary directory with path helpers
//! - [`assert_eventually`] - Poll a condition until it's true or timeout
//! - [`ForestBuilder`] - Named-branch lineage fixtures
//! - [`test_gc_config`] - Fast garbage collection configuration for tests
//! - [`strategies`] - Proptest generators for lineage domain types

#![deny(unsafe_code)]
// Test utilities are allowed to use unwrap for simplicity
#![cfg_attr(test, allow(clippy::disallowed_methods))]

mod test_dir;
pub use test_dir::TestDir;

mod assertions;
pub use assertions::assert_eventually;

mod config;
pub use config::test_gc_config;

mod forest;
pub use forest::ForestBuilder;

pub mod strategies;
