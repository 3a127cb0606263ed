//! Core types and errors for the StrataDB lineage layer.
//!
//! This crate provides the foundational types used by lineage tracking
//! and garbage collection:
//! - Identifier newtypes (BranchId, ReplicaId, ShardId)
//! - Byte-keyspace regions and branch birth certificates
//! - Wire codec for consensus log entries and replica disk images
//! - Error types using snafu

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod certificate;
pub mod codec;
pub mod config;
pub mod error;
pub mod region;
pub mod types;

// Re-export commonly used types at crate root
pub use certificate::BirthCertificate;
pub use error::{ErrorCode, LineageError, Result};
pub use region::Region;
pub use types::*;
