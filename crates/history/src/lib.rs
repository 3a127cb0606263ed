//! Branch lineage tracking for StrataDB shards.
//!
//! This crate provides:
//! - [`LineageStore`] — the in-memory forest of birth certificates
//! - Region-tagged references ([`BranchRef`], [`RegionBranchMap`])
//! - Keyspace partitioning by coverage ([`partition_refs`])
//! - Lock-step common-ancestor resolution ([`resolve`])
//!
//! Resolution is a pure computation over a store and a reference set. The
//! decision of what to do with an unresolved sub-region — retain and defer
//! — belongs to the garbage collection layer built on top of this crate.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod partition;
pub mod refs;
pub mod resolver;
pub mod store;

// Re-export the working set at crate root
pub use partition::{Subregion, partition_refs};
pub use refs::{BranchRef, RegionBranchMap};
pub use resolver::{Divergence, Resolution, SubregionOutcome, SubregionResolution, resolve};
pub use store::{AncestorWalk, LineageStore, WalkTermination};
