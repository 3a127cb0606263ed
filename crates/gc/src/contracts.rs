//! The contract source boundary.
//!
//! Replication contracts name the branch each sub-region's replication must
//! currently be built on. The contract subsystem owns that decision; this
//! module only exposes it to GC as a versioned, read-only snapshot the
//! coordinator loads at the start of every cycle.

use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use stratadb_lineage_history::RegionBranchMap;
use tracing::info;

/// A versioned snapshot of the contract-asserted branch set.
///
/// The version is a publication counter, not a consensus version; it lets
/// event-driven callers tell "same snapshot" from "new snapshot" cheaply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractBranchSet {
    /// Publication counter, starting at zero for the empty initial set.
    pub version: u64,
    /// One branch per sub-region the contract covers; pairwise disjoint.
    pub branches: RegionBranchMap,
}

/// Read-only access to the current contract branch set.
pub trait ContractSource: Send + Sync {
    /// The latest published snapshot.
    ///
    /// The returned `Arc` stays consistent even if a new set is published
    /// concurrently; callers re-load per cycle.
    fn current(&self) -> Arc<ContractBranchSet>;
}

/// Contract source fed directly by the embedding process.
///
/// Reads are lock-free snapshots; publication is an atomic pointer swap.
/// The contract subsystem is the single publisher.
#[derive(Debug, Default)]
pub struct InProcessContractSource {
    inner: ArcSwap<ContractBranchSet>,
}

impl InProcessContractSource {
    /// Creates a source holding the empty set at version zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes a new contract branch set, returning its version.
    pub fn publish(&self, branches: RegionBranchMap) -> u64 {
        let version = self.inner.load().version + 1;
        info!(version, refs = branches.len(), "Published contract branch set");
        self.inner.store(Arc::new(ContractBranchSet { version, branches }));
        version
    }
}

impl ContractSource for InProcessContractSource {
    fn current(&self) -> Arc<ContractBranchSet> {
        self.inner.load_full()
    }
}
