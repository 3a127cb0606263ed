//! Consensus-replicated mutations of the authoritative lineage.
//!
//! The authoritative store never changes by direct mutation. Branch creation
//! and garbage collection both flow through the consensus log as
//! [`LineageMutation`] entries, and every node that replicates the log applies
//! them in the same total order through [`AuthoritativeLineage::apply`].
//! `apply` is deterministic: identical entry sequences produce identical
//! stores and versions on every node.
//!
//! A `Prune` carries the version its retain set was computed against. If the
//! log ordered another mutation in between, the version no longer matches and
//! the prune is dropped as superseded — on every replica, identically — and
//! the coordinator recomputes from current state next round.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use stratadb_lineage_history::LineageStore;
use stratadb_lineage_types::{BirthCertificate, BranchId};
use tracing::debug;

/// One consensus log entry mutating the authoritative lineage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineageMutation {
    /// Register a freshly created branch's birth certificate.
    AddBranch(BirthCertificate),
    /// Shrink the store to exactly the named branches.
    Prune {
        /// Version the proposer computed the retain set against.
        based_on: u64,
        /// Every branch that must survive the prune.
        retain: BTreeSet<BranchId>,
    },
}

/// What applying one mutation concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The mutation took effect; the store is now at `version`.
    Applied {
        /// Version after the mutation.
        version: u64,
    },
    /// A `Prune` was computed against a version the log has moved past.
    Superseded,
    /// An `AddBranch` conflicted with a registered, different certificate.
    ///
    /// Branch ids are never reused, so this is a branch-creation bug and is
    /// surfaced to the proposer rather than applied.
    Rejected {
        /// The colliding branch.
        branch_id: BranchId,
    },
}

/// The consensus-replicated lineage store with its applied-entries version.
///
/// The version advances by one for every applied mutation, including an
/// idempotent `AddBranch` re-delivery; rejected and superseded entries leave
/// it untouched. Since every node applies the same entries in the same
/// order, the (store, version) pair is identical across the cluster at any
/// given log position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthoritativeLineage {
    store: LineageStore,
    version: u64,
}

impl AuthoritativeLineage {
    /// Creates an empty store at version zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// The current lineage store.
    pub fn store(&self) -> &LineageStore {
        &self.store
    }

    /// The applied-entries version.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Applies one log entry.
    ///
    /// Deterministic and total: every input produces an [`ApplyOutcome`],
    /// never an error, so log application can not diverge across nodes.
    pub fn apply(&mut self, mutation: &LineageMutation) -> ApplyOutcome {
        match mutation {
            LineageMutation::AddBranch(certificate) => {
                // Re-delivery of an identical certificate is a no-op insert
                // but still advances the version: the entry was applied.
                match self.store.insert(certificate.clone()) {
                    Ok(_) => {
                        self.version += 1;
                        ApplyOutcome::Applied { version: self.version }
                    }
                    Err(_) => {
                        debug!(
                            branch = %certificate.branch_id,
                            "AddBranch rejected: conflicting certificate already registered"
                        );
                        ApplyOutcome::Rejected { branch_id: certificate.branch_id }
                    }
                }
            }
            LineageMutation::Prune { based_on, retain } => {
                if *based_on != self.version {
                    debug!(
                        based_on,
                        current = self.version,
                        "Prune superseded by a concurrent mutation"
                    );
                    return ApplyOutcome::Superseded;
                }
                let removed = self.store.prune(retain);
                self.version += 1;
                debug!(removed, version = self.version, "Prune applied");
                ApplyOutcome::Applied { version: self.version }
            }
        }
    }
}
