//! In-memory lineage forest.
//!
//! Every branch a shard has ever created is recorded here by its birth
//! certificate. Certificates are immutable once inserted: the store grows
//! by `insert` or `absorb` and shrinks only through `prune`, which applies
//! a whole retain set in one step.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use snafu::ensure;
use stratadb_lineage_types::{
    BirthCertificate, BranchId, Region, Result,
    error::{DuplicateBranchSnafu, MissingEntrySnafu},
};
use tracing::debug;

/// Immutable record of every known branch, keyed by [`BranchId`].
///
/// The forest structure lives in the certificates themselves: each entry
/// points at its parent (or at nothing, for origin branches). Parents are
/// not required to be present at insert time — a replica may absorb a
/// partial image and fill in the rest later. Walks fail closed on whatever
/// is absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineageStore {
    branches: BTreeMap<BranchId, BirthCertificate>,
}

impl LineageStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self { branches: BTreeMap::new() }
    }

    /// Registers a branch's birth certificate.
    ///
    /// Re-inserting an identical certificate is a no-op and returns
    /// `Ok(false)`. Returns `Ok(true)` when the branch is new.
    ///
    /// # Errors
    ///
    /// Returns [`DuplicateBranch`](stratadb_lineage_types::LineageError::DuplicateBranch)
    /// if the id is already registered with a different certificate.
    pub fn insert(&mut self, certificate: BirthCertificate) -> Result<bool> {
        let branch_id = certificate.branch_id;
        if let Some(existing) = self.branches.get(&branch_id) {
            ensure!(*existing == certificate, DuplicateBranchSnafu { branch_id });
            return Ok(false);
        }
        self.branches.insert(branch_id, certificate);
        Ok(true)
    }

    /// Looks up a branch's certificate.
    ///
    /// # Errors
    ///
    /// Returns [`MissingEntry`](stratadb_lineage_types::LineageError::MissingEntry)
    /// if the branch is not registered.
    pub fn get(&self, branch_id: BranchId) -> Result<&BirthCertificate> {
        self.branches.get(&branch_id).ok_or_else(|| MissingEntrySnafu { branch_id }.build())
    }

    /// Returns true if the branch is registered.
    pub fn contains(&self, branch_id: BranchId) -> bool {
        self.branches.contains_key(&branch_id)
    }

    /// Number of registered branches.
    pub fn len(&self) -> usize {
        self.branches.len()
    }

    /// Returns true if no branches are registered.
    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }

    /// All registered branch ids in sorted order.
    pub fn branch_ids(&self) -> impl Iterator<Item = BranchId> + '_ {
        self.branches.keys().copied()
    }

    /// All certificates in branch-id order.
    pub fn certificates(&self) -> impl Iterator<Item = &BirthCertificate> + '_ {
        self.branches.values()
    }

    /// Ids of every branch whose region overlaps `region`.
    pub fn branches_overlapping(&self, region: &Region) -> BTreeSet<BranchId> {
        self.branches
            .iter()
            .filter(|(_, cert)| cert.region.overlaps(region))
            .map(|(id, _)| *id)
            .collect()
    }

    /// Drops every branch not named in `retain`. Returns the number removed.
    ///
    /// Prune is total and idempotent: applying the same retain set twice
    /// removes nothing the second time.
    pub fn prune(&mut self, retain: &BTreeSet<BranchId>) -> usize {
        let before = self.branches.len();
        self.branches.retain(|id, _| retain.contains(id));
        let removed = before - self.branches.len();
        if removed > 0 {
            debug!(removed, remaining = self.branches.len(), "Pruned lineage store");
        }
        removed
    }

    /// Copies every certificate from `other` into this store.
    ///
    /// Entries already present are skipped. Returns the number of branches
    /// newly added.
    ///
    /// # Errors
    ///
    /// Returns [`DuplicateBranch`](stratadb_lineage_types::LineageError::DuplicateBranch)
    /// if any id is registered in both stores with differing certificates.
    pub fn absorb(&mut self, other: &LineageStore) -> Result<usize> {
        let mut added = 0;
        for certificate in other.certificates() {
            if self.insert(certificate.clone())? {
                added += 1;
            }
        }
        Ok(added)
    }

    /// Walks the parent chain starting at `start`, inclusive.
    ///
    /// The walk yields certificates child-first and stops at an origin
    /// branch, at the first id with no stored certificate, or when the
    /// chain revisits a branch. [`AncestorWalk::termination`] reports
    /// which of the three ended it.
    pub fn walk_ancestors(&self, start: BranchId) -> AncestorWalk<'_> {
        AncestorWalk { store: self, next: Some(start), seen: BTreeSet::new(), termination: None }
    }
}

/// Why an ancestor walk stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkTermination {
    /// The walk reached an origin branch.
    Root,
    /// The chain referenced a branch with no stored certificate.
    MissingEntry {
        /// The absent branch.
        branch_id: BranchId,
    },
    /// The chain revisited a branch it had already yielded.
    CycleDetected {
        /// The first branch seen twice.
        branch_id: BranchId,
    },
}

/// Iterator over a parent chain, child-first.
///
/// Created by [`LineageStore::walk_ancestors`]. After the iterator returns
/// `None`, [`termination`](AncestorWalk::termination) is always set.
#[derive(Debug)]
pub struct AncestorWalk<'a> {
    store: &'a LineageStore,
    next: Option<BranchId>,
    seen: BTreeSet<BranchId>,
    termination: Option<WalkTermination>,
}

impl AncestorWalk<'_> {
    /// Why the walk stopped, or `None` while certificates remain.
    pub fn termination(&self) -> Option<WalkTermination> {
        self.termination
    }
}

impl<'a> Iterator for AncestorWalk<'a> {
    type Item = &'a BirthCertificate;

    fn next(&mut self) -> Option<Self::Item> {
        let branch_id = self.next.take()?;
        if !self.seen.insert(branch_id) {
            self.termination = Some(WalkTermination::CycleDetected { branch_id });
            return None;
        }
        let Some(certificate) = self.store.branches.get(&branch_id) else {
            self.termination = Some(WalkTermination::MissingEntry { branch_id });
            return None;
        };
        match certificate.parent {
            Some(parent) => self.next = Some(parent),
            None => self.termination = Some(WalkTermination::Root),
        }
        Some(certificate)
    }
}
