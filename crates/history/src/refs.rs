//! Region-tagged branch references.
//!
//! A reference pairs a keyspace region with the branch its source last
//! observed for that region. Contracts and replica reports both speak in
//! references; the resolver consumes them as a flat slice.

use serde::{Deserialize, Serialize};
use snafu::ensure;
use stratadb_lineage_types::{BranchId, Region, Result, error::OverlappingReferencesSnafu};

/// One source's claim: "for this region, I last observed this branch".
///
/// The region describes the referrer's responsibility, not the branch's
/// own extent. A replica assigned `[a, b)` may reference a branch whose
/// certificate covers a wider region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchRef {
    /// Keyspace the referrer speaks for.
    pub region: Region,
    /// Branch the referrer last observed there.
    pub branch: BranchId,
}

impl BranchRef {
    /// Creates a reference.
    pub fn new(region: Region, branch: BranchId) -> Self {
        Self { region, branch }
    }
}

/// A single source's reference set, validated to cover disjoint regions.
///
/// One contract or one replica speaks for each key at most once. The
/// constructor and [`push`](RegionBranchMap::push) enforce that; a slice
/// handed to the resolver may still mix references from many sources and
/// overlap freely across them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionBranchMap {
    refs: Vec<BranchRef>,
}

impl RegionBranchMap {
    /// Creates an empty map.
    pub fn empty() -> Self {
        Self { refs: Vec::new() }
    }

    /// Builds a map from references, validating pairwise disjointness.
    ///
    /// # Errors
    ///
    /// Returns [`OverlappingReferences`](stratadb_lineage_types::LineageError::OverlappingReferences)
    /// if any two regions overlap.
    pub fn new(refs: Vec<BranchRef>) -> Result<Self> {
        let mut map = Self::empty();
        for branch_ref in refs {
            map.push(branch_ref)?;
        }
        Ok(map)
    }

    /// Appends a reference, validating it against the existing set.
    ///
    /// # Errors
    ///
    /// Returns [`OverlappingReferences`](stratadb_lineage_types::LineageError::OverlappingReferences)
    /// if the new region overlaps one already present.
    pub fn push(&mut self, branch_ref: BranchRef) -> Result<()> {
        for existing in &self.refs {
            ensure!(
                !existing.region.overlaps(&branch_ref.region),
                OverlappingReferencesSnafu {
                    first: existing.region.clone(),
                    second: branch_ref.region.clone(),
                }
            );
        }
        self.refs.push(branch_ref);
        Ok(())
    }

    /// The references in insertion order.
    pub fn as_slice(&self) -> &[BranchRef] {
        &self.refs
    }

    /// Iterates the references in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &BranchRef> {
        self.refs.iter()
    }

    /// Number of references.
    pub fn len(&self) -> usize {
        self.refs.len()
    }

    /// Returns true if the map holds no references.
    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }
}

impl IntoIterator for RegionBranchMap {
    type Item = BranchRef;
    type IntoIter = std::vec::IntoIter<BranchRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.refs.into_iter()
    }
}

impl<'a> IntoIterator for &'a RegionBranchMap {
    type Item = &'a BranchRef;
    type IntoIter = std::slice::Iter<'a, BranchRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.refs.iter()
    }
}
