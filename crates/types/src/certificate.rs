//! Birth certificates: immutable records of branch creation.

use serde::{Deserialize, Serialize};

use crate::{
    region::Region,
    types::{BranchId, Timestamp},
};

/// Immutable description of one branch's origin.
///
/// A certificate is written exactly once, when a region of the keyspace
/// fails over to a new write authority and a fresh branch is created. It
/// never changes afterwards; the only lifecycle event for lineage metadata
/// is an entry's removal by garbage collection.
///
/// `parent = None` marks the region's origin branch. Ancestor chains follow
/// `parent` pointers; by construction a parent's region is a superset of its
/// children's regions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bon::Builder)]
pub struct BirthCertificate {
    /// Identifier of the branch this certificate describes.
    pub branch_id: BranchId,
    /// Keyspace region the branch holds write authority over.
    pub region: Region,
    /// Branch this one split off from, or `None` for an origin branch.
    pub parent: Option<BranchId>,
    /// Logical position in the parent's history where the split happened.
    pub origin_point: Timestamp,
}

impl BirthCertificate {
    /// Whether this branch started a fresh lineage.
    #[inline]
    pub fn is_origin(&self) -> bool {
        self.parent.is_none()
    }
}
