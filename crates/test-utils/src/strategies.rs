//! Proptest strategies for StrataDB lineage domain types.
//!
//! Reusable generators for property-based testing across crates. Strategies
//! produce well-formed domain values while exploring edge cases through
//! random variation.
//!
//! # Usage
//!
//! ```no_run
//! use proptest::prelude::*;
//! use stratadb_lineage_test_utils::strategies;
//!
//! proptest! {
//!     #[test]
//!     fn my_property(cert in strategies::arb_certificate()) {
//!         // test invariant with a randomly generated certificate
//!     }
//! }
//! ```

// Test fixtures panic on misuse rather than propagate errors
#![allow(clippy::expect_used)]

use proptest::prelude::*;
use stratadb_lineage_history::{BranchRef, LineageStore};
use stratadb_lineage_types::{BirthCertificate, BranchId, KeyBytes, Region, Timestamp};

/// Generates an arbitrary [`BranchId`] from 16 uniform random bytes.
pub fn arb_branch_id() -> impl Strategy<Value = BranchId> {
    proptest::array::uniform16(any::<u8>()).prop_map(BranchId::from_bytes)
}

/// Generates a short key over a 4-symbol alphabet (0-3 bytes).
///
/// A narrow alphabet makes generated regions share boundaries often, which
/// is where partitioning edge cases live.
pub fn arb_key() -> impl Strategy<Value = KeyBytes> {
    proptest::collection::vec(0u8..4, 0..4)
}

/// Generates an arbitrary non-empty [`Region`], bounded or unbounded.
pub fn arb_region() -> impl Strategy<Value = Region> {
    (arb_key(), proptest::option::of(arb_key())).prop_map(|(a, b)| match b {
        None => Region { start: a, end: None },
        Some(b) => {
            let (start, mut end) = if a <= b { (a, b) } else { (b, a) };
            if start == end {
                // Extending the end by one byte keeps the interval non-empty.
                end.push(0);
            }
            Region { start, end: Some(end) }
        }
    })
}

/// Generates an arbitrary [`Timestamp`] in the range 0-999,999.
pub fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
    (0u64..1_000_000).prop_map(Timestamp::new)
}

/// Generates an arbitrary [`BirthCertificate`].
///
/// The parent, when present, is a random id with no registered
/// certificate. Use [`arb_forest`] for stores whose parent chains all
/// resolve.
pub fn arb_certificate() -> impl Strategy<Value = BirthCertificate> {
    (arb_branch_id(), arb_region(), proptest::option::of(arb_branch_id()), arb_timestamp())
        .prop_map(|(branch_id, region, parent, origin_point)| BirthCertificate {
            branch_id,
            region,
            parent,
            origin_point,
        })
}

/// Generates a well-formed forest of 1 to `max_branches` branches.
///
/// Every parent pointer targets a registered, earlier branch, so walks
/// never hit a missing entry or a cycle. Entry 0 is always an origin;
/// each later entry either forks from an earlier branch or starts a new
/// origin.
pub fn arb_forest(max_branches: usize) -> impl Strategy<Value = LineageStore> {
    proptest::collection::vec(any::<prop::sample::Index>(), 1..=max_branches).prop_map(|picks| {
        let mut store = LineageStore::new();
        let mut ids: Vec<BranchId> = Vec::with_capacity(picks.len());
        for (i, pick) in picks.iter().enumerate() {
            let branch_id = BranchId::from_bytes((i as u128).to_be_bytes());
            let parent = if i == 0 {
                None
            } else {
                // One slot past the candidates stands for "new origin".
                let slot = pick.index(i + 1);
                (slot < i).then(|| ids[slot])
            };
            let certificate = BirthCertificate {
                branch_id,
                region: Region::full(),
                parent,
                origin_point: Timestamp::new(i as u64),
            };
            store.insert(certificate).expect("indexed ids are unique");
            ids.push(branch_id);
        }
        store
    })
}

/// Generates a forest plus references into it.
///
/// Every reference names a registered branch; regions are arbitrary and
/// may overlap across references. Missing-entry behavior is better pinned
/// by deterministic tests.
pub fn arb_forest_with_refs(
    max_branches: usize,
    max_refs: usize,
) -> impl Strategy<Value = (LineageStore, Vec<BranchRef>)> {
    arb_forest(max_branches).prop_flat_map(move |store| {
        let ids: Vec<BranchId> = store.branch_ids().collect();
        let refs = proptest::collection::vec(
            (arb_region(), prop::sample::select(ids))
                .prop_map(|(region, branch)| BranchRef::new(region, branch)),
            0..=max_refs,
        );
        (Just(store), refs)
    })
}
