//! End-to-end resolution scenarios over hand-built forests.
//!
//! Each test grows a lineage history the way a shard would — failovers
//! forking branches, splits narrowing regions — then checks what
//! resolution concludes for a mixed set of contract and replica
//! references.

// Test code is allowed to use unwrap for simplicity
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::disallowed_methods)]

use std::collections::BTreeSet;

use proptest::prelude::*;
use stratadb_lineage_history::{
    BranchRef, Divergence, LineageStore, Resolution, SubregionOutcome, resolve,
};
use stratadb_lineage_test_utils::{ForestBuilder, strategies};
use stratadb_lineage_types::{BranchId, Region};

const DEPTH: usize = 64;

fn region(start: u8, end: u8) -> Region {
    Region::new(vec![start], Some(vec![end])).unwrap()
}

fn full_ref(branch: BranchId) -> BranchRef {
    BranchRef::new(Region::full(), branch)
}

// ============================================================================
// Scenario tests
// ============================================================================

#[test]
fn test_linear_chain_resolves_to_older_reference() {
    // Three failovers on one region: a <- b <- c <- d. The contract moved
    // on to d while a lagging replica still references b.
    let mut forest = ForestBuilder::new();
    let a = forest.origin("a", Region::full());
    let b = forest.fork("b", "a", Region::full());
    let c = forest.fork("c", "b", Region::full());
    let d = forest.fork("d", "c", Region::full());
    let store = forest.build();

    let resolution = resolve(&store, &[full_ref(d), full_ref(b)], DEPTH);
    assert!(resolution.is_fully_resolved());
    assert_eq!(resolution.subregions.len(), 1);
    assert_eq!(resolution.subregions[0].ancestor().unwrap(), b);

    let retained = resolution.retained_union();
    assert_eq!(retained, [b, c, d].into_iter().collect());
    // Only the origin below the common ancestor became prunable.
    assert!(!retained.contains(&a));
}

#[test]
fn test_identical_references_resolve_immediately() {
    let mut forest = ForestBuilder::new();
    let a = forest.origin("a", Region::full());
    let b = forest.fork("b", "a", Region::full());
    let store = forest.build();

    // Contract and replica agree on b: the ancestor is b itself and the
    // chain below it is not needed.
    let resolution = resolve(&store, &[full_ref(b), full_ref(b)], DEPTH);
    assert!(resolution.is_fully_resolved());
    assert_eq!(resolution.subregions[0].ancestor().unwrap(), b);
    assert_eq!(resolution.retained_union(), [b].into_iter().collect());
    assert!(!resolution.retained_union().contains(&a));
}

#[test]
fn test_missing_entry_blocks_resolution() {
    let mut forest = ForestBuilder::new();
    forest.origin("a", Region::full());
    let b = forest.fork("b", "a", Region::full());
    let store = forest.build();
    let ghost = BranchId::random();

    let resolution = resolve(&store, &[full_ref(b), full_ref(ghost)], DEPTH);
    assert!(!resolution.is_fully_resolved());
    assert_eq!(resolution.unresolved().count(), 1);
    assert_eq!(
        resolution.subregions[0].outcome,
        SubregionOutcome::Unresolved { cause: Divergence::MissingEntry { branch_id: ghost } }
    );
    assert_eq!(resolution.missing_entries(), [ghost].into_iter().collect());
    // An unresolved sub-region clears nothing for pruning.
    assert!(resolution.retained_union().is_empty());
}

#[test]
fn test_region_split_against_lagging_replica() {
    // The keyspace split: a held [0,100) and forked into l over [0,50)
    // and r over [50,100); l then failed over again to l2. The contract
    // references the split tips while one replica still reports the
    // pre-split branch for the whole range.
    let mut forest = ForestBuilder::new();
    let a = forest.origin("a", region(0, 100));
    let l = forest.fork("l", "a", region(0, 50));
    let r = forest.fork("r", "a", region(50, 100));
    let l2 = forest.fork("l2", "l", region(0, 50));
    let store = forest.build();

    let refs = [
        BranchRef::new(region(0, 50), l2),
        BranchRef::new(region(50, 100), r),
        BranchRef::new(region(0, 100), a),
    ];
    let resolution = resolve(&store, &refs, DEPTH);

    // Both halves resolve to the pre-split branch the replica still holds.
    assert_eq!(resolution.subregions.len(), 2);
    assert_eq!(resolution.subregions[0].region, region(0, 50));
    assert_eq!(resolution.subregions[0].ancestor().unwrap(), a);
    assert_eq!(resolution.subregions[1].region, region(50, 100));
    assert_eq!(resolution.subregions[1].ancestor().unwrap(), a);
    // Every branch on a path from a reference to its ancestor stays.
    assert_eq!(resolution.retained_union(), [a, l, r, l2].into_iter().collect());

    // The replica catches up to the split tips: each half's ancestor
    // collapses to the tip itself and the old lineage becomes prunable.
    let refs = [
        BranchRef::new(region(0, 50), l2),
        BranchRef::new(region(50, 100), r),
        BranchRef::new(region(0, 50), l2),
        BranchRef::new(region(50, 100), r),
    ];
    let resolution = resolve(&store, &refs, DEPTH);
    assert!(resolution.is_fully_resolved());
    assert_eq!(resolution.retained_union(), [l2, r].into_iter().collect());
}

#[test]
fn test_failure_confined_to_its_subregion() {
    // A missing entry on the left half must not stall the right half.
    let mut forest = ForestBuilder::new();
    let a = forest.origin("a", region(0, 100));
    let r = forest.fork("r", "a", region(50, 100));
    let store = forest.build();
    let ghost = BranchId::random();

    let refs = [
        BranchRef::new(region(0, 50), ghost),
        BranchRef::new(region(50, 100), r),
        BranchRef::new(region(50, 100), a),
    ];
    let resolution = resolve(&store, &refs, DEPTH);
    assert_eq!(resolution.subregions.len(), 2);
    assert!(!resolution.subregions[0].is_resolved());
    assert_eq!(resolution.subregions[1].ancestor().unwrap(), a);
    assert_eq!(resolution.retained_union(), [a, r].into_iter().collect());
}

#[test]
fn test_walks_past_a_rooted_chain_still_meet_it() {
    // b's walk roots out in two rounds; d's walk needs three to reach b.
    // The rooted walk's visited set must stay in play for the later
    // rounds, or the intersection would never form.
    let mut forest = ForestBuilder::new();
    forest.origin("a", Region::full());
    let b = forest.fork("b", "a", Region::full());
    let c = forest.fork("c", "b", Region::full());
    let d = forest.fork("d", "c", Region::full());
    let store = forest.build();

    let resolution = resolve(&store, &[full_ref(d), full_ref(b)], DEPTH);
    assert_eq!(resolution.subregions[0].ancestor().unwrap(), b);
    assert_eq!(resolution.retained_union(), [b, c, d].into_iter().collect());
}

// ============================================================================
// Properties
// ============================================================================

fn forest_refs_and_shuffle()
-> impl Strategy<Value = (LineageStore, Vec<BranchRef>, Vec<BranchRef>)> {
    strategies::arb_forest_with_refs(10, 6).prop_flat_map(|(store, refs)| {
        let shuffled = Just(refs.clone()).prop_shuffle();
        (Just(store), Just(refs), shuffled)
    })
}

/// Projection that drops unresolved-cause payloads: which witness a cause
/// names may follow reference order, the rest of the outcome may not.
fn comparable(resolution: &Resolution) -> Vec<(Region, Option<(BranchId, BTreeSet<BranchId>)>)> {
    resolution
        .subregions
        .iter()
        .map(|entry| {
            let resolved = match &entry.outcome {
                SubregionOutcome::Resolved { ancestor, retained } => {
                    Some((*ancestor, retained.clone()))
                }
                SubregionOutcome::Unresolved { .. } => None,
            };
            (entry.region.clone(), resolved)
        })
        .collect()
}

proptest! {
    #[test]
    fn test_resolution_is_deterministic((store, refs) in strategies::arb_forest_with_refs(10, 6)) {
        let base = resolve(&store, &refs, DEPTH);
        let again = resolve(&store, &refs, DEPTH);
        prop_assert_eq!(base, again);
    }

    #[test]
    fn test_resolution_order_independent(
        (store, refs, shuffled) in forest_refs_and_shuffle()
    ) {
        let base = resolve(&store, &refs, DEPTH);
        let alt = resolve(&store, &shuffled, DEPTH);
        prop_assert_eq!(comparable(&base), comparable(&alt));
    }

    #[test]
    fn test_retained_branches_are_registered(
        (store, refs) in strategies::arb_forest_with_refs(10, 6)
    ) {
        let resolution = resolve(&store, &refs, DEPTH);
        for id in resolution.retained_union() {
            prop_assert!(store.contains(id));
        }
    }

    #[test]
    fn test_resolved_ancestor_is_retained(
        (store, refs) in strategies::arb_forest_with_refs(10, 6)
    ) {
        let resolution = resolve(&store, &refs, DEPTH);
        for entry in &resolution.subregions {
            if let SubregionOutcome::Resolved { ancestor, retained } = &entry.outcome {
                prop_assert!(retained.contains(ancestor));
            }
        }
    }
}
