//! End-to-end garbage collection rounds.
//!
//! Each test drives a coordinator (and where relevant a local collector)
//! against a hand-built lineage forest, the way a deployment would: publish
//! a contract set, feed replica reports, run cycles, and check exactly
//! which branches survive.

// Test code is allowed to use unwrap for simplicity
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::disallowed_methods)]

use std::{sync::Arc, time::Duration};

use parking_lot::RwLock;
use stratadb_lineage_gc::{
    AuthoritativeLineage, ContractSource, CycleOutcome, FileLineagePersistence, GcCoordinator,
    InProcessConsensus, InProcessContractSource, LineageMutation, LineagePersistence,
    LocalCycleOutcome, LocalGc, ReportRegistry,
};
use stratadb_lineage_history::{BranchRef, LineageStore, RegionBranchMap};
use stratadb_lineage_test_utils::{ForestBuilder, TestDir, assert_eventually, test_gc_config};
use stratadb_lineage_types::{BirthCertificate, BranchId, Region, ReplicaId, Timestamp};

fn region(start: u8, end: u8) -> Region {
    Region::new(vec![start], Some(vec![end])).unwrap()
}

fn full_map(branch: BranchId) -> RegionBranchMap {
    RegionBranchMap::new(vec![BranchRef::new(Region::full(), branch)]).unwrap()
}

struct Cluster {
    state: Arc<RwLock<AuthoritativeLineage>>,
    contracts: Arc<InProcessContractSource>,
    reports: Arc<ReportRegistry>,
    coordinator: GcCoordinator<InProcessConsensus>,
}

fn cluster(forest: &ForestBuilder) -> Cluster {
    let mut state = AuthoritativeLineage::new();
    let certificates: Vec<BirthCertificate> = forest.build().certificates().cloned().collect();
    for certificate in certificates {
        state.apply(&LineageMutation::AddBranch(certificate));
    }
    let state = Arc::new(RwLock::new(state));
    let contracts = Arc::new(InProcessContractSource::new());
    let config = test_gc_config();
    let reports = Arc::new(ReportRegistry::new(config.report_warn_after));
    let coordinator = GcCoordinator::builder()
        .authoritative(Arc::clone(&state))
        .contracts(Arc::clone(&contracts) as Arc<dyn ContractSource>)
        .reports(Arc::clone(&reports))
        .consensus(Arc::new(InProcessConsensus::new(Arc::clone(&state))))
        .config(config)
        .build();
    Cluster { state, contracts, reports, coordinator }
}

// ============================================================================
// Coordinator rounds
// ============================================================================

#[tokio::test]
async fn test_linear_chain_round_prunes_origin() {
    // a <- b <- c <- d: the contract is on d, one replica lags on b. The
    // provable common ancestor is b, so only a is garbage.
    let mut forest = ForestBuilder::new();
    let a = forest.origin("a", Region::full());
    let b = forest.fork("b", "a", Region::full());
    let c = forest.fork("c", "b", Region::full());
    let d = forest.fork("d", "c", Region::full());
    let cluster = cluster(&forest);

    cluster.contracts.publish(full_map(d));
    cluster.reports.expect_replica(ReplicaId::new(1), Region::full());
    cluster.reports.submit(ReplicaId::new(1), 1, full_map(b));

    let outcome = cluster.coordinator.run_cycle().await.unwrap();
    assert!(matches!(outcome, CycleOutcome::Pruned { removed: 1, retained: 3, .. }));

    let state = cluster.state.read();
    assert!(!state.store().contains(a));
    for kept in [b, c, d] {
        assert!(state.store().contains(kept));
    }
}

#[tokio::test]
async fn test_agreeing_references_prune_whole_chain_below() {
    // Contract and replica both reference the tip: everything below it goes.
    let mut forest = ForestBuilder::new();
    let a = forest.origin("a", Region::full());
    let b = forest.fork("b", "a", Region::full());
    let cluster = cluster(&forest);

    cluster.contracts.publish(full_map(b));
    cluster.reports.expect_replica(ReplicaId::new(1), Region::full());
    cluster.reports.submit(ReplicaId::new(1), 3, full_map(b));

    let outcome = cluster.coordinator.run_cycle().await.unwrap();
    assert!(matches!(outcome, CycleOutcome::Pruned { removed: 1, retained: 1, .. }));
    let state = cluster.state.read();
    assert!(state.store().contains(b));
    assert!(!state.store().contains(a));
}

#[tokio::test]
async fn test_region_split_prunes_per_half_and_unions() {
    // One branch splits: left half failed over to l, right half to r. The
    // replica covering the left half lags on the pre-split branch.
    let mut forest = ForestBuilder::new();
    let a = forest.origin("a", Region::full());
    let b = forest.fork("b", "a", Region::full());
    let l = forest.fork("l", "b", region(0, 128));
    let r = forest.fork("r", "b", region(128, 255));
    let cluster = cluster(&forest);

    let contract = RegionBranchMap::new(vec![
        BranchRef::new(region(0, 128), l),
        BranchRef::new(region(128, 255), r),
    ])
    .unwrap();
    cluster.contracts.publish(contract);
    cluster.reports.expect_replica(ReplicaId::new(1), region(0, 128));
    cluster.reports.submit(
        ReplicaId::new(1),
        1,
        RegionBranchMap::new(vec![BranchRef::new(region(0, 128), b)]).unwrap(),
    );
    cluster.reports.expect_replica(ReplicaId::new(2), region(128, 255));
    cluster.reports.submit(
        ReplicaId::new(2),
        1,
        RegionBranchMap::new(vec![BranchRef::new(region(128, 255), r)]).unwrap(),
    );

    let outcome = cluster.coordinator.run_cycle().await.unwrap();
    // Left half keeps {b, l} (ancestor b), right half keeps {r}; the union
    // retains b even though the right half alone would not.
    assert!(matches!(outcome, CycleOutcome::Pruned { removed: 1, retained: 3, .. }));
    let state = cluster.state.read();
    assert!(!state.store().contains(a));
    for kept in [b, l, r] {
        assert!(state.store().contains(kept));
    }
}

#[tokio::test]
async fn test_missing_reference_defers_everything_in_its_subregion() {
    let mut forest = ForestBuilder::new();
    forest.origin("a", Region::full());
    let b = forest.fork("b", "a", Region::full());
    let cluster = cluster(&forest);
    let ghost = BranchId::random();

    cluster.contracts.publish(full_map(b));
    cluster.reports.expect_replica(ReplicaId::new(1), Region::full());
    cluster.reports.submit(ReplicaId::new(1), 1, full_map(ghost));

    assert_eq!(
        cluster.coordinator.run_cycle().await.unwrap(),
        CycleOutcome::Idle { deferred: 1 }
    );
    assert_eq!(cluster.state.read().store().len(), 2);
}

#[tokio::test]
async fn test_never_reported_replica_holds_its_region() {
    let mut forest = ForestBuilder::new();
    let a = forest.origin("a", Region::full());
    let b = forest.fork("b", "a", Region::full());
    let cluster = cluster(&forest);

    cluster.contracts.publish(full_map(b));
    cluster.reports.expect_replica(ReplicaId::new(1), Region::full());

    // No report yet: the whole region defers.
    assert_eq!(
        cluster.coordinator.run_cycle().await.unwrap(),
        CycleOutcome::Idle { deferred: 1 }
    );
    assert!(cluster.state.read().store().contains(a));

    // The first report unblocks the next round.
    cluster.reports.submit(ReplicaId::new(1), 1, full_map(b));
    assert!(matches!(
        cluster.coordinator.run_cycle().await.unwrap(),
        CycleOutcome::Pruned { removed: 1, .. }
    ));
    assert!(!cluster.state.read().store().contains(a));
}

#[tokio::test]
async fn test_retiring_a_replica_releases_its_hold() {
    let mut forest = ForestBuilder::new();
    let a = forest.origin("a", Region::full());
    let b = forest.fork("b", "a", Region::full());
    let cluster = cluster(&forest);

    cluster.contracts.publish(full_map(b));
    cluster.reports.expect_replica(ReplicaId::new(1), Region::full());
    cluster.reports.expect_replica(ReplicaId::new(2), Region::full());
    cluster.reports.submit(ReplicaId::new(1), 1, full_map(b));
    // Replica 2 lags forever on the old branch.
    cluster.reports.submit(ReplicaId::new(2), 1, full_map(a));

    assert_eq!(
        cluster.coordinator.run_cycle().await.unwrap(),
        CycleOutcome::Idle { deferred: 0 }
    );

    cluster.reports.retire_replica(ReplicaId::new(2));
    assert!(matches!(
        cluster.coordinator.run_cycle().await.unwrap(),
        CycleOutcome::Pruned { removed: 1, .. }
    ));
    assert!(!cluster.state.read().store().contains(a));
}

#[tokio::test]
async fn test_superseded_proposal_recomputes_and_converges() {
    // A branch creation wins the log slot a prune was computed against. The
    // stale prune is rejected wholesale, and the next round's recomputation
    // retains the new branch's lineage.
    let mut forest = ForestBuilder::new();
    let a = forest.origin("a", Region::full());
    let b = forest.fork("b", "a", Region::full());
    let cluster = cluster(&forest);

    cluster.contracts.publish(full_map(b));
    cluster.reports.expect_replica(ReplicaId::new(1), Region::full());
    cluster.reports.submit(ReplicaId::new(1), 1, full_map(b));

    // Interleave: a failover forks c from b between the read and the
    // proposal of a manually staged stale prune.
    let based_on = cluster.state.read().version();
    let stale = LineageMutation::Prune { based_on, retain: [b].into_iter().collect() };
    let c = BirthCertificate::builder()
        .branch_id(BranchId::random())
        .region(Region::full())
        .parent(b)
        .origin_point(Timestamp::new(100))
        .build();
    cluster.state.write().apply(&LineageMutation::AddBranch(c.clone()));
    assert_eq!(
        cluster.state.write().apply(&stale),
        stratadb_lineage_gc::ApplyOutcome::Superseded
    );
    assert!(cluster.state.read().store().contains(a));

    // References move to the new tip; the fresh round prunes a and b.
    cluster.contracts.publish(full_map(c.branch_id));
    cluster.reports.submit(ReplicaId::new(1), 2, full_map(c.branch_id));
    assert!(matches!(
        cluster.coordinator.run_cycle().await.unwrap(),
        CycleOutcome::Pruned { removed: 2, retained: 1, .. }
    ));
    let state = cluster.state.read();
    assert!(state.store().contains(c.branch_id));
    assert!(!state.store().contains(a));
    assert!(!state.store().contains(b));
}

#[tokio::test]
async fn test_rounds_are_idempotent() {
    let mut forest = ForestBuilder::new();
    forest.origin("a", Region::full());
    let b = forest.fork("b", "a", Region::full());
    let cluster = cluster(&forest);

    cluster.contracts.publish(full_map(b));
    cluster.reports.expect_replica(ReplicaId::new(1), Region::full());
    cluster.reports.submit(ReplicaId::new(1), 1, full_map(b));

    assert!(matches!(
        cluster.coordinator.run_cycle().await.unwrap(),
        CycleOutcome::Pruned { .. }
    ));
    let version_after = cluster.state.read().version();

    // Nothing changed since: further rounds conclude idle and never
    // propose, so the version stays put.
    for _ in 0..3 {
        assert_eq!(
            cluster.coordinator.run_cycle().await.unwrap(),
            CycleOutcome::Idle { deferred: 0 }
        );
    }
    assert_eq!(cluster.state.read().version(), version_after);
}

#[tokio::test]
async fn test_background_coordinator_prunes_on_its_own() {
    let mut forest = ForestBuilder::new();
    let a = forest.origin("a", Region::full());
    let b = forest.fork("b", "a", Region::full());
    let cluster = cluster(&forest);

    cluster.contracts.publish(full_map(b));
    cluster.reports.expect_replica(ReplicaId::new(1), Region::full());
    cluster.reports.submit(ReplicaId::new(1), 1, full_map(b));

    let state = Arc::clone(&cluster.state);
    let handle = cluster.coordinator.start();
    let pruned = assert_eventually(Duration::from_secs(5), || {
        !state.read().store().contains(a)
    })
    .await;
    handle.abort();
    assert!(pruned, "background coordinator should prune the origin");
    assert!(state.read().store().contains(b));
}

// ============================================================================
// Local collector alongside the coordinator
// ============================================================================

#[tokio::test]
async fn test_local_gc_trims_replica_copy_after_authoritative_prune() {
    let mut forest = ForestBuilder::new();
    let a = forest.origin("a", Region::full());
    let b = forest.fork("b", "a", Region::full());
    let c = forest.fork("c", "b", Region::full());
    let cluster = cluster(&forest);

    cluster.contracts.publish(full_map(c));
    cluster.reports.expect_replica(ReplicaId::new(1), Region::full());
    cluster.reports.submit(ReplicaId::new(1), 1, full_map(c));
    assert!(matches!(
        cluster.coordinator.run_cycle().await.unwrap(),
        CycleOutcome::Pruned { .. }
    ));

    // The replica held the full pre-prune history.
    let dir = TestDir::new();
    let persistence = Arc::new(FileLineagePersistence::new(dir.join("lineage.bin")));
    let store = Arc::new(RwLock::new(forest.build()));
    let local = LocalGc::builder()
        .replica(ReplicaId::new(1))
        .store(Arc::clone(&store))
        .authoritative(Arc::new(RwLock::new(LineageStore::new())))
        .own_refs(Arc::new(RwLock::new(full_map(c))))
        .persistence(Arc::clone(&persistence))
        .config(test_gc_config())
        .build();
    local.receive_authoritative(cluster.state.read().store()).unwrap();

    let outcome = local.run_cycle().unwrap();
    // Own reference c retains only c, but the authoritative copy still
    // holds b, so b survives locally too.
    assert_eq!(outcome, LocalCycleOutcome::Pruned { removed: 1, retained: 2, deferred: 0 });
    assert!(!store.read().contains(a));
    assert!(store.read().contains(b));
    assert!(store.read().contains(c));

    // The pruned image is on disk and restores into a cold replica.
    assert_eq!(persistence.load().unwrap(), *store.read());
}

#[tokio::test]
async fn test_replica_restart_round_trip() {
    let mut forest = ForestBuilder::new();
    forest.origin("a", Region::full());
    let b = forest.fork("b", "a", Region::full());

    let dir = TestDir::new();
    let persistence = Arc::new(FileLineagePersistence::new(dir.join("lineage.bin")));
    {
        let local = LocalGc::builder()
            .replica(ReplicaId::new(1))
            .store(Arc::new(RwLock::new(forest.build())))
            .authoritative(Arc::new(RwLock::new(LineageStore::new())))
            .own_refs(Arc::new(RwLock::new(full_map(b))))
            .persistence(Arc::clone(&persistence))
            .config(test_gc_config())
            .build();
        assert!(matches!(local.run_cycle().unwrap(), LocalCycleOutcome::Pruned { .. }));
    }

    // Restart: a fresh collector restores the trimmed image.
    let store = Arc::new(RwLock::new(LineageStore::new()));
    let restarted = LocalGc::builder()
        .replica(ReplicaId::new(1))
        .store(Arc::clone(&store))
        .authoritative(Arc::new(RwLock::new(LineageStore::new())))
        .own_refs(Arc::new(RwLock::new(full_map(b))))
        .persistence(persistence)
        .config(test_gc_config())
        .build();
    assert_eq!(restarted.restore().unwrap(), 1);
    assert!(store.read().contains(b));
    assert_eq!(store.read().len(), 1);
}

// ============================================================================
// Properties
// ============================================================================

use proptest::prelude::*;
use stratadb_lineage_gc::ApplyOutcome;
use stratadb_lineage_history::resolve;
use stratadb_lineage_test_utils::strategies;

proptest! {
    /// A prune computed the way a GC round computes it never removes a
    /// branch any reference still needs, on any forest.
    #[test]
    fn prop_gc_retention_keeps_every_referenced_lineage(
        (store, refs) in strategies::arb_forest_with_refs(12, 6),
    ) {
        let mut state = AuthoritativeLineage::new();
        let certificates: Vec<BirthCertificate> = store.certificates().cloned().collect();
        for certificate in certificates {
            state.apply(&LineageMutation::AddBranch(certificate));
        }

        let resolution = resolve(state.store(), &refs, 4096);
        let mut retain = resolution.retained_union();
        for entry in resolution.unresolved() {
            retain.extend(state.store().branches_overlapping(&entry.region));
        }

        let based_on = state.version();
        prop_assert_eq!(
            state.apply(&LineageMutation::Prune { based_on, retain }),
            ApplyOutcome::Applied { version: based_on + 1 }
        );
        for branch_ref in &refs {
            prop_assert!(state.store().contains(branch_ref.branch));
        }
    }

    /// Replicas applying the same mutation log reach the same state, and a
    /// prune based on a version the log moved past never applies.
    #[test]
    fn prop_mutation_log_replays_identically(
        store in strategies::arb_forest(10),
        retain_picks in proptest::collection::vec(any::<prop::sample::Index>(), 0..6),
    ) {
        let certificates: Vec<BirthCertificate> = store.certificates().cloned().collect();
        let ids: Vec<BranchId> = store.branch_ids().collect();
        let retain = retain_picks
            .iter()
            .map(|pick| ids[pick.index(ids.len())])
            .collect::<std::collections::BTreeSet<_>>();

        let mut log: Vec<LineageMutation> =
            certificates.into_iter().map(LineageMutation::AddBranch).collect();
        log.push(LineageMutation::Prune { based_on: ids.len() as u64, retain });
        // Stale prune, computed before the log's last entry.
        log.push(LineageMutation::Prune { based_on: 0, retain: ids.iter().copied().collect() });

        let mut first = AuthoritativeLineage::new();
        let mut second = AuthoritativeLineage::new();
        let outcomes_first: Vec<ApplyOutcome> =
            log.iter().map(|mutation| first.apply(mutation)).collect();
        let outcomes_second: Vec<ApplyOutcome> =
            log.iter().map(|mutation| second.apply(mutation)).collect();

        prop_assert_eq!(outcomes_first.clone(), outcomes_second);
        prop_assert_eq!(first.store(), second.store());
        prop_assert_eq!(first.version(), second.version());
        prop_assert_eq!(outcomes_first.last(), Some(&ApplyOutcome::Superseded));
    }
}
