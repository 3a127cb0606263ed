//! Replica report ingestion and freshness tracking.
//!
//! Every replica periodically acknowledges its on-disk state by reporting
//! the branch it holds per sub-region of its assigned range. The registry
//! keeps the freshest report per replica (by the replica's own `as_of`
//! counter, so out-of-order delivery is harmless) and tells the coordinator
//! which expected replicas have never reported at all — their regions are
//! pending and must defer pruning.
//!
//! A report is never expired by age. An unresponsive replica's last-known
//! report stays live until the replica is explicitly retired, which is a
//! membership decision taken outside this crate. Old reports are only
//! logged and counted as stale so operators notice.

use std::{collections::BTreeMap, time::Duration};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use stratadb_lineage_history::RegionBranchMap;
use stratadb_lineage_types::{Region, ReplicaId};
use tracing::{debug, warn};

use crate::metrics;

/// One replica's self-asserted current state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicaReportSet {
    /// The reporting replica.
    pub replica: ReplicaId,
    /// The replica's own report counter; higher supersedes lower.
    pub as_of: u64,
    /// One branch per sub-region of the replica's assigned range.
    pub branches: RegionBranchMap,
    /// When this process received the report.
    pub received_at: DateTime<Utc>,
}

/// How a submitted report was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportDisposition {
    /// The report superseded the replica's previous one (or was its first).
    Fresh,
    /// The report's `as_of` did not exceed the last seen; ignored.
    Stale,
}

/// The coordinator's per-cycle view of replica state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportView {
    /// The freshest report of every expected replica that has reported.
    pub reports: Vec<ReplicaReportSet>,
    /// Assigned regions of expected replicas that have never reported.
    ///
    /// Pruning must be deferred for these regions: the replica's state is
    /// unknown, not absent.
    pub pending: Vec<(ReplicaId, Region)>,
}

#[derive(Debug, Default)]
struct RegistryInner {
    expected: BTreeMap<ReplicaId, Region>,
    reports: BTreeMap<ReplicaId, ReplicaReportSet>,
}

/// Tracks the expected replica set and each replica's freshest report.
#[derive(Debug)]
pub struct ReportRegistry {
    inner: RwLock<RegistryInner>,
    warn_after: Duration,
}

impl ReportRegistry {
    /// Creates an empty registry.
    ///
    /// `warn_after` is the report age past which [`view`](Self::view) logs
    /// a staleness warning. It never drops a report.
    pub fn new(warn_after: Duration) -> Self {
        Self { inner: RwLock::new(RegistryInner::default()), warn_after }
    }

    /// Declares that `replica` holds `region` and its state matters to GC.
    ///
    /// Until the replica's first report arrives, the region is pending and
    /// pruning defers for it. Re-declaring updates the assigned region.
    pub fn expect_replica(&self, replica: ReplicaId, region: Region) {
        let mut inner = self.inner.write();
        inner.expected.insert(replica, region);
    }

    /// Removes a replica from the expected set and drops its report.
    ///
    /// Called when membership decides the replica is gone for good; its
    /// last report stops holding history live from the next cycle on.
    pub fn retire_replica(&self, replica: ReplicaId) {
        let mut inner = self.inner.write();
        inner.expected.remove(&replica);
        if inner.reports.remove(&replica).is_some() {
            debug!(%replica, "Retired replica; dropped its last report");
        }
    }

    /// Ingests a report, keeping it only if it supersedes the last one.
    ///
    /// Reports from replicas not (yet) expected are stored too; membership
    /// updates may trail report arrival, and an unexpected replica's report
    /// is ignored by [`view`](Self::view) until it is declared.
    pub fn submit(
        &self,
        replica: ReplicaId,
        as_of: u64,
        branches: RegionBranchMap,
    ) -> ReportDisposition {
        let mut inner = self.inner.write();
        if let Some(existing) = inner.reports.get(&replica) {
            if as_of <= existing.as_of {
                debug!(%replica, as_of, last_seen = existing.as_of, "Ignored stale report");
                return ReportDisposition::Stale;
            }
        }
        inner
            .reports
            .insert(replica, ReplicaReportSet { replica, as_of, branches, received_at: Utc::now() });
        ReportDisposition::Fresh
    }

    /// Snapshots the freshest report per expected replica.
    ///
    /// Reports older than the warn threshold are logged and counted but
    /// still included: staleness never expires a report.
    pub fn view(&self) -> ReportView {
        let inner = self.inner.read();
        let mut reports = Vec::new();
        let mut pending = Vec::new();
        for (&replica, region) in &inner.expected {
            match inner.reports.get(&replica) {
                Some(report) => {
                    let age = Utc::now().signed_duration_since(report.received_at);
                    if age.to_std().is_ok_and(|age| age > self.warn_after) {
                        warn!(
                            %replica,
                            age_secs = age.num_seconds(),
                            as_of = report.as_of,
                            "Replica report is stale; still honoring it"
                        );
                        metrics::record_stale_report();
                    }
                    reports.push(report.clone());
                }
                None => pending.push((replica, region.clone())),
            }
        }
        ReportView { reports, pending }
    }

    /// Number of expected replicas.
    pub fn expected_count(&self) -> usize {
        self.inner.read().expected.len()
    }
}
