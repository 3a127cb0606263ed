//! Authoritative garbage collection.
//!
//! Runs where the authoritative lineage store lives. Each cycle folds the
//! contract branch set with every relevant replica's freshest report,
//! resolves common ancestors over the local already-applied copy of the
//! store, and proposes a single atomic prune through consensus.
//!
//! Every uncertainty defers rather than deletes: an unresolved sub-region
//! keeps all branches overlapping it, an expected replica that has never
//! reported keeps its whole assigned region, and a cycle with no live
//! references at all proposes nothing. A proposal that loses its consensus
//! round is dropped and the next cycle recomputes from current state — GC is
//! idempotent and always safe to re-derive.

use std::{sync::Arc, time::Instant};

use parking_lot::RwLock;
use stratadb_lineage_history::{BranchRef, resolve};
use stratadb_lineage_types::{Result, config::GcConfig, error::InternalSnafu};
use tokio::time::interval;
use tracing::{debug, error, info, warn};

use crate::{
    consensus::{ConsensusHandle, ProposalOutcome},
    contracts::ContractSource,
    metrics,
    mutation::{AuthoritativeLineage, LineageMutation},
    reports::ReportRegistry,
};

/// Duty check deciding whether this process currently coordinates GC.
///
/// Supplied by the embedding system's leader election. Duplicate active
/// coordinators are safe — the version check makes at most one concurrent
/// proposal win — just wasteful.
pub type ActiveCheck = Arc<dyn Fn() -> bool + Send + Sync>;

/// What one coordinator cycle concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The duty check said another process coordinates; nothing computed.
    Inactive,
    /// Nothing to prune: every stored branch is still retained.
    Idle {
        /// Sub-regions (failed or pending) whose pruning was deferred.
        deferred: usize,
    },
    /// A prune was proposed and applied.
    Pruned {
        /// Branches removed from the authoritative store.
        removed: usize,
        /// Branches surviving the prune.
        retained: usize,
        /// Sub-regions whose pruning was deferred this round.
        deferred: usize,
        /// Authoritative version after the prune.
        version: u64,
    },
    /// The proposal lost its consensus round; recomputed next cycle.
    Superseded,
}

/// Background coordinator proposing authoritative prunes.
///
/// Stateless between cycles: every round re-derives its proposal from the
/// current contract set, report view, and store, so a newly elected leader
/// can start one with no handover.
#[derive(bon::Builder)]
pub struct GcCoordinator<C: ConsensusHandle> {
    /// Local already-applied copy of the authoritative store.
    authoritative: Arc<RwLock<AuthoritativeLineage>>,
    /// Source of the contract-asserted branch set.
    contracts: Arc<dyn ContractSource>,
    /// Replica report registry.
    reports: Arc<ReportRegistry>,
    /// Consensus collaborator proposals go through.
    consensus: Arc<C>,
    /// GC tuning knobs.
    #[builder(default)]
    config: GcConfig,
    /// Leader-duty probe; defaults to always active (single-process).
    #[builder(default = Arc::new(|| true))]
    is_active: ActiveCheck,
}

impl<C: ConsensusHandle> GcCoordinator<C> {
    /// Runs one collection cycle.
    ///
    /// Public so the embedding system can trigger a round on every contract
    /// change or report receipt, in addition to the timer.
    ///
    /// # Errors
    ///
    /// Propagates consensus collaborator failures; the cycle holds no state,
    /// so the caller simply retries next round.
    pub async fn run_cycle(&self) -> Result<CycleOutcome> {
        if !(self.is_active)() {
            debug!("Skipping GC cycle (not the active coordinator)");
            return Ok(CycleOutcome::Inactive);
        }

        let contracts = self.contracts.current();
        let view = self.reports.view();

        let mut refs: Vec<BranchRef> = contracts.branches.iter().cloned().collect();
        for report in &view.reports {
            refs.extend(report.branches.iter().cloned());
        }
        if refs.is_empty() && view.pending.is_empty() {
            // No contract, no replicas: there is no live reference to anchor
            // retention, so pruning anything would be guesswork.
            debug!("No live references; skipping GC cycle");
            return Ok(CycleOutcome::Idle { deferred: 0 });
        }

        // All store reads happen under one read lock, dropped before the
        // proposal await.
        let (retain, missing, failed, store_len, based_on) = {
            let state = self.authoritative.read();
            let resolution = resolve(state.store(), &refs, self.config.max_walk_depth);

            let mut retain = resolution.retained_union();
            let mut failed = 0usize;
            for entry in resolution.unresolved() {
                failed += 1;
                warn!(
                    region = %entry.region,
                    "No provable common ancestor; deferring prune for sub-region"
                );
                retain.extend(state.store().branches_overlapping(&entry.region));
            }
            for (replica, region) in &view.pending {
                debug!(%replica, region = %region, "Replica has never reported; deferring its region");
                retain.extend(state.store().branches_overlapping(region));
            }

            (retain, resolution.missing_entries(), failed, state.store().len(), state.version())
        };

        if !missing.is_empty() {
            // A live reference's lineage could not be reconstructed: a prior
            // prune may have been too aggressive. Operators must audit and
            // schedule a re-sync for the affected references.
            error!(
                branches = ?missing,
                "Referenced branches absent from the authoritative store"
            );
            metrics::record_missing_entry_alarm(metrics::SCOPE_COORDINATOR, missing.len() as u64);
        }

        let deferred = failed + view.pending.len();
        metrics::set_deferred_subregions(metrics::SCOPE_COORDINATOR, deferred);
        metrics::set_store_branches(metrics::SCOPE_COORDINATOR, store_len);

        // Retain sets only ever name stored branches, so covering the whole
        // store means this round removes nothing.
        if retain.len() >= store_len {
            debug!(retained = retain.len(), deferred, "GC cycle retained the whole store");
            return Ok(CycleOutcome::Idle { deferred });
        }

        let removed = store_len - retain.len();
        let retained = retain.len();
        let proposal = LineageMutation::Prune { based_on, retain };
        match self.consensus.propose(proposal).await? {
            ProposalOutcome::Applied { version } => {
                info!(removed, retained, deferred, version, "GC pruned authoritative lineage");
                metrics::record_proposal("applied");
                metrics::record_branches_pruned(metrics::SCOPE_COORDINATOR, removed as u64);
                metrics::set_branches_retained(metrics::SCOPE_COORDINATOR, retained);
                Ok(CycleOutcome::Pruned { removed, retained, deferred, version })
            }
            ProposalOutcome::Superseded => {
                debug!(based_on, "GC proposal superseded; recomputing next cycle");
                metrics::record_proposal("superseded");
                Ok(CycleOutcome::Superseded)
            }
            ProposalOutcome::Rejected { branch_id } => {
                // Prunes carry no certificates, so consensus has nothing to
                // reject; reaching this arm is a collaborator bug.
                metrics::record_proposal("rejected");
                InternalSnafu {
                    message: format!("prune proposal rejected for branch {branch_id}"),
                }
                .fail()
            }
        }
    }

    /// Starts the coordinator as a background task.
    ///
    /// Returns a handle that can be used to abort the task.
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(self.config.coordinator_interval);
            loop {
                ticker.tick().await;

                let start = Instant::now();
                match self.run_cycle().await {
                    Ok(outcome) => {
                        metrics::record_gc_cycle_duration(
                            metrics::SCOPE_COORDINATOR,
                            start.elapsed().as_secs_f64(),
                        );
                        metrics::record_gc_cycle(metrics::SCOPE_COORDINATOR, outcome_label(outcome));
                    }
                    Err(e) => {
                        metrics::record_gc_cycle_duration(
                            metrics::SCOPE_COORDINATOR,
                            start.elapsed().as_secs_f64(),
                        );
                        metrics::record_gc_cycle(metrics::SCOPE_COORDINATOR, "failure");
                        warn!(error = %e, "GC cycle failed");
                    }
                }
            }
        })
    }
}

fn outcome_label(outcome: CycleOutcome) -> &'static str {
    match outcome {
        CycleOutcome::Inactive => "inactive",
        CycleOutcome::Idle { .. } => "idle",
        CycleOutcome::Pruned { .. } => "pruned",
        CycleOutcome::Superseded => "superseded",
    }
}
