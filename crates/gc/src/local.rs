//! Per-replica local garbage collection.
//!
//! Each replica keeps a private lineage store so it can interpret its own
//! on-disk state without asking anyone. Local GC trims that private copy
//! using only the replica's own references plus one rule: any branch the
//! authoritative store still retains is kept locally too, since the
//! coordinator may yet need the replica to reason about it. Local pruning
//! needs no consensus round because it affects no one else.

use std::{sync::Arc, time::Instant};

use parking_lot::RwLock;
use stratadb_lineage_history::{LineageStore, RegionBranchMap, resolve};
use stratadb_lineage_types::{ReplicaId, Result, config::GcConfig};
use tokio::time::interval;
use tracing::{debug, error, info, warn};

use crate::{metrics, persistence::LineagePersistence};

/// What one local collection cycle concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalCycleOutcome {
    /// Nothing to prune this round.
    Idle {
        /// Sub-regions whose pruning was deferred.
        deferred: usize,
    },
    /// Branches were removed from the private store and the image saved.
    Pruned {
        /// Branches removed.
        removed: usize,
        /// Branches surviving.
        retained: usize,
        /// Sub-regions whose pruning was deferred.
        deferred: usize,
    },
}

/// Background collector trimming one replica's private lineage store.
#[derive(bon::Builder)]
pub struct LocalGc<P: LineagePersistence> {
    /// The owning replica, for logs.
    replica: ReplicaId,
    /// The replica's private lineage store.
    store: Arc<RwLock<LineageStore>>,
    /// Latest received image of the authoritative store.
    ///
    /// Updated through [`receive_authoritative`](Self::receive_authoritative);
    /// may lag arbitrarily, which only makes local GC keep more.
    authoritative: Arc<RwLock<LineageStore>>,
    /// The branches this replica's own state is currently built on.
    own_refs: Arc<RwLock<RegionBranchMap>>,
    /// Durable image of the private store.
    persistence: Arc<P>,
    /// GC tuning knobs.
    #[builder(default)]
    config: GcConfig,
}

impl<P: LineagePersistence + 'static> LocalGc<P> {
    /// Restores the private store from its persisted image.
    ///
    /// Absorbs rather than replaces, so certificates learned before restore
    /// ran survive. Returns how many certificates the image contributed.
    ///
    /// # Errors
    ///
    /// Fails on an unreadable or corrupt image, or if the image conflicts
    /// with an already-held certificate.
    pub fn restore(&self) -> Result<usize> {
        let image = self.persistence.load()?;
        let absorbed = self.store.write().absorb(&image)?;
        info!(replica = %self.replica, absorbed, "Restored lineage from persisted image");
        Ok(absorbed)
    }

    /// Ingests a fresh copy of the authoritative store.
    ///
    /// New certificates are absorbed into the private store (the replica
    /// never forgets what the coordinator still knows), and the image
    /// replaces the retained-by-authority baseline the next cycle prunes
    /// against. Returns how many certificates were new.
    ///
    /// # Errors
    ///
    /// Fails if the image conflicts with an already-held certificate, which
    /// indicates corruption on one side.
    pub fn receive_authoritative(&self, image: &LineageStore) -> Result<usize> {
        let absorbed = self.store.write().absorb(image)?;
        *self.authoritative.write() = image.clone();
        debug!(
            replica = %self.replica,
            absorbed,
            authoritative = image.len(),
            "Received authoritative lineage image"
        );
        Ok(absorbed)
    }

    /// Runs one local collection cycle.
    ///
    /// # Errors
    ///
    /// Fails if saving the pruned image fails; the in-memory prune has
    /// already happened and the next successful save catches up.
    pub fn run_cycle(&self) -> Result<LocalCycleOutcome> {
        let refs: Vec<_> = self.own_refs.read().iter().cloned().collect();
        if refs.is_empty() {
            // A replica with no state of its own has nothing anchoring a
            // prune; keep everything.
            debug!(replica = %self.replica, "No local references; skipping local GC");
            return Ok(LocalCycleOutcome::Idle { deferred: 0 });
        }

        let (snapshot, removed, retained, deferred, missing) = {
            let mut store = self.store.write();
            let resolution = resolve(&store, &refs, self.config.max_walk_depth);

            let mut retain = resolution.retained_union();
            let mut deferred = 0usize;
            for entry in resolution.unresolved() {
                deferred += 1;
                warn!(
                    replica = %self.replica,
                    region = %entry.region,
                    "No provable common ancestor; deferring local prune for sub-region"
                );
                retain.extend(store.branches_overlapping(&entry.region));
            }
            // Whatever the authoritative store retains, this replica keeps.
            retain.extend(self.authoritative.read().branch_ids());

            let removed = store.prune(&retain);
            let retained = store.len();
            let snapshot = (removed > 0).then(|| store.clone());
            (snapshot, removed, retained, deferred, resolution.missing_entries())
        };

        if !missing.is_empty() {
            error!(
                replica = %self.replica,
                branches = ?missing,
                "Locally referenced branches absent from the private store"
            );
            metrics::record_missing_entry_alarm(metrics::SCOPE_LOCAL, missing.len() as u64);
        }

        metrics::set_deferred_subregions(metrics::SCOPE_LOCAL, deferred);
        metrics::set_store_branches(metrics::SCOPE_LOCAL, retained);

        match snapshot {
            Some(snapshot) => {
                self.persistence.save(&snapshot)?;
                info!(
                    replica = %self.replica,
                    removed,
                    retained,
                    deferred,
                    "Local GC pruned private lineage"
                );
                metrics::record_branches_pruned(metrics::SCOPE_LOCAL, removed as u64);
                metrics::set_branches_retained(metrics::SCOPE_LOCAL, retained);
                Ok(LocalCycleOutcome::Pruned { removed, retained, deferred })
            }
            None => {
                debug!(replica = %self.replica, retained, deferred, "Local GC retained everything");
                Ok(LocalCycleOutcome::Idle { deferred })
            }
        }
    }

    /// Starts local collection as a background task.
    ///
    /// Returns a handle that can be used to abort the task.
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(self.config.local_interval);
            loop {
                ticker.tick().await;

                let start = Instant::now();
                match self.run_cycle() {
                    Ok(outcome) => {
                        metrics::record_gc_cycle_duration(
                            metrics::SCOPE_LOCAL,
                            start.elapsed().as_secs_f64(),
                        );
                        let label = match outcome {
                            LocalCycleOutcome::Idle { .. } => "idle",
                            LocalCycleOutcome::Pruned { .. } => "pruned",
                        };
                        metrics::record_gc_cycle(metrics::SCOPE_LOCAL, label);
                    }
                    Err(e) => {
                        metrics::record_gc_cycle_duration(
                            metrics::SCOPE_LOCAL,
                            start.elapsed().as_secs_f64(),
                        );
                        metrics::record_gc_cycle(metrics::SCOPE_LOCAL, "failure");
                        warn!(replica = %self.replica, error = %e, "Local GC cycle failed");
                    }
                }
            }
        })
    }
}
