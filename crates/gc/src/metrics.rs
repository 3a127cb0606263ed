//! Observability metrics exposed via the `metrics` crate.
//!
//! ## Metric Naming Conventions
//!
//! All metrics follow the pattern: `stratadb_lineage_{name}_{unit}`
//!
//! - Counters: `_total` suffix
//! - Histograms: `_seconds` suffix
//! - Gauges: no suffix
//!
//! Garbage collection metrics carry a `scope` label distinguishing the
//! authoritative coordinator (`"coordinator"`) from per-replica local
//! collection (`"local"`).

use metrics::{counter, gauge, histogram};

// =============================================================================
// Metric Names (constants for consistency)
// =============================================================================

const GC_CYCLES_TOTAL: &str = "stratadb_lineage_gc_cycles_total";
const GC_CYCLE_DURATION: &str = "stratadb_lineage_gc_cycle_duration_seconds";
const GC_BRANCHES_PRUNED_TOTAL: &str = "stratadb_lineage_gc_branches_pruned_total";
const GC_BRANCHES_RETAINED: &str = "stratadb_lineage_gc_branches_retained";
const GC_DEFERRED_SUBREGIONS: &str = "stratadb_lineage_gc_deferred_subregions";
const GC_PROPOSALS_TOTAL: &str = "stratadb_lineage_gc_proposals_total";
const MISSING_ENTRY_ALARMS_TOTAL: &str = "stratadb_lineage_missing_entry_alarms_total";
const STALE_REPORTS_TOTAL: &str = "stratadb_lineage_stale_reports_total";
const STORE_BRANCHES: &str = "stratadb_lineage_store_branches";

/// Scope label for the authoritative coordinator.
pub const SCOPE_COORDINATOR: &str = "coordinator";
/// Scope label for per-replica local collection.
pub const SCOPE_LOCAL: &str = "local";

// =============================================================================
// Garbage Collection Metrics
// =============================================================================

/// Records the outcome of one GC cycle.
///
/// `outcome` is one of `"inactive"`, `"idle"`, `"pruned"`, `"superseded"`,
/// `"failure"`.
#[inline]
pub fn record_gc_cycle(scope: &'static str, outcome: &'static str) {
    counter!(GC_CYCLES_TOTAL, "scope" => scope, "outcome" => outcome).increment(1);
}

/// Records one GC cycle's wall-clock duration.
#[inline]
pub fn record_gc_cycle_duration(scope: &'static str, duration_secs: f64) {
    histogram!(GC_CYCLE_DURATION, "scope" => scope).record(duration_secs);
}

/// Records branches removed by an applied prune.
#[inline]
pub fn record_branches_pruned(scope: &'static str, count: u64) {
    counter!(GC_BRANCHES_PRUNED_TOTAL, "scope" => scope).increment(count);
}

/// Sets the retained branch count after a cycle.
#[inline]
pub fn set_branches_retained(scope: &'static str, count: usize) {
    gauge!(GC_BRANCHES_RETAINED, "scope" => scope).set(count as f64);
}

/// Sets the number of sub-regions whose pruning was deferred this cycle.
#[inline]
pub fn set_deferred_subregions(scope: &'static str, count: usize) {
    gauge!(GC_DEFERRED_SUBREGIONS, "scope" => scope).set(count as f64);
}

/// Records the outcome of a prune proposal.
///
/// `outcome` is one of `"applied"`, `"superseded"`, `"rejected"`.
#[inline]
pub fn record_proposal(outcome: &'static str) {
    counter!(GC_PROPOSALS_TOTAL, "outcome" => outcome).increment(1);
}

/// Records referenced branches found absent from a lineage store.
///
/// A non-zero rate is a correctness alarm: a prior prune may have removed
/// history a live reference still needs.
#[inline]
pub fn record_missing_entry_alarm(scope: &'static str, count: u64) {
    counter!(MISSING_ENTRY_ALARMS_TOTAL, "scope" => scope).increment(count);
}

/// Records a replica report observed past the staleness warning threshold.
#[inline]
pub fn record_stale_report() {
    counter!(STALE_REPORTS_TOTAL).increment(1);
}

/// Sets the current lineage store size in branches.
#[inline]
pub fn set_store_branches(scope: &'static str, count: usize) {
    gauge!(STORE_BRANCHES, "scope" => scope).set(count as f64);
}
