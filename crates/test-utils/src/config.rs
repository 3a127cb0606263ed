//! Test configuration helpers.
//!
//! Provides sensible default configurations for tests, centralizing
//! magic values that would otherwise be scattered across test modules.

use std::time::Duration;

use stratadb_lineage_types::config::GcConfig;

/// Returns a garbage collection configuration suitable for tests.
///
/// Uses small values for fast test execution:
/// - `coordinator_interval`: 1s (the validation floor)
/// - `local_interval`: 1s
/// - `report_warn_after`: 1s (staleness warnings fire quickly)
/// - `max_walk_depth`: 64 (plenty for fixture-sized forests)
#[must_use]
pub fn test_gc_config() -> GcConfig {
    GcConfig {
        coordinator_interval: Duration::from_secs(1),
        local_interval: Duration::from_secs(1),
        report_warn_after: Duration::from_secs(1),
        max_walk_depth: 64,
    }
}
