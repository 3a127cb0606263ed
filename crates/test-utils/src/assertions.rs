//! Polling assertions for background-job tests.
//!
//! Collection jobs run on timers, so a test that starts one cannot pin
//! down *when* the effect lands — only that it does. [`assert_eventually`]
//! polls for the effect instead of sleeping a guessed amount, which keeps
//! those tests fast when the job is quick and honest when it is not.

use std::time::Duration;

use tokio::time::{Instant, sleep};

/// Polling interval for [`assert_eventually`].
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Polls `condition` until it holds or `timeout` expires.
///
/// Returns whether the condition held before the deadline; callers assert
/// on the returned bool so the failure message stays theirs.
///
/// # Example
///
/// ```no_run
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::sync::Arc;
/// use std::time::Duration;
/// use stratadb_lineage_test_utils::assert_eventually;
///
/// #[tokio::test]
/// async fn test_cycle_ran() {
///     let pruned = Arc::new(AtomicBool::new(false));
///     let observed = pruned.clone();
///
///     // Stand-in for a collection job flipping state on its own schedule
///     tokio::spawn(async move {
///         tokio::time::sleep(Duration::from_millis(50)).await;
///         pruned.store(true, Ordering::SeqCst);
///     });
///
///     let result = assert_eventually(Duration::from_millis(200), || {
///         observed.load(Ordering::SeqCst)
///     }).await;
///     assert!(result, "cycle should have pruned");
/// }
/// ```
pub async fn assert_eventually<F>(timeout: Duration, condition: F) -> bool
where
    F: Fn() -> bool,
{
    let start = Instant::now();

    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        sleep(DEFAULT_POLL_INTERVAL).await;
    }

    // Final check after timeout
    condition()
}
