//! Scratch directories for persistence tests.
//!
//! Every test that saves a lineage image needs a directory nobody else
//! writes to; [`TestDir`] wraps [`tempfile::TempDir`] so the fixture is a
//! one-liner and cleanup is tied to the test's scope.

// Test utilities are expected to panic on failure - that's their purpose
#![allow(clippy::expect_used)]

use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// A scratch directory that lives exactly as long as the test holds it.
///
/// Dropping the value deletes the directory with everything written into
/// it, lineage images included.
///
/// # Example
///
/// ```
/// use stratadb_lineage_test_utils::TestDir;
///
/// let dir = TestDir::new();
/// let image_path = dir.join("lineage.bin");
/// // save an image at image_path, reload it, assert on the contents;
/// // the directory disappears when `dir` drops
/// ```
pub struct TestDir {
    inner: TempDir,
}

impl TestDir {
    /// Creates the scratch directory.
    ///
    /// # Panics
    ///
    /// Panics when the directory cannot be created; a test without a
    /// scratch directory cannot run anyway.
    #[must_use]
    pub fn new() -> Self {
        let inner = TempDir::new().expect("failed to create temp directory");
        Self { inner }
    }

    /// The directory's path.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.inner.path()
    }

    /// A path inside the directory, for image files and the like.
    #[must_use]
    pub fn join<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        self.inner.path().join(path)
    }
}

impl Default for TestDir {
    fn default() -> Self {
        Self::new()
    }
}
