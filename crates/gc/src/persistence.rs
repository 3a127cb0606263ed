//! Durable storage of a replica's private lineage store.
//!
//! Each replica persists its private store so a restart does not forget
//! lineage the authoritative copy may already have pruned (a lagging replica
//! can legitimately hold more history than the coordinator retains). The
//! file image uses the same postcard codec as consensus log entries.

use std::{
    fs::{self, File},
    io::Write,
    path::PathBuf,
};

use snafu::ResultExt;
use stratadb_lineage_history::LineageStore;
use stratadb_lineage_types::{
    Result, codec,
    error::{IoSnafu, SerializationSnafu},
};
use tracing::debug;

/// Durable load/save of a replica's private lineage store.
pub trait LineagePersistence: Send + Sync {
    /// Loads the persisted store, or an empty one if none was ever saved.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](stratadb_lineage_types::LineageError::Io) on read
    /// failure and
    /// [`Serialization`](stratadb_lineage_types::LineageError::Serialization)
    /// on a corrupt image.
    fn load(&self) -> Result<LineageStore>;

    /// Durably replaces the persisted store.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](stratadb_lineage_types::LineageError::Io) on write
    /// failure; a failed save leaves the previous image intact.
    fn save(&self, store: &LineageStore) -> Result<()>;
}

/// File-backed persistence: one postcard image, replaced atomically.
///
/// Saves write to a sibling temp file, fsync, then rename over the target,
/// so a crash mid-save never leaves a torn image. A missing file loads as
/// an empty store (first boot).
#[derive(Debug, Clone)]
pub struct FileLineagePersistence {
    path: PathBuf,
}

impl FileLineagePersistence {
    /// Creates persistence writing to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The image path.
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl LineagePersistence for FileLineagePersistence {
    fn load(&self) -> Result<LineageStore> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No persisted lineage image; starting empty");
                return Ok(LineageStore::new());
            }
            Err(error) => return Err(error).context(IoSnafu),
        };
        codec::decode(&bytes)
            .map_err(|error| SerializationSnafu { message: error.to_string() }.build())
    }

    fn save(&self, store: &LineageStore) -> Result<()> {
        let bytes = codec::encode(store)
            .map_err(|error| SerializationSnafu { message: error.to_string() }.build())?;

        let tmp = self.path.with_extension("tmp");
        let mut file = File::create(&tmp).context(IoSnafu)?;
        file.write_all(&bytes).context(IoSnafu)?;
        file.sync_all().context(IoSnafu)?;
        fs::rename(&tmp, &self.path).context(IoSnafu)?;
        debug!(
            path = %self.path.display(),
            branches = store.len(),
            bytes = bytes.len(),
            "Saved lineage image"
        );
        Ok(())
    }
}
