//! Error types for the lineage layer using snafu.
//!
//! Defines a unified error type hierarchy that captures:
//! - Store errors (duplicate branches, malformed regions, corrupt chains)
//! - Resolution errors (unresolvable ancestry, missing entries)
//! - Collaborator errors (consensus, persistence, serialization)
//!
//! Each error variant maps to an [`ErrorCode`] with a unique numeric identifier,
//! retryability classification, and suggested recovery action.
//! See [`ErrorCode`] for the full catalog.

use core::fmt;

use snafu::{Location, Snafu};

use crate::{region::Region, types::BranchId};

/// Unified result type for lineage operations.
pub type Result<T, E = LineageError> = std::result::Result<T, E>;

/// Machine-readable error codes for programmatic error handling.
///
/// Each [`LineageError`] variant maps to a unique numeric code. Codes are
/// organized into ranges:
///
/// | Range       | Domain      | Examples                                    |
/// |-------------|-------------|---------------------------------------------|
/// | 1000–1099   | Store       | Duplicate branch, invalid region, cycles    |
/// | 2000–2099   | Resolution  | No common ancestor, missing entry           |
/// | 3000–3099   | GC          | Consensus, serialization, I/O, config       |
///
/// Codes are stable across releases: they appear in structured log fields and
/// are surfaced by operator tooling. Use [`ErrorCode::as_u16`] when emitting
/// and [`ErrorCode::from_u16`] when interpreting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    // --- Store errors (1000–1099) ---
    /// Insert conflicted with an existing, different certificate for the id.
    StoreDuplicateBranch = 1000,
    /// Region bounds are malformed (start not below a bounded end).
    StoreInvalidRegion = 1001,
    /// A parent chain closed a loop; lineage metadata is corrupt.
    StoreCorruptLineage = 1002,

    // --- Resolution errors (2000–2099) ---
    /// No common ancestor could be proved for a sub-region.
    ResolveNoCommonAncestor = 2000,
    /// A referenced lineage entry is absent from the store.
    ResolveMissingEntry = 2001,
    /// One source asserted two branches for overlapping regions.
    ResolveOverlappingReferences = 2002,
    /// An ancestor walk exceeded the configured depth bound.
    ResolveWalkDepthExceeded = 2003,

    // --- GC and collaborator errors (3000–3099) ---
    /// The consensus collaborator failed to process a proposal.
    GcConsensus = 3000,
    /// Serialization or deserialization error.
    GcSerialization = 3001,
    /// Filesystem I/O error.
    GcIo = 3002,
    /// Configuration error.
    GcConfig = 3003,
    /// Internal error (unexpected state, invariant violation).
    GcInternal = 3004,
}

impl ErrorCode {
    /// Returns the numeric code value.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Converts a numeric code to an `ErrorCode`, returning `None` for unknown values.
    #[must_use]
    pub fn from_u16(code: u16) -> Option<Self> {
        match code {
            1000 => Some(Self::StoreDuplicateBranch),
            1001 => Some(Self::StoreInvalidRegion),
            1002 => Some(Self::StoreCorruptLineage),
            2000 => Some(Self::ResolveNoCommonAncestor),
            2001 => Some(Self::ResolveMissingEntry),
            2002 => Some(Self::ResolveOverlappingReferences),
            2003 => Some(Self::ResolveWalkDepthExceeded),
            3000 => Some(Self::GcConsensus),
            3001 => Some(Self::GcSerialization),
            3002 => Some(Self::GcIo),
            3003 => Some(Self::GcConfig),
            3004 => Some(Self::GcInternal),
            _ => None,
        }
    }

    /// Whether this error is retryable.
    ///
    /// Retryable errors may succeed on a subsequent attempt, typically after
    /// backoff or after fresh inputs arrive. Non-retryable errors require
    /// corrective action before retrying.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::ResolveNoCommonAncestor | Self::GcConsensus | Self::GcIo)
    }

    /// Suggested recovery action for this error code.
    ///
    /// Returns a human-readable string describing what the caller should do
    /// to recover from this error. This guidance is stable and safe to display
    /// in UIs or log to operator dashboards.
    #[must_use]
    pub const fn suggested_action(self) -> &'static str {
        match self {
            Self::StoreDuplicateBranch => {
                "Branch id collision on insert. This indicates a bug in branch creation; collect both certificates and report as an issue."
            },
            Self::StoreInvalidRegion => {
                "Fix the region bounds: start must be strictly below a bounded end."
            },
            Self::StoreCorruptLineage => {
                "Lineage metadata contains a cycle. Discard the local copy and re-absorb the authoritative store."
            },
            Self::ResolveNoCommonAncestor => {
                "No action usually needed. GC defers pruning for the region and retries once fresh reports arrive."
            },
            Self::ResolveMissingEntry => {
                "Audit recent prunes for the affected region. A live reference could not reconstruct its lineage; schedule a full re-sync for it."
            },
            Self::ResolveOverlappingReferences => {
                "Fix the reference set: one source may assert at most one branch per key."
            },
            Self::ResolveWalkDepthExceeded => {
                "Raise max_walk_depth or investigate why an ancestor chain grew past the configured bound."
            },
            Self::GcConsensus => {
                "Retry with backoff. The proposal may have raced a leadership change or a concurrent mutation."
            },
            Self::GcSerialization => {
                "Codec bug or data corruption. Report as an issue with the serialized data context."
            },
            Self::GcIo => {
                "Check disk space, filesystem permissions, and mount health. May be retryable."
            },
            Self::GcConfig => "Fix the configuration value and restart the process.",
            Self::GcInternal => {
                "Unexpected state or invariant violation. Collect context and report as an issue."
            },
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u16())
    }
}

/// Top-level error type for lineage operations.
///
/// # Recovery Guide
///
/// | Variant                 | Retryable | Recovery Action                                        |
/// | ----------------------- | --------- | ------------------------------------------------------ |
/// | `DuplicateBranch`       | No        | Branch-id collision; a bug in branch creation          |
/// | `InvalidRegion`         | No        | Fix the region bounds                                  |
/// | `CorruptLineage`        | No        | Re-absorb the authoritative store                      |
/// | `NoCommonAncestor`      | Yes       | GC defers the region; retried next round               |
/// | `MissingEntry`          | No        | Correctness alarm; audit prunes, schedule re-sync      |
/// | `OverlappingReferences` | No        | Fix the caller's reference set                         |
/// | `WalkDepthExceeded`     | No        | Raise the depth bound or investigate chain growth      |
/// | `Consensus`             | Yes       | Retry with backoff                                     |
/// | `Serialization`         | No        | Bug in codec layer; report as issue                    |
/// | `Io`                    | Maybe     | Check filesystem permissions and disk health           |
/// | `Config`                | No        | Fix configuration and restart                          |
/// | `Internal`              | No        | Unexpected state; report as issue with context         |
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum LineageError {
    /// An insert conflicted with an existing, different certificate.
    ///
    /// **Recovery**: Not retryable. Branch ids are never reused, so this
    /// indicates two distinct branches collided on an id — a bug in branch
    /// creation, not a transient condition.
    #[snafu(display("Branch {branch_id} already registered with a different certificate"))]
    DuplicateBranch {
        /// The colliding branch identifier.
        branch_id: BranchId,
    },

    /// Region bounds are malformed.
    ///
    /// **Recovery**: Not retryable. Fix the bounds: start must be strictly
    /// below a bounded end.
    #[snafu(display("Invalid region: {message}"))]
    InvalidRegion {
        /// Error description.
        message: String,
    },

    /// A parent chain closed a loop.
    ///
    /// **Recovery**: Not retryable. Birth certificates are immutable and
    /// acyclic by construction, so a cycle means the store is corrupt.
    /// Discard the copy and re-absorb the authoritative store.
    #[snafu(display("Lineage for branch {branch_id} contains a cycle"))]
    CorruptLineage {
        /// Branch at which the cycle was detected.
        branch_id: BranchId,
    },

    /// No common ancestor could be proved for a sub-region.
    ///
    /// **Recovery**: Retryable indirectly. GC defers pruning for the region
    /// this round and recomputes next round; fresh replica reports usually
    /// clear the condition.
    #[snafu(display("No common ancestor for region {region}"))]
    NoCommonAncestor {
        /// Sub-region whose references could not be resolved.
        region: Region,
    },

    /// A referenced lineage entry is absent from the store.
    ///
    /// **Recovery**: Correctness alarm, not retryable. A previous prune may
    /// have removed a branch still referenced; surface to operators and
    /// schedule a full re-sync for the affected reference.
    #[snafu(display("Lineage entry for branch {branch_id} is missing"))]
    MissingEntry {
        /// The referenced branch with no stored certificate.
        branch_id: BranchId,
    },

    /// One source asserted branches for overlapping regions.
    ///
    /// **Recovery**: Not retryable. A single contract or replica speaks for
    /// disjoint regions by construction; fix the caller's reference set.
    #[snafu(display("References overlap: {first} and {second}"))]
    OverlappingReferences {
        /// Region of the first conflicting reference.
        first: Region,
        /// Region of the second conflicting reference.
        second: Region,
    },

    /// An ancestor walk exceeded the configured depth bound.
    ///
    /// **Recovery**: Not retryable with the same inputs. Either raise
    /// `max_walk_depth` or investigate why the chain grew past the bound
    /// GC normally keeps it under.
    #[snafu(display("Ancestor walk for region {region} exceeded depth {max_depth}"))]
    WalkDepthExceeded {
        /// Sub-region whose walks ran past the bound.
        region: Region,
        /// The configured bound.
        max_depth: usize,
    },

    /// The consensus collaborator failed to process a proposal.
    ///
    /// **Recovery**: Retry with backoff. The cluster may be electing a new
    /// leader or recovering from a network partition; GC re-derives its
    /// proposal from fresh state on the next round.
    #[snafu(display("Consensus error at {location}: {message}"))]
    Consensus {
        /// Error description.
        message: String,
        /// Source location.
        #[snafu(implicit)]
        location: Location,
    },

    /// Serialization or deserialization error (postcard codec failure).
    ///
    /// **Recovery**: Not retryable. Indicates a codec bug or data corruption.
    /// Report as an issue with the serialized data context.
    #[snafu(display("Serialization error at {location}: {message}"))]
    Serialization {
        /// Error description.
        message: String,
        /// Source location.
        #[snafu(implicit)]
        location: Location,
    },

    /// I/O error (filesystem).
    ///
    /// **Recovery**: May be retryable if caused by transient filesystem
    /// pressure. Check disk space, permissions, and mount health.
    #[snafu(display("I/O error at {location}: {source}"))]
    Io {
        /// Underlying I/O error.
        source: std::io::Error,
        /// Source location.
        #[snafu(implicit)]
        location: Location,
    },

    /// Configuration error (invalid value or constraint violation).
    ///
    /// **Recovery**: Not retryable. Fix the configuration value and restart.
    #[snafu(display("Configuration error: {message}"))]
    Config {
        /// Error description.
        message: String,
    },

    /// Internal error (unexpected state, invariant violation).
    ///
    /// **Recovery**: Not retryable. This indicates a bug. Collect the error
    /// context (location, message) and report as an issue.
    #[snafu(display("Internal error at {location}: {message}"))]
    Internal {
        /// Error description.
        message: String,
        /// Source location.
        #[snafu(implicit)]
        location: Location,
    },
}

impl LineageError {
    /// Returns the machine-readable error code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::DuplicateBranch { .. } => ErrorCode::StoreDuplicateBranch,
            Self::InvalidRegion { .. } => ErrorCode::StoreInvalidRegion,
            Self::CorruptLineage { .. } => ErrorCode::StoreCorruptLineage,
            Self::NoCommonAncestor { .. } => ErrorCode::ResolveNoCommonAncestor,
            Self::MissingEntry { .. } => ErrorCode::ResolveMissingEntry,
            Self::OverlappingReferences { .. } => ErrorCode::ResolveOverlappingReferences,
            Self::WalkDepthExceeded { .. } => ErrorCode::ResolveWalkDepthExceeded,
            Self::Consensus { .. } => ErrorCode::GcConsensus,
            Self::Serialization { .. } => ErrorCode::GcSerialization,
            Self::Io { .. } => ErrorCode::GcIo,
            Self::Config { .. } => ErrorCode::GcConfig,
            Self::Internal { .. } => ErrorCode::GcInternal,
        }
    }

    /// Whether this error is retryable.
    ///
    /// Retryable errors may succeed on a subsequent attempt. Delegates to
    /// [`ErrorCode::is_retryable`] so the classification matches what
    /// operator tooling sees.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.code().is_retryable()
    }

    /// Suggested recovery action for this error.
    ///
    /// Delegates to [`ErrorCode::suggested_action`].
    #[must_use]
    pub const fn suggested_action(&self) -> &'static str {
        self.code().suggested_action()
    }
}
