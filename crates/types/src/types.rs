//! Core identifier types for the lineage layer.
//!
//! Branch lineage metadata is keyed by a small set of identifiers:
//! - `BranchId` for branches of a shard's write history
//! - `ReplicaId` / `ShardId` for the processes and shard groups that
//!   report and own branches
//! - `Timestamp` for logical positions in a branch's history

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Identifier Types
// ============================================================================

/// Generates a newtype wrapper around a numeric type for type-safe identifiers.
///
/// Each generated type provides:
/// - Standard derives: Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord
/// - Serde with `#[serde(transparent)]` for wire format compatibility
/// - `From<inner>` and `Into<inner>` conversions
/// - `Display` with a semantic prefix (e.g., `replica:3`)
/// - `new()` constructor and `value()` accessor
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident, $inner:ty, $prefix:expr
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
            Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name($inner);

        impl $name {
            /// Creates a new identifier from a raw value.
            #[inline]
            pub const fn new(value: $inner) -> Self {
                Self(value)
            }

            /// Returns the raw numeric value.
            #[inline]
            pub const fn value(self) -> $inner {
                self.0
            }
        }

        impl From<$inner> for $name {
            #[inline]
            fn from(value: $inner) -> Self {
                Self(value)
            }
        }

        impl From<$name> for $inner {
            #[inline]
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}:{}", $prefix, self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = <$inner as std::str::FromStr>::Err;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                s.parse::<$inner>().map(Self)
            }
        }
    };
}

define_id!(
    /// Unique identifier for a replica process holding shard data.
    ///
    /// Wraps a `u64` with compile-time type safety to prevent mixing with
    /// other identifier types.
    ///
    /// # Display
    ///
    /// Formats with `replica:` prefix: `replica:3`.
    ReplicaId, u64, "replica"
);

define_id!(
    /// Unique identifier for a shard group.
    ///
    /// Wraps a `u32` with compile-time type safety to prevent mixing with
    /// other identifier types.
    ///
    /// # Display
    ///
    /// Formats with `shard:` prefix: `shard:7`.
    ShardId, u32, "shard"
);

define_id!(
    /// Logical position in a branch's write history.
    ///
    /// Positions are totally ordered within one branch; a child branch's
    /// origin point names where it split off its parent's history.
    ///
    /// # Display
    ///
    /// Formats with `ts:` prefix: `ts:1024`.
    Timestamp, u64, "ts"
);

impl Timestamp {
    /// The earliest logical position.
    pub const ZERO: Timestamp = Timestamp::new(0);

    /// Returns the position immediately after this one.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Timestamp {
        Timestamp::new(self.0 + 1)
    }
}

// ============================================================================
// Keyspace
// ============================================================================

/// Raw key bytes used as region bounds.
///
/// Keys compare lexicographically; the empty key sorts before every other key.
pub type KeyBytes = Vec<u8>;

// ============================================================================
// Branch Identity
// ============================================================================

/// Globally unique identifier for a branch of a shard's write history.
///
/// A fresh id is generated once when a branch is created at failover and is
/// never reused, even after the branch is garbage collected. Equality on ids
/// is therefore equality of branches.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BranchId([u8; 16]);

impl BranchId {
    /// Generates a fresh random identifier.
    pub fn random() -> Self {
        Self(*uuid::Uuid::new_v4().as_bytes())
    }

    /// Creates an identifier from raw bytes.
    #[inline]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Returns the raw bytes.
    #[inline]
    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Display for BranchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", uuid::Uuid::from_bytes(self.0))
    }
}

impl fmt::Debug for BranchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BranchId({})", uuid::Uuid::from_bytes(self.0))
    }
}

impl From<uuid::Uuid> for BranchId {
    fn from(id: uuid::Uuid) -> Self {
        Self(*id.as_bytes())
    }
}

impl From<BranchId> for uuid::Uuid {
    fn from(id: BranchId) -> Self {
        uuid::Uuid::from_bytes(id.0)
    }
}

impl std::str::FromStr for BranchId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        s.parse::<uuid::Uuid>().map(Self::from)
    }
}
