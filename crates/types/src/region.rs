//! Half-open keyspace intervals.
//!
//! A [`Region`] is the unit of write authority: branches, contracts and
//! replica reports all speak about `[start, end)` intervals of the binary
//! keyspace. Regions are only ever split into disjoint sub-regions, never
//! merged, so interval arithmetic here is limited to containment, overlap
//! and intersection.

use std::{cmp::Ordering, fmt};

use serde::{Deserialize, Serialize};
use snafu::ensure;

use crate::{
    error::{InvalidRegionSnafu, Result},
    types::KeyBytes,
};

/// A half-open interval `[start, end)` over the binary keyspace.
///
/// `end = None` means the interval is unbounded above. The empty `start` key
/// together with `end = None` covers the whole keyspace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    /// Inclusive lower bound.
    pub start: KeyBytes,
    /// Exclusive upper bound; `None` is unbounded.
    pub end: Option<KeyBytes>,
}

impl Region {
    /// The region covering the entire keyspace.
    pub fn full() -> Self {
        Self { start: Vec::new(), end: None }
    }

    /// Creates a region after checking that it is non-empty.
    ///
    /// # Errors
    ///
    /// Returns [`LineageError::InvalidRegion`](crate::LineageError::InvalidRegion)
    /// if `end` is present and not strictly greater than `start`.
    pub fn new(start: KeyBytes, end: Option<KeyBytes>) -> Result<Self> {
        if let Some(end_key) = &end {
            ensure!(
                start < *end_key,
                InvalidRegionSnafu {
                    message: format!(
                        "start {} must be below end {}",
                        fmt_bound(&start),
                        fmt_bound(end_key)
                    ),
                }
            );
        }
        Ok(Self { start, end })
    }

    /// Whether the region has no upper bound.
    #[inline]
    pub fn is_unbounded(&self) -> bool {
        self.end.is_none()
    }

    /// Whether `key` falls inside the region.
    pub fn contains_key(&self, key: &[u8]) -> bool {
        key >= self.start.as_slice() && self.end.as_ref().is_none_or(|end| key < end.as_slice())
    }

    /// Whether `other` lies entirely inside this region.
    pub fn contains_region(&self, other: &Region) -> bool {
        if other.start < self.start {
            return false;
        }
        match (&self.end, &other.end) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(own), Some(theirs)) => theirs <= own,
        }
    }

    /// Whether this region and `other` share at least one key.
    ///
    /// Adjacent regions (`[a, b)` and `[b, c)`) do not overlap.
    pub fn overlaps(&self, other: &Region) -> bool {
        let lower = (&self.start).max(&other.start);
        match (&self.end, &other.end) {
            (None, None) => true,
            (Some(end), None) | (None, Some(end)) => lower < end,
            (Some(a), Some(b)) => lower < a.min(b),
        }
    }

    /// The shared part of this region and `other`, if any.
    pub fn intersect(&self, other: &Region) -> Option<Region> {
        let start = self.start.clone().max(other.start.clone());
        let end = match (&self.end, &other.end) {
            (None, None) => None,
            (Some(end), None) | (None, Some(end)) => Some(end.clone()),
            (Some(a), Some(b)) => Some(a.min(b).clone()),
        };
        match &end {
            Some(end_key) if *end_key <= start => None,
            _ => Some(Region { start, end }),
        }
    }
}

/// Renders a bound for display: printable ASCII verbatim, hex otherwise.
fn fmt_bound(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        return "\"\"".to_string();
    }
    if bytes.iter().all(|b| (0x20..0x7f).contains(b)) {
        format!("\"{}\"", String::from_utf8_lossy(bytes))
    } else {
        let mut out = String::with_capacity(2 + bytes.len() * 2);
        out.push_str("0x");
        for b in bytes {
            out.push_str(&format!("{b:02x}"));
        }
        out
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.end {
            Some(end) => write!(f, "[{}, {})", fmt_bound(&self.start), fmt_bound(end)),
            None => write!(f, "[{}, +inf)", fmt_bound(&self.start)),
        }
    }
}

// Ordered by start key, then by end with bounded ends before unbounded. The
// derived Option ordering would sort None first, which inverts the +inf
// meaning, so this is spelled out.
impl Ord for Region {
    fn cmp(&self, other: &Self) -> Ordering {
        self.start.cmp(&other.start).then_with(|| match (&self.end, &other.end) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(a), Some(b)) => a.cmp(b),
        })
    }
}

impl PartialOrd for Region {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
