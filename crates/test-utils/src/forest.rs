//! Hand-built lineage fixtures.
//!
//! [`ForestBuilder`] names branches with short strings so tests read like
//! the scenarios they encode, instead of juggling raw ids.

// Test fixtures panic on misuse rather than propagate errors
#![allow(clippy::expect_used)]

use std::collections::BTreeMap;

use stratadb_lineage_history::LineageStore;
use stratadb_lineage_types::{BirthCertificate, BranchId, Region, Timestamp};

/// Incrementally builds a [`LineageStore`] with named branches.
///
/// Each registration advances an internal clock, so origin points are
/// distinct and ordered by creation.
///
/// # Example
///
/// ```
/// use stratadb_lineage_test_utils::ForestBuilder;
/// use stratadb_lineage_types::Region;
///
/// let mut forest = ForestBuilder::new();
/// let a = forest.origin("a", Region::full());
/// let b = forest.fork("b", "a", Region::full());
/// let store = forest.build();
/// assert_eq!(store.get(b).unwrap().parent, Some(a));
/// ```
#[derive(Debug, Default)]
pub struct ForestBuilder {
    store: LineageStore,
    names: BTreeMap<String, BranchId>,
    clock: u64,
}

impl ForestBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an origin branch under `name` and returns its id.
    ///
    /// # Panics
    ///
    /// Panics if `name` is already taken.
    pub fn origin(&mut self, name: &str, region: Region) -> BranchId {
        self.register(name, None, region)
    }

    /// Registers a branch forked from `parent` under `name` and returns
    /// its id.
    ///
    /// # Panics
    ///
    /// Panics if `name` is already taken or `parent` is unknown.
    pub fn fork(&mut self, name: &str, parent: &str, region: Region) -> BranchId {
        let parent_id = self.id(parent);
        self.register(name, Some(parent_id), region)
    }

    /// The id registered under `name`.
    ///
    /// # Panics
    ///
    /// Panics if `name` is unknown.
    #[must_use]
    pub fn id(&self, name: &str) -> BranchId {
        *self.names.get(name).expect("fixture name not registered")
    }

    /// A copy of the store built so far.
    #[must_use]
    pub fn build(&self) -> LineageStore {
        self.store.clone()
    }

    fn register(&mut self, name: &str, parent: Option<BranchId>, region: Region) -> BranchId {
        let branch_id = BranchId::random();
        self.clock += 1;
        let certificate = BirthCertificate {
            branch_id,
            region,
            parent,
            origin_point: Timestamp::new(self.clock),
        };
        self.store.insert(certificate).expect("random ids do not collide");
        let previous = self.names.insert(name.to_string(), branch_id);
        assert!(previous.is_none(), "fixture name {name:?} registered twice");
        branch_id
    }
}
