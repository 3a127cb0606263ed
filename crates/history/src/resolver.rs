//! Common-ancestor resolution over region-tagged references.
//!
//! For each sub-region of constant coverage, the resolver walks every
//! referenced branch's parent chain in lock step, one certificate per
//! round per chain, until some branch has been visited by every chain.
//! Walking in lock step keeps the answer the *nearest* common ancestor:
//! a branch shared by all chains completes at the round equal to its
//! greatest depth below any reference, and at most one branch can newly
//! complete per round.
//!
//! A chain that ends early — at its origin, at a missing certificate, or
//! by looping — stops contributing new branches but keeps its visited set
//! in play, so the remaining chains can still meet it. Only when every
//! chain has ended without a shared branch is the sub-region declared
//! unresolved, and then with the most specific cause available.

use std::collections::BTreeSet;

use stratadb_lineage_types::{
    BranchId, Region, Result,
    error::{CorruptLineageSnafu, MissingEntrySnafu, NoCommonAncestorSnafu, WalkDepthExceededSnafu},
};
use tracing::{debug, warn};

use crate::{
    partition::partition_refs,
    refs::BranchRef,
    store::{AncestorWalk, LineageStore, WalkTermination},
};

/// Why a sub-region could not be resolved.
///
/// When several chains fail the same way, the reported witness follows the
/// first affected reference in input order; the cause kind itself does not
/// depend on reference order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Divergence {
    /// A parent chain revisited one of its own branches.
    CycleDetected {
        /// First branch seen twice.
        branch_id: BranchId,
    },
    /// A parent chain referenced a branch absent from the store.
    MissingEntry {
        /// The absent branch.
        branch_id: BranchId,
    },
    /// Every chain ended cleanly at an origin, but no branch is shared.
    DisjointLineage,
    /// The round budget ran out with chains still walking.
    DepthExceeded {
        /// The configured bound.
        max_depth: usize,
    },
}

/// Result of resolving one sub-region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubregionOutcome {
    /// Every reference's chain met at a common branch.
    Resolved {
        /// Nearest branch visited by every chain.
        ancestor: BranchId,
        /// Union of the chain prefixes from each reference down to and
        /// including the ancestor. Everything a consumer of this
        /// sub-region still needs.
        retained: BTreeSet<BranchId>,
    },
    /// No common branch could be proved; pruning must not touch the
    /// sub-region this round.
    Unresolved {
        /// The most specific failure observed.
        cause: Divergence,
    },
}

/// One sub-region's resolution, tagged with the interval it covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubregionResolution {
    /// The interval this entry speaks for.
    pub region: Region,
    /// What resolution concluded there.
    pub outcome: SubregionOutcome,
}

impl SubregionResolution {
    /// The resolved ancestor, or the failure as an error.
    ///
    /// # Errors
    ///
    /// - [`CorruptLineage`](stratadb_lineage_types::LineageError::CorruptLineage)
    ///   for a cycle
    /// - [`MissingEntry`](stratadb_lineage_types::LineageError::MissingEntry)
    ///   for an absent certificate
    /// - [`NoCommonAncestor`](stratadb_lineage_types::LineageError::NoCommonAncestor)
    ///   for disjoint lineages
    /// - [`WalkDepthExceeded`](stratadb_lineage_types::LineageError::WalkDepthExceeded)
    ///   for an exhausted round budget
    pub fn ancestor(&self) -> Result<BranchId> {
        match &self.outcome {
            SubregionOutcome::Resolved { ancestor, .. } => Ok(*ancestor),
            SubregionOutcome::Unresolved { cause } => match *cause {
                Divergence::CycleDetected { branch_id } => {
                    CorruptLineageSnafu { branch_id }.fail()
                }
                Divergence::MissingEntry { branch_id } => MissingEntrySnafu { branch_id }.fail(),
                Divergence::DisjointLineage => {
                    NoCommonAncestorSnafu { region: self.region.clone() }.fail()
                }
                Divergence::DepthExceeded { max_depth } => {
                    WalkDepthExceededSnafu { region: self.region.clone(), max_depth }.fail()
                }
            },
        }
    }

    /// Returns true if a common ancestor was found.
    pub fn is_resolved(&self) -> bool {
        matches!(self.outcome, SubregionOutcome::Resolved { .. })
    }
}

/// Full resolution over a reference set, one entry per sub-region.
///
/// Entries are disjoint and sorted by start key, mirroring
/// [`partition_refs`]. The result is a pure function of the store and the
/// reference set; reference order only influences which witness an
/// unresolved cause names.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Resolution {
    /// Per-sub-region outcomes.
    pub subregions: Vec<SubregionResolution>,
}

impl Resolution {
    /// Returns true if every sub-region resolved.
    ///
    /// Vacuously true for an empty reference set.
    pub fn is_fully_resolved(&self) -> bool {
        self.subregions.iter().all(SubregionResolution::is_resolved)
    }

    /// Union of the retained sets of all resolved sub-regions.
    ///
    /// Unresolved sub-regions contribute nothing here; callers retain
    /// everything overlapping them instead.
    pub fn retained_union(&self) -> BTreeSet<BranchId> {
        let mut union = BTreeSet::new();
        for entry in &self.subregions {
            if let SubregionOutcome::Resolved { retained, .. } = &entry.outcome {
                union.extend(retained.iter().copied());
            }
        }
        union
    }

    /// The sub-regions that did not resolve.
    pub fn unresolved(&self) -> impl Iterator<Item = &SubregionResolution> {
        self.subregions.iter().filter(|entry| !entry.is_resolved())
    }

    /// Every branch reported absent by some chain.
    ///
    /// A non-empty result is a correctness alarm: a referenced branch has
    /// no certificate, which past over-pruning or an incomplete absorb
    /// would cause.
    pub fn missing_entries(&self) -> BTreeSet<BranchId> {
        self.subregions
            .iter()
            .filter_map(|entry| match entry.outcome {
                SubregionOutcome::Unresolved {
                    cause: Divergence::MissingEntry { branch_id },
                } => Some(branch_id),
                _ => None,
            })
            .collect()
    }
}

/// Resolves a common ancestor and retained path set per sub-region.
///
/// The references may overlap freely; they are first partitioned into
/// sub-regions of constant coverage, and each sub-region is resolved
/// independently against the distinct branches referenced there.
/// `max_walk_depth` bounds the lock-step rounds per sub-region.
pub fn resolve(store: &LineageStore, refs: &[BranchRef], max_walk_depth: usize) -> Resolution {
    let mut subregions = Vec::new();
    for subregion in partition_refs(refs) {
        // Several references often assert the same branch for one
        // sub-region; walk each distinct branch once, in first-appearance
        // order.
        let mut starts: Vec<BranchId> = Vec::new();
        for &index in &subregion.refs {
            let branch = refs[index].branch;
            if !starts.contains(&branch) {
                starts.push(branch);
            }
        }

        let outcome = resolve_subregion(store, &starts, max_walk_depth);
        match &outcome {
            SubregionOutcome::Resolved { ancestor, retained } => {
                debug!(
                    region = %subregion.region,
                    ancestor = %ancestor,
                    retained = retained.len(),
                    "Resolved common ancestor"
                );
            }
            SubregionOutcome::Unresolved { cause: Divergence::CycleDetected { branch_id } } => {
                warn!(
                    region = %subregion.region,
                    branch = %branch_id,
                    "Lineage cycle detected; sub-region left unresolved"
                );
            }
            SubregionOutcome::Unresolved { cause } => {
                debug!(region = %subregion.region, ?cause, "Sub-region unresolved");
            }
        }
        subregions.push(SubregionResolution { region: subregion.region, outcome });
    }
    Resolution { subregions }
}

struct WalkState<'a> {
    walk: AncestorWalk<'a>,
    order: Vec<BranchId>,
    visited: BTreeSet<BranchId>,
    done: bool,
}

fn resolve_subregion(
    store: &LineageStore,
    starts: &[BranchId],
    max_walk_depth: usize,
) -> SubregionOutcome {
    let mut walks: Vec<WalkState<'_>> = starts
        .iter()
        .map(|&start| WalkState {
            walk: store.walk_ancestors(start),
            order: Vec::new(),
            visited: BTreeSet::new(),
            done: false,
        })
        .collect();

    for _ in 0..max_walk_depth {
        for state in &mut walks {
            if state.done {
                continue;
            }
            match state.walk.next() {
                Some(certificate) => {
                    let branch_id = certificate.branch_id;
                    state.order.push(branch_id);
                    state.visited.insert(branch_id);
                    if state.walk.termination().is_some() {
                        state.done = true;
                    }
                }
                None => state.done = true,
            }
        }

        if let Some(ancestor) = shared_ancestor(&walks) {
            let mut retained = BTreeSet::new();
            for state in &walks {
                if let Some(position) = state.order.iter().position(|&id| id == ancestor) {
                    retained.extend(state.order[..=position].iter().copied());
                }
            }
            return SubregionOutcome::Resolved { ancestor, retained };
        }

        if walks.iter().all(|state| state.done) {
            return SubregionOutcome::Unresolved { cause: divergence_cause(&walks) };
        }
    }

    SubregionOutcome::Unresolved {
        cause: Divergence::DepthExceeded { max_depth: max_walk_depth },
    }
}

/// First branch in the lead chain's visit order that every chain has seen.
///
/// Lock-step stepping guarantees at most one branch newly completes per
/// round, so at the first round with any hit the hit is unique and is the
/// nearest common ancestor.
fn shared_ancestor(walks: &[WalkState<'_>]) -> Option<BranchId> {
    let (first, rest) = walks.split_first()?;
    first.order.iter().copied().find(|id| rest.iter().all(|state| state.visited.contains(id)))
}

/// Most specific failure across the ended chains: a cycle outranks a
/// missing certificate, which outranks clean-but-disjoint origins.
fn divergence_cause(walks: &[WalkState<'_>]) -> Divergence {
    for state in walks {
        if let Some(WalkTermination::CycleDetected { branch_id }) = state.walk.termination() {
            return Divergence::CycleDetected { branch_id };
        }
    }
    for state in walks {
        if let Some(WalkTermination::MissingEntry { branch_id }) = state.walk.termination() {
            return Divergence::MissingEntry { branch_id };
        }
    }
    Divergence::DisjointLineage
}
