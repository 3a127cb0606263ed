//! Keyspace partitioning by reference coverage.
//!
//! Resolution never runs on whole references: replicas split and merge, so
//! the regions different sources speak for rarely line up. The sweep here
//! cuts the keyspace at every reference boundary, producing sub-regions on
//! which coverage is constant. Each sub-region is then resolved on its own.

use std::collections::BTreeSet;

use stratadb_lineage_types::{KeyBytes, Region};

use crate::refs::BranchRef;

/// A maximal run of keys covered by one fixed set of references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subregion {
    /// The covered interval.
    pub region: Region,
    /// Indices into the reference slice handed to [`partition_refs`],
    /// ascending. Every listed reference's region contains the whole
    /// interval; every other reference's region is disjoint from it.
    pub refs: Vec<usize>,
}

/// Splits the keyspace into maximal sub-regions of constant coverage.
///
/// Output sub-regions are disjoint, sorted by start key, and cover exactly
/// the union of the input regions: stretches no reference covers produce
/// no sub-region. Each input region either contains a given sub-region
/// entirely or misses it entirely.
pub fn partition_refs(refs: &[BranchRef]) -> Vec<Subregion> {
    if refs.is_empty() {
        return Vec::new();
    }

    // Cut at every start and every bounded end. No reference begins or
    // ends strictly inside a fragment, so coverage is constant on each.
    let mut points: BTreeSet<&KeyBytes> = BTreeSet::new();
    for branch_ref in refs {
        points.insert(&branch_ref.region.start);
        if let Some(end) = &branch_ref.region.end {
            points.insert(end);
        }
    }
    let points: Vec<&KeyBytes> = points.into_iter().collect();

    let mut fragments = Vec::new();
    for (i, &start) in points.iter().enumerate() {
        let end = points.get(i + 1).copied();
        let covering: Vec<usize> = refs
            .iter()
            .enumerate()
            .filter(|(_, branch_ref)| branch_ref.region.contains_key(start))
            .map(|(index, _)| index)
            .collect();
        if covering.is_empty() {
            continue;
        }
        fragments.push(Subregion {
            region: Region { start: start.clone(), end: end.cloned() },
            refs: covering,
        });
    }

    merge_adjacent(fragments)
}

/// Collapses contiguous fragments with identical coverage into one
/// maximal sub-region.
fn merge_adjacent(fragments: Vec<Subregion>) -> Vec<Subregion> {
    let mut merged: Vec<Subregion> = Vec::with_capacity(fragments.len());
    for fragment in fragments {
        if let Some(prev) = merged.last_mut() {
            if prev.refs == fragment.refs && prev.region.end.as_ref() == Some(&fragment.region.start)
            {
                prev.region.end = fragment.region.end;
                continue;
            }
        }
        merged.push(fragment);
    }
    merged
}
