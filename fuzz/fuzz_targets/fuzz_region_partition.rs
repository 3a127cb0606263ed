//! Fuzz target for keyspace partitioning.
//!
//! Builds an arbitrary reference set from fuzz bytes and checks the
//! partition invariants: sub-regions are pairwise disjoint, every listed
//! reference covers its whole sub-region, every unlisted reference is
//! disjoint from it, and no reference vanishes.

#![no_main]

use libfuzzer_sys::fuzz_target;

use stratadb_lineage_history::{BranchRef, partition_refs};
use stratadb_lineage_types::{BranchId, Region};

fuzz_target!(|data: &[u8]| {
    let mut refs = Vec::new();
    for (index, chunk) in data.chunks_exact(3).take(32).enumerate() {
        let region = match chunk[2] % 3 {
            0 => Region::full(),
            1 => match Region::new(vec![chunk[0]], None) {
                Ok(region) => region,
                Err(_) => continue,
            },
            _ => match Region::new(vec![chunk[0]], Some(vec![chunk[1]])) {
                Ok(region) => region,
                Err(_) => continue,
            },
        };
        let mut id = [0u8; 16];
        id[0] = index as u8;
        refs.push(BranchRef::new(region, BranchId::from_bytes(id)));
    }

    let subregions = partition_refs(&refs);

    for (i, subregion) in subregions.iter().enumerate() {
        assert!(!subregion.refs.is_empty(), "empty sub-region emitted");
        for &index in &subregion.refs {
            assert!(
                refs[index].region.contains_region(&subregion.region),
                "listed reference does not cover its sub-region"
            );
        }
        for (index, branch_ref) in refs.iter().enumerate() {
            if !subregion.refs.contains(&index) {
                assert!(
                    !branch_ref.region.overlaps(&subregion.region),
                    "unlisted reference overlaps a sub-region"
                );
            }
        }
        for other in &subregions[i + 1..] {
            assert!(
                !subregion.region.overlaps(&other.region),
                "sub-regions overlap"
            );
        }
    }

    // Every reference covers at least one key, so it must surface somewhere.
    for index in 0..refs.len() {
        assert!(
            subregions.iter().any(|subregion| subregion.refs.contains(&index)),
            "reference lost by partitioning"
        );
    }
});
