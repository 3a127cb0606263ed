//! Garbage collection for the StrataDB lineage layer.
//!
//! Two collectors share the resolution machinery from
//! `stratadb-lineage-history`:
//! - [`GcCoordinator`] proposes atomic prunes of the authoritative store
//!   through consensus, folding contract assertions with replica reports.
//! - [`LocalGc`] trims one replica's private store against its own
//!   references, never dropping what the authoritative copy still retains.
//!
//! Both fail closed: any sub-region whose common ancestor cannot be proven,
//! and any expected replica that has never reported, defers pruning for the
//! branches it covers.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod consensus;
pub mod contracts;
pub mod coordinator;
pub mod local;
pub mod metrics;
pub mod mutation;
pub mod persistence;
pub mod reports;

// Re-export the working set at crate root
pub use consensus::{ConsensusHandle, InProcessConsensus, ProposalOutcome};
pub use contracts::{ContractBranchSet, ContractSource, InProcessContractSource};
pub use coordinator::{CycleOutcome, GcCoordinator};
pub use local::{LocalCycleOutcome, LocalGc};
pub use mutation::{ApplyOutcome, AuthoritativeLineage, LineageMutation};
pub use persistence::{FileLineagePersistence, LineagePersistence};
pub use reports::{ReplicaReportSet, ReportDisposition, ReportRegistry, ReportView};
