//! The consensus collaborator boundary.
//!
//! Lineage GC does not implement consensus. It hands [`LineageMutation`]s to
//! a [`ConsensusHandle`] and relies on the collaborator for total order,
//! durability, and exactly-once application on every replicated copy of the
//! authoritative store. [`InProcessConsensus`] is the single-process
//! implementation used by embedding tests and the engine's bring-up path.

use std::sync::Arc;

use parking_lot::RwLock;
use stratadb_lineage_types::{BranchId, Result};

use crate::mutation::{ApplyOutcome, AuthoritativeLineage, LineageMutation};

/// Outcome of a proposal as observed by the proposer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProposalOutcome {
    /// The mutation was ordered and applied at `version`.
    Applied {
        /// Version of the authoritative store after application.
        version: u64,
    },
    /// The proposal lost its consensus round to a concurrent mutation.
    ///
    /// Safe to re-derive and retry from fresh state; GC does exactly that
    /// on its next cycle.
    Superseded,
    /// The mutation was ordered but could not apply.
    ///
    /// Only `AddBranch` rejects, and only on a branch-id collision — a bug
    /// in branch creation, not a transient condition.
    Rejected {
        /// The colliding branch.
        branch_id: BranchId,
    },
}

/// Proposes mutations for total-order application to the authoritative store.
///
/// Implementations wrap whatever replication machinery the deployment runs.
/// The contract is: a proposal that returns [`ProposalOutcome::Applied`] has
/// been durably ordered and applied on every replica of the log, in the same
/// position relative to all other mutations.
pub trait ConsensusHandle: Send + Sync + 'static {
    /// Proposes a mutation.
    ///
    /// # Errors
    ///
    /// Returns [`Consensus`](stratadb_lineage_types::LineageError::Consensus)
    /// when the cluster could not process the proposal at all (leader lost,
    /// quorum unavailable). Retryable with backoff.
    fn propose(
        &self,
        mutation: LineageMutation,
    ) -> impl std::future::Future<Output = Result<ProposalOutcome>> + Send;
}

/// Consensus collapsed to a single process.
///
/// The write lock on the shared state is the log: proposals apply one at a
/// time in lock-acquisition order, which is a valid total order for a single
/// process. Clones share the same state.
#[derive(Debug, Clone)]
pub struct InProcessConsensus {
    state: Arc<RwLock<AuthoritativeLineage>>,
}

impl InProcessConsensus {
    /// Creates a handle applying proposals to `state`.
    pub fn new(state: Arc<RwLock<AuthoritativeLineage>>) -> Self {
        Self { state }
    }

    /// The shared authoritative state this handle applies to.
    pub fn state(&self) -> Arc<RwLock<AuthoritativeLineage>> {
        Arc::clone(&self.state)
    }
}

impl ConsensusHandle for InProcessConsensus {
    async fn propose(&self, mutation: LineageMutation) -> Result<ProposalOutcome> {
        let outcome = self.state.write().apply(&mutation);
        Ok(match outcome {
            ApplyOutcome::Applied { version } => ProposalOutcome::Applied { version },
            ApplyOutcome::Superseded => ProposalOutcome::Superseded,
            ApplyOutcome::Rejected { branch_id } => ProposalOutcome::Rejected { branch_id },
        })
    }
}
