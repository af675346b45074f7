//! rdk-engine
//!
//! Reconciliation orchestrator.
//!
//! [`BalanceEngine`] is the only component that knows both the state store
//! and the water-balance/weather computation. Every operation is one strict
//! load → compute → save unit: either the whole cycle's result is persisted
//! or nothing is. Cycles are externally triggered and unsynchronized; the
//! store's conditional write is the sole concurrency guard, and the loser of
//! a race gets [`CycleError::Conflict`] with its work dropped; the next
//! natural trigger re-runs the full cycle from fresh state. No retry loop
//! lives here: retrying just the save would apply decisions computed from
//! stale input.

mod engine;

pub use engine::{BalanceEngine, DrainDecision};

use rdk_store::StoreError;

// ---------------------------------------------------------------------------
// CycleError
// ---------------------------------------------------------------------------

/// Failure modes of one reconciliation cycle.
#[derive(Debug)]
pub enum CycleError {
    /// Save rejected on a stale version token: another cycle committed first.
    /// Nothing was written; the cycle is simply "not applied".
    Conflict { state_key: String },

    /// Zero weather sources produced a reading. The weather cycle is a full
    /// no-op; averaging an empty set would be NaN, so it is refused instead.
    AllSourcesUnavailable,

    /// Store backend failure other than a conflict (never holds
    /// [`StoreError::Conflict`]; that maps to [`CycleError::Conflict`]).
    Store(StoreError),
}

impl CycleError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, CycleError::Conflict { .. })
    }
}

impl std::fmt::Display for CycleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CycleError::Conflict { state_key } => write!(
                f,
                "cycle not applied: concurrent write to state document '{state_key}' won the race"
            ),
            CycleError::AllSourcesUnavailable => {
                write!(f, "all weather sources unavailable; rainfall update skipped")
            }
            CycleError::Store(e) => write!(f, "cycle aborted by state store: {e}"),
        }
    }
}

impl std::error::Error for CycleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CycleError::Store(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreError> for CycleError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict { state_key } => CycleError::Conflict { state_key },
            other => CycleError::Store(other),
        }
    }
}
