//! rdk-store
//!
//! Versioned state store.
//!
//! Architectural decisions:
//! - One `ApplicationState` document per state key (deployment environment)
//! - Every load of an existing document returns an opaque [`VersionToken`];
//!   every save of an existing document must present it
//! - An absent token means "no prior document, create unconditionally";
//!   it succeeds only while no document exists
//! - A mismatched token fails with [`StoreError::Conflict`] and leaves the
//!   stored document untouched
//! - No retry loop lives here; a conflict is the caller's cycle to drop
//!
//! Backends: [`MemoryStateStore`] (tests, single-process dev runs) and
//! [`PgStateStore`] (durable, multi-instance safe).

mod memory;
mod postgres;

pub use memory::MemoryStateStore;
pub use postgres::{connect_from_env, migrate, status, DbStatus, PgStateStore, ENV_DB_URL};

use async_trait::async_trait;
use rdk_schemas::ApplicationState;

// ---------------------------------------------------------------------------
// VersionToken
// ---------------------------------------------------------------------------

/// Opaque optimistic-concurrency marker tied to one persisted document
/// revision. Callers hold it and hand it back; they never interpret it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionToken(String);

impl VersionToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VersionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// StoreError
// ---------------------------------------------------------------------------

/// Failure modes of the store boundary.
#[derive(Debug)]
pub enum StoreError {
    /// Conditional write rejected: the presented token no longer matches the
    /// stored version, or an absent token met an already-existing document.
    /// The stored document was not modified.
    Conflict { state_key: String },

    /// Anything else from the backend (connectivity, decode, constraint).
    Backend(anyhow::Error),
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Conflict { state_key } => write!(
                f,
                "concurrency conflict on state document '{state_key}': version token is stale"
            ),
            StoreError::Backend(e) => write!(f, "state store backend error: {e}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Backend(e) => Some(e.as_ref()),
            StoreError::Conflict { .. } => None,
        }
    }
}

impl From<anyhow::Error> for StoreError {
    fn from(e: anyhow::Error) -> Self {
        StoreError::Backend(e)
    }
}

// ---------------------------------------------------------------------------
// StateStore
// ---------------------------------------------------------------------------

/// Persistence boundary for the application state document.
///
/// `load` never fails on an absent document: it returns a freshly
/// initialized state (built from the configured seed) together with `None`,
/// signaling "not yet persisted". The subsequent `save(…, None)` performs
/// the create.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn load(&self) -> Result<(ApplicationState, Option<VersionToken>), StoreError>;

    /// Conditional write. See the crate docs for the token contract.
    async fn save(
        &self,
        state: &ApplicationState,
        token: Option<&VersionToken>,
    ) -> Result<(), StoreError>;
}
