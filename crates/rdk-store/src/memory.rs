//! In-memory store backend.
//!
//! Holds the document as serialized JSON so every load/save round-trips
//! through the real wire shape; a test that passes here has also exercised
//! the serde contract. Process memory is not a system of record: use this
//! for tests and single-process dev runs only.

use async_trait::async_trait;
use chrono::Utc;
use rdk_schemas::{ApplicationState, StateSeed};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{StateStore, StoreError, VersionToken};

struct StoredDocument {
    raw: String,
    version: String,
}

pub struct MemoryStateStore {
    state_key: String,
    seed: StateSeed,
    slot: RwLock<Option<StoredDocument>>,
}

impl MemoryStateStore {
    pub fn new(state_key: impl Into<String>, seed: StateSeed) -> Self {
        Self {
            state_key: state_key.into(),
            seed,
            slot: RwLock::new(None),
        }
    }

    /// `true` while no document has been saved yet.
    pub async fn is_empty(&self) -> bool {
        self.slot.read().await.is_none()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load(&self) -> Result<(ApplicationState, Option<VersionToken>), StoreError> {
        let slot = self.slot.read().await;
        match slot.as_ref() {
            None => Ok((ApplicationState::initial(&self.seed, Utc::now()), None)),
            Some(doc) => {
                let state: ApplicationState = serde_json::from_str(&doc.raw)
                    .map_err(|e| StoreError::Backend(e.into()))?;
                Ok((state, Some(VersionToken::new(doc.version.clone()))))
            }
        }
    }

    async fn save(
        &self,
        state: &ApplicationState,
        token: Option<&VersionToken>,
    ) -> Result<(), StoreError> {
        let raw = serde_json::to_string(state).map_err(|e| StoreError::Backend(e.into()))?;
        let mut slot = self.slot.write().await;

        let matches = match (slot.as_ref(), token) {
            (None, None) => true,
            (Some(doc), Some(tok)) => doc.version == tok.as_str(),
            _ => false,
        };
        if !matches {
            return Err(StoreError::Conflict {
                state_key: self.state_key.clone(),
            });
        }

        *slot = Some(StoredDocument {
            raw,
            version: Uuid::new_v4().to_string(),
        });
        Ok(())
    }
}
