//! Flow persistence contract.
//!
//! The engine only needs point reads, an insert, a single-record
//! compare-and-swap, and sweep enumeration; no transactional scope beyond
//! the CAS. `MemoryFlowStore` is the dashmap-backed implementation used by
//! tests and single-process deployments; the SQLite implementation lives
//! in `db::sqlite`.

use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;

use crate::models::{OwnerKey, TransactionFlow};

#[derive(Debug, Error)]
pub enum StoreError {
    /// The stored version no longer matches the caller's expectation
    #[error("version conflict")]
    Conflict,
    /// Insert collided with an existing flow id or an active owner slot
    #[error("duplicate flow")]
    Duplicate,
    #[error("flow not found")]
    NotFound,
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait FlowStore: Send + Sync {
    /// The active (non-terminal) flow for an owner key, if any
    async fn get_active(&self, owner: &OwnerKey) -> Result<Option<TransactionFlow>, StoreError>;

    async fn get(&self, flow_id: &str) -> Result<Option<TransactionFlow>, StoreError>;

    /// Persist a new flow. Fails with `Duplicate` when the flow id or the
    /// owner's active slot is already taken.
    async fn insert(&self, flow: &TransactionFlow) -> Result<(), StoreError>;

    /// Replace the stored flow iff its version still equals
    /// `expected_version`. The caller supplies the replacement with its
    /// version already advanced.
    async fn compare_and_swap(
        &self,
        flow_id: &str,
        expected_version: u64,
        flow: &TransactionFlow,
    ) -> Result<(), StoreError>;

    /// Every non-terminal flow; the expiry sweep's enumeration
    async fn list_unfinished(&self) -> Result<Vec<TransactionFlow>, StoreError>;
}

/// In-memory store: flows by id plus a secondary owner-key index over the
/// active flow. Safe for concurrent use; the CAS is the only write path
/// after insert.
#[derive(Default)]
pub struct MemoryFlowStore {
    flows: DashMap<String, TransactionFlow>,
    active: DashMap<String, String>,
}

impl MemoryFlowStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FlowStore for MemoryFlowStore {
    async fn get_active(&self, owner: &OwnerKey) -> Result<Option<TransactionFlow>, StoreError> {
        let Some(flow_id) = self.active.get(&owner.storage_key()).map(|e| e.value().clone())
        else {
            return Ok(None);
        };
        Ok(self.flows.get(&flow_id).map(|e| e.value().clone()))
    }

    async fn get(&self, flow_id: &str) -> Result<Option<TransactionFlow>, StoreError> {
        Ok(self.flows.get(flow_id).map(|e| e.value().clone()))
    }

    async fn insert(&self, flow: &TransactionFlow) -> Result<(), StoreError> {
        if self.flows.contains_key(&flow.flow_id) {
            return Err(StoreError::Duplicate);
        }
        match self.active.entry(flow.owner_key().storage_key()) {
            dashmap::mapref::entry::Entry::Occupied(_) => return Err(StoreError::Duplicate),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(flow.flow_id.clone());
            }
        }
        self.flows.insert(flow.flow_id.clone(), flow.clone());
        Ok(())
    }

    async fn compare_and_swap(
        &self,
        flow_id: &str,
        expected_version: u64,
        flow: &TransactionFlow,
    ) -> Result<(), StoreError> {
        {
            let Some(mut entry) = self.flows.get_mut(flow_id) else {
                return Err(StoreError::NotFound);
            };
            if entry.version != expected_version {
                return Err(StoreError::Conflict);
            }
            *entry = flow.clone();
        }

        // Keep the owner index in sync: terminal flows free the slot
        let owner = flow.owner_key().storage_key();
        if flow.is_terminal() {
            self.active
                .remove_if(&owner, |_, active_id| active_id.as_str() == flow_id);
        } else {
            self.active.insert(owner, flow_id.to_string());
        }
        Ok(())
    }

    async fn list_unfinished(&self) -> Result<Vec<TransactionFlow>, StoreError> {
        Ok(self
            .flows
            .iter()
            .filter(|e| !e.value().is_terminal())
            .map(|e| e.value().clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FlowStatus, Intent, StepKind, TransactionStep};
    use chrono::Duration;

    fn flow_for(wallet: &str, chain_id: u64) -> TransactionFlow {
        let owner = OwnerKey::new(wallet, chain_id);
        let steps = vec![TransactionStep::new(
            0,
            StepKind::SendToken,
            "0x0000000000000000000000000000000000000002",
            "0x",
            "0",
            chain_id,
        )];
        TransactionFlow::new(&owner, Intent::unknown("t"), steps, Duration::minutes(30))
    }

    #[tokio::test]
    async fn insert_and_read_back() {
        let store = MemoryFlowStore::new();
        let flow = flow_for("0xaaa0000000000000000000000000000000000001", 1);
        store.insert(&flow).await.unwrap();

        let by_id = store.get(&flow.flow_id).await.unwrap().unwrap();
        assert_eq!(by_id, flow);

        let active = store.get_active(&flow.owner_key()).await.unwrap().unwrap();
        assert_eq!(active.flow_id, flow.flow_id);
    }

    #[tokio::test]
    async fn insert_rejects_second_active_flow_for_owner() {
        let store = MemoryFlowStore::new();
        let first = flow_for("0xaaa0000000000000000000000000000000000001", 1);
        let second = flow_for("0xAAA0000000000000000000000000000000000001", 1);
        store.insert(&first).await.unwrap();
        assert!(matches!(
            store.insert(&second).await,
            Err(StoreError::Duplicate)
        ));
    }

    #[tokio::test]
    async fn cas_with_stale_version_conflicts() {
        let store = MemoryFlowStore::new();
        let flow = flow_for("0xaaa0000000000000000000000000000000000001", 1);
        store.insert(&flow).await.unwrap();

        let mut updated = flow.clone();
        updated.version = 2;
        store
            .compare_and_swap(&flow.flow_id, 1, &updated)
            .await
            .unwrap();

        // A second writer still holding version 1 loses the race
        let mut racing = flow.clone();
        racing.version = 2;
        assert!(matches!(
            store.compare_and_swap(&flow.flow_id, 1, &racing).await,
            Err(StoreError::Conflict)
        ));
    }

    #[tokio::test]
    async fn terminal_cas_frees_the_owner_slot() {
        let store = MemoryFlowStore::new();
        let flow = flow_for("0xaaa0000000000000000000000000000000000001", 1);
        store.insert(&flow).await.unwrap();

        let mut done = flow.clone();
        done.status = FlowStatus::Cancelled;
        done.version = 2;
        store
            .compare_and_swap(&flow.flow_id, 1, &done)
            .await
            .unwrap();

        assert!(store.get_active(&flow.owner_key()).await.unwrap().is_none());

        // Owner can start a fresh flow now
        let next = flow_for("0xaaa0000000000000000000000000000000000001", 1);
        store.insert(&next).await.unwrap();
    }

    #[tokio::test]
    async fn list_unfinished_excludes_terminal_flows() {
        let store = MemoryFlowStore::new();
        let open = flow_for("0xaaa0000000000000000000000000000000000001", 1);
        let closed = flow_for("0xbbb0000000000000000000000000000000000002", 1);
        store.insert(&open).await.unwrap();
        store.insert(&closed).await.unwrap();

        let mut done = closed.clone();
        done.status = FlowStatus::Completed;
        done.version = 2;
        store
            .compare_and_swap(&closed.flow_id, 1, &done)
            .await
            .unwrap();

        let unfinished = store.list_unfinished().await.unwrap();
        assert_eq!(unfinished.len(), 1);
        assert_eq!(unfinished[0].flow_id, open.flow_id);
    }
}
