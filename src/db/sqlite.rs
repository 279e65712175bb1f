//! SQLite-backed flow store.
//!
//! One row per flow with the full flow serialized into `body`; status,
//! owner key, and version are denormalized into columns for the owner
//! index and the CAS predicate. The partial unique index over active
//! statuses enforces the one-active-flow-per-owner invariant at the
//! storage layer too, so the guarantee holds across process instances.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use rusqlite::{Connection, Result as SqliteResult};

use crate::flow::store::{FlowStore, StoreError};
use crate::models::{OwnerKey, TransactionFlow};

const ACTIVE_STATUSES: &str = "('created', 'awaiting_signature')";

pub struct SqliteFlowStore {
    conn: Mutex<Connection>,
}

impl SqliteFlowStore {
    pub fn new(database_url: &str) -> SqliteResult<Self> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = Path::new(database_url).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).ok();
            }
        }

        let conn = Connection::open(database_url)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init()?;
        Ok(store)
    }

    fn init(&self) -> SqliteResult<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "CREATE TABLE IF NOT EXISTS flows (
                flow_id TEXT PRIMARY KEY,
                owner_key TEXT NOT NULL,
                status TEXT NOT NULL,
                version INTEGER NOT NULL,
                body TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                expires_at TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_flows_owner ON flows(owner_key)",
            [],
        )?;

        // One active flow per owner, enforced in storage
        conn.execute(
            &format!(
                "CREATE UNIQUE INDEX IF NOT EXISTS idx_flows_owner_active
                 ON flows(owner_key) WHERE status IN {}",
                ACTIVE_STATUSES
            ),
            [],
        )?;

        Ok(())
    }

    fn decode(body: &str) -> Result<TransactionFlow, StoreError> {
        serde_json::from_str(body)
            .map_err(|e| StoreError::Unavailable(format!("corrupt flow record: {}", e)))
    }

    fn encode(flow: &TransactionFlow) -> Result<String, StoreError> {
        serde_json::to_string(flow)
            .map_err(|e| StoreError::Unavailable(format!("failed to serialize flow: {}", e)))
    }
}

fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(f, _)
            if f.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

#[async_trait]
impl FlowStore for SqliteFlowStore {
    async fn get_active(&self, owner: &OwnerKey) -> Result<Option<TransactionFlow>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT body FROM flows WHERE owner_key = ?1 AND status IN {}",
                ACTIVE_STATUSES
            ))
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let body: Option<String> = stmt
            .query_row([owner.storage_key()], |row| row.get(0))
            .ok();

        body.as_deref().map(Self::decode).transpose()
    }

    async fn get(&self, flow_id: &str) -> Result<Option<TransactionFlow>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT body FROM flows WHERE flow_id = ?1")
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let body: Option<String> = stmt.query_row([flow_id], |row| row.get(0)).ok();

        body.as_deref().map(Self::decode).transpose()
    }

    async fn insert(&self, flow: &TransactionFlow) -> Result<(), StoreError> {
        let body = Self::encode(flow)?;
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "INSERT INTO flows (flow_id, owner_key, status, version, body, created_at, updated_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            rusqlite::params![
                flow.flow_id,
                flow.owner_key().storage_key(),
                flow.status.as_str(),
                flow.version as i64,
                body,
                flow.created_at.to_rfc3339(),
                flow.updated_at.to_rfc3339(),
                flow.expires_at.to_rfc3339(),
            ],
        )
        .map_err(|e| {
            if is_constraint_violation(&e) {
                StoreError::Duplicate
            } else {
                StoreError::Unavailable(e.to_string())
            }
        })?;

        Ok(())
    }

    async fn compare_and_swap(
        &self,
        flow_id: &str,
        expected_version: u64,
        flow: &TransactionFlow,
    ) -> Result<(), StoreError> {
        let body = Self::encode(flow)?;
        let conn = self.conn.lock().unwrap();

        let rows_affected = conn
            .execute(
                "UPDATE flows SET body = ?1, status = ?2, version = ?3, updated_at = ?4
                 WHERE flow_id = ?5 AND version = ?6",
                rusqlite::params![
                    body,
                    flow.status.as_str(),
                    flow.version as i64,
                    flow.updated_at.to_rfc3339(),
                    flow_id,
                    expected_version as i64,
                ],
            )
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        if rows_affected > 0 {
            return Ok(());
        }

        // Distinguish a lost race from a missing record
        let exists: bool = conn
            .prepare("SELECT 1 FROM flows WHERE flow_id = ?1")
            .map_err(|e| StoreError::Unavailable(e.to_string()))?
            .query_row([flow_id], |_| Ok(()))
            .is_ok();

        if exists {
            Err(StoreError::Conflict)
        } else {
            Err(StoreError::NotFound)
        }
    }

    async fn list_unfinished(&self) -> Result<Vec<TransactionFlow>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT body FROM flows WHERE status IN {}",
                ACTIVE_STATUSES
            ))
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let bodies: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .map_err(|e| StoreError::Unavailable(e.to_string()))?
            .filter_map(|r| r.ok())
            .collect();

        bodies.iter().map(|b| Self::decode(b)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FlowStatus, Intent, StepKind, TransactionStep};
    use chrono::Duration;
    use tempfile::TempDir;

    fn store() -> (SqliteFlowStore, TempDir) {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("flows.db");
        let store = SqliteFlowStore::new(path.to_str().unwrap()).expect("open store");
        (store, dir)
    }

    fn flow_for(wallet: &str) -> TransactionFlow {
        let owner = OwnerKey::new(wallet, 8453);
        let steps = vec![TransactionStep::new(
            0,
            StepKind::SendToken,
            "0x0000000000000000000000000000000000000002",
            "0x",
            "0",
            8453,
        )];
        TransactionFlow::new(&owner, Intent::unknown("t"), steps, Duration::minutes(30))
    }

    #[tokio::test]
    async fn insert_and_read_back() {
        let (store, _dir) = store();
        let flow = flow_for("0xaaa0000000000000000000000000000000000001");
        store.insert(&flow).await.unwrap();

        let by_id = store.get(&flow.flow_id).await.unwrap().unwrap();
        assert_eq!(by_id, flow);

        let active = store.get_active(&flow.owner_key()).await.unwrap().unwrap();
        assert_eq!(active.flow_id, flow.flow_id);
    }

    #[tokio::test]
    async fn unique_active_owner_enforced_by_schema() {
        let (store, _dir) = store();
        let first = flow_for("0xaaa0000000000000000000000000000000000001");
        let second = flow_for("0xaaa0000000000000000000000000000000000001");
        store.insert(&first).await.unwrap();
        assert!(matches!(
            store.insert(&second).await,
            Err(StoreError::Duplicate)
        ));
    }

    #[tokio::test]
    async fn cas_checks_the_stored_version() {
        let (store, _dir) = store();
        let flow = flow_for("0xaaa0000000000000000000000000000000000001");
        store.insert(&flow).await.unwrap();

        let mut updated = flow.clone();
        updated.version = 2;
        store
            .compare_and_swap(&flow.flow_id, 1, &updated)
            .await
            .unwrap();

        let mut racing = flow.clone();
        racing.version = 2;
        assert!(matches!(
            store.compare_and_swap(&flow.flow_id, 1, &racing).await,
            Err(StoreError::Conflict)
        ));

        assert!(matches!(
            store.compare_and_swap("missing", 1, &updated).await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn terminal_status_frees_the_owner_slot() {
        let (store, _dir) = store();
        let flow = flow_for("0xaaa0000000000000000000000000000000000001");
        store.insert(&flow).await.unwrap();

        let mut done = flow.clone();
        done.status = FlowStatus::Completed;
        done.version = 2;
        store
            .compare_and_swap(&flow.flow_id, 1, &done)
            .await
            .unwrap();

        assert!(store.get_active(&flow.owner_key()).await.unwrap().is_none());

        let next = flow_for("0xaaa0000000000000000000000000000000000001");
        store.insert(&next).await.unwrap();

        let unfinished = store.list_unfinished().await.unwrap();
        assert_eq!(unfinished.len(), 1);
        assert_eq!(unfinished[0].flow_id, next.flow_id);
    }

    #[tokio::test]
    async fn survives_reopen() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("flows.db");
        let flow = flow_for("0xaaa0000000000000000000000000000000000001");

        {
            let store = SqliteFlowStore::new(path.to_str().unwrap()).unwrap();
            store.insert(&flow).await.unwrap();
        }

        let reopened = SqliteFlowStore::new(path.to_str().unwrap()).unwrap();
        let read = reopened.get(&flow.flow_id).await.unwrap().unwrap();
        assert_eq!(read, flow);
    }
}
