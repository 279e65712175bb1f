//! The transaction flow state machine.
//!
//! One flow per (wallet, chain) owner key, persisted through the
//! [`FlowStore`] contract and advanced exclusively by step-completion
//! callbacks. Every mutation is read → modify → compare-and-swap, so the
//! engine stays correct across multiple stateless process instances with
//! no in-process locking: a concurrent writer loses the CAS, observes
//! `StaleVersion`, and re-reads.
//!
//! Expiry is lazy on top of the periodic sweep: any read of a flow past
//! its deadline reports it EXPIRED and best-effort persists the
//! transition, so a stale flow can never accept another step.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::error::{EngineError, FlowStateKind};
use crate::models::{
    CommandType, FlowStatus, Intent, OwnerKey, StepStatus, TransactionFlow, TransactionStep,
};

use super::store::{FlowStore, StoreError};

/// Which flow-state kind a terminal flow rejects mutations with: an
/// already-reaped flow reports `expired`, every other terminal state is
/// plain `terminal`
fn terminal_kind(flow: &TransactionFlow) -> FlowStateKind {
    if flow.status == FlowStatus::Expired {
        FlowStateKind::Expired
    } else {
        FlowStateKind::Terminal
    }
}

pub struct FlowEngine {
    store: Arc<dyn FlowStore>,
    ttl: Duration,
}

impl FlowEngine {
    pub fn new(store: Arc<dyn FlowStore>, ttl_minutes: i64) -> Self {
        FlowEngine {
            store,
            ttl: Duration::minutes(ttl_minutes),
        }
    }

    /// Create a flow for an owner key, in AWAITING_SIGNATURE of step 0.
    ///
    /// Fails with `Conflict` when the owner already has an active flow,
    /// unless `replace` is set, in which case the old flow is cancelled
    /// first.
    pub async fn create(
        &self,
        owner: &OwnerKey,
        origin: Intent,
        mut steps: Vec<TransactionStep>,
        replace: bool,
    ) -> Result<TransactionFlow, EngineError> {
        if steps.is_empty() {
            return Err(EngineError::validation("a flow needs at least one step"));
        }
        if origin.command_type == CommandType::Unknown {
            return Err(EngineError::validation(
                "unclassified commands never produce a flow",
            ));
        }

        let now = Utc::now();
        if let Some(active) = self.load_active(owner, now).await? {
            if !active.is_terminal() {
                if !replace {
                    return Err(EngineError::Conflict {
                        active_flow_id: active.flow_id,
                    });
                }
                let mut cancelled = active.clone();
                cancelled.status = FlowStatus::Cancelled;
                self.commit(active.version, cancelled).await?;
                log::info!(
                    "[flow] replaced active flow {} for {}",
                    active.flow_id,
                    owner.storage_key()
                );
            }
        }

        // Normalize composition at the only point it may be set
        for (i, step) in steps.iter_mut().enumerate() {
            step.index = i;
            step.status = StepStatus::Pending;
            step.tx_hash = None;
        }

        let flow = TransactionFlow::new(owner, origin, steps, self.ttl);
        match self.store.insert(&flow).await {
            Ok(()) => {
                log::info!(
                    "[flow] created flow {} ({} steps) for {}",
                    flow.flow_id,
                    flow.steps.len(),
                    owner.storage_key()
                );
                Ok(flow)
            }
            Err(StoreError::Duplicate) => {
                // Lost an insert race; report the winner
                let active_flow_id = self
                    .store
                    .get_active(owner)
                    .await
                    .ok()
                    .flatten()
                    .map(|f| f.flow_id)
                    .unwrap_or_default();
                Err(EngineError::Conflict { active_flow_id })
            }
            Err(e) => Err(EngineError::Storage(e.to_string())),
        }
    }

    /// The flow by id, with lazy expiry applied
    pub async fn get(&self, flow_id: &str) -> Result<Option<TransactionFlow>, EngineError> {
        let now = Utc::now();
        match self.store.get(flow_id).await {
            Ok(Some(flow)) => Ok(Some(self.freshen(flow, now).await)),
            Ok(None) => Ok(None),
            Err(e) => Err(EngineError::Storage(e.to_string())),
        }
    }

    /// The owner's active flow, with lazy expiry applied
    pub async fn get_active(
        &self,
        owner: &OwnerKey,
    ) -> Result<Option<TransactionFlow>, EngineError> {
        self.load_active(owner, Utc::now()).await
    }

    /// The step currently awaiting a signature, or None when the flow is
    /// terminal or mid-confirmation
    pub async fn get_current_step(
        &self,
        flow_id: &str,
    ) -> Result<Option<TransactionStep>, EngineError> {
        match self.get(flow_id).await? {
            Some(flow) => Ok(flow.current_step().cloned()),
            None => Err(EngineError::FlowState(FlowStateKind::NotFound)),
        }
    }

    /// Record that the current step's transaction was broadcast but not yet
    /// confirmed. Idempotent for a repeated report with the same hash.
    pub async fn mark_step_submitted(
        &self,
        flow_id: &str,
        step_index: usize,
        tx_hash: &str,
    ) -> Result<TransactionFlow, EngineError> {
        let now = Utc::now();
        let flow = self.require(flow_id).await?;
        if flow.is_expired_at(now) {
            self.expire(&flow).await;
            return Err(EngineError::FlowState(FlowStateKind::Expired));
        }
        if flow.is_terminal() {
            return Err(EngineError::FlowState(terminal_kind(&flow)));
        }
        if step_index != flow.current_step_index {
            return Err(EngineError::FlowState(FlowStateKind::OutOfOrder));
        }

        let step = &flow.steps[step_index];
        match step.status {
            StepStatus::Submitted if step.tx_hash.as_deref() == Some(tx_hash) => Ok(flow),
            StepStatus::Pending => {
                let mut next = flow.clone();
                let step = &mut next.steps[step_index];
                step.status = StepStatus::Submitted;
                step.tx_hash = Some(tx_hash.to_string());
                self.commit(flow.version, next).await
            }
            _ => Err(EngineError::FlowState(FlowStateKind::OutOfOrder)),
        }
    }

    /// Apply a step-completion callback.
    ///
    /// Idempotent: a repeat of an already-confirmed step with the same hash
    /// returns the stored flow unchanged. A hash for any step other than the
    /// current one fails with `out_of_order` and mutates nothing. On
    /// failure the step and the whole flow go FAILED; no further steps are
    /// ever issued for a failed flow.
    pub async fn complete_step(
        &self,
        flow_id: &str,
        step_index: usize,
        tx_hash: &str,
        success: bool,
    ) -> Result<TransactionFlow, EngineError> {
        let now = Utc::now();
        let flow = self.require(flow_id).await?;
        if flow.is_expired_at(now) {
            self.expire(&flow).await;
            return Err(EngineError::FlowState(FlowStateKind::Expired));
        }

        // Duplicate delivery of a confirmation that already landed
        if success {
            if let Some(step) = flow.steps.get(step_index) {
                if step.status == StepStatus::Confirmed && step.tx_hash.as_deref() == Some(tx_hash)
                {
                    return Ok(flow);
                }
            }
        }

        if flow.is_terminal() {
            return Err(EngineError::FlowState(terminal_kind(&flow)));
        }
        let Some(step) = flow.steps.get(step_index) else {
            return Err(EngineError::FlowState(FlowStateKind::OutOfOrder));
        };
        if step_index != flow.current_step_index
            || !matches!(step.status, StepStatus::Pending | StepStatus::Submitted)
        {
            return Err(EngineError::FlowState(FlowStateKind::OutOfOrder));
        }

        let mut next = flow.clone();
        {
            let step = &mut next.steps[step_index];
            step.status = if success {
                StepStatus::Confirmed
            } else {
                StepStatus::Failed
            };
            step.tx_hash = Some(tx_hash.to_string());
        }

        if success {
            if step_index + 1 < next.steps.len() {
                next.current_step_index = step_index + 1;
                log::info!(
                    "[flow] {} step {} confirmed, awaiting step {}",
                    flow_id,
                    step_index,
                    step_index + 1
                );
            } else {
                next.status = FlowStatus::Completed;
                log::info!("[flow] {} completed after {} steps", flow_id, next.steps.len());
            }
        } else {
            next.status = FlowStatus::Failed;
            log::warn!("[flow] {} failed at step {} ({})", flow_id, step_index, tx_hash);
        }

        self.commit(flow.version, next).await
    }

    /// Cancel an active flow and free the owner key immediately
    pub async fn cancel(&self, flow_id: &str) -> Result<TransactionFlow, EngineError> {
        let now = Utc::now();
        let flow = self.require(flow_id).await?;
        if flow.is_expired_at(now) {
            self.expire(&flow).await;
            return Err(EngineError::FlowState(FlowStateKind::Expired));
        }
        if flow.is_terminal() {
            return Err(EngineError::FlowState(terminal_kind(&flow)));
        }

        let mut cancelled = flow.clone();
        cancelled.status = FlowStatus::Cancelled;
        let committed = self.commit(flow.version, cancelled).await?;
        log::info!("[flow] cancelled flow {}", flow_id);
        Ok(committed)
    }

    /// Move every non-terminal flow past its deadline to EXPIRED and free
    /// its owner key. Idempotent; safe to re-run at any time.
    pub async fn cleanup_expired(&self, now: DateTime<Utc>) -> Result<usize, EngineError> {
        let flows = self
            .store
            .list_unfinished()
            .await
            .map_err(|e| EngineError::Storage(e.to_string()))?;

        let mut reaped = 0;
        for flow in flows {
            if !flow.is_expired_at(now) {
                continue;
            }
            let mut expired = flow.clone();
            expired.status = FlowStatus::Expired;
            match self.commit(flow.version, expired).await {
                Ok(_) => reaped += 1,
                // Another writer advanced or reaped it first
                Err(EngineError::StaleVersion) | Err(EngineError::FlowState(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(reaped)
    }

    async fn require(&self, flow_id: &str) -> Result<TransactionFlow, EngineError> {
        match self.store.get(flow_id).await {
            Ok(Some(flow)) => Ok(flow),
            Ok(None) => Err(EngineError::FlowState(FlowStateKind::NotFound)),
            Err(e) => Err(EngineError::Storage(e.to_string())),
        }
    }

    async fn load_active(
        &self,
        owner: &OwnerKey,
        now: DateTime<Utc>,
    ) -> Result<Option<TransactionFlow>, EngineError> {
        match self.store.get_active(owner).await {
            Ok(Some(flow)) => Ok(Some(self.freshen(flow, now).await)),
            Ok(None) => Ok(None),
            Err(e) => Err(EngineError::Storage(e.to_string())),
        }
    }

    /// Lazy expiry on read. The expired view is authoritative even when
    /// persisting it loses a race.
    async fn freshen(&self, flow: TransactionFlow, now: DateTime<Utc>) -> TransactionFlow {
        if !flow.is_expired_at(now) {
            return flow;
        }
        let mut expired = flow.clone();
        expired.status = FlowStatus::Expired;
        match self.commit(flow.version, expired.clone()).await {
            Ok(persisted) => persisted,
            Err(_) => expired,
        }
    }

    /// Best-effort persistence of an expiry observed mid-mutation
    async fn expire(&self, flow: &TransactionFlow) {
        let mut expired = flow.clone();
        expired.status = FlowStatus::Expired;
        if let Err(e) = self.commit(flow.version, expired).await {
            log::debug!("[flow] lazy expiry of {} not persisted: {}", flow.flow_id, e);
        }
    }

    async fn commit(
        &self,
        expected_version: u64,
        mut flow: TransactionFlow,
    ) -> Result<TransactionFlow, EngineError> {
        flow.version = expected_version + 1;
        flow.updated_at = Utc::now();
        match self
            .store
            .compare_and_swap(&flow.flow_id, expected_version, &flow)
            .await
        {
            Ok(()) => Ok(flow),
            Err(StoreError::Conflict) => Err(EngineError::StaleVersion),
            Err(StoreError::NotFound) => Err(EngineError::FlowState(FlowStateKind::NotFound)),
            Err(e) => Err(EngineError::Storage(e.to_string())),
        }
    }
}
