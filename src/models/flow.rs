use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::intent::Intent;

/// What a single flow step asks the wallet to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Approve,
    PayGas,
    CallContract,
    SendToken,
    SignTypedData,
}

impl StepKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepKind::Approve => "approve",
            StepKind::PayGas => "pay_gas",
            StepKind::CallContract => "call_contract",
            StepKind::SendToken => "send_token",
            StepKind::SignTypedData => "sign_typed_data",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Submitted,
    Confirmed,
    Failed,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Pending => "pending",
            StepStatus::Submitted => "submitted",
            StepStatus::Confirmed => "confirmed",
            StepStatus::Failed => "failed",
        }
    }
}

/// One on-chain transaction within a flow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionStep {
    pub index: usize,
    pub kind: StepKind,
    /// Contract or recipient address the transaction targets
    pub target: String,
    /// 0x-prefixed calldata, "0x" for plain value transfers
    pub call_data: String,
    /// Native value in wei as a decimal string
    pub value: String,
    pub chain_id: u64,
    pub status: StepStatus,
    pub tx_hash: Option<String>,
}

impl TransactionStep {
    pub fn new(
        index: usize,
        kind: StepKind,
        target: &str,
        call_data: &str,
        value: &str,
        chain_id: u64,
    ) -> Self {
        TransactionStep {
            index,
            kind,
            target: target.to_string(),
            call_data: call_data.to_string(),
            value: value.to_string(),
            chain_id,
            status: StepStatus::Pending,
            tx_hash: None,
        }
    }
}

/// Lifecycle state of a flow. Transitions are monotonic toward a terminal
/// state; no terminal state is ever re-entered or reversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowStatus {
    Created,
    AwaitingSignature,
    Completed,
    Failed,
    Expired,
    Cancelled,
}

impl FlowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowStatus::Created => "created",
            FlowStatus::AwaitingSignature => "awaiting_signature",
            FlowStatus::Completed => "completed",
            FlowStatus::Failed => "failed",
            FlowStatus::Expired => "expired",
            FlowStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            FlowStatus::Completed | FlowStatus::Failed | FlowStatus::Expired | FlowStatus::Cancelled
        )
    }
}

/// The (wallet, chain) pair that limits concurrent flows to one at a time.
/// Wallet addresses are lowercased so the same wallet never maps to two keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerKey {
    pub wallet_address: String,
    pub chain_id: u64,
}

impl OwnerKey {
    pub fn new(wallet_address: &str, chain_id: u64) -> Self {
        OwnerKey {
            wallet_address: wallet_address.to_lowercase(),
            chain_id,
        }
    }

    /// Flat key used by stores for the secondary owner index
    pub fn storage_key(&self) -> String {
        format!("{}:{}", self.wallet_address, self.chain_id)
    }
}

/// A persisted, ordered sequence of on-chain transaction steps tracked to
/// completion. Steps are immutable in composition once the flow is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionFlow {
    pub flow_id: String,
    pub wallet_address: String,
    pub chain_id: u64,
    pub steps: Vec<TransactionStep>,
    pub current_step_index: usize,
    pub status: FlowStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// The intent that produced this flow
    pub origin: Intent,
    /// Monotonically incremented on every mutation; compare-and-swap token
    pub version: u64,
}

impl TransactionFlow {
    /// Build a fresh flow awaiting the signature of its first step.
    pub fn new(owner: &OwnerKey, origin: Intent, steps: Vec<TransactionStep>, ttl: Duration) -> Self {
        let now = Utc::now();
        TransactionFlow {
            flow_id: Uuid::new_v4().to_string(),
            wallet_address: owner.wallet_address.clone(),
            chain_id: owner.chain_id,
            steps,
            current_step_index: 0,
            status: FlowStatus::AwaitingSignature,
            created_at: now,
            updated_at: now,
            expires_at: now + ttl,
            origin,
            version: 1,
        }
    }

    pub fn owner_key(&self) -> OwnerKey {
        OwnerKey::new(&self.wallet_address, self.chain_id)
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// A non-terminal flow past its deadline counts as expired even before
    /// the sweep has persisted the transition.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_terminal() && self.expires_at < now
    }

    /// The step currently awaiting a signature, if the flow is still live.
    pub fn current_step(&self) -> Option<&TransactionStep> {
        if self.status == FlowStatus::AwaitingSignature {
            self.steps.get(self.current_step_index)
        } else {
            None
        }
    }
}
