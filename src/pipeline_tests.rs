//! End-to-end tests for the parse → dispatch → flow pipeline.
//!
//! These wire a real processor and flow engine against the in-memory store
//! and mock providers, then drive whole commands through the same surface
//! the HTTP controllers use: process a command, sign steps one at a time,
//! and watch the flow advance to a terminal state.

use std::sync::Arc;

use crate::adapters::mock::{mock_adapters, MockBridgeProvider};
use crate::adapters::Adapters;
use crate::error::EngineError;
use crate::flow::{FlowEngine, MemoryFlowStore};
use crate::handlers::create_default_registry;
use crate::models::{Command, FlowStatus, OwnerKey, Platform, StepKind, TransactionStep};
use crate::processor::{CommandProcessor, ProcessOutcome};

const WALLET: &str = "0x52908400098527886e0f7030069857d2e4169ee7";
const CHAIN_ID: u64 = 8453;

struct TestHarness {
    processor: CommandProcessor,
    engine: Arc<FlowEngine>,
}

impl TestHarness {
    fn new() -> Self {
        Self::with_adapters(mock_adapters())
    }

    fn with_adapters(adapters: Adapters) -> Self {
        let engine = Arc::new(FlowEngine::new(Arc::new(MemoryFlowStore::new()), 30));
        let processor = CommandProcessor::new(create_default_registry(&adapters), engine.clone());
        TestHarness { processor, engine }
    }

    async fn process(&self, text: &str) -> Result<ProcessOutcome, EngineError> {
        let command = Command::new(text, Platform::Web, WALLET, CHAIN_ID);
        self.processor.process(&command, false).await
    }

    fn owner(&self) -> OwnerKey {
        OwnerKey::new(WALLET, CHAIN_ID)
    }
}

fn expect_flow_created(outcome: ProcessOutcome) -> (String, TransactionStep) {
    match outcome {
        ProcessOutcome::FlowCreated {
            flow_id, next_step, ..
        } => (flow_id, next_step),
        other => panic!("expected FlowCreated, got {:?}", other),
    }
}

#[tokio::test]
async fn bridge_command_runs_to_completion() {
    let harness = TestHarness::new();

    // "bridge 1 usdc from base to optimism" becomes a 2-step approve +
    // send_token flow, and only step 0 is handed out
    let outcome = harness
        .process("bridge 1 usdc from base to optimism")
        .await
        .unwrap();
    let (flow_id, step0) = expect_flow_created(outcome);
    assert_eq!(step0.index, 0);
    assert_eq!(step0.kind, StepKind::Approve);

    // Completing step 0 releases step 1's payload
    let after_first = harness
        .engine
        .complete_step(&flow_id, 0, "0xhash0", true)
        .await
        .unwrap();
    assert_eq!(after_first.status, FlowStatus::AwaitingSignature);
    let step1 = after_first.current_step().unwrap();
    assert_eq!(step1.index, 1);
    assert_eq!(step1.kind, StepKind::SendToken);

    // Completing step 1 finishes the flow and frees the owner key
    let done = harness
        .engine
        .complete_step(&flow_id, 1, "0xhash1", true)
        .await
        .unwrap();
    assert_eq!(done.status, FlowStatus::Completed);
    assert!(harness.engine.get_active(&harness.owner()).await.unwrap().is_none());
}

#[tokio::test]
async fn usd_swap_creates_an_approve_and_call_flow() {
    let harness = TestHarness::new();
    let outcome = harness
        .process("swap $100 worth of USDC for ETH")
        .await
        .unwrap();
    let (flow_id, step0) = expect_flow_created(outcome);
    assert_eq!(step0.kind, StepKind::Approve);

    let flow = harness.engine.get(&flow_id).await.unwrap().unwrap();
    assert_eq!(flow.steps.len(), 2);
    assert!(flow.origin.amount_is_usd);
    assert_eq!(flow.origin.amount, Some(100.0));
}

#[tokio::test]
async fn unknown_command_never_touches_the_engine() {
    let harness = TestHarness::new();
    let outcome = harness.process("good morning").await.unwrap();
    assert!(matches!(outcome, ProcessOutcome::Clarification { .. }));
    assert!(harness.engine.get_active(&harness.owner()).await.unwrap().is_none());
}

#[tokio::test]
async fn active_flow_blocks_new_commands_until_replaced() {
    let harness = TestHarness::new();
    let (first_id, _) = expect_flow_created(
        harness
            .process("bridge 1 usdc from base to optimism")
            .await
            .unwrap(),
    );

    // A second multi-step command conflicts with the active flow
    let err = harness.process("swap 10 USDC for ETH").await.unwrap_err();
    match err {
        EngineError::Conflict { active_flow_id } => assert_eq!(active_flow_id, first_id),
        other => panic!("expected Conflict, got {:?}", other),
    }

    // Read-only commands still work with a flow in flight
    let outcome = harness.process("show my balance").await.unwrap();
    assert!(matches!(outcome, ProcessOutcome::Answer { .. }));

    // Explicit replacement cancels the prior flow and starts fresh
    let command = Command::new("swap 10 USDC for ETH", Platform::Web, WALLET, CHAIN_ID);
    let outcome = harness.processor.process(&command, true).await.unwrap();
    let (second_id, _) = expect_flow_created(outcome);
    assert_ne!(second_id, first_id);

    let old = harness.engine.get(&first_id).await.unwrap().unwrap();
    assert_eq!(old.status, FlowStatus::Cancelled);
}

#[tokio::test]
async fn provider_outage_leaves_the_owner_key_free() {
    let mut adapters = mock_adapters();
    adapters.bridge = Arc::new(MockBridgeProvider::failing(true));
    let harness = TestHarness::with_adapters(adapters);

    let err = harness
        .process("bridge 1 usdc from base to optimism")
        .await
        .unwrap_err();
    assert!(err.retryable());

    // The failed attempt reserved nothing; a retry against healthy
    // providers succeeds
    assert!(harness.engine.get_active(&harness.owner()).await.unwrap().is_none());
    let healthy = TestHarness::new();
    let outcome = healthy
        .process("bridge 1 usdc from base to optimism")
        .await
        .unwrap();
    expect_flow_created(outcome);
}

#[tokio::test]
async fn failed_step_ends_the_flow_and_reports_terminal_afterwards() {
    let harness = TestHarness::new();
    let (flow_id, _) = expect_flow_created(
        harness
            .process("bridge 1 usdc from base to optimism")
            .await
            .unwrap(),
    );

    let failed = harness
        .engine
        .complete_step(&flow_id, 0, "0xreverted", false)
        .await
        .unwrap();
    assert_eq!(failed.status, FlowStatus::Failed);
    assert!(failed.current_step().is_none());

    // The owner can immediately start over
    let outcome = harness
        .process("bridge 1 usdc from base to optimism")
        .await
        .unwrap();
    expect_flow_created(outcome);
}

#[tokio::test]
async fn duplicated_client_retries_are_harmless() {
    let harness = TestHarness::new();
    let (flow_id, _) = expect_flow_created(
        harness
            .process("bridge 1 usdc from base to optimism")
            .await
            .unwrap(),
    );

    let first = harness
        .engine
        .complete_step(&flow_id, 0, "0xhash0", true)
        .await
        .unwrap();
    // The client's retry of the same completion is a no-op
    let retry = harness
        .engine
        .complete_step(&flow_id, 0, "0xhash0", true)
        .await
        .unwrap();
    assert_eq!(first, retry);

    // A retry that skips ahead is rejected without mutating anything
    let err = harness
        .engine
        .complete_step(&flow_id, 2, "0xhash2", true)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::FlowState(_)));
    let unchanged = harness.engine.get(&flow_id).await.unwrap().unwrap();
    assert_eq!(unchanged, retry);
}
