//! External provider seams.
//!
//! Domain handlers talk to quote, bridge, transfer, balance, price, and
//! research providers through these traits and treat them as black boxes:
//! each call either returns a result or a typed adapter error carrying a
//! `retryable` flag. The HTTP implementations live in [`http`], canned
//! in-memory implementations in [`mock`].

pub mod http;
pub mod mock;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::models::{StepKind, TransactionStep};

/// A transaction payload produced by a provider, not yet part of a flow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxPayload {
    pub kind: StepKind,
    pub target: String,
    pub call_data: String,
    pub value: String,
    pub chain_id: u64,
}

impl TxPayload {
    pub fn into_step(self, index: usize) -> TransactionStep {
        TransactionStep::new(
            index,
            self.kind,
            &self.target,
            &self.call_data,
            &self.value,
            self.chain_id,
        )
    }
}

/// Convert provider payloads into an ordered step list
pub fn payloads_to_steps(payloads: Vec<TxPayload>) -> Vec<TransactionStep> {
    payloads
        .into_iter()
        .enumerate()
        .map(|(i, p)| p.into_step(i))
        .collect()
}

/// A swap quote: the expected output plus the transactions to realize it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub token_in: String,
    pub token_out: String,
    /// Input amount in the token's raw units
    pub amount_in: String,
    /// Expected output in the output token's raw units
    pub expected_out: String,
    pub chain_id: u64,
    /// ERC-20 approval, absent when the input is the native token
    pub approval: Option<TxPayload>,
    /// The swap call itself
    pub call: TxPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenBalance {
    pub symbol: String,
    pub amount: f64,
    pub usd_value: Option<f64>,
}

#[async_trait]
pub trait QuoteProvider: Send + Sync {
    async fn get_quote(
        &self,
        token_in: &str,
        token_out: &str,
        amount_raw: &str,
        chain_id: u64,
    ) -> Result<Quote, EngineError>;
}

#[async_trait]
pub trait BridgeProvider: Send + Sync {
    /// Transactions that move `amount_raw` of `token` from the source chain
    /// to `dest_chain` for `recipient`. All steps execute on the source
    /// chain.
    async fn build_bridge_steps(
        &self,
        token: &str,
        amount_raw: &str,
        source_chain_id: u64,
        dest_chain: &str,
        recipient: &str,
    ) -> Result<Vec<TxPayload>, EngineError>;
}

#[async_trait]
pub trait TransferProvider: Send + Sync {
    async fn build_transfer_steps(
        &self,
        token: &str,
        amount_raw: &str,
        chain_id: u64,
        from: &str,
        to: &str,
    ) -> Result<Vec<TxPayload>, EngineError>;
}

#[async_trait]
pub trait BalanceProvider: Send + Sync {
    async fn get_balances(
        &self,
        wallet: &str,
        chain_id: u64,
    ) -> Result<Vec<TokenBalance>, EngineError>;
}

#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// USD price per token symbol. Symbols the provider does not know are
    /// absent from the result.
    async fn get_usd_prices(&self, symbols: &[String]) -> Result<HashMap<String, f64>, EngineError>;
}

#[async_trait]
pub trait ResearchProvider: Send + Sync {
    async fn research(&self, topic: &str) -> Result<String, EngineError>;
}

/// The full provider bundle handed to handler construction
#[derive(Clone)]
pub struct Adapters {
    pub quotes: Arc<dyn QuoteProvider>,
    pub bridge: Arc<dyn BridgeProvider>,
    pub transfers: Arc<dyn TransferProvider>,
    pub balances: Arc<dyn BalanceProvider>,
    pub prices: Arc<dyn PriceProvider>,
    pub research: Arc<dyn ResearchProvider>,
}
