//! Canned in-memory providers for tests and offline development.
//!
//! Each mock returns a fixed, plausible payload, or a configured adapter
//! error when built with `failing`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::EngineError;
use crate::models::StepKind;

use super::{
    Adapters, BalanceProvider, BridgeProvider, PriceProvider, Quote, QuoteProvider,
    ResearchProvider, TokenBalance, TransferProvider, TxPayload,
};

pub const MOCK_ROUTER: &str = "0x1111111254eeb25477b68fb85ed929f73a960582";
pub const MOCK_TOKEN: &str = "0x833589fcd6edb6e08f4c7c32d4f71b54bda02913";
pub const MOCK_BRIDGE: &str = "0x09aea4b2242abc8bb4bb78d537a67a245a7bec64";

const APPROVE_SELECTOR: &str = "0x095ea7b3";
const TRANSFER_SELECTOR: &str = "0xa9059cbb";
const SWAP_SELECTOR: &str = "0x12aa3caf";
const DEPOSIT_SELECTOR: &str = "0x7b939232";

fn canned_failure(retryable: bool) -> EngineError {
    if retryable {
        EngineError::adapter("mock provider: upstream 502", true)
    } else {
        EngineError::adapter("mock provider: unsupported request", false)
    }
}

fn payload(kind: StepKind, target: &str, selector: &str, chain_id: u64) -> TxPayload {
    TxPayload {
        kind,
        target: target.to_string(),
        call_data: selector.to_string(),
        value: "0".to_string(),
        chain_id,
    }
}

#[derive(Default)]
pub struct MockQuoteProvider {
    fail: Option<bool>,
}

impl MockQuoteProvider {
    pub fn failing(retryable: bool) -> Self {
        MockQuoteProvider {
            fail: Some(retryable),
        }
    }
}

#[async_trait]
impl QuoteProvider for MockQuoteProvider {
    async fn get_quote(
        &self,
        token_in: &str,
        token_out: &str,
        amount_raw: &str,
        chain_id: u64,
    ) -> Result<Quote, EngineError> {
        if let Some(retryable) = self.fail {
            return Err(canned_failure(retryable));
        }
        // Native input needs no approval
        let approval = (token_in != "ETH")
            .then(|| payload(StepKind::Approve, MOCK_TOKEN, APPROVE_SELECTOR, chain_id));
        Ok(Quote {
            token_in: token_in.to_string(),
            token_out: token_out.to_string(),
            amount_in: amount_raw.to_string(),
            expected_out: amount_raw.to_string(),
            chain_id,
            approval,
            call: payload(StepKind::CallContract, MOCK_ROUTER, SWAP_SELECTOR, chain_id),
        })
    }
}

#[derive(Default)]
pub struct MockBridgeProvider {
    fail: Option<bool>,
}

impl MockBridgeProvider {
    pub fn failing(retryable: bool) -> Self {
        MockBridgeProvider {
            fail: Some(retryable),
        }
    }
}

#[async_trait]
impl BridgeProvider for MockBridgeProvider {
    async fn build_bridge_steps(
        &self,
        _token: &str,
        _amount_raw: &str,
        source_chain_id: u64,
        _dest_chain: &str,
        _recipient: &str,
    ) -> Result<Vec<TxPayload>, EngineError> {
        if let Some(retryable) = self.fail {
            return Err(canned_failure(retryable));
        }
        Ok(vec![
            payload(StepKind::Approve, MOCK_TOKEN, APPROVE_SELECTOR, source_chain_id),
            payload(StepKind::SendToken, MOCK_BRIDGE, DEPOSIT_SELECTOR, source_chain_id),
        ])
    }
}

#[derive(Default)]
pub struct MockTransferProvider {
    fail: Option<bool>,
    with_gas_step: bool,
}

impl MockTransferProvider {
    pub fn failing(retryable: bool) -> Self {
        MockTransferProvider {
            fail: Some(retryable),
            with_gas_step: false,
        }
    }

    /// Pretend the destination needs gas before it can move the token
    pub fn with_gas_step() -> Self {
        MockTransferProvider {
            fail: None,
            with_gas_step: true,
        }
    }
}

#[async_trait]
impl TransferProvider for MockTransferProvider {
    async fn build_transfer_steps(
        &self,
        _token: &str,
        _amount_raw: &str,
        chain_id: u64,
        _from: &str,
        to: &str,
    ) -> Result<Vec<TxPayload>, EngineError> {
        if let Some(retryable) = self.fail {
            return Err(canned_failure(retryable));
        }
        let mut payloads = Vec::new();
        if self.with_gas_step {
            let mut gas = payload(StepKind::PayGas, to, "0x", chain_id);
            gas.value = "1000000000000000".to_string();
            payloads.push(gas);
        }
        payloads.push(payload(StepKind::SendToken, MOCK_TOKEN, TRANSFER_SELECTOR, chain_id));
        Ok(payloads)
    }
}

#[derive(Default)]
pub struct MockBalanceProvider {
    fail: Option<bool>,
}

impl MockBalanceProvider {
    pub fn failing(retryable: bool) -> Self {
        MockBalanceProvider {
            fail: Some(retryable),
        }
    }
}

#[async_trait]
impl BalanceProvider for MockBalanceProvider {
    async fn get_balances(
        &self,
        _wallet: &str,
        _chain_id: u64,
    ) -> Result<Vec<TokenBalance>, EngineError> {
        if let Some(retryable) = self.fail {
            return Err(canned_failure(retryable));
        }
        Ok(vec![
            TokenBalance {
                symbol: "ETH".to_string(),
                amount: 1.25,
                usd_value: Some(3125.0),
            },
            TokenBalance {
                symbol: "USDC".to_string(),
                amount: 420.5,
                usd_value: Some(420.5),
            },
        ])
    }
}

#[derive(Default)]
pub struct MockPriceProvider {
    fail: Option<bool>,
}

impl MockPriceProvider {
    pub fn failing(retryable: bool) -> Self {
        MockPriceProvider {
            fail: Some(retryable),
        }
    }
}

#[async_trait]
impl PriceProvider for MockPriceProvider {
    async fn get_usd_prices(
        &self,
        symbols: &[String],
    ) -> Result<HashMap<String, f64>, EngineError> {
        if let Some(retryable) = self.fail {
            return Err(canned_failure(retryable));
        }
        let known: &[(&str, f64)] = &[
            ("ETH", 2500.0),
            ("WETH", 2500.0),
            ("USDC", 1.0),
            ("USDT", 1.0),
            ("DAI", 1.0),
            ("WBTC", 60000.0),
            ("ZEC", 45.0),
        ];
        Ok(symbols
            .iter()
            .filter_map(|s| {
                known
                    .iter()
                    .find(|(sym, _)| sym == s)
                    .map(|(sym, price)| (sym.to_string(), *price))
            })
            .collect())
    }
}

#[derive(Default)]
pub struct MockResearchProvider {
    fail: Option<bool>,
}

impl MockResearchProvider {
    pub fn failing(retryable: bool) -> Self {
        MockResearchProvider {
            fail: Some(retryable),
        }
    }
}

#[async_trait]
impl ResearchProvider for MockResearchProvider {
    async fn research(&self, topic: &str) -> Result<String, EngineError> {
        if let Some(retryable) = self.fail {
            return Err(canned_failure(retryable));
        }
        Ok(format!(
            "{} overview: canned research summary for testing.",
            topic
        ))
    }
}

/// The full bundle with every provider mocked and succeeding
pub fn mock_adapters() -> Adapters {
    Adapters {
        quotes: Arc::new(MockQuoteProvider::default()),
        bridge: Arc::new(MockBridgeProvider::default()),
        transfers: Arc::new(MockTransferProvider::default()),
        balances: Arc::new(MockBalanceProvider::default()),
        prices: Arc::new(MockPriceProvider::default()),
        research: Arc::new(MockResearchProvider::default()),
    }
}
