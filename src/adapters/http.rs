//! HTTP implementations of the provider traits.
//!
//! Every request is timeout-bounded. Transport failures and non-2xx
//! statuses are mapped into `EngineError::Adapter`; timeouts and 5xx are
//! retryable, 4xx are not.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::Config;
use crate::error::EngineError;
use crate::models::StepKind;

use super::{
    Adapters, BalanceProvider, BridgeProvider, PriceProvider, Quote, QuoteProvider,
    ResearchProvider, TokenBalance, TransferProvider, TxPayload,
};

fn transport_error(context: &str, e: reqwest::Error) -> EngineError {
    let retryable = e.is_timeout() || e.is_connect();
    EngineError::adapter(format!("{}: {}", context, e), retryable)
}

/// Check status and decode the body; 5xx responses are retryable
async fn read_json<T: serde::de::DeserializeOwned>(
    context: &str,
    response: reqwest::Response,
) -> Result<T, EngineError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(EngineError::adapter(
            format!("{} returned {}: {}", context, status, body),
            status.is_server_error(),
        ));
    }
    response
        .json::<T>()
        .await
        .map_err(|e| EngineError::adapter(format!("{}: invalid response: {}", context, e), false))
}

/// Transaction payload as providers return it
#[derive(Debug, Deserialize)]
struct TxDto {
    to: String,
    data: String,
    #[serde(default = "zero_value")]
    value: String,
    #[serde(rename = "chainId")]
    chain_id: u64,
}

fn zero_value() -> String {
    "0".to_string()
}

impl TxDto {
    fn into_payload(self, kind: StepKind) -> TxPayload {
        TxPayload {
            kind,
            target: self.to,
            call_data: self.data,
            value: self.value,
            chain_id: self.chain_id,
        }
    }
}

pub struct HttpQuoteProvider {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpQuoteProvider {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        HttpQuoteProvider {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }
}

#[derive(Debug, Deserialize)]
struct QuoteResponse {
    #[serde(rename = "expectedOut")]
    expected_out: String,
    #[serde(default)]
    approval: Option<TxDto>,
    #[serde(rename = "swapTx")]
    swap_tx: TxDto,
}

#[async_trait]
impl QuoteProvider for HttpQuoteProvider {
    async fn get_quote(
        &self,
        token_in: &str,
        token_out: &str,
        amount_raw: &str,
        chain_id: u64,
    ) -> Result<Quote, EngineError> {
        let url = format!(
            "{}/quote?tokenIn={}&tokenOut={}&amount={}&chainId={}",
            self.base_url, token_in, token_out, amount_raw, chain_id
        );
        log::debug!("[adapters] GET {}", url);

        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| transport_error("quote service", e))?;
        let body: QuoteResponse = read_json("quote service", response).await?;

        Ok(Quote {
            token_in: token_in.to_string(),
            token_out: token_out.to_string(),
            amount_in: amount_raw.to_string(),
            expected_out: body.expected_out,
            chain_id,
            approval: body.approval.map(|tx| tx.into_payload(StepKind::Approve)),
            call: body.swap_tx.into_payload(StepKind::CallContract),
        })
    }
}

pub struct HttpBridgeProvider {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpBridgeProvider {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        HttpBridgeProvider {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }
}

#[derive(Debug, Deserialize)]
struct BridgeStepsResponse {
    #[serde(default)]
    approval: Option<TxDto>,
    deposit: TxDto,
}

#[async_trait]
impl BridgeProvider for HttpBridgeProvider {
    async fn build_bridge_steps(
        &self,
        token: &str,
        amount_raw: &str,
        source_chain_id: u64,
        dest_chain: &str,
        recipient: &str,
    ) -> Result<Vec<TxPayload>, EngineError> {
        let url = format!("{}/bridge/steps", self.base_url);
        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(&serde_json::json!({
                "token": token,
                "amount": amount_raw,
                "sourceChainId": source_chain_id,
                "destChain": dest_chain,
                "recipient": recipient,
            }))
            .send()
            .await
            .map_err(|e| transport_error("bridge service", e))?;
        let body: BridgeStepsResponse = read_json("bridge service", response).await?;

        let mut payloads = Vec::new();
        if let Some(approval) = body.approval {
            payloads.push(approval.into_payload(StepKind::Approve));
        }
        payloads.push(body.deposit.into_payload(StepKind::SendToken));
        Ok(payloads)
    }
}

pub struct HttpChainProvider {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpChainProvider {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        HttpChainProvider {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TransferStepsResponse {
    /// Present when the destination needs gas before it can move the token
    #[serde(default, rename = "gasTx")]
    gas_tx: Option<TxDto>,
    #[serde(rename = "transferTx")]
    transfer_tx: TxDto,
}

#[async_trait]
impl TransferProvider for HttpChainProvider {
    async fn build_transfer_steps(
        &self,
        token: &str,
        amount_raw: &str,
        chain_id: u64,
        from: &str,
        to: &str,
    ) -> Result<Vec<TxPayload>, EngineError> {
        let url = format!("{}/transfer/steps", self.base_url);
        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(&serde_json::json!({
                "token": token,
                "amount": amount_raw,
                "chainId": chain_id,
                "from": from,
                "to": to,
            }))
            .send()
            .await
            .map_err(|e| transport_error("transfer service", e))?;
        let body: TransferStepsResponse = read_json("transfer service", response).await?;

        let mut payloads = Vec::new();
        if let Some(gas) = body.gas_tx {
            payloads.push(gas.into_payload(StepKind::PayGas));
        }
        payloads.push(body.transfer_tx.into_payload(StepKind::SendToken));
        Ok(payloads)
    }
}

#[derive(Debug, Deserialize)]
struct BalanceDto {
    symbol: String,
    amount: f64,
    #[serde(default, rename = "usdValue")]
    usd_value: Option<f64>,
}

#[async_trait]
impl BalanceProvider for HttpChainProvider {
    async fn get_balances(
        &self,
        wallet: &str,
        chain_id: u64,
    ) -> Result<Vec<TokenBalance>, EngineError> {
        let url = format!(
            "{}/balances?wallet={}&chainId={}",
            self.base_url, wallet, chain_id
        );
        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| transport_error("balance service", e))?;
        let body: Vec<BalanceDto> = read_json("balance service", response).await?;

        Ok(body
            .into_iter()
            .map(|b| TokenBalance {
                symbol: b.symbol,
                amount: b.amount,
                usd_value: b.usd_value,
            })
            .collect())
    }
}

#[async_trait]
impl PriceProvider for HttpChainProvider {
    async fn get_usd_prices(
        &self,
        symbols: &[String],
    ) -> Result<HashMap<String, f64>, EngineError> {
        let url = format!("{}/prices?symbols={}", self.base_url, symbols.join(","));
        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| transport_error("price service", e))?;
        read_json("price service", response).await
    }
}

pub struct HttpResearchProvider {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpResearchProvider {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        HttpResearchProvider {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ResearchResponse {
    summary: String,
}

#[async_trait]
impl ResearchProvider for HttpResearchProvider {
    async fn research(&self, topic: &str) -> Result<String, EngineError> {
        let url = format!("{}/research", self.base_url);
        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(&serde_json::json!({ "topic": topic }))
            .send()
            .await
            .map_err(|e| transport_error("research service", e))?;
        let body: ResearchResponse = read_json("research service", response).await?;
        Ok(body.summary)
    }
}

/// Build the full provider bundle from configured base URLs
pub fn build(config: &Config) -> Adapters {
    let timeout = Duration::from_secs(config.adapter_timeout_secs);
    let chain = Arc::new(HttpChainProvider::new(&config.chain_api_url, timeout));

    Adapters {
        quotes: Arc::new(HttpQuoteProvider::new(&config.quote_api_url, timeout)),
        bridge: Arc::new(HttpBridgeProvider::new(&config.bridge_api_url, timeout)),
        transfers: chain.clone(),
        balances: chain.clone(),
        prices: chain,
        research: Arc::new(HttpResearchProvider::new(&config.research_api_url, timeout)),
    }
}
