use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::adapters::{BalanceProvider, PriceProvider};
use crate::error::EngineError;
use crate::models::{CommandType, Intent};
use crate::parser::aliases;

use super::types::{HandlerContext, HandlerResult};
use super::CommandHandler;

/// Portfolio analysis: balances plus USD valuation, rendered as text with
/// a structured payload alongside for richer clients.
pub struct PortfolioHandler {
    balances: Arc<dyn BalanceProvider>,
    prices: Arc<dyn PriceProvider>,
}

impl PortfolioHandler {
    pub fn new(balances: Arc<dyn BalanceProvider>, prices: Arc<dyn PriceProvider>) -> Self {
        PortfolioHandler { balances, prices }
    }
}

#[async_trait]
impl CommandHandler for PortfolioHandler {
    fn command_type(&self) -> CommandType {
        CommandType::PortfolioAnalysis
    }

    async fn handle(
        &self,
        _intent: &Intent,
        ctx: &HandlerContext,
    ) -> Result<HandlerResult, EngineError> {
        let holdings = self
            .balances
            .get_balances(&ctx.wallet_address, ctx.chain_id)
            .await?;
        if holdings.is_empty() {
            return Ok(HandlerResult::answer(
                "No token balances found for this wallet.",
            ));
        }

        let symbols: Vec<String> = holdings.iter().map(|b| b.symbol.clone()).collect();
        let prices = self.prices.get_usd_prices(&symbols).await?;

        let valued: Vec<(String, f64, Option<f64>)> = holdings
            .iter()
            .map(|b| {
                let usd = b
                    .usd_value
                    .or_else(|| prices.get(&b.symbol).map(|p| p * b.amount));
                (b.symbol.clone(), b.amount, usd)
            })
            .collect();
        let total: f64 = valued.iter().filter_map(|(_, _, usd)| *usd).sum();

        let chain = aliases::chain_name(ctx.chain_id).unwrap_or("this chain");
        let mut lines = vec![format!("Portfolio on {} (${:.2} total):", chain, total)];
        for (symbol, amount, usd) in &valued {
            match usd {
                Some(usd) if total > 0.0 => lines.push(format!(
                    "- {} {}: ${:.2} ({:.1}%)",
                    amount,
                    symbol,
                    usd,
                    usd / total * 100.0
                )),
                Some(usd) => lines.push(format!("- {} {}: ${:.2}", amount, symbol, usd)),
                None => lines.push(format!("- {} {}: price unavailable", amount, symbol)),
            }
        }

        let data = json!({
            "chain_id": ctx.chain_id,
            "total_usd": total,
            "holdings": valued
                .iter()
                .map(|(symbol, amount, usd)| json!({
                    "symbol": symbol,
                    "amount": amount,
                    "usd_value": usd,
                }))
                .collect::<Vec<_>>(),
        });

        Ok(HandlerResult::answer_with_data(lines.join("\n"), data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::{MockBalanceProvider, MockPriceProvider};
    use crate::models::Platform;
    use crate::parser::{parse, ParseContext};

    fn ctx() -> HandlerContext {
        HandlerContext {
            wallet_address: "0x52908400098527886e0f7030069857d2e4169ee7".to_string(),
            chain_id: 8453,
            platform: Platform::Web,
        }
    }

    fn intent() -> crate::models::Intent {
        parse("analyze my portfolio", &ParseContext { default_chain_id: 8453 })
    }

    #[tokio::test]
    async fn portfolio_sums_usd_values() {
        let handler = PortfolioHandler::new(
            Arc::new(MockBalanceProvider::default()),
            Arc::new(MockPriceProvider::default()),
        );
        let result = handler.handle(&intent(), &ctx()).await.unwrap();
        match result {
            HandlerResult::Answer { text, data } => {
                // Mock wallet: 1.25 ETH ($3125) + 420.5 USDC ($420.50)
                assert!(text.contains("$3545.50 total"));
                assert!(text.contains("ETH"));
                let data = data.expect("structured payload");
                assert_eq!(data["holdings"].as_array().unwrap().len(), 2);
            }
            other => panic!("expected Answer, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn balance_outage_is_retryable() {
        let handler = PortfolioHandler::new(
            Arc::new(MockBalanceProvider::failing(true)),
            Arc::new(MockPriceProvider::default()),
        );
        let err = handler.handle(&intent(), &ctx()).await.unwrap_err();
        assert!(err.retryable());
    }
}
