use std::sync::Arc;

use async_trait::async_trait;

use crate::adapters::{payloads_to_steps, PriceProvider, QuoteProvider};
use crate::error::EngineError;
use crate::models::{CommandType, Intent};
use crate::parser::aliases;

use super::types::{HandlerContext, HandlerResult};
use super::{amount_in_tokens, format_raw_amount, require_param, to_raw_amount, CommandHandler};

/// Token swaps on a single chain: quote the pair, then hand back the
/// approval (when the input is an ERC-20) and the swap call as flow steps.
pub struct SwapHandler {
    quotes: Arc<dyn QuoteProvider>,
    prices: Arc<dyn PriceProvider>,
}

impl SwapHandler {
    pub fn new(quotes: Arc<dyn QuoteProvider>, prices: Arc<dyn PriceProvider>) -> Self {
        SwapHandler { quotes, prices }
    }
}

#[async_trait]
impl CommandHandler for SwapHandler {
    fn command_type(&self) -> CommandType {
        CommandType::Swap
    }

    async fn handle(
        &self,
        intent: &Intent,
        ctx: &HandlerContext,
    ) -> Result<HandlerResult, EngineError> {
        let token_in = require_param(&intent.token_in, "input token")?;
        let token_out = require_param(&intent.token_out, "output token")?;
        if token_in == token_out {
            return Err(EngineError::validation(
                "input and output tokens must be different",
            ));
        }

        let amount = amount_in_tokens(&self.prices, intent, &token_in).await?;
        let amount_raw = to_raw_amount(amount, aliases::token_decimals(&token_in));

        let quote = self
            .quotes
            .get_quote(&token_in, &token_out, &amount_raw, ctx.chain_id)
            .await?;

        let expected = format_raw_amount(&quote.expected_out, aliases::token_decimals(&token_out));
        let chain = aliases::chain_name(ctx.chain_id)
            .map(|n| n.to_string())
            .unwrap_or_else(|| format!("chain {}", ctx.chain_id));

        let mut payloads = Vec::new();
        if let Some(approval) = quote.approval {
            payloads.push(approval);
        }
        payloads.push(quote.call);
        let steps = payloads_to_steps(payloads);

        log::info!(
            "[swap] {} {} -> ~{} {} on {} ({} steps)",
            amount,
            token_in,
            expected,
            token_out,
            chain,
            steps.len()
        );

        Ok(HandlerResult::FlowSpec {
            summary: format!(
                "Swap {} {} for ~{} {} on {}",
                amount, token_in, expected, token_out, chain
            ),
            steps,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::{MockPriceProvider, MockQuoteProvider};
    use crate::models::{Platform, StepKind};
    use crate::parser::{parse, ParseContext};

    fn handler() -> SwapHandler {
        SwapHandler::new(
            Arc::new(MockQuoteProvider::default()),
            Arc::new(MockPriceProvider::default()),
        )
    }

    fn ctx() -> HandlerContext {
        HandlerContext {
            wallet_address: "0x52908400098527886e0f7030069857d2e4169ee7".to_string(),
            chain_id: 8453,
            platform: Platform::Web,
        }
    }

    fn intent(text: &str) -> Intent {
        parse(text, &ParseContext { default_chain_id: 8453 })
    }

    #[tokio::test]
    async fn erc20_swap_needs_approval_then_call() {
        let result = handler()
            .handle(&intent("swap 100 USDC for ETH"), &ctx())
            .await
            .unwrap();
        match result {
            HandlerResult::FlowSpec { steps, summary } => {
                assert_eq!(steps.len(), 2);
                assert_eq!(steps[0].kind, StepKind::Approve);
                assert_eq!(steps[1].kind, StepKind::CallContract);
                assert!(summary.contains("USDC"));
            }
            other => panic!("expected FlowSpec, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn native_input_skips_approval() {
        let result = handler()
            .handle(&intent("swap 0.01 ETH for USDC"), &ctx())
            .await
            .unwrap();
        match result {
            HandlerResult::FlowSpec { steps, .. } => {
                assert_eq!(steps.len(), 1);
                assert_eq!(steps[0].kind, StepKind::CallContract);
            }
            other => panic!("expected FlowSpec, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn usd_amount_is_converted_before_quoting() {
        // USDC is priced at 1.0 by the mock: $100 becomes 100 USDC raw
        let result = handler()
            .handle(&intent("swap $100 worth of USDC for ETH"), &ctx())
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn missing_output_token_is_a_validation_error() {
        let err = handler()
            .handle(&intent("swap 100 USDC"), &ctx())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
        assert!(!err.retryable());
    }

    #[tokio::test]
    async fn quote_outage_is_retryable() {
        let handler = SwapHandler::new(
            Arc::new(MockQuoteProvider::failing(true)),
            Arc::new(MockPriceProvider::default()),
        );
        let err = handler
            .handle(&intent("swap 100 USDC for ETH"), &ctx())
            .await
            .unwrap_err();
        assert!(err.retryable());
    }
}
