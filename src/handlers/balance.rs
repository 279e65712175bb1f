use std::sync::Arc;

use async_trait::async_trait;

use crate::adapters::BalanceProvider;
use crate::error::EngineError;
use crate::models::{CommandType, Intent};
use crate::parser::aliases;

use super::types::{HandlerContext, HandlerResult};
use super::CommandHandler;

/// Single-chain balance lookups, optionally narrowed to one token
pub struct BalanceHandler {
    balances: Arc<dyn BalanceProvider>,
}

impl BalanceHandler {
    pub fn new(balances: Arc<dyn BalanceProvider>) -> Self {
        BalanceHandler { balances }
    }
}

#[async_trait]
impl CommandHandler for BalanceHandler {
    fn command_type(&self) -> CommandType {
        CommandType::Balance
    }

    async fn handle(
        &self,
        intent: &Intent,
        ctx: &HandlerContext,
    ) -> Result<HandlerResult, EngineError> {
        let holdings = self
            .balances
            .get_balances(&ctx.wallet_address, ctx.chain_id)
            .await?;
        let chain = aliases::chain_name(ctx.chain_id).unwrap_or("this chain");

        if let Some(token) = &intent.token_in {
            let amount = holdings
                .iter()
                .find(|b| &b.symbol == token)
                .map(|b| b.amount)
                .unwrap_or(0.0);
            return Ok(HandlerResult::answer(format!(
                "Your {} balance on {}: {}",
                token, chain, amount
            )));
        }

        if holdings.is_empty() {
            return Ok(HandlerResult::answer(format!(
                "No token balances found on {}.",
                chain
            )));
        }

        let mut lines = vec![format!("Balances on {}:", chain)];
        for b in &holdings {
            lines.push(format!("- {} {}", b.amount, b.symbol));
        }
        Ok(HandlerResult::answer(lines.join("\n")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::MockBalanceProvider;
    use crate::models::Platform;
    use crate::parser::{parse, ParseContext};

    fn handler() -> BalanceHandler {
        BalanceHandler::new(Arc::new(MockBalanceProvider::default()))
    }

    fn ctx() -> HandlerContext {
        HandlerContext {
            wallet_address: "0x52908400098527886e0f7030069857d2e4169ee7".to_string(),
            chain_id: 8453,
            platform: Platform::Web,
        }
    }

    #[tokio::test]
    async fn single_token_balance() {
        let intent = parse("what is my usdc balance", &ParseContext { default_chain_id: 8453 });
        let result = handler().handle(&intent, &ctx()).await.unwrap();
        match result {
            HandlerResult::Answer { text, .. } => {
                assert!(text.contains("USDC balance on Base: 420.5"));
            }
            other => panic!("expected Answer, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn all_balances_listed_without_a_token() {
        let intent = parse("show my balance", &ParseContext { default_chain_id: 8453 });
        let result = handler().handle(&intent, &ctx()).await.unwrap();
        match result {
            HandlerResult::Answer { text, .. } => {
                assert!(text.contains("1.25 ETH"));
                assert!(text.contains("420.5 USDC"));
            }
            other => panic!("expected Answer, got {:?}", other),
        }
    }
}
