use std::sync::Arc;

use async_trait::async_trait;

use crate::adapters::{payloads_to_steps, PriceProvider, TransferProvider};
use crate::error::EngineError;
use crate::models::{CommandType, Intent};
use crate::parser::aliases;

use super::types::{HandlerContext, HandlerResult};
use super::{
    amount_in_tokens, is_address, require_param, short_address, to_raw_amount, CommandHandler,
};

/// Payments: same step construction as a transfer, but the proposal comes
/// back as a confirmation awaiting explicit user approval. No flow exists
/// until the user says yes.
pub struct PaymentHandler {
    transfers: Arc<dyn TransferProvider>,
    prices: Arc<dyn PriceProvider>,
}

impl PaymentHandler {
    pub fn new(transfers: Arc<dyn TransferProvider>, prices: Arc<dyn PriceProvider>) -> Self {
        PaymentHandler { transfers, prices }
    }
}

#[async_trait]
impl CommandHandler for PaymentHandler {
    fn command_type(&self) -> CommandType {
        CommandType::Payment
    }

    async fn handle(
        &self,
        intent: &Intent,
        ctx: &HandlerContext,
    ) -> Result<HandlerResult, EngineError> {
        let token = require_param(&intent.token_in, "payment token")?;
        let recipient = require_param(&intent.recipient, "payee address")?;
        if !is_address(&recipient) {
            return Err(EngineError::validation(format!(
                "invalid payee address: {}",
                recipient
            )));
        }

        let amount = amount_in_tokens(&self.prices, intent, &token).await?;
        let amount_raw = to_raw_amount(amount, aliases::token_decimals(&token));

        let payloads = self
            .transfers
            .build_transfer_steps(
                &token,
                &amount_raw,
                ctx.chain_id,
                &ctx.wallet_address,
                &recipient,
            )
            .await?;
        let steps = payloads_to_steps(payloads);

        log::info!(
            "[payment] proposing {} {} to {}",
            amount,
            token,
            short_address(&recipient)
        );

        Ok(HandlerResult::Confirmation {
            summary: format!(
                "Pay {} {} to {}? Reply to confirm.",
                amount,
                token,
                short_address(&recipient)
            ),
            steps,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::{MockPriceProvider, MockTransferProvider};
    use crate::models::Platform;
    use crate::parser::{parse, ParseContext};

    const PAYEE: &str = "0x1111000000000000000000000000000000002222";

    fn handler() -> PaymentHandler {
        PaymentHandler::new(
            Arc::new(MockTransferProvider::default()),
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

    #[tokio::test]
    async fn payment_awaits_explicit_approval() {
        let intent = parse(
            &format!("pay 5 USDC to {}", PAYEE),
            &ParseContext { default_chain_id: 8453 },
        );
        let result = handler().handle(&intent, &ctx()).await.unwrap();
        match result {
            HandlerResult::Confirmation { summary, steps } => {
                assert!(summary.contains("Pay 5 USDC"));
                assert_eq!(steps.len(), 1);
            }
            other => panic!("expected Confirmation, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn missing_payee_is_a_validation_error() {
        let intent = parse("pay 5 USDC", &ParseContext { default_chain_id: 8453 });
        let err = handler().handle(&intent, &ctx()).await.unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }
}
