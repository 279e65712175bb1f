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

/// Direct token transfers to an explicit recipient address
pub struct TransferHandler {
    transfers: Arc<dyn TransferProvider>,
    prices: Arc<dyn PriceProvider>,
}

impl TransferHandler {
    pub fn new(transfers: Arc<dyn TransferProvider>, prices: Arc<dyn PriceProvider>) -> Self {
        TransferHandler { transfers, prices }
    }
}

#[async_trait]
impl CommandHandler for TransferHandler {
    fn command_type(&self) -> CommandType {
        CommandType::Transfer
    }

    async fn handle(
        &self,
        intent: &Intent,
        ctx: &HandlerContext,
    ) -> Result<HandlerResult, EngineError> {
        let token = require_param(&intent.token_in, "token to send")?;
        let recipient = require_param(&intent.recipient, "recipient address")?;
        if !is_address(&recipient) {
            return Err(EngineError::validation(format!(
                "invalid recipient address: {}",
                recipient
            )));
        }
        if recipient.eq_ignore_ascii_case(&ctx.wallet_address) {
            return Err(EngineError::validation("cannot send to your own wallet"));
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
            "[transfer] {} {} to {} ({} steps)",
            amount,
            token,
            short_address(&recipient),
            steps.len()
        );

        Ok(HandlerResult::FlowSpec {
            summary: format!("Send {} {} to {}", amount, token, short_address(&recipient)),
            steps,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::{MockPriceProvider, MockTransferProvider};
    use crate::models::{Platform, StepKind};
    use crate::parser::{parse, ParseContext};

    const RECIPIENT: &str = "0x1111000000000000000000000000000000002222";

    fn handler() -> TransferHandler {
        TransferHandler::new(
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

    fn intent(text: &str) -> Intent {
        parse(text, &ParseContext { default_chain_id: 8453 })
    }

    #[tokio::test]
    async fn transfer_builds_a_single_send_step() {
        let result = handler()
            .handle(&intent(&format!("send 10 USDC to {}", RECIPIENT)), &ctx())
            .await
            .unwrap();
        match result {
            HandlerResult::FlowSpec { steps, summary } => {
                assert_eq!(steps.len(), 1);
                assert_eq!(steps[0].kind, StepKind::SendToken);
                assert!(summary.starts_with("Send 10 USDC"));
            }
            other => panic!("expected FlowSpec, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn gas_prefunding_adds_a_step() {
        let handler = TransferHandler::new(
            Arc::new(MockTransferProvider::with_gas_step()),
            Arc::new(MockPriceProvider::default()),
        );
        let result = handler
            .handle(&intent(&format!("send 10 USDC to {}", RECIPIENT)), &ctx())
            .await
            .unwrap();
        match result {
            HandlerResult::FlowSpec { steps, .. } => {
                assert_eq!(steps.len(), 2);
                assert_eq!(steps[0].kind, StepKind::PayGas);
                assert_eq!(steps[1].kind, StepKind::SendToken);
            }
            other => panic!("expected FlowSpec, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn missing_recipient_is_a_validation_error() {
        let err = handler()
            .handle(&intent("send 10 USDC"), &ctx())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[tokio::test]
    async fn self_transfer_is_rejected() {
        let err = handler()
            .handle(
                &intent("send 10 USDC to 0x52908400098527886e0f7030069857d2e4169ee7"),
                &ctx(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }
}
