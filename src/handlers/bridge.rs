use std::sync::Arc;

use async_trait::async_trait;

use crate::adapters::{payloads_to_steps, BridgeProvider, PriceProvider};
use crate::error::EngineError;
use crate::models::{CommandType, Intent};
use crate::parser::aliases;

use super::types::{HandlerContext, HandlerResult};
use super::{
    amount_in_tokens, is_address, require_chain_id, require_param, to_raw_amount, CommandHandler,
};

/// Cross-chain bridging. Every step the provider returns executes on the
/// source chain; the destination only shows up inside the deposit payload.
pub struct BridgeHandler {
    bridge: Arc<dyn BridgeProvider>,
    prices: Arc<dyn PriceProvider>,
}

impl BridgeHandler {
    pub fn new(bridge: Arc<dyn BridgeProvider>, prices: Arc<dyn PriceProvider>) -> Self {
        BridgeHandler { bridge, prices }
    }
}

#[async_trait]
impl CommandHandler for BridgeHandler {
    fn command_type(&self) -> CommandType {
        CommandType::Bridge
    }

    async fn handle(
        &self,
        intent: &Intent,
        ctx: &HandlerContext,
    ) -> Result<HandlerResult, EngineError> {
        let token = require_param(&intent.token_in, "token to bridge")?;
        let source = require_param(&intent.source_chain, "source chain")?;
        let dest = require_param(&intent.dest_chain, "destination chain")?;
        if source == dest {
            return Err(EngineError::validation(
                "source and destination chains must be different",
            ));
        }
        let source_chain_id = require_chain_id(&source)?;

        let recipient = intent
            .recipient
            .clone()
            .unwrap_or_else(|| ctx.wallet_address.clone());
        if !is_address(&recipient) {
            return Err(EngineError::validation(format!(
                "invalid recipient address: {}",
                recipient
            )));
        }

        let amount = amount_in_tokens(&self.prices, intent, &token).await?;
        let amount_raw = to_raw_amount(amount, aliases::token_decimals(&token));

        let payloads = self
            .bridge
            .build_bridge_steps(&token, &amount_raw, source_chain_id, &dest, &recipient)
            .await?;
        let steps = payloads_to_steps(payloads);

        log::info!(
            "[bridge] {} {} from {} to {} ({} steps)",
            amount,
            token,
            source,
            dest,
            steps.len()
        );

        Ok(HandlerResult::FlowSpec {
            summary: format!("Bridge {} {} from {} to {}", amount, token, source, dest),
            steps,
        })
    }
}
