use std::sync::Arc;

use async_trait::async_trait;

use crate::adapters::{payloads_to_steps, BalanceProvider, BridgeProvider, PriceProvider};
use crate::error::EngineError;
use crate::models::{CommandType, Intent};
use crate::parser::aliases;

use super::types::{HandlerContext, HandlerResult};
use super::{amount_in_tokens, require_chain_id, require_param, to_raw_amount, CommandHandler};

/// Privacy bridging: move a token into the Zcash shielded pool.
///
/// Phrasings like "make my ETH private" carry no amount; the wallet's full
/// balance of the token is used in that case.
pub struct BridgeToPrivacyHandler {
    bridge: Arc<dyn BridgeProvider>,
    balances: Arc<dyn BalanceProvider>,
    prices: Arc<dyn PriceProvider>,
}

impl BridgeToPrivacyHandler {
    pub fn new(
        bridge: Arc<dyn BridgeProvider>,
        balances: Arc<dyn BalanceProvider>,
        prices: Arc<dyn PriceProvider>,
    ) -> Self {
        BridgeToPrivacyHandler {
            bridge,
            balances,
            prices,
        }
    }

    async fn full_balance(
        &self,
        token: &str,
        wallet: &str,
        chain_id: u64,
    ) -> Result<f64, EngineError> {
        let balances = self.balances.get_balances(wallet, chain_id).await?;
        balances
            .iter()
            .find(|b| b.symbol == token)
            .map(|b| b.amount)
            .filter(|a| *a > 0.0)
            .ok_or_else(|| {
                EngineError::validation(format!("no {} balance available to shield", token))
            })
    }
}

#[async_trait]
impl CommandHandler for BridgeToPrivacyHandler {
    fn command_type(&self) -> CommandType {
        CommandType::BridgeToPrivacy
    }

    async fn handle(
        &self,
        intent: &Intent,
        ctx: &HandlerContext,
    ) -> Result<HandlerResult, EngineError> {
        let token = require_param(&intent.token_in, "token to shield")?;
        let source = require_param(&intent.source_chain, "source chain")?;
        let source_chain_id = require_chain_id(&source)?;

        let amount = match intent.amount {
            Some(_) => amount_in_tokens(&self.prices, intent, &token).await?,
            None => {
                self.full_balance(&token, &ctx.wallet_address, source_chain_id)
                    .await?
            }
        };
        let amount_raw = to_raw_amount(amount, aliases::token_decimals(&token));

        let payloads = self
            .bridge
            .build_bridge_steps(
                &token,
                &amount_raw,
                source_chain_id,
                aliases::PRIVACY_CHAIN,
                &ctx.wallet_address,
            )
            .await?;
        let steps = payloads_to_steps(payloads);

        log::info!(
            "[privacy] shielding {} {} from {} ({} steps)",
            amount,
            token,
            source,
            steps.len()
        );

        Ok(HandlerResult::FlowSpec {
            summary: format!(
                "Bridge {} {} from {} into the {} shielded pool",
                amount,
                token,
                source,
                aliases::PRIVACY_CHAIN
            ),
            steps,
        })
    }
}
