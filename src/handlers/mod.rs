//! Domain handlers: pure functions from (intent, context) to a result.
//!
//! Each handler validates its own required parameters and calls external
//! providers through the adapter traits. Missing or bad parameters are
//! non-retryable validation errors; provider timeouts and 5xx come back as
//! retryable adapter errors, so the caller can re-issue the same command
//! without re-parsing.

pub mod balance;
pub mod bridge;
pub mod payment;
pub mod portfolio;
pub mod privacy;
pub mod registry;
pub mod research;
pub mod swap;
pub mod transfer;
pub mod types;

use std::sync::Arc;

pub use registry::{CommandHandler, HandlerRegistry};
pub use types::{HandlerContext, HandlerResult};

use crate::adapters::{Adapters, PriceProvider};
use crate::error::EngineError;
use crate::models::Intent;
use crate::parser::aliases;

/// Build the registry with every domain handler wired to the providers
pub fn create_default_registry(adapters: &Adapters) -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    registry.register(Arc::new(swap::SwapHandler::new(
        adapters.quotes.clone(),
        adapters.prices.clone(),
    )));
    registry.register(Arc::new(bridge::BridgeHandler::new(
        adapters.bridge.clone(),
        adapters.prices.clone(),
    )));
    registry.register(Arc::new(privacy::BridgeToPrivacyHandler::new(
        adapters.bridge.clone(),
        adapters.balances.clone(),
        adapters.prices.clone(),
    )));
    registry.register(Arc::new(transfer::TransferHandler::new(
        adapters.transfers.clone(),
        adapters.prices.clone(),
    )));
    registry.register(Arc::new(payment::PaymentHandler::new(
        adapters.transfers.clone(),
        adapters.prices.clone(),
    )));
    registry.register(Arc::new(portfolio::PortfolioHandler::new(
        adapters.balances.clone(),
        adapters.prices.clone(),
    )));
    registry.register(Arc::new(research::ResearchHandler::new(
        adapters.research.clone(),
    )));
    registry.register(Arc::new(balance::BalanceHandler::new(
        adapters.balances.clone(),
    )));
    registry
}

pub(crate) fn require_amount(intent: &Intent) -> Result<f64, EngineError> {
    match intent.amount {
        Some(amount) if amount > 0.0 => Ok(amount),
        Some(_) => Err(EngineError::validation("amount must be positive")),
        None => Err(EngineError::validation("no amount found in the command")),
    }
}

pub(crate) fn require_param(value: &Option<String>, what: &str) -> Result<String, EngineError> {
    value
        .clone()
        .ok_or_else(|| EngineError::validation(format!("could not determine the {}", what)))
}

pub(crate) fn require_chain_id(chain: &str) -> Result<u64, EngineError> {
    aliases::chain_id_for_name(chain)
        .ok_or_else(|| EngineError::validation(format!("unsupported chain: {}", chain)))
}

/// 0x-prefixed, 20-byte hex address
pub(crate) fn is_address(s: &str) -> bool {
    s.len() == 42 && s.starts_with("0x") && hex::decode(&s[2..]).is_ok()
}

/// Shorten an address for human-readable summaries (0x5290…9ee7)
pub(crate) fn short_address(address: &str) -> String {
    if address.len() > 10 {
        format!("{}…{}", &address[..6], &address[address.len() - 4..])
    } else {
        address.to_string()
    }
}

/// Convert a human-readable token amount to raw units
pub(crate) fn to_raw_amount(amount: f64, decimals: u32) -> String {
    let scaled = amount * 10f64.powi(decimals as i32);
    format!("{}", scaled.round() as u128)
}

/// Format a raw token amount as a human-readable string
pub(crate) fn format_raw_amount(raw: &str, decimals: u32) -> String {
    if let Ok(value) = raw.parse::<u128>() {
        let divisor = 10u128.pow(decimals);
        let whole = value / divisor;
        let frac = value % divisor;
        if frac == 0 {
            format!("{}", whole)
        } else {
            let frac_str = format!("{:0>width$}", frac, width = decimals as usize)
                .trim_end_matches('0')
                .to_string();
            format!("{}.{}", whole, frac_str)
        }
    } else {
        raw.to_string()
    }
}

/// Resolve the intent's amount into token units. USD amounts are converted
/// at the provider's current price; token amounts pass through unchanged.
pub(crate) async fn amount_in_tokens(
    prices: &Arc<dyn PriceProvider>,
    intent: &Intent,
    symbol: &str,
) -> Result<f64, EngineError> {
    let amount = require_amount(intent)?;
    if !intent.amount_is_usd {
        return Ok(amount);
    }
    let quotes = prices.get_usd_prices(&[symbol.to_string()]).await?;
    let price = quotes
        .get(symbol)
        .copied()
        .filter(|p| *p > 0.0)
        .ok_or_else(|| {
            EngineError::validation(format!("no USD price available for {}", symbol))
        })?;
    Ok(amount / price)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_amount_roundtrip() {
        assert_eq!(to_raw_amount(1.0, 6), "1000000");
        assert_eq!(to_raw_amount(0.01, 18), "10000000000000000");
        assert_eq!(format_raw_amount("1000000", 6), "1");
        assert_eq!(format_raw_amount("1500000", 6), "1.5");
        assert_eq!(format_raw_amount("not-a-number", 6), "not-a-number");
    }

    #[test]
    fn address_validation() {
        assert!(is_address("0x52908400098527886e0f7030069857d2e4169ee7"));
        assert!(!is_address("0x1234"));
        assert!(!is_address("52908400098527886e0f7030069857d2e4169ee700"));
        assert!(!is_address("0xzz908400098527886e0f7030069857d2e4169ee7"));
    }

    #[test]
    fn short_address_elides_the_middle() {
        assert_eq!(
            short_address("0x52908400098527886e0f7030069857d2e4169ee7"),
            "0x5290…9ee7"
        );
    }
}
