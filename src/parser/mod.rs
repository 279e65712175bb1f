//! Free-text command parsing.
//!
//! `parse` normalizes the text, runs it through the prioritized rule table,
//! and extracts amounts, tokens, chains, and recipient from the match. The
//! parser never talks to the network and never converts USD amounts to
//! token amounts; that is a handler responsibility.

pub mod aliases;
pub mod rules;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{CommandType, Intent};
use self::rules::IntentRule;

/// Rules below this floor never classify; the parser falls back to UNKNOWN
pub const MIN_CONFIDENCE: f32 = 0.5;

/// Session context available to the parser
#[derive(Debug, Clone)]
pub struct ParseContext {
    /// Chain the wallet session is currently on; used as the default source
    /// chain when the command names none.
    pub default_chain_id: u64,
}

static NUMBER_COMMAS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d[\d,]*\d").unwrap());
static USD_PREFIX_AMOUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\s?(\d+(?:\.\d+)?)\b").unwrap());
static USD_SUFFIX_AMOUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|\s)(\d+(?:\.\d+)?)\s*(?:usd|dollars?)\b").unwrap());
static PLAIN_AMOUNT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:^|\s)(\d+(?:\.\d+)?)\b").unwrap());
static FROM_CHAIN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bfrom\s+([a-z0-9]+)").unwrap());
static ON_CHAIN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bon\s+([a-z0-9]+)").unwrap());
static TO_CHAIN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bto\s+([a-z0-9]+)").unwrap());
static RECIPIENT_ADDRESS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(0x[0-9a-f]{40})\b").unwrap());

/// Parse a raw command into a typed intent. Infallible: text no rule
/// matches classifies as UNKNOWN with zero confidence.
pub fn parse(text: &str, ctx: &ParseContext) -> Intent {
    let normalized = normalize(text);

    let Some(rule) = rules::first_match(&normalized) else {
        return Intent::unknown(text);
    };
    if rule.confidence < MIN_CONFIDENCE {
        return Intent::unknown(text);
    }

    let (amount, amount_is_usd) = extract_amount(&normalized);
    let (source_chain, dest_chain) = extract_chains(&normalized, rule.command_type, ctx);
    let (token_in, token_out) = extract_tokens(&normalized, rule);
    let recipient = RECIPIENT_ADDRESS
        .captures(&normalized)
        .map(|c| c[1].to_string());

    Intent {
        command_type: rule.command_type,
        amount,
        amount_is_usd,
        token_in,
        token_out,
        source_chain,
        dest_chain,
        recipient,
        confidence: rule.confidence,
        matched_rule_id: Some(rule.id.to_string()),
        raw_text: text.to_string(),
    }
}

/// Lowercase, strip thousands separators, collapse whitespace
fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();
    let without_commas = NUMBER_COMMAS.replace_all(&lowered, |caps: &regex::Captures| {
        caps[0].replace(',', "")
    });
    without_commas
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// A leading `$` or a trailing "usd"/"dollars" marks the amount as
/// USD-denominated; otherwise the first number is a token amount.
fn extract_amount(text: &str) -> (Option<f64>, bool) {
    if let Some(caps) = USD_PREFIX_AMOUNT.captures(text) {
        return (caps[1].parse().ok(), true);
    }
    if let Some(caps) = USD_SUFFIX_AMOUNT.captures(text) {
        return (caps[1].parse().ok(), true);
    }
    if let Some(caps) = PLAIN_AMOUNT.captures(text) {
        return (caps[1].parse().ok(), false);
    }
    (None, false)
}

/// Chains come from "from X"/"on X" (source) and "to X" (destination).
/// Privacy bridging pins the destination regardless of phrasing, and the
/// session's chain fills in a missing source.
fn extract_chains(
    text: &str,
    command_type: CommandType,
    ctx: &ParseContext,
) -> (Option<String>, Option<String>) {
    let capture = |re: &Regex| {
        re.captures(text)
            .and_then(|c| aliases::resolve_chain(&c[1]))
            .map(|(name, _)| name.to_string())
    };

    let source = capture(&FROM_CHAIN)
        .or_else(|| capture(&ON_CHAIN))
        .or_else(|| aliases::chain_name(ctx.default_chain_id).map(|n| n.to_string()));

    let dest = match command_type {
        CommandType::BridgeToPrivacy => Some(aliases::PRIVACY_CHAIN.to_string()),
        CommandType::Bridge => capture(&TO_CHAIN),
        _ => None,
    };

    (source, dest)
}

/// Token mentions in order of appearance. An alias that doubles as a chain
/// name ("eth", "matic", "op") directly after from/on/to is a chain
/// mention, not a token.
fn extract_tokens(text: &str, rule: &IntentRule) -> (Option<String>, Option<String>) {
    let words: Vec<&str> = text.split_whitespace().collect();
    let mut found: Vec<String> = Vec::new();
    let mut i = 0;

    while i < words.len() {
        let word = trim_word(words[i]);

        // Two-word aliases first ("usd coin")
        if i + 1 < words.len() {
            let pair = format!("{} {}", word, trim_word(words[i + 1]));
            if let Some(symbol) = aliases::resolve_token(&pair) {
                found.push(symbol.to_string());
                i += 2;
                continue;
            }
        }

        if let Some(symbol) = aliases::resolve_token(word) {
            let after_chain_keyword = i > 0
                && matches!(trim_word(words[i - 1]), "from" | "on" | "to")
                && aliases::resolve_chain(word).is_some();
            if !after_chain_keyword {
                found.push(symbol.to_string());
            }
        }
        i += 1;
    }

    let mut iter = found.into_iter();
    let first = iter.next();
    let second = iter.next();

    match rule.command_type {
        // "buy ETH with USDC" names the output token first
        CommandType::Swap if rule.id == "swap.buy_with" => (second, first),
        CommandType::Swap => (first, second),
        _ => (first, None),
    }
}

fn trim_word(word: &str) -> &str {
    word.trim_matches(|c: char| matches!(c, ',' | '.' | '?' | '!' | ':' | ';' | '"' | '\''))
}
