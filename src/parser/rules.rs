//! Prioritized intent classification rules.
//!
//! The table is evaluated top to bottom and the first matching rule wins, so
//! priority is a property of the data, not of code placement. More specific
//! command types sit ahead of general ones that share vocabulary: the
//! privacy-bridge rules must come before the generic bridge rule (both
//! contain "bridge"), payment before transfer ("pay" vs "send"), and
//! balance before the catch-all research phrasings ("what is my balance").

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::CommandType;

/// A single classification rule: pattern, resulting command type, and the
/// confidence floor reported when it matches. Confidence is an opaque
/// per-rule value, not a calibrated probability.
pub struct IntentRule {
    pub id: &'static str,
    pub command_type: CommandType,
    pattern: Regex,
    pub confidence: f32,
}

impl IntentRule {
    fn new(id: &'static str, command_type: CommandType, pattern: &str, confidence: f32) -> Self {
        IntentRule {
            id,
            command_type,
            pattern: Regex::new(pattern).unwrap(),
            confidence,
        }
    }

    pub fn matches(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }
}

static RULES: Lazy<Vec<IntentRule>> = Lazy::new(|| {
    vec![
        // Privacy bridging ahead of the generic bridge rule
        IntentRule::new(
            "privacy.bridge_to_zcash",
            CommandType::BridgeToPrivacy,
            r"\bbridge\b.*\bzcash\b",
            0.95,
        ),
        IntentRule::new(
            "privacy.make_private",
            CommandType::BridgeToPrivacy,
            r"\bmake\b.*\bprivate\b",
            0.85,
        ),
        IntentRule::new(
            "privacy.shield",
            CommandType::BridgeToPrivacy,
            r"\b(?:shield|privacy bridge)\b",
            0.8,
        ),
        IntentRule::new("bridge.generic", CommandType::Bridge, r"\bbridge\b", 0.85),
        IntentRule::new("swap.swap", CommandType::Swap, r"\bswap\b", 0.9),
        IntentRule::new(
            "swap.convert",
            CommandType::Swap,
            r"\b(?:convert|exchange)\b.*\b(?:to|for|into)\b",
            0.75,
        ),
        IntentRule::new(
            "swap.buy_with",
            CommandType::Swap,
            r"\bbuy\b.*\b(?:with|using)\b",
            0.7,
        ),
        // Payment ahead of transfer: "pay" is more specific than "send"
        IntentRule::new("payment.pay", CommandType::Payment, r"\bpay\b", 0.85),
        IntentRule::new(
            "transfer.send",
            CommandType::Transfer,
            r"\b(?:send|transfer)\b",
            0.85,
        ),
        // Balance ahead of the loose research phrasings
        IntentRule::new("balance.balance", CommandType::Balance, r"\bbalance\b", 0.9),
        IntentRule::new(
            "balance.how_much",
            CommandType::Balance,
            r"\bhow much\b.*\b(?:have|hold|holding|wallet)\b",
            0.7,
        ),
        IntentRule::new(
            "portfolio.portfolio",
            CommandType::PortfolioAnalysis,
            r"\bportfolio\b",
            0.9,
        ),
        IntentRule::new(
            "portfolio.holdings",
            CommandType::PortfolioAnalysis,
            r"\banaly[sz]e\b.*\b(?:holdings|assets)\b",
            0.75,
        ),
        IntentRule::new(
            "research.research",
            CommandType::ProtocolResearch,
            r"\bresearch\b",
            0.9,
        ),
        IntentRule::new(
            "research.tell_me",
            CommandType::ProtocolResearch,
            r"\b(?:tell me about|what is|explain)\b",
            0.6,
        ),
    ]
});

/// The full rule table in evaluation order
pub fn rules() -> &'static [IntentRule] {
    &RULES
}

/// First rule whose pattern matches; later rules are never tried
pub fn first_match(text: &str) -> Option<&'static IntentRule> {
    RULES.iter().find(|rule| rule.matches(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn privacy_rules_precede_generic_bridge() {
        let privacy_idx = RULES
            .iter()
            .position(|r| r.command_type == CommandType::BridgeToPrivacy)
            .unwrap();
        let bridge_idx = RULES.iter().position(|r| r.id == "bridge.generic").unwrap();
        assert!(privacy_idx < bridge_idx);
    }

    #[test]
    fn bridge_to_zcash_never_matches_generic_bridge() {
        let rule = first_match("bridge 1 eth to zcash").unwrap();
        assert_eq!(rule.command_type, CommandType::BridgeToPrivacy);
        assert_eq!(rule.id, "privacy.bridge_to_zcash");
    }

    #[test]
    fn make_private_classifies_as_privacy() {
        let rule = first_match("make my eth private").unwrap();
        assert_eq!(rule.command_type, CommandType::BridgeToPrivacy);
    }

    #[test]
    fn pay_beats_send() {
        let rule = first_match("pay 5 usdc to 0xabc").unwrap();
        assert_eq!(rule.command_type, CommandType::Payment);
        let rule = first_match("send 5 usdc to 0xabc").unwrap();
        assert_eq!(rule.command_type, CommandType::Transfer);
    }

    #[test]
    fn balance_question_is_not_research() {
        let rule = first_match("what is my balance").unwrap();
        assert_eq!(rule.command_type, CommandType::Balance);
    }

    #[test]
    fn unmatched_text_has_no_rule() {
        assert!(first_match("hello there").is_none());
    }
}
