use serde::{Deserialize, Serialize};

/// Command categories the parser can classify into
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CommandType {
    Swap,
    Bridge,
    BridgeToPrivacy,
    Transfer,
    Payment,
    PortfolioAnalysis,
    ProtocolResearch,
    Balance,
    Unknown,
}

/// Structured, typed interpretation of a raw user command.
///
/// Produced once per command by the parser and consumed immediately by the
/// command processor; never mutated after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    pub command_type: CommandType,
    /// Extracted amount. In tokens unless `amount_is_usd` is set.
    pub amount: Option<f64>,
    /// Whether the amount was denominated in USD ("$100", "100 usd").
    /// USD-to-token conversion happens in the handlers, never here.
    pub amount_is_usd: bool,
    pub token_in: Option<String>,
    pub token_out: Option<String>,
    pub source_chain: Option<String>,
    pub dest_chain: Option<String>,
    pub recipient: Option<String>,
    /// Confidence floor of the rule that matched, 0.0 for unmatched text.
    pub confidence: f32,
    pub matched_rule_id: Option<String>,
    pub raw_text: String,
}

impl Intent {
    /// Terminal classification for text no rule matched. Not an error;
    /// downstream code turns this into a clarification response.
    pub fn unknown(raw_text: &str) -> Self {
        Intent {
            command_type: CommandType::Unknown,
            amount: None,
            amount_is_usd: false,
            token_in: None,
            token_out: None,
            source_chain: None,
            dest_chain: None,
            recipient: None,
            confidence: 0.0,
            matched_rule_id: None,
            raw_text: raw_text.to_string(),
        }
    }
}
