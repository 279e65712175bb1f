use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Channel a command arrived from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    Web,
    Telegram,
    Line,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Web => "web",
            Platform::Telegram => "telegram",
            Platform::Line => "line",
        }
    }
}

/// A raw user command as received from a channel. Immutable once received.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Command {
    pub text: String,
    pub platform: Platform,
    pub wallet_address: String,
    pub chain_id: u64,
    pub issued_at: DateTime<Utc>,
}

impl Command {
    pub fn new(text: &str, platform: Platform, wallet_address: &str, chain_id: u64) -> Self {
        Command {
            text: text.to_string(),
            platform,
            wallet_address: wallet_address.to_string(),
            chain_id,
            issued_at: Utc::now(),
        }
    }
}
