use serde::Serialize;

use crate::models::{Platform, TransactionStep};

/// Per-request context a handler needs beyond the intent itself
#[derive(Debug, Clone)]
pub struct HandlerContext {
    pub wallet_address: String,
    pub chain_id: u64,
    pub platform: Platform,
}

/// What a domain handler produced.
///
/// Ephemeral: never persisted beyond the request/response cycle except when
/// a `FlowSpec` is promoted into a flow by the processor.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HandlerResult {
    /// Informational response, no on-chain action
    Answer {
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<serde_json::Value>,
    },
    /// Proposed steps awaiting explicit user approval before any flow exists
    Confirmation {
        summary: String,
        steps: Vec<TransactionStep>,
    },
    /// Ordered steps ready to execute as a flow
    FlowSpec {
        summary: String,
        steps: Vec<TransactionStep>,
    },
}

impl HandlerResult {
    pub fn answer(text: impl Into<String>) -> Self {
        HandlerResult::Answer {
            text: text.into(),
            data: None,
        }
    }

    pub fn answer_with_data(text: impl Into<String>, data: serde_json::Value) -> Self {
        HandlerResult::Answer {
            text: text.into(),
            data: Some(data),
        }
    }
}
