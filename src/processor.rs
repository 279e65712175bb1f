//! The command processor: parse, dispatch to the registered handler, and
//! promote multi-step results into flows.
//!
//! The client is never handed more than one unconfirmed step at a time:
//! a created flow returns only its first step payload, and the rest are
//! released one by one through step completions.

use std::sync::Arc;

use serde::Serialize;

use crate::error::EngineError;
use crate::flow::FlowEngine;
use crate::handlers::{HandlerContext, HandlerRegistry, HandlerResult};
use crate::models::{Command, CommandType, OwnerKey, TransactionStep};
use crate::parser::{self, ParseContext};

/// What a processed command produced, as returned to the caller
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProcessOutcome {
    /// Informational response, nothing to sign
    Answer {
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<serde_json::Value>,
    },
    /// The command could not be classified; ask the user to rephrase
    Clarification { text: String },
    /// Steps proposed, awaiting explicit user approval; no flow exists yet
    Confirmation {
        summary: String,
        steps: Vec<TransactionStep>,
    },
    /// A flow was created; the client signs one step at a time
    FlowCreated {
        flow_id: String,
        summary: String,
        next_step: TransactionStep,
    },
}

pub struct CommandProcessor {
    registry: HandlerRegistry,
    flow_engine: Arc<FlowEngine>,
}

impl CommandProcessor {
    pub fn new(registry: HandlerRegistry, flow_engine: Arc<FlowEngine>) -> Self {
        CommandProcessor {
            registry,
            flow_engine,
        }
    }

    pub async fn process(
        &self,
        command: &Command,
        replace: bool,
    ) -> Result<ProcessOutcome, EngineError> {
        let intent = parser::parse(
            &command.text,
            &ParseContext {
                default_chain_id: command.chain_id,
            },
        );
        log::info!(
            "[processor] \"{}\" -> {} (confidence {:.2}, rule {})",
            command.text,
            intent.command_type,
            intent.confidence,
            intent.matched_rule_id.as_deref().unwrap_or("-")
        );

        // A valid terminal classification, resolved locally, never a fault
        if intent.command_type == CommandType::Unknown {
            return Ok(ProcessOutcome::Clarification {
                text: clarification(&command.text),
            });
        }

        let handler = self.registry.get(intent.command_type).ok_or_else(|| {
            log::error!(
                "[processor] no handler registered for {}",
                intent.command_type
            );
            EngineError::Unroutable(intent.command_type)
        })?;

        let ctx = HandlerContext {
            wallet_address: command.wallet_address.clone(),
            chain_id: command.chain_id,
            platform: command.platform,
        };

        match handler.handle(&intent, &ctx).await? {
            HandlerResult::Answer { text, data } => Ok(ProcessOutcome::Answer { text, data }),
            HandlerResult::Confirmation { summary, steps } => {
                Ok(ProcessOutcome::Confirmation { summary, steps })
            }
            HandlerResult::FlowSpec { summary, steps } => {
                let owner = OwnerKey::new(&command.wallet_address, command.chain_id);
                let flow = self.flow_engine.create(&owner, intent, steps, replace).await?;
                let next_step = flow.current_step().cloned().ok_or_else(|| {
                    EngineError::Storage("freshly created flow has no pending step".to_string())
                })?;
                Ok(ProcessOutcome::FlowCreated {
                    flow_id: flow.flow_id,
                    summary,
                    next_step,
                })
            }
        }
    }
}

fn clarification(text: &str) -> String {
    format!(
        "I couldn't work out what you want to do from \"{}\". Try something like \
         \"swap 10 USDC for ETH\", \"bridge 1 USDC from Base to Optimism\", or \
         \"show my balance\".",
        text
    )
}
