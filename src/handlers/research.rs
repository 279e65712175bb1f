use std::sync::Arc;

use async_trait::async_trait;

use crate::adapters::ResearchProvider;
use crate::error::EngineError;
use crate::models::{CommandType, Intent};

use super::types::{HandlerContext, HandlerResult};
use super::CommandHandler;

/// Leading phrases stripped to recover the research topic
const TOPIC_PREFIXES: &[&str] = &["research", "tell me about", "what is", "explain"];

/// Protocol research: forward the topic to the research provider and relay
/// its summary verbatim.
pub struct ResearchHandler {
    research: Arc<dyn ResearchProvider>,
}

impl ResearchHandler {
    pub fn new(research: Arc<dyn ResearchProvider>) -> Self {
        ResearchHandler { research }
    }

    fn topic_from(text: &str) -> String {
        let mut topic = text.trim().to_lowercase();
        for prefix in TOPIC_PREFIXES {
            if let Some(rest) = topic.strip_prefix(prefix) {
                topic = rest.trim().to_string();
                break;
            }
        }
        topic.trim_end_matches(['?', '.', '!']).trim().to_string()
    }
}

#[async_trait]
impl CommandHandler for ResearchHandler {
    fn command_type(&self) -> CommandType {
        CommandType::ProtocolResearch
    }

    async fn handle(
        &self,
        intent: &Intent,
        _ctx: &HandlerContext,
    ) -> Result<HandlerResult, EngineError> {
        let topic = Self::topic_from(&intent.raw_text);
        if topic.is_empty() {
            return Err(EngineError::validation(
                "could not determine what to research",
            ));
        }

        log::info!("[research] topic: {}", topic);
        let summary = self.research.research(&topic).await?;
        Ok(HandlerResult::answer(summary))
    }
}
