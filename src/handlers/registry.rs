use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::EngineError;
use crate::models::{CommandType, Intent};

use super::types::{HandlerContext, HandlerResult};

/// Trait every domain handler implements.
///
/// Handlers are pure request/response: they validate their own parameters,
/// call external providers, and return a result or a typed error. They
/// never touch the flow store; promoting steps into a flow is the
/// processor's job.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// The command type this handler serves
    fn command_type(&self) -> CommandType;

    async fn handle(
        &self,
        intent: &Intent,
        ctx: &HandlerContext,
    ) -> Result<HandlerResult, EngineError>;
}

/// Registry mapping command types to their handlers. Dispatch is a lookup,
/// not a branch chain; adding a handler never touches the processor.
pub struct HandlerRegistry {
    handlers: HashMap<CommandType, Arc<dyn CommandHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        HandlerRegistry {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler under its own command type
    pub fn register(&mut self, handler: Arc<dyn CommandHandler>) {
        self.handlers.insert(handler.command_type(), handler);
    }

    pub fn get(&self, command_type: CommandType) -> Option<Arc<dyn CommandHandler>> {
        self.handlers.get(&command_type).cloned()
    }

    pub fn has(&self, command_type: CommandType) -> bool {
        self.handlers.contains_key(&command_type)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
