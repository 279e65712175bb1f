use serde::Serialize;
use thiserror::Error;

use crate::models::CommandType;

/// The specific way a step-completion or cancel collided with flow state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FlowStateKind {
    /// The reported step is not the one currently awaiting a signature
    OutOfOrder,
    /// The flow passed its deadline before the step was reported
    Expired,
    /// The flow already reached a terminal state
    Terminal,
    NotFound,
}

/// Error taxonomy for the parse/dispatch/flow pipeline.
///
/// Parse ambiguity is deliberately absent: a command no rule matches is a
/// valid UNKNOWN classification resolved into a clarification response, not
/// a fault.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Bad or missing command parameter. The user must resubmit.
    #[error("validation error: {0}")]
    Validation(String),

    /// Upstream quote/bridge/price provider failed. Retryable when the
    /// failure was a timeout or a server-side error.
    #[error("adapter error: {message}")]
    Adapter { message: String, retryable: bool },

    /// Step completion collided with the flow's state. The flow is left
    /// unmutated; silently reordering steps would break the ordering
    /// invariant.
    #[error("flow state error: {0}")]
    FlowState(FlowStateKind),

    /// The stored flow version advanced since the caller last read it.
    /// Re-fetch and retry.
    #[error("flow was modified concurrently, re-fetch and retry")]
    StaleVersion,

    /// An active flow already exists for this wallet and chain. Resume it,
    /// cancel it, or create with replace=true.
    #[error("an active flow already exists for this wallet and chain")]
    Conflict { active_flow_id: String },

    /// Persistence unavailable. Fatal for this request; the flow itself
    /// remains intact and recoverable once storage returns.
    #[error("storage error: {0}")]
    Storage(String),

    /// No handler registered for a parsed command type. Unreachable given
    /// the default registry; kept as a guard against partial registration.
    #[error("no handler registered for command type '{0}'")]
    Unroutable(CommandType),
}

impl EngineError {
    pub fn validation(message: impl Into<String>) -> Self {
        EngineError::Validation(message.into())
    }

    pub fn adapter(message: impl Into<String>, retryable: bool) -> Self {
        EngineError::Adapter {
            message: message.into(),
            retryable,
        }
    }

    /// Whether the caller may re-issue the same request without changes.
    pub fn retryable(&self) -> bool {
        match self {
            EngineError::Adapter { retryable, .. } => *retryable,
            EngineError::StaleVersion | EngineError::Storage(_) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(EngineError::adapter("quote service 502", true).retryable());
        assert!(!EngineError::adapter("unknown token pair", false).retryable());
        assert!(EngineError::StaleVersion.retryable());
        assert!(EngineError::Storage("db locked".to_string()).retryable());
        assert!(!EngineError::validation("missing amount").retryable());
        assert!(!EngineError::FlowState(FlowStateKind::OutOfOrder).retryable());
    }

    #[test]
    fn flow_state_kind_display() {
        assert_eq!(FlowStateKind::OutOfOrder.to_string(), "out_of_order");
        assert_eq!(FlowStateKind::Expired.to_string(), "expired");
    }
}
