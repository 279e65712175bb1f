pub mod commands;
pub mod flows;
pub mod health;

use actix_web::HttpResponse;

use crate::error::{EngineError, FlowStateKind};

/// Map an engine error onto the HTTP surface. Bodies always carry the
/// message and whether the same request may be re-issued verbatim.
pub(crate) fn error_response(err: &EngineError) -> HttpResponse {
    let body = serde_json::json!({
        "error": err.to_string(),
        "retryable": err.retryable(),
    });

    match err {
        EngineError::Validation(_) => HttpResponse::BadRequest().json(body),
        EngineError::FlowState(FlowStateKind::NotFound) => HttpResponse::NotFound().json(body),
        EngineError::FlowState(kind) => HttpResponse::Conflict().json(serde_json::json!({
            "error": err.to_string(),
            "kind": kind,
            "retryable": err.retryable(),
        })),
        EngineError::StaleVersion => HttpResponse::Conflict().json(body),
        EngineError::Conflict { active_flow_id } => {
            HttpResponse::Conflict().json(serde_json::json!({
                "error": err.to_string(),
                "active_flow_id": active_flow_id,
                "retryable": false,
            }))
        }
        EngineError::Adapter { .. } => HttpResponse::BadGateway().json(body),
        EngineError::Storage(_) | EngineError::Unroutable(_) => {
            HttpResponse::InternalServerError().json(body)
        }
    }
}
