//! Flow lifecycle endpoints.
//!
//! - `GET  /api/flows/active?wallet_address=&chain_id=`: the owner's flow
//! - `POST /api/flows/{flow_id}/steps/{step_index}/submitted`: tx broadcast
//! - `POST /api/flows/{flow_id}/steps/{step_index}/complete`: tx confirmed
//!   or failed; returns the next step to sign, if any
//! - `POST /api/flows/{flow_id}/cancel`

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::models::{FlowStatus, OwnerKey, TransactionFlow, TransactionStep};
use crate::AppState;

use super::error_response;

#[derive(Debug, Deserialize)]
struct ActiveFlowQuery {
    wallet_address: String,
    chain_id: u64,
}

#[derive(Debug, Deserialize)]
struct SubmitStepRequest {
    tx_hash: String,
}

#[derive(Debug, Deserialize)]
struct CompleteStepRequest {
    tx_hash: String,
    success: bool,
}

/// Step-advance response: the flow's status and the next step to sign,
/// absent when the flow reached a terminal state
#[derive(Debug, Serialize)]
struct StepAdvanceResponse {
    flow_id: String,
    status: FlowStatus,
    current_step_index: usize,
    next_step: Option<TransactionStep>,
}

impl StepAdvanceResponse {
    fn from_flow(flow: &TransactionFlow) -> Self {
        StepAdvanceResponse {
            flow_id: flow.flow_id.clone(),
            status: flow.status,
            current_step_index: flow.current_step_index,
            next_step: flow.current_step().cloned(),
        }
    }
}

async fn get_active_flow(
    state: web::Data<AppState>,
    query: web::Query<ActiveFlowQuery>,
) -> HttpResponse {
    let owner = OwnerKey::new(&query.wallet_address, query.chain_id);
    match state.flow_engine.get_active(&owner).await {
        Ok(Some(flow)) => HttpResponse::Ok().json(flow),
        Ok(None) => HttpResponse::NotFound().json(serde_json::json!({
            "error": "no active flow for this wallet and chain",
        })),
        Err(e) => error_response(&e),
    }
}

async fn submit_step(
    state: web::Data<AppState>,
    path: web::Path<(String, usize)>,
    body: web::Json<SubmitStepRequest>,
) -> HttpResponse {
    let (flow_id, step_index) = path.into_inner();
    if body.tx_hash.trim().is_empty() {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "error": "tx_hash must not be empty",
            "retryable": false,
        }));
    }

    match state
        .flow_engine
        .mark_step_submitted(&flow_id, step_index, &body.tx_hash)
        .await
    {
        Ok(flow) => HttpResponse::Ok().json(StepAdvanceResponse::from_flow(&flow)),
        Err(e) => error_response(&e),
    }
}

async fn complete_step(
    state: web::Data<AppState>,
    path: web::Path<(String, usize)>,
    body: web::Json<CompleteStepRequest>,
) -> HttpResponse {
    let (flow_id, step_index) = path.into_inner();
    if body.tx_hash.trim().is_empty() {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "error": "tx_hash must not be empty",
            "retryable": false,
        }));
    }

    match state
        .flow_engine
        .complete_step(&flow_id, step_index, &body.tx_hash, body.success)
        .await
    {
        Ok(flow) => HttpResponse::Ok().json(StepAdvanceResponse::from_flow(&flow)),
        Err(e) => error_response(&e),
    }
}

async fn cancel_flow(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    let flow_id = path.into_inner();
    match state.flow_engine.cancel(&flow_id).await {
        Ok(flow) => HttpResponse::Ok().json(StepAdvanceResponse::from_flow(&flow)),
        Err(e) => error_response(&e),
    }
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/flows")
            .route("/active", web::get().to(get_active_flow))
            .route(
                "/{flow_id}/steps/{step_index}/submitted",
                web::post().to(submit_step),
            )
            .route(
                "/{flow_id}/steps/{step_index}/complete",
                web::post().to(complete_step),
            )
            .route("/{flow_id}/cancel", web::post().to(cancel_flow)),
    );
}
