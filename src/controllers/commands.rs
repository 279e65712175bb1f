//! Command intake endpoint.
//!
//! `POST /api/commands`: parse a free-text command, dispatch it, and
//! return either a textual answer, a confirmation proposal, or the id and
//! first step of a freshly created transaction flow.

use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::handlers::is_address;
use crate::models::{Command, Platform};
use crate::AppState;

use super::error_response;

#[derive(Debug, Deserialize)]
struct ProcessCommandRequest {
    text: String,
    wallet_address: String,
    chain_id: u64,
    #[serde(default)]
    platform: Platform,
    /// Cancel and replace an active flow instead of failing with a conflict
    #[serde(default)]
    replace: bool,
}

async fn process_command(
    state: web::Data<AppState>,
    body: web::Json<ProcessCommandRequest>,
) -> HttpResponse {
    if body.text.trim().is_empty() {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "error": "text must not be empty",
            "retryable": false,
        }));
    }
    if !is_address(&body.wallet_address) {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "error": format!("invalid wallet address: {}", body.wallet_address),
            "retryable": false,
        }));
    }

    let command = Command::new(&body.text, body.platform, &body.wallet_address, body.chain_id);
    match state.processor.process(&command, body.replace).await {
        Ok(outcome) => HttpResponse::Ok().json(outcome),
        Err(e) => error_response(&e),
    }
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/api/commands").route(web::post().to(process_command)));
}
