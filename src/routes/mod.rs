//! API routes

use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Serialize;

use crate::providers::{AssistantReply, AssistantRequest};
use crate::AppState;

#[derive(Debug, Serialize)]
struct RootResponse {
    message: &'static str,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Heritage Square File Assistant API is running.",
    })
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Always answers 200 with a `response` field; failures are described in it
async fn chat(
    State(state): State<AppState>,
    Json(request): Json<AssistantRequest>,
) -> Json<AssistantReply> {
    let text = match state.commands.handle(&request.text).await {
        Ok(text) => text,
        Err(e) => {
            tracing::error!("Command failed: {}", e);
            format!("Internal server error: {}", e)
        }
    };

    Json(AssistantReply::response(text))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/chat", post(chat))
}
