//! Chat endpoints

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use super::{ApiError, ApiState, CurrentUser};
use crate::chat::Message;

#[derive(Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Serialize)]
pub struct ChatResponse {
    pub reply: String,
}

#[derive(Serialize)]
pub struct HistoryResponse {
    pub messages: Vec<Message>,
}

/// Send a message and wait for the assistant's reply
async fn send(
    State(state): State<Arc<ApiState>>,
    user: CurrentUser,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let identity = user.require()?;
    let pipeline = state.sessions.pipeline_for(&identity).await;
    let mut pipeline = pipeline.lock().await;

    let reply = pipeline.submit(&req.message).await?;
    Ok(Json(ChatResponse { reply }))
}

/// Visible history for the caller
async fn history(
    State(state): State<Arc<ApiState>>,
    user: CurrentUser,
) -> Result<Json<HistoryResponse>, ApiError> {
    let identity = user.require()?;
    let pipeline = state.sessions.pipeline_for(&identity).await;
    let mut pipeline = pipeline.lock().await;

    let messages = pipeline.load_history().await?;
    Ok(Json(HistoryResponse { messages }))
}

/// Reset the caller's conversation
async fn clear(
    State(state): State<Arc<ApiState>>,
    user: CurrentUser,
) -> Result<StatusCode, ApiError> {
    let identity = user.require()?;
    let pipeline = state.sessions.pipeline_for(&identity).await;
    let mut pipeline = pipeline.lock().await;

    pipeline.clear().await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Build chat router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/", post(send))
        .route("/history", get(history).delete(clear))
        .with_state(state)
}
