//! REST routes over the chat and chatbot services

use super::error::ApiError;
use super::state::AppState;
use crate::chat::{ChatOptions, ChatReply};
use crate::storage::{Chatbot, ChatbotUpdate, HistoryPage, Location, NewChatbot, PageRequest, UserFeedback};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

/// Register all API routes
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/api/chatbots", get(list_chatbots).post(create_chatbot))
        .route(
            "/api/chatbots/:id",
            get(get_chatbot).patch(update_chatbot).delete(delete_chatbot),
        )
        .route("/api/chatbots/:id/chat", post(chat))
        .route("/api/chatbots/:id/history", get(history))
        .route("/api/chat-logs/:id/feedback", post(feedback))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub location: Option<Location>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub feedback: UserFeedback,
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn chat(
    State(state): State<AppState>,
    Path(chatbot_id): Path<i64>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatReply>, ApiError> {
    let req = json_body(payload)?;
    let reply = state
        .chat
        .clone()
        .chat_detached(
            chatbot_id,
            req.message,
            ChatOptions {
                user_id: req.user_id,
                session_id: req.session_id,
                location: req.location,
            },
        )
        .await?;
    Ok(Json(reply))
}

async fn history(
    State(state): State<AppState>,
    Path(chatbot_id): Path<i64>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryPage>, ApiError> {
    let session_id = query.session_id.unwrap_or_default();
    let page = state
        .chat
        .get_history(
            chatbot_id,
            &session_id,
            PageRequest::new(query.page, query.limit),
        )
        .await?;
    Ok(Json(page))
}

async fn feedback(
    State(state): State<AppState>,
    Path(log_id): Path<i64>,
    payload: Result<Json<FeedbackRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let req = json_body(payload)?;
    state.chat.set_feedback(log_id, req.feedback).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_chatbots(State(state): State<AppState>) -> Result<Json<Vec<Chatbot>>, ApiError> {
    Ok(Json(state.chatbots.list().await?))
}

async fn create_chatbot(
    State(state): State<AppState>,
    payload: Result<Json<NewChatbot>, JsonRejection>,
) -> Result<(StatusCode, Json<Chatbot>), ApiError> {
    let new = json_body(payload)?;
    let chatbot = state.chatbots.provision(new).await?;
    Ok((StatusCode::CREATED, Json(chatbot)))
}

async fn get_chatbot(
    State(state): State<AppState>,
    Path(chatbot_id): Path<i64>,
) -> Result<Json<Chatbot>, ApiError> {
    Ok(Json(state.chatbots.get(chatbot_id).await?))
}

async fn update_chatbot(
    State(state): State<AppState>,
    Path(chatbot_id): Path<i64>,
    payload: Result<Json<ChatbotUpdate>, JsonRejection>,
) -> Result<Json<Chatbot>, ApiError> {
    let update = json_body(payload)?;
    Ok(Json(state.chatbots.update(chatbot_id, update).await?))
}

async fn delete_chatbot(
    State(state): State<AppState>,
    Path(chatbot_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.chatbots.delete(chatbot_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
