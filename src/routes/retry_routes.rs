use axum::{
    extract::{Query, State},
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use validator::Validate;

use crate::dto::quiz_dto::TelegramIdQuery;
use crate::dto::session_dto::{AnswerRequest, ClearRetryRequest, SessionReply, StartRetryRequest};
use crate::routes::session_routes::require_participant;
use crate::AppState;

/// Finished attempts with missed questions still on record.
#[axum::debug_handler]
pub async fn list_retryable(
    State(state): State<AppState>,
    Query(query): Query<TelegramIdQuery>,
) -> crate::error::Result<Response> {
    let participant = require_participant(&state, query.telegram_id).await?;
    let scores = state.retry_service.list_retryable(participant.id).await?;
    Ok(Json(json!({ "scores": scores })).into_response())
}

#[axum::debug_handler]
pub async fn start_retry(
    State(state): State<AppState>,
    Json(req): Json<StartRetryRequest>,
) -> crate::error::Result<Response> {
    let participant = require_participant(&state, req.telegram_id).await?;
    let started = state
        .retry_service
        .start_retry(participant.id, req.score_id)
        .await?;
    Ok(Json(SessionReply::from(started)).into_response())
}

#[axum::debug_handler]
pub async fn submit_retry_answer(
    State(state): State<AppState>,
    Json(req): Json<AnswerRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;

    let participant = require_participant(&state, req.telegram_id).await?;
    let outcome = state
        .retry_service
        .submit_answer(participant.id, &req.answer)
        .await?;
    Ok(Json(SessionReply::from(outcome)).into_response())
}

#[axum::debug_handler]
pub async fn retry_status(
    State(state): State<AppState>,
    Query(query): Query<TelegramIdQuery>,
) -> crate::error::Result<Response> {
    let participant = require_participant(&state, query.telegram_id).await?;
    let status = state.retry_service.status(participant.id).await?;
    Ok(Json(status).into_response())
}

#[axum::debug_handler]
pub async fn clear_retry(
    State(state): State<AppState>,
    Json(req): Json<ClearRetryRequest>,
) -> crate::error::Result<Response> {
    let participant = require_participant(&state, req.telegram_id).await?;
    state.retry_service.clear_session(participant.id).await?;
    Ok(Json(json!({ "cleared": true })).into_response())
}
