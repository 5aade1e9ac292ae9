use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::dto::quiz_dto::{CreateQuizRequest, GrantAccessRequest, QuizSummary, TelegramIdQuery};
use crate::models::quiz::STATUS_PUBLIC;
use crate::routes::session_routes::require_participant;
use crate::AppState;

#[axum::debug_handler]
pub async fn list_quizzes(State(state): State<AppState>) -> crate::error::Result<Response> {
    let names = state.quiz_service.list_public_quiz_names().await?;
    Ok(Json(json!({ "quizzes": names })).into_response())
}

#[axum::debug_handler]
pub async fn create_quiz(
    State(state): State<AppState>,
    Json(req): Json<CreateQuizRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;

    let owner = state
        .participant_service
        .get_or_create(req.telegram_id, None, None, None)
        .await?;
    let status = req.status.as_deref().unwrap_or(STATUS_PUBLIC);
    let quiz = state
        .quiz_service
        .create_quiz(owner.id, req.name.trim(), &req.sheet_url, status)
        .await?;

    tracing::info!("Quiz '{}' created by participant {}", quiz.name, owner.id);
    Ok(Json(QuizSummary::from(quiz)).into_response())
}

/// Quizzes the participant has taken at least once.
#[axum::debug_handler]
pub async fn list_participated(
    State(state): State<AppState>,
    Query(query): Query<TelegramIdQuery>,
) -> crate::error::Result<Response> {
    let participant = require_participant(&state, query.telegram_id).await?;
    let quizzes = state.quiz_service.list_participated(participant.id).await?;
    let summaries: Vec<QuizSummary> = quizzes.into_iter().map(QuizSummary::from).collect();
    Ok(Json(json!({ "quizzes": summaries })).into_response())
}

#[axum::debug_handler]
pub async fn grant_access(
    State(state): State<AppState>,
    Path(quiz_id): Path<Uuid>,
    Json(req): Json<GrantAccessRequest>,
) -> crate::error::Result<Response> {
    let granter = require_participant(&state, req.telegram_id).await?;
    let grantee = state
        .participant_service
        .get_or_create(req.grantee_telegram_id, None, None, None)
        .await?;

    let grant = state
        .quiz_service
        .grant_access(quiz_id, granter.id, grantee.id, &req.access_type)
        .await?;

    tracing::info!(
        "Access '{}' on quiz {} granted to participant {}",
        grant.access_type,
        grant.quiz_id,
        grantee.id
    );
    Ok(Json(grant).into_response())
}
