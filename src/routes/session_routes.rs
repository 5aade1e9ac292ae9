use axum::{
    extract::State,
    response::{IntoResponse, Json, Response},
};
use validator::Validate;

use crate::dto::session_dto::{AnswerRequest, ResumeRequest, SessionReply, StartQuizRequest};
use crate::error::Error;
use crate::models::participant::Participant;
use crate::AppState;

pub(crate) async fn require_participant(
    state: &AppState,
    telegram_id: i64,
) -> crate::error::Result<Participant> {
    state
        .participant_service
        .get_by_telegram_id(telegram_id)
        .await?
        .ok_or_else(|| Error::NotFound("Unknown participant".to_string()))
}

#[axum::debug_handler]
pub async fn start_quiz(
    State(state): State<AppState>,
    Json(req): Json<StartQuizRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;

    let participant = state
        .participant_service
        .get_or_create(
            req.telegram_id,
            req.username.as_deref(),
            req.first_name.as_deref(),
            req.last_name.as_deref(),
        )
        .await?;

    let started = state
        .session_service
        .start_quiz(participant.id, req.quiz_name.trim())
        .await?;
    Ok(Json(SessionReply::from(started)).into_response())
}

#[axum::debug_handler]
pub async fn submit_answer(
    State(state): State<AppState>,
    Json(req): Json<AnswerRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;

    let participant = require_participant(&state, req.telegram_id).await?;
    let outcome = state
        .session_service
        .submit_answer(participant.id, &req.answer)
        .await?;
    Ok(Json(SessionReply::from(outcome)).into_response())
}

#[axum::debug_handler]
pub async fn resume_quiz(
    State(state): State<AppState>,
    Json(req): Json<ResumeRequest>,
) -> crate::error::Result<Response> {
    let participant = require_participant(&state, req.telegram_id).await?;
    let resumed = state.session_service.resume(participant.id).await?;
    Ok(Json(SessionReply::from(resumed)).into_response())
}
