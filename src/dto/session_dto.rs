use crate::models::question::QuestionView;
use crate::services::retry_service::{RetryOutcome, StartedRetry};
use crate::services::session_service::{AnswerOutcome, ResumedQuiz, StartedQuiz};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct StartQuizRequest {
    pub telegram_id: i64,
    #[validate(length(min = 1, message = "Quiz name is required"))]
    pub quiz_name: String,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AnswerRequest {
    pub telegram_id: i64,
    #[validate(length(min = 1, message = "Answer text is required"))]
    pub answer: String,
}

#[derive(Debug, Deserialize)]
pub struct ResumeRequest {
    pub telegram_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct StartRetryRequest {
    pub telegram_id: i64,
    pub score_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct ClearRetryRequest {
    pub telegram_id: i64,
}

/// Uniform reply shape for every session-flow endpoint. `type` tells the
/// client whether to render a question, feedback before the next question,
/// or a completion summary.
#[derive(Debug, Serialize)]
pub struct SessionReply {
    pub r#type: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<QuestionView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_questions: Option<i32>,
}

impl SessionReply {
    pub fn question(message: String, question: QuestionView, progress: String, session_id: Uuid) -> Self {
        Self {
            r#type: "question",
            message,
            question: Some(question),
            progress: Some(progress),
            session_id: Some(session_id),
            score: None,
            total_questions: None,
        }
    }

    pub fn completed(message: String, score: i32, total_questions: i32) -> Self {
        Self {
            r#type: "complete",
            message,
            question: None,
            progress: None,
            session_id: None,
            score: Some(score),
            total_questions: Some(total_questions),
        }
    }
}

impl From<StartedQuiz> for SessionReply {
    fn from(started: StartedQuiz) -> Self {
        Self::question(
            format!("Starting quiz '{}'", started.quiz_name),
            started.prompt.question,
            started.prompt.progress,
            started.prompt.session_id,
        )
    }
}

impl From<ResumedQuiz> for SessionReply {
    fn from(resumed: ResumedQuiz) -> Self {
        Self::question(
            format!("Resuming quiz '{}'", resumed.quiz_name),
            resumed.prompt.question,
            resumed.prompt.progress,
            resumed.prompt.session_id,
        )
    }
}

impl From<AnswerOutcome> for SessionReply {
    fn from(outcome: AnswerOutcome) -> Self {
        match outcome {
            AnswerOutcome::Feedback { feedback, next } => Self {
                r#type: "feedback",
                message: feedback,
                question: Some(next.question),
                progress: Some(next.progress),
                session_id: Some(next.session_id),
                score: None,
                total_questions: None,
            },
            AnswerOutcome::Completed {
                feedback,
                score,
                total_questions,
                ..
            } => Self::completed(
                format!("{} Quiz complete: {}/{}", feedback, score, total_questions),
                score,
                total_questions,
            ),
        }
    }
}

impl From<StartedRetry> for SessionReply {
    fn from(started: StartedRetry) -> Self {
        Self::question(
            format!("Retrying missed questions from '{}'", started.quiz_name),
            started.prompt.question,
            started.prompt.progress,
            started.prompt.session_id,
        )
    }
}

impl From<RetryOutcome> for SessionReply {
    fn from(outcome: RetryOutcome) -> Self {
        match outcome {
            RetryOutcome::Feedback { feedback, next } => Self {
                r#type: "feedback",
                message: feedback,
                question: Some(next.question),
                progress: Some(next.progress),
                session_id: Some(next.session_id),
                score: None,
                total_questions: None,
            },
            RetryOutcome::Completed {
                feedback,
                score,
                total_questions,
            } => Self::completed(
                format!("{} Retry complete: {}/{}", feedback, score, total_questions),
                score,
                total_questions,
            ),
        }
    }
}
