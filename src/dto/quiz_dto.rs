use crate::models::quiz::Quiz;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuizRequest {
    pub telegram_id: i64,
    #[validate(length(min = 1, max = 200, message = "Quiz name must be 1-200 characters"))]
    pub name: String,
    #[validate(url(message = "Sheet URL must be a valid URL"))]
    pub sheet_url: String,
    /// "public" or "private"; defaults to public.
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GrantAccessRequest {
    pub telegram_id: i64,
    pub grantee_telegram_id: i64,
    /// "full_access" or "participate".
    pub access_type: String,
}

/// Query-string identity for GET endpoints.
#[derive(Debug, Deserialize)]
pub struct TelegramIdQuery {
    pub telegram_id: i64,
}

#[derive(Debug, Serialize)]
pub struct QuizSummary {
    pub id: Uuid,
    pub name: String,
    pub status: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Quiz> for QuizSummary {
    fn from(quiz: Quiz) -> Self {
        Self {
            id: quiz.id,
            name: quiz.name,
            status: quiz.status,
            is_active: quiz.is_active,
            created_at: quiz.created_at,
        }
    }
}
