use crate::error::{Error, Result};
use crate::models::question::Question;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

/// Transient progress cursor for an in-progress attempt. The question list
/// is frozen at quiz start so mid-quiz sheet edits cannot corrupt it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct QuizSession {
    pub id: Uuid,
    pub participant_id: Uuid,
    pub quiz_id: Uuid,
    pub score_id: Uuid,
    pub question_index: i32,
    pub score: i32,
    pub active: bool,
    pub questions: JsonValue,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl QuizSession {
    pub fn question_list(&self) -> Result<Vec<Question>> {
        serde_json::from_value(self.questions.clone()).map_err(|e| {
            Error::Internal(format!("Corrupt question snapshot on session {}: {}", self.id, e))
        })
    }
}
