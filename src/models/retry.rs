use crate::error::{Error, Result};
use crate::models::question::Question;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

/// Outcome of a retry-the-missed-questions attempt. `missed_indexes` are
/// 0-based positions into the question list snapshotted by the paired
/// retry session, in the original attempt's order.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RetryScore {
    pub id: Uuid,
    pub original_score_id: Uuid,
    pub participant_id: Uuid,
    pub missed_indexes: JsonValue,
    pub score: i32,
    pub total_questions: i32,
    pub question_index: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
}

impl RetryScore {
    pub fn index_list(&self) -> Result<Vec<usize>> {
        serde_json::from_value(self.missed_indexes.clone()).map_err(|e| {
            Error::Internal(format!("Corrupt retry index list on {}: {}", self.id, e))
        })
    }
}

/// Cursor + "am I expecting an answer right now" flag for the retry flow.
/// At most one active per participant.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RetrySession {
    pub id: Uuid,
    pub participant_id: Uuid,
    pub retry_score_id: Uuid,
    pub questions: JsonValue,
    pub active: bool,
    pub expecting_answer: bool,
    pub created_at: DateTime<Utc>,
}

impl RetrySession {
    pub fn question_list(&self) -> Result<Vec<Question>> {
        serde_json::from_value(self.questions.clone()).map_err(|e| {
            Error::Internal(format!(
                "Corrupt question snapshot on retry session {}: {}",
                self.id, e
            ))
        })
    }
}
