use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const ACCESS_FULL: &str = "full_access";
pub const ACCESS_PARTICIPATE: &str = "participate";

/// A grant of a capability on a quiz to a participant. One row per
/// (quiz, participant); re-granting updates the level in place.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct QuizAccess {
    pub id: Uuid,
    pub quiz_id: Uuid,
    pub participant_id: Uuid,
    pub access_type: String,
    pub granted_by: Option<Uuid>,
    pub granted_at: DateTime<Utc>,
}
