use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const STATUS_PUBLIC: &str = "public";
pub const STATUS_PRIVATE: &str = "private";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Quiz {
    pub id: Uuid,
    pub name: String,
    pub sheet_url: String,
    pub status: String,
    pub owner_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Quiz {
    pub fn is_public(&self) -> bool {
        self.status == STATUS_PUBLIC
    }

    pub fn is_owned_by(&self, participant_id: Uuid) -> bool {
        self.owner_id == Some(participant_id)
    }
}
