use crate::error::Result;
use crate::models::participant::Participant;
use sqlx::PgPool;

#[derive(Clone)]
pub struct ParticipantService {
    pool: PgPool,
}

impl ParticipantService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_by_telegram_id(&self, telegram_id: i64) -> Result<Option<Participant>> {
        let participant = sqlx::query_as::<_, Participant>(
            r#"SELECT * FROM participants WHERE telegram_id = $1"#,
        )
        .bind(telegram_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(participant)
    }

    /// Participants are created on first contact. A returning participant
    /// keeps existing profile fields unless the caller supplies fresh ones.
    pub async fn get_or_create(
        &self,
        telegram_id: i64,
        username: Option<&str>,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> Result<Participant> {
        let participant = sqlx::query_as::<_, Participant>(
            r#"
            INSERT INTO participants (telegram_id, username, first_name, last_name)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (telegram_id) DO UPDATE SET
                username = COALESCE(EXCLUDED.username, participants.username),
                first_name = COALESCE(EXCLUDED.first_name, participants.first_name),
                last_name = COALESCE(EXCLUDED.last_name, participants.last_name)
            RETURNING *
            "#,
        )
        .bind(telegram_id)
        .bind(username)
        .bind(first_name)
        .bind(last_name)
        .fetch_one(&self.pool)
        .await?;
        Ok(participant)
    }
}
