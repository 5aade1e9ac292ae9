use crate::error::{Error, Result};
use crate::models::quiz::{Quiz, STATUS_PRIVATE, STATUS_PUBLIC};
use crate::models::quiz_access::{QuizAccess, ACCESS_FULL, ACCESS_PARTICIPATE};
use sqlx::PgPool;
use url::Url;
use uuid::Uuid;

#[derive(Clone)]
pub struct QuizService {
    pool: PgPool,
}

impl QuizService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Names of active public quizzes, for the selection keyboard.
    pub async fn list_public_quiz_names(&self) -> Result<Vec<String>> {
        let names = sqlx::query_scalar::<_, String>(
            r#"SELECT name FROM quizzes WHERE is_active AND status = $1 ORDER BY name"#,
        )
        .bind(STATUS_PUBLIC)
        .fetch_all(&self.pool)
        .await?;
        Ok(names)
    }

    pub async fn get_active_by_name(&self, name: &str) -> Result<Option<Quiz>> {
        let quiz = sqlx::query_as::<_, Quiz>(
            r#"SELECT * FROM quizzes WHERE name = $1 AND is_active"#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(quiz)
    }

    pub async fn get_by_id(&self, quiz_id: Uuid) -> Result<Quiz> {
        let quiz = sqlx::query_as::<_, Quiz>(r#"SELECT * FROM quizzes WHERE id = $1"#)
            .bind(quiz_id)
            .fetch_optional(&self.pool)
            .await?;
        quiz.ok_or_else(|| Error::NotFound("Quiz not found".to_string()))
    }

    pub async fn create_quiz(
        &self,
        owner_id: Uuid,
        name: &str,
        sheet_url: &str,
        status: &str,
    ) -> Result<Quiz> {
        if status != STATUS_PUBLIC && status != STATUS_PRIVATE {
            return Err(Error::BadRequest(format!(
                "Unknown quiz status '{}', expected 'public' or 'private'",
                status
            )));
        }
        let parsed = Url::parse(sheet_url)
            .map_err(|_| Error::BadRequest("Sheet URL is not a valid URL".to_string()))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(Error::BadRequest(
                "Only HTTP and HTTPS sheet URLs are allowed".to_string(),
            ));
        }

        let quiz = sqlx::query_as::<_, Quiz>(
            r#"
            INSERT INTO quizzes (name, sheet_url, status, owner_id)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(sheet_url)
        .bind(status)
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                Error::BadRequest(format!("A quiz named '{}' already exists", name))
            }
            _ => Error::from(e),
        })?;
        Ok(quiz)
    }

    /// Quizzes the participant has at least one score record in.
    pub async fn list_participated(&self, participant_id: Uuid) -> Result<Vec<Quiz>> {
        let quizzes = sqlx::query_as::<_, Quiz>(
            r#"
            SELECT DISTINCT q.* FROM quizzes q
            JOIN quiz_scores s ON s.quiz_id = q.id
            WHERE s.participant_id = $1
            ORDER BY q.name
            "#,
        )
        .bind(participant_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(quizzes)
    }

    async fn get_grant(
        &self,
        quiz_id: Uuid,
        participant_id: Uuid,
    ) -> Result<Option<QuizAccess>> {
        let grant = sqlx::query_as::<_, QuizAccess>(
            r#"SELECT * FROM quiz_access WHERE quiz_id = $1 AND participant_id = $2"#,
        )
        .bind(quiz_id)
        .bind(participant_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(grant)
    }

    /// Public quiz, ownership, or any explicit grant.
    pub async fn is_accessible_by(&self, quiz: &Quiz, participant_id: Uuid) -> Result<bool> {
        if quiz.is_public() || quiz.is_owned_by(participant_id) {
            return Ok(true);
        }
        Ok(self.get_grant(quiz.id, participant_id).await?.is_some())
    }

    /// Ownership or a full-access grant.
    pub async fn can_edit(&self, quiz: &Quiz, participant_id: Uuid) -> Result<bool> {
        if quiz.is_owned_by(participant_id) {
            return Ok(true);
        }
        let grant = self.get_grant(quiz.id, participant_id).await?;
        Ok(matches!(grant, Some(g) if g.access_type == ACCESS_FULL))
    }

    /// Idempotent upsert: granting an existing grantee a new level updates
    /// the row in place. Granting the owner to themselves is rejected.
    pub async fn grant_access(
        &self,
        quiz_id: Uuid,
        granter_id: Uuid,
        grantee_id: Uuid,
        access_type: &str,
    ) -> Result<QuizAccess> {
        if access_type != ACCESS_FULL && access_type != ACCESS_PARTICIPATE {
            return Err(Error::BadRequest(format!(
                "Unknown access type '{}', expected 'full_access' or 'participate'",
                access_type
            )));
        }

        let quiz = self.get_by_id(quiz_id).await?;
        if !self.can_edit(&quiz, granter_id).await? {
            return Err(Error::Forbidden(
                "Only the quiz owner or a full-access holder can grant access".to_string(),
            ));
        }
        if quiz.is_owned_by(grantee_id) {
            return Err(Error::BadRequest(
                "The quiz owner already has full access".to_string(),
            ));
        }

        let grant = sqlx::query_as::<_, QuizAccess>(
            r#"
            INSERT INTO quiz_access (quiz_id, participant_id, access_type, granted_by)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (quiz_id, participant_id) DO UPDATE SET
                access_type = EXCLUDED.access_type,
                granted_by = EXCLUDED.granted_by,
                granted_at = NOW()
            RETURNING *
            "#,
        )
        .bind(quiz_id)
        .bind(grantee_id)
        .bind(access_type)
        .bind(granter_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(grant)
    }
}
