use crate::error::{Error, Result};
use crate::models::retry::{RetryScore, RetrySession};
use crate::models::score::{MissedList, QuizScore};
use crate::services::grading_service::{AnswerVerdict, GradingService};
use crate::services::quiz_service::QuizService;
use crate::services::session_service::QuestionPrompt;
use crate::services::sheet_service::SheetService;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

/// A finished score a participant can retry: it has at least one missed
/// question on record.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RetryableScore {
    pub id: Uuid,
    pub quiz_name: String,
    pub score: i32,
    pub total_questions: i32,
    pub missed_count: i64,
    pub end_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StartedRetry {
    pub quiz_name: String,
    pub retry_score_id: Uuid,
    pub prompt: QuestionPrompt,
}

#[derive(Debug, Clone, Serialize)]
pub enum RetryOutcome {
    Feedback {
        feedback: String,
        next: QuestionPrompt,
    },
    Completed {
        feedback: String,
        score: i32,
        total_questions: i32,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct RetryStatus {
    pub active: bool,
    pub expecting_answer: bool,
}

/// Replays only the questions a participant missed on a finished attempt.
/// A retry walks the recorded missed indexes against a snapshot of the
/// quiz content taken when the retry starts.
#[derive(Clone)]
pub struct RetryService {
    pool: PgPool,
    quizzes: QuizService,
    sheets: SheetService,
}

impl RetryService {
    pub fn new(pool: PgPool, quizzes: QuizService, sheets: SheetService) -> Self {
        Self {
            pool,
            quizzes,
            sheets,
        }
    }

    pub async fn list_retryable(&self, participant_id: Uuid) -> Result<Vec<RetryableScore>> {
        let scores = sqlx::query_as::<_, RetryableScore>(
            r#"
            SELECT s.id, q.name AS quiz_name, s.score, s.total_questions,
                   jsonb_array_length(s.missed_questions)::bigint AS missed_count, s.end_time
            FROM quiz_scores s
            JOIN quizzes q ON q.id = s.quiz_id
            WHERE s.participant_id = $1
              AND s.end_time IS NOT NULL
              AND jsonb_array_length(s.missed_questions) > 0
            ORDER BY s.end_time DESC
            "#,
        )
        .bind(participant_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(scores)
    }

    /// Every recorded index must still exist in the live question list. A
    /// single out-of-range index fails the whole retry start before any row
    /// is created.
    fn validate_indexes(quiz_name: &str, indexes: &[usize], live_len: usize) -> Result<()> {
        for &idx in indexes {
            if idx >= live_len {
                return Err(Error::ContentDrift(format!(
                    "Quiz '{}' has changed since this attempt; question {} no longer exists",
                    quiz_name,
                    idx + 1
                )));
            }
        }
        Ok(())
    }

    /// Starts a retry over the missed questions of `score_id`. The current
    /// sheet content is validated against every recorded index before
    /// anything is created; drifted content aborts the whole start.
    pub async fn start_retry(&self, participant_id: Uuid, score_id: Uuid) -> Result<StartedRetry> {
        let score = sqlx::query_as::<_, QuizScore>(r#"SELECT * FROM quiz_scores WHERE id = $1"#)
            .bind(score_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Score not found".to_string()))?;

        if score.participant_id != participant_id {
            return Err(Error::Forbidden(
                "That score belongs to another participant".to_string(),
            ));
        }
        if score.end_time.is_none() {
            return Err(Error::BadRequest(
                "Finish the quiz before retrying missed questions".to_string(),
            ));
        }

        let missed = MissedList::from_value(&score.missed_questions);
        if missed.is_empty() {
            return Err(Error::BadRequest(
                "That attempt has no missed questions to retry".to_string(),
            ));
        }
        let indexes = missed.zero_based_indexes()?;

        let quiz = self.quizzes.get_by_id(score.quiz_id).await?;
        let questions = self.sheets.fetch(&quiz.sheet_url).await?;
        Self::validate_indexes(&quiz.name, &indexes, questions.len())?;

        let snapshot = serde_json::to_value(&questions)?;
        let index_json = serde_json::to_value(&indexes)?;
        let total = indexes.len() as i32;

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"UPDATE retry_sessions SET active = FALSE, expecting_answer = FALSE
               WHERE participant_id = $1 AND active"#,
        )
        .bind(participant_id)
        .execute(&mut *tx)
        .await?;

        let retry_score = sqlx::query_as::<_, RetryScore>(
            r#"
            INSERT INTO retry_scores
                (original_score_id, participant_id, missed_indexes, total_questions)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(score.id)
        .bind(participant_id)
        .bind(&index_json)
        .bind(total)
        .fetch_one(&mut *tx)
        .await?;

        let session = sqlx::query_as::<_, RetrySession>(
            r#"
            INSERT INTO retry_sessions (participant_id, retry_score_id, questions)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(participant_id)
        .bind(retry_score.id)
        .bind(&snapshot)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            "Participant {} started retry of score {} ({} questions)",
            participant_id,
            score.id,
            total
        );

        Ok(StartedRetry {
            quiz_name: quiz.name,
            retry_score_id: retry_score.id,
            prompt: QuestionPrompt {
                question: questions[indexes[0]].view(),
                progress: format!("1 of {}", total),
                session_id: session.id,
            },
        })
    }

    /// Grades one answer in the participant's active retry session. Same
    /// grading rules as the main flow; invalid answers change nothing.
    pub async fn submit_answer(&self, participant_id: Uuid, text: &str) -> Result<RetryOutcome> {
        let mut tx = self.pool.begin().await?;

        let session = sqlx::query_as::<_, RetrySession>(
            r#"
            SELECT * FROM retry_sessions
            WHERE participant_id = $1 AND active
            ORDER BY created_at DESC
            LIMIT 1
            FOR UPDATE
            "#,
        )
        .bind(participant_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| Error::NotFound("No active retry session".to_string()))?;

        if !session.expecting_answer {
            return Err(Error::NotFound(
                "No retry question is awaiting an answer".to_string(),
            ));
        }

        let retry_score = sqlx::query_as::<_, RetryScore>(
            r#"SELECT * FROM retry_scores WHERE id = $1 FOR UPDATE"#,
        )
        .bind(session.retry_score_id)
        .fetch_one(&mut *tx)
        .await?;

        let indexes = retry_score.index_list()?;
        let cursor = retry_score.question_index as usize;
        if cursor >= indexes.len() {
            return Err(Error::AlreadyCompleted(
                "This retry is already finished.".to_string(),
            ));
        }

        let questions = session.question_list()?;
        let question = questions.get(indexes[cursor]).ok_or_else(|| {
            Error::Internal("Retry snapshot is shorter than its missed indexes".to_string())
        })?;

        let (correct, feedback) = match GradingService::evaluate(question, text) {
            AnswerVerdict::NotAnOption => {
                return Err(Error::InvalidAnswer(
                    "That doesn't match any of the options. Please pick one of the listed answers."
                        .to_string(),
                ))
            }
            AnswerVerdict::Correct => (true, "✅ Correct!".to_string()),
            AnswerVerdict::Incorrect { correct } => {
                (false, format!("❌ Incorrect. Correct: {}", correct))
            }
        };

        let new_score = if correct {
            retry_score.score + 1
        } else {
            retry_score.score
        };
        let next_cursor = cursor + 1;
        let completed = next_cursor == indexes.len();

        if completed {
            sqlx::query(
                r#"UPDATE retry_scores
                   SET score = $1, question_index = $2, end_time = NOW()
                   WHERE id = $3"#,
            )
            .bind(new_score)
            .bind(next_cursor as i32)
            .bind(retry_score.id)
            .execute(&mut *tx)
            .await?;
            sqlx::query(
                r#"UPDATE retry_sessions SET active = FALSE, expecting_answer = FALSE
                   WHERE id = $1"#,
            )
            .bind(session.id)
            .execute(&mut *tx)
            .await?;
        } else {
            sqlx::query(
                r#"UPDATE retry_scores SET score = $1, question_index = $2 WHERE id = $3"#,
            )
            .bind(new_score)
            .bind(next_cursor as i32)
            .bind(retry_score.id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        if completed {
            tracing::info!(
                "Participant {} completed retry {}: {}/{}",
                participant_id,
                retry_score.id,
                new_score,
                indexes.len()
            );
            return Ok(RetryOutcome::Completed {
                feedback,
                score: new_score,
                total_questions: indexes.len() as i32,
            });
        }

        Ok(RetryOutcome::Feedback {
            feedback,
            next: QuestionPrompt {
                question: questions[indexes[next_cursor]].view(),
                progress: format!("{} of {}", next_cursor + 1, indexes.len()),
                session_id: session.id,
            },
        })
    }

    /// Idempotent: clearing when nothing is active succeeds quietly.
    pub async fn clear_session(&self, participant_id: Uuid) -> Result<()> {
        sqlx::query(
            r#"UPDATE retry_sessions SET active = FALSE, expecting_answer = FALSE
               WHERE participant_id = $1 AND active"#,
        )
        .bind(participant_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn status(&self, participant_id: Uuid) -> Result<RetryStatus> {
        let session = sqlx::query_as::<_, RetrySession>(
            r#"
            SELECT * FROM retry_sessions
            WHERE participant_id = $1 AND active
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(participant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(match session {
            Some(s) => RetryStatus {
                active: true,
                expecting_answer: s.expecting_answer,
            },
            None => RetryStatus {
                active: false,
                expecting_answer: false,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indexes_within_live_list_pass() {
        assert!(RetryService::validate_indexes("capitals", &[0, 2, 4], 5).is_ok());
    }

    #[test]
    fn out_of_range_index_aborts_with_content_drift() {
        let err = RetryService::validate_indexes("capitals", &[0, 5], 5).unwrap_err();
        assert!(matches!(err, Error::ContentDrift(_)));
        assert!(err.to_string().contains("question 6"));
    }

    #[test]
    fn shrunken_quiz_drifts_every_index() {
        assert!(RetryService::validate_indexes("capitals", &[0], 0).is_err());
    }
}
