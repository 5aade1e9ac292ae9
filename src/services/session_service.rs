use crate::error::{Error, Result};
use crate::models::question::{Question, QuestionView};
use crate::models::score::{MissedList, QuizScore};
use crate::models::session::QuizSession;
use crate::services::grading_service::{AnswerVerdict, GradingService};
use crate::services::quiz_service::QuizService;
use crate::services::sheet_service::SheetService;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

/// The next question to put in front of a participant.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionPrompt {
    pub question: QuestionView,
    pub progress: String,
    pub session_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
pub struct StartedQuiz {
    pub quiz_name: String,
    pub prompt: QuestionPrompt,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResumedQuiz {
    pub quiz_name: String,
    pub prompt: QuestionPrompt,
}

#[derive(Debug, Clone, Serialize)]
pub enum AnswerOutcome {
    Feedback {
        feedback: String,
        next: QuestionPrompt,
    },
    Completed {
        feedback: String,
        score: i32,
        total_questions: i32,
        session_id: Uuid,
    },
}

/// Outcome of grading one in-options answer against the frozen list.
/// Pure bookkeeping; persistence happens around it.
#[derive(Debug, Clone)]
pub struct StepResult {
    pub correct: bool,
    pub feedback: String,
    pub next_index: usize,
    pub completed: bool,
}

/// Drives a participant's progress through an ordered question list:
/// start, answer-by-answer advancement, and resumption of unfinished
/// attempts. Each answer submission updates the session cursor and the
/// durable score record inside one transaction.
#[derive(Clone)]
pub struct SessionService {
    pool: PgPool,
    quizzes: QuizService,
    sheets: SheetService,
}

impl SessionService {
    pub fn new(pool: PgPool, quizzes: QuizService, sheets: SheetService) -> Self {
        Self {
            pool,
            quizzes,
            sheets,
        }
    }

    /// Grades the answer at `index` and computes the cursor move. Fails
    /// with `AlreadyCompleted` past the end and `InvalidAnswer` when the
    /// input matches no option; neither advances anything.
    pub fn evaluate_step(
        questions: &[Question],
        index: usize,
        raw_answer: &str,
    ) -> Result<StepResult> {
        let question = questions.get(index).ok_or_else(|| {
            Error::AlreadyCompleted("This quiz is already finished.".to_string())
        })?;

        let (correct, feedback) = match GradingService::evaluate(question, raw_answer) {
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

        let next_index = index + 1;
        Ok(StepResult {
            correct,
            feedback,
            next_index,
            completed: next_index == questions.len(),
        })
    }

    /// Cursor for re-entering an attempt: the persisted session index, or
    /// the answered-so-far count (score + missed) when the session row was
    /// lost. A past-the-end cursor means the attempt is already done.
    pub fn resume_index(index: usize, total: usize) -> Result<usize> {
        if index >= total {
            return Err(Error::NothingToResume(
                "Your previous attempt was already complete.".to_string(),
            ));
        }
        Ok(index)
    }

    /// Starts a fresh attempt. Any prior unfinished attempt is abandoned
    /// and any lingering retry session is cleared so only one "expecting
    /// answer" context exists per participant.
    pub async fn start_quiz(&self, participant_id: Uuid, quiz_name: &str) -> Result<StartedQuiz> {
        let quiz = self
            .quizzes
            .get_active_by_name(quiz_name)
            .await?
            .ok_or_else(|| {
                Error::NotFound(format!("Quiz '{}' not found or inactive", quiz_name))
            })?;

        if !self.quizzes.is_accessible_by(&quiz, participant_id).await? {
            return Err(Error::Forbidden("This quiz is private.".to_string()));
        }

        let questions = self.sheets.fetch(&quiz.sheet_url).await?;
        if questions.is_empty() {
            return Err(Error::ContentError(format!(
                "Quiz '{}' has no questions",
                quiz.name
            )));
        }
        let snapshot = serde_json::to_value(&questions)?;
        let total = questions.len() as i32;

        let mut tx = self.pool.begin().await?;

        // Single attempt in flight per participant.
        sqlx::query(
            r#"UPDATE quiz_scores SET end_time = NOW()
               WHERE participant_id = $1 AND end_time IS NULL"#,
        )
        .bind(participant_id)
        .execute(&mut *tx)
        .await?;
        sqlx::query(
            r#"UPDATE quiz_sessions SET active = FALSE, updated_at = NOW()
               WHERE participant_id = $1 AND active"#,
        )
        .bind(participant_id)
        .execute(&mut *tx)
        .await?;
        sqlx::query(
            r#"UPDATE retry_sessions SET active = FALSE, expecting_answer = FALSE
               WHERE participant_id = $1 AND active"#,
        )
        .bind(participant_id)
        .execute(&mut *tx)
        .await?;

        let score = sqlx::query_as::<_, QuizScore>(
            r#"
            INSERT INTO quiz_scores (participant_id, quiz_id, total_questions)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(participant_id)
        .bind(quiz.id)
        .bind(total)
        .fetch_one(&mut *tx)
        .await?;

        let session = sqlx::query_as::<_, QuizSession>(
            r#"
            INSERT INTO quiz_sessions (participant_id, quiz_id, score_id, questions)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(participant_id)
        .bind(quiz.id)
        .bind(score.id)
        .bind(&snapshot)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            "Participant {} started quiz '{}' ({} questions)",
            participant_id,
            quiz.name,
            total
        );

        Ok(StartedQuiz {
            quiz_name: quiz.name,
            prompt: QuestionPrompt {
                question: questions[0].view(),
                progress: format!("1 of {}", total),
                session_id: session.id,
            },
        })
    }

    /// Grades one answer for the participant's active session. The session
    /// cursor and score record move together in one transaction; invalid
    /// answers leave both untouched.
    pub async fn submit_answer(&self, participant_id: Uuid, text: &str) -> Result<AnswerOutcome> {
        let mut tx = self.pool.begin().await?;

        let session = sqlx::query_as::<_, QuizSession>(
            r#"
            SELECT * FROM quiz_sessions
            WHERE participant_id = $1 AND active
            ORDER BY created_at DESC
            LIMIT 1
            FOR UPDATE
            "#,
        )
        .bind(participant_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            Error::NotFound("No active quiz session. Send a quiz name to begin.".to_string())
        })?;

        let questions = session.question_list()?;
        let index = session.question_index as usize;
        let step = Self::evaluate_step(&questions, index, text)?;

        let score_row = sqlx::query_as::<_, QuizScore>(
            r#"SELECT * FROM quiz_scores WHERE id = $1 FOR UPDATE"#,
        )
        .bind(session.score_id)
        .fetch_one(&mut *tx)
        .await?;

        let mut missed = MissedList::from_value(&score_row.missed_questions);
        let (session_score, record_score) = if step.correct {
            (session.score + 1, score_row.score + 1)
        } else {
            missed.push(index + 1, &questions[index]);
            (session.score, score_row.score)
        };

        if step.completed {
            sqlx::query(
                r#"UPDATE quiz_scores
                   SET score = $1, missed_questions = $2, end_time = NOW()
                   WHERE id = $3"#,
            )
            .bind(record_score)
            .bind(missed.to_value())
            .bind(score_row.id)
            .execute(&mut *tx)
            .await?;
        } else {
            sqlx::query(
                r#"UPDATE quiz_scores SET score = $1, missed_questions = $2 WHERE id = $3"#,
            )
            .bind(record_score)
            .bind(missed.to_value())
            .bind(score_row.id)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            r#"UPDATE quiz_sessions
               SET question_index = $1, score = $2, active = $3, updated_at = NOW()
               WHERE id = $4"#,
        )
        .bind(step.next_index as i32)
        .bind(session_score)
        .bind(!step.completed)
        .bind(session.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        if step.completed {
            tracing::info!(
                "Participant {} completed quiz session {}: {}/{}",
                participant_id,
                session.id,
                session_score,
                questions.len()
            );
            return Ok(AnswerOutcome::Completed {
                feedback: step.feedback,
                score: session_score,
                total_questions: questions.len() as i32,
                session_id: session.id,
            });
        }

        Ok(AnswerOutcome::Feedback {
            feedback: step.feedback,
            next: QuestionPrompt {
                question: questions[step.next_index].view(),
                progress: format!("{} of {}", step.next_index + 1, questions.len()),
                session_id: session.id,
            },
        })
    }

    /// Re-enters an unfinished attempt at its persisted index. If the
    /// session row was lost, the snapshot is rebuilt from the provider and
    /// the cursor reconstructed as answered-so-far (score + missed count),
    /// accepting that sheet content may have drifted meanwhile.
    pub async fn resume(&self, participant_id: Uuid) -> Result<ResumedQuiz> {
        let score = sqlx::query_as::<_, QuizScore>(
            r#"
            SELECT * FROM quiz_scores
            WHERE participant_id = $1 AND end_time IS NULL
            ORDER BY start_time DESC
            LIMIT 1
            "#,
        )
        .bind(participant_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NothingToResume("You have no quiz in progress.".to_string()))?;

        let quiz = self.quizzes.get_by_id(score.quiz_id).await?;

        let session = sqlx::query_as::<_, QuizSession>(
            r#"SELECT * FROM quiz_sessions WHERE score_id = $1 AND active LIMIT 1"#,
        )
        .bind(score.id)
        .fetch_optional(&self.pool)
        .await?;

        let session = match session {
            Some(session) => session,
            None => self.rebuild_session(&score, &quiz.sheet_url).await?,
        };

        let questions = session.question_list()?;
        let index = match Self::resume_index(session.question_index as usize, questions.len()) {
            Ok(index) => index,
            Err(e) => {
                // The cursor says the attempt is done but the score was
                // never finalized. Close it out rather than re-asking.
                self.finalize_score(score.id).await?;
                return Err(e);
            }
        };

        Ok(ResumedQuiz {
            quiz_name: quiz.name,
            prompt: QuestionPrompt {
                question: questions[index].view(),
                progress: format!("{} of {}", index + 1, questions.len()),
                session_id: session.id,
            },
        })
    }

    async fn rebuild_session(&self, score: &QuizScore, sheet_url: &str) -> Result<QuizSession> {
        let questions = self.sheets.fetch(sheet_url).await?;
        let missed = MissedList::from_value(&score.missed_questions);
        let answered = score.score as usize + missed.len();

        if let Err(e) = Self::resume_index(answered, questions.len()) {
            self.finalize_score(score.id).await?;
            return Err(e);
        }

        let snapshot = serde_json::to_value(&questions)?;
        let session = sqlx::query_as::<_, QuizSession>(
            r#"
            INSERT INTO quiz_sessions
                (participant_id, quiz_id, score_id, question_index, score, questions)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(score.participant_id)
        .bind(score.quiz_id)
        .bind(score.id)
        .bind(answered as i32)
        .bind(score.score)
        .bind(&snapshot)
        .fetch_one(&self.pool)
        .await?;

        tracing::warn!(
            "Rebuilt lost session for score {} at index {}",
            score.id,
            answered
        );
        Ok(session)
    }

    async fn finalize_score(&self, score_id: Uuid) -> Result<()> {
        sqlx::query(r#"UPDATE quiz_scores SET end_time = NOW() WHERE id = $1"#)
            .bind(score_id)
            .execute(&self.pool)
            .await?;
        sqlx::query(
            r#"UPDATE quiz_sessions SET active = FALSE, updated_at = NOW() WHERE score_id = $1"#,
        )
        .bind(score_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn questions() -> Vec<Question> {
        let build = |number: &str, text: &str, correct: &str| Question {
            number: number.to_string(),
            text: text.to_string(),
            options: vec![
                "A: one".to_string(),
                "B: two".to_string(),
                "C: three".to_string(),
                "D: four".to_string(),
                "E: ".to_string(),
            ],
            correct: correct.to_string(),
        };
        vec![
            build("1", "First?", "A"),
            build("2", "Second?", "B"),
            build("3", "Third?", "C"),
        ]
    }

    #[test]
    fn correct_answer_advances_and_scores() {
        let qs = questions();
        let step = SessionService::evaluate_step(&qs, 0, "A").unwrap();
        assert!(step.correct);
        assert_eq!(step.next_index, 1);
        assert!(!step.completed);
        assert_eq!(step.feedback, "✅ Correct!");
    }

    #[test]
    fn incorrect_answer_advances_without_scoring() {
        let qs = questions();
        let step = SessionService::evaluate_step(&qs, 1, "A: one").unwrap();
        assert!(!step.correct);
        assert_eq!(step.next_index, 2);
        assert_eq!(step.feedback, "❌ Incorrect. Correct: B");
    }

    #[test]
    fn invalid_answer_does_not_advance() {
        let qs = questions();
        let err = SessionService::evaluate_step(&qs, 1, "X").unwrap_err();
        assert!(matches!(err, Error::InvalidAnswer(_)));
    }

    #[test]
    fn answering_past_the_end_is_already_completed() {
        let qs = questions();
        let err = SessionService::evaluate_step(&qs, 3, "A").unwrap_err();
        assert!(matches!(err, Error::AlreadyCompleted(_)));
    }

    #[test]
    fn last_answer_completes() {
        let qs = questions();
        let step = SessionService::evaluate_step(&qs, 2, "C").unwrap();
        assert!(step.completed);
        assert_eq!(step.next_index, 3);
    }

    // Three questions with correct answers A, B, C; the participant sends
    // A, X, B, C. The invalid X is rejected without advancing or counting
    // as missed; the final tally is 3/3 with an empty missed list.
    #[test]
    fn invalid_answers_never_count_as_missed() {
        let qs = questions();
        let mut index = 0usize;
        let mut score = 0;
        let mut missed = MissedList::default();

        for raw in ["A", "X", "B", "C"] {
            match SessionService::evaluate_step(&qs, index, raw) {
                Ok(step) => {
                    if step.correct {
                        score += 1;
                    } else {
                        missed.push(index + 1, &qs[index]);
                    }
                    index = step.next_index;
                }
                Err(Error::InvalidAnswer(_)) => {
                    // index and score untouched
                }
                Err(other) => panic!("unexpected error: {}", other),
            }
        }

        assert_eq!(index, 3);
        assert_eq!(score, 3);
        assert!(missed.is_empty());
    }

    #[test]
    fn resume_returns_persisted_index_not_zero() {
        assert_eq!(SessionService::resume_index(2, 3).unwrap(), 2);
    }

    #[test]
    fn resume_past_the_end_is_nothing_to_resume() {
        let err = SessionService::resume_index(3, 3).unwrap_err();
        assert!(matches!(err, Error::NothingToResume(_)));
    }

    // A lost session is rebuilt with its cursor at answered-so-far: one
    // correct plus one missed answer puts the participant on question 3.
    #[test]
    fn lost_session_cursor_counts_correct_and_missed_answers() {
        let qs = questions();
        let mut score = 0usize;
        let mut missed = MissedList::default();

        for (index, raw) in ["A", "C"].iter().enumerate() {
            let step = SessionService::evaluate_step(&qs, index, raw).unwrap();
            if step.correct {
                score += 1;
            } else {
                missed.push(index + 1, &qs[index]);
            }
        }

        let answered = score + missed.len();
        assert_eq!(SessionService::resume_index(answered, qs.len()).unwrap(), 2);
    }

    #[test]
    fn missed_entries_are_one_based() {
        let qs = questions();
        let mut missed = MissedList::default();
        let step = SessionService::evaluate_step(&qs, 0, "B").unwrap();
        assert!(!step.correct);
        missed.push(1, &qs[0]);
        assert_eq!(missed.to_value()[0]["index"], 1);
    }
}
