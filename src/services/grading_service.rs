use crate::models::question::{option_is_blank, Question};
use crate::utils::normalize::normalize_answer;

/// Result of checking one submitted answer against the current question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerVerdict {
    /// Input matched none of the option strings. The caller should ask the
    /// participant to resubmit; nothing advances.
    NotAnOption,
    Correct,
    Incorrect {
        /// The correct option letter, for the feedback message.
        correct: String,
    },
}

pub struct GradingService;

impl GradingService {
    /// Evaluates a raw answer against a question. Both sides are normalized
    /// (case-fold, NFKC, quote/whitespace trim) so keyboard presses and
    /// typed letters compare equal. Correctness is a prefix match on the
    /// correct option letter: "A" and "A: Paris" both count.
    pub fn evaluate(question: &Question, raw_answer: &str) -> AnswerVerdict {
        let answer = normalize_answer(raw_answer);
        if answer.is_empty() || !Self::is_among_options(question, &answer) {
            return AnswerVerdict::NotAnOption;
        }

        let correct = normalize_answer(&question.correct);
        if answer.starts_with(&correct) {
            AnswerVerdict::Correct
        } else {
            AnswerVerdict::Incorrect {
                correct: question.correct.clone(),
            }
        }
    }

    /// An answer is in-options when it equals a non-blank option string or
    /// is a leading fragment of one (the bare letter "a" against
    /// "a: paris"). Blank options never match.
    fn is_among_options(question: &Question, normalized_answer: &str) -> bool {
        question
            .options
            .iter()
            .filter(|opt| !option_is_blank(opt))
            .map(|opt| normalize_answer(opt))
            .any(|opt| opt == normalized_answer || opt.starts_with(normalized_answer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question() -> Question {
        Question {
            number: "1".to_string(),
            text: "Capital of France?".to_string(),
            options: vec![
                "A: Paris".to_string(),
                "B: London".to_string(),
                "C: Rome".to_string(),
                "D: Berlin".to_string(),
                "E: ".to_string(),
            ],
            correct: "A".to_string(),
        }
    }

    #[test]
    fn bare_letter_is_correct() {
        assert_eq!(GradingService::evaluate(&question(), "A"), AnswerVerdict::Correct);
        assert_eq!(GradingService::evaluate(&question(), "a"), AnswerVerdict::Correct);
    }

    #[test]
    fn full_option_text_is_correct() {
        assert_eq!(
            GradingService::evaluate(&question(), "A: Paris"),
            AnswerVerdict::Correct
        );
        assert_eq!(
            GradingService::evaluate(&question(), "  \"a: paris\" "),
            AnswerVerdict::Correct
        );
    }

    #[test]
    fn wrong_option_is_incorrect_with_letter() {
        assert_eq!(
            GradingService::evaluate(&question(), "B: London"),
            AnswerVerdict::Incorrect {
                correct: "A".to_string()
            }
        );
        assert_eq!(
            GradingService::evaluate(&question(), "b"),
            AnswerVerdict::Incorrect {
                correct: "A".to_string()
            }
        );
    }

    #[test]
    fn free_text_is_not_an_option() {
        assert_eq!(
            GradingService::evaluate(&question(), "the answer is Paris"),
            AnswerVerdict::NotAnOption
        );
        assert_eq!(GradingService::evaluate(&question(), "X"), AnswerVerdict::NotAnOption);
    }

    #[test]
    fn empty_input_is_not_an_option() {
        assert_eq!(GradingService::evaluate(&question(), "   "), AnswerVerdict::NotAnOption);
        assert_eq!(GradingService::evaluate(&question(), "\"\""), AnswerVerdict::NotAnOption);
    }

    #[test]
    fn blank_option_letter_is_not_an_option() {
        // "E" only exists as an empty column in this row.
        assert_eq!(GradingService::evaluate(&question(), "E"), AnswerVerdict::NotAnOption);
    }
}
