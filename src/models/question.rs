use serde::{Deserialize, Serialize};

/// One row of a quiz sheet. `options` keep their presentation prefix
/// ("A: Paris"); `correct` is the bare option letter ("A").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub number: String,
    pub text: String,
    pub options: Vec<String>,
    pub correct: String,
}

/// Sanitized projection sent to participants: the correct answer is withheld
/// and blank options (an unused "E:" column) are dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionView {
    pub number: String,
    pub text: String,
    pub options: Vec<String>,
}

impl Question {
    /// Options with non-blank text, in sheet order. A row may use fewer than
    /// five options; the unused columns come through as "E: " and are hidden.
    pub fn presented_options(&self) -> Vec<String> {
        self.options
            .iter()
            .filter(|opt| !option_is_blank(opt))
            .cloned()
            .collect()
    }

    pub fn view(&self) -> QuestionView {
        QuestionView {
            number: self.number.clone(),
            text: self.text.clone(),
            options: self.presented_options(),
        }
    }
}

/// An option is blank when it has no text after its letter prefix
/// ("E: " or an entirely empty cell).
pub fn option_is_blank(option: &str) -> bool {
    let text = match option.split_once(':') {
        Some((_, rest)) => rest,
        None => option,
    };
    text.trim().is_empty()
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
    fn blank_options_are_hidden() {
        let q = question();
        let presented = q.presented_options();
        assert_eq!(presented.len(), 4);
        assert!(!presented.iter().any(|o| o.starts_with("E:")));
    }

    #[test]
    fn view_withholds_correct_answer() {
        let q = question();
        let view = serde_json::to_value(q.view()).unwrap();
        assert!(view.get("correct").is_none());
        assert_eq!(view["number"], "1");
    }

    #[test]
    fn option_without_letter_prefix_counts_by_text() {
        assert!(!option_is_blank("Paris"));
        assert!(option_is_blank("   "));
        assert!(option_is_blank("E:"));
    }
}
