use crate::config::get_config;
use crate::error::{Error, Result};
use crate::models::question::{option_is_blank, Question};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

const OPTION_LETTERS: [char; 5] = ['A', 'B', 'C', 'D', 'E'];

/// Raw sheet row. "Option E" is optional in published sheets and defaults
/// to an empty cell.
#[derive(Debug, Deserialize)]
struct SheetRow {
    #[serde(rename = "Question Number")]
    number: String,
    #[serde(rename = "Question")]
    question: String,
    #[serde(rename = "Option A")]
    option_a: String,
    #[serde(rename = "Option B")]
    option_b: String,
    #[serde(rename = "Option C")]
    option_c: String,
    #[serde(rename = "Option D")]
    option_d: String,
    #[serde(rename = "Option E", default)]
    option_e: String,
    #[serde(rename = "Correct Answer")]
    correct: String,
}

struct CachedSheet {
    fetched_at: Instant,
    questions: Vec<Question>,
}

/// Question provider: downloads a quiz sheet published as CSV and parses it
/// into an ordered question list. Results are cached per URL for a short
/// TTL; expiry is the only invalidation.
#[derive(Clone)]
pub struct SheetService {
    client: reqwest::Client,
    cache: Arc<Mutex<HashMap<String, CachedSheet>>>,
    ttl: Duration,
}

impl SheetService {
    pub fn new(client: reqwest::Client) -> Self {
        let config = get_config();
        Self {
            client,
            cache: Arc::new(Mutex::new(HashMap::new())),
            ttl: Duration::from_secs(config.sheet_cache_ttl_secs),
        }
    }

    pub async fn fetch(&self, sheet_url: &str) -> Result<Vec<Question>> {
        {
            let cache = self.cache.lock().await;
            if let Some(entry) = cache.get(sheet_url) {
                if entry.fetched_at.elapsed() < self.ttl {
                    return Ok(entry.questions.clone());
                }
            }
        }

        let response = self
            .client
            .get(sheet_url)
            .send()
            .await
            .map_err(|e| Error::ContentError(format!("Failed to download quiz sheet: {}", e)))?;
        if !response.status().is_success() {
            return Err(Error::ContentError(format!(
                "Quiz sheet returned HTTP {}",
                response.status()
            )));
        }
        let body = response
            .text()
            .await
            .map_err(|e| Error::ContentError(format!("Failed to read quiz sheet: {}", e)))?;

        let questions = parse_sheet_csv(&body)?;
        tracing::info!("Loaded {} questions from sheet {}", questions.len(), sheet_url);

        let mut cache = self.cache.lock().await;
        cache.insert(
            sheet_url.to_string(),
            CachedSheet {
                fetched_at: Instant::now(),
                questions: questions.clone(),
            },
        );
        Ok(questions)
    }
}

/// Parses published CSV into questions. Malformed rows (missing text,
/// missing or out-of-range correct letter, correct letter pointing at a
/// blank option) fail the whole fetch with a row-addressed message.
pub fn parse_sheet_csv(data: &str) -> Result<Vec<Question>> {
    let data = data.trim_start_matches('\u{feff}');
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(data.as_bytes());

    let mut questions = Vec::new();
    for (row_idx, record) in reader.deserialize::<SheetRow>().enumerate() {
        let row_number = row_idx + 1;
        let row = record
            .map_err(|e| Error::ContentError(format!("Unreadable sheet row {}: {}", row_number, e)))?;

        if row.question.trim().is_empty() {
            return Err(Error::ContentError(format!(
                "Sheet row {} has no question text",
                row_number
            )));
        }

        let options = vec![
            format!("A: {}", row.option_a),
            format!("B: {}", row.option_b),
            format!("C: {}", row.option_c),
            format!("D: {}", row.option_d),
            format!("E: {}", row.option_e),
        ];

        let correct = row
            .correct
            .trim()
            .chars()
            .next()
            .map(|c| c.to_ascii_uppercase())
            .ok_or_else(|| {
                Error::ContentError(format!("Sheet row {} has no correct answer", row_number))
            })?;
        let correct_pos = OPTION_LETTERS
            .iter()
            .position(|&letter| letter == correct)
            .ok_or_else(|| {
                Error::ContentError(format!(
                    "Sheet row {} marks '{}' as correct, expected one of A-E",
                    row_number, correct
                ))
            })?;
        if option_is_blank(&options[correct_pos]) {
            return Err(Error::ContentError(format!(
                "Sheet row {} marks blank option '{}' as correct",
                row_number, correct
            )));
        }

        questions.push(Question {
            number: row.number,
            text: row.question,
            options,
            correct: correct.to_string(),
        });
    }

    Ok(questions)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "Question Number,Question,Option A,Option B,Option C,Option D,Option E,Correct Answer";

    #[test]
    fn parses_well_formed_sheet() {
        let csv = format!(
            "{}\n1,Capital of France?,Paris,London,Rome,Berlin,,A\n2,2 + 2?,3,4,5,6,,B",
            HEADER
        );
        let questions = parse_sheet_csv(&csv).unwrap();
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].number, "1");
        assert_eq!(questions[0].options[0], "A: Paris");
        assert_eq!(questions[0].correct, "A");
        assert_eq!(questions[1].correct, "B");
    }

    #[test]
    fn strips_byte_order_mark() {
        let csv = format!("\u{feff}{}\n1,Q?,x,y,z,w,,a", HEADER);
        let questions = parse_sheet_csv(&csv).unwrap();
        assert_eq!(questions[0].correct, "A");
    }

    #[test]
    fn accepts_full_answer_text_in_correct_column() {
        // Sheets sometimes carry "B: 4" instead of the bare letter.
        let csv = format!("{}\n1,2 + 2?,3,4,5,6,,B: 4", HEADER);
        let questions = parse_sheet_csv(&csv).unwrap();
        assert_eq!(questions[0].correct, "B");
    }

    #[test]
    fn sheet_without_option_e_column_parses() {
        let csv = "Question Number,Question,Option A,Option B,Option C,Option D,Correct Answer\n\
                   1,Q?,w,x,y,z,D";
        let questions = parse_sheet_csv(csv).unwrap();
        assert_eq!(questions[0].options[4], "E: ");
        assert_eq!(questions[0].presented_options().len(), 4);
    }

    #[test]
    fn missing_question_text_fails() {
        let csv = format!("{}\n1,,a,b,c,d,,A", HEADER);
        let err = parse_sheet_csv(&csv).unwrap_err();
        assert!(err.to_string().contains("row 1"));
    }

    #[test]
    fn missing_correct_answer_fails() {
        let csv = format!("{}\n1,Q?,a,b,c,d,,", HEADER);
        assert!(parse_sheet_csv(&csv).is_err());
    }

    #[test]
    fn correct_letter_outside_options_fails() {
        let csv = format!("{}\n1,Q?,a,b,c,d,,F", HEADER);
        let err = parse_sheet_csv(&csv).unwrap_err();
        assert!(err.to_string().contains("'F'"));
    }

    #[test]
    fn correct_letter_on_blank_option_fails() {
        let csv = format!("{}\n1,Q?,a,b,c,d,,E", HEADER);
        let err = parse_sheet_csv(&csv).unwrap_err();
        assert!(err.to_string().contains("blank option"));
    }

    #[test]
    fn empty_sheet_yields_no_questions() {
        let questions = parse_sheet_csv(HEADER).unwrap();
        assert!(questions.is_empty());
    }
}
