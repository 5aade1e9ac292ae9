use crate::error::{Error, Result};
use crate::models::question::Question;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use sqlx::FromRow;
use uuid::Uuid;

/// Durable outcome of one quiz attempt. Survives after the session ends;
/// `end_time` stays NULL while the attempt is in progress.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct QuizScore {
    pub id: Uuid,
    pub participant_id: Uuid,
    pub quiz_id: Uuid,
    pub score: i32,
    pub total_questions: i32,
    pub missed_questions: JsonValue,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// The persisted missed-question list. New entries are written in the
/// structured `{"index": <1-based>, "question": {...}}` shape; older records
/// stored bare 1-based integers and the reader accepts both.
#[derive(Debug, Clone, Default)]
pub struct MissedList(Vec<JsonValue>);

impl MissedList {
    pub fn from_value(value: &JsonValue) -> Self {
        match value.as_array() {
            Some(items) => Self(items.clone()),
            None => Self(Vec::new()),
        }
    }

    pub fn to_value(&self) -> JsonValue {
        JsonValue::Array(self.0.clone())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Records a missed question. Indexes are stored 1-based so exported
    /// score records stay stable for external consumers.
    pub fn push(&mut self, index_one_based: usize, question: &Question) {
        self.0.push(json!({
            "index": index_one_based,
            "question": question,
        }));
    }

    /// Normalizes both historical shapes into 0-based indexes, preserving
    /// original relative order. Entries that fit neither shape fail loudly
    /// instead of being dropped.
    pub fn zero_based_indexes(&self) -> Result<Vec<usize>> {
        let mut indexes = Vec::with_capacity(self.0.len());
        for entry in &self.0 {
            let one_based = match entry {
                JsonValue::Number(n) => n.as_u64(),
                JsonValue::Object(map) => map.get("index").and_then(|v| v.as_u64()),
                _ => None,
            };
            match one_based {
                Some(n) if n >= 1 => indexes.push((n - 1) as usize),
                _ => {
                    return Err(Error::Internal(format!(
                        "Unreadable missed-question entry: {}",
                        entry
                    )))
                }
            }
        }
        Ok(indexes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn question() -> Question {
        Question {
            number: "2".to_string(),
            text: "2 + 2?".to_string(),
            options: vec!["A: 3".to_string(), "B: 4".to_string()],
            correct: "B".to_string(),
        }
    }

    #[test]
    fn push_stores_structured_one_based_entries() {
        let mut missed = MissedList::default();
        missed.push(2, &question());
        let value = missed.to_value();
        assert_eq!(value[0]["index"], 2);
        assert_eq!(value[0]["question"]["number"], "2");
    }

    #[test]
    fn reads_legacy_integer_entries() {
        let missed = MissedList::from_value(&json!([1, 3, 5]));
        assert_eq!(missed.zero_based_indexes().unwrap(), vec![0, 2, 4]);
    }

    #[test]
    fn reads_structured_entries() {
        let missed = MissedList::from_value(&json!([
            {"index": 2, "question": {"number": "2"}},
            {"index": 4, "question": {"number": "4"}},
        ]));
        assert_eq!(missed.zero_based_indexes().unwrap(), vec![1, 3]);
    }

    #[test]
    fn mixed_shapes_preserve_order() {
        let missed = MissedList::from_value(&json!([3, {"index": 1}]));
        assert_eq!(missed.zero_based_indexes().unwrap(), vec![2, 0]);
    }

    #[test]
    fn rejects_unreadable_entries() {
        let missed = MissedList::from_value(&json!(["what"]));
        assert!(missed.zero_based_indexes().is_err());

        let missed = MissedList::from_value(&json!([0]));
        assert!(missed.zero_based_indexes().is_err());
    }

    #[test]
    fn non_array_value_reads_as_empty() {
        let missed = MissedList::from_value(&json!(null));
        assert!(missed.is_empty());
    }
}
