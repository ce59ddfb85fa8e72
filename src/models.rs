//! Persisted data model for the study state.

use chrono::{DateTime, Local};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::deck::Deck;
use crate::syllabus::Topic;

/// One drawn topic in the active batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchCard {
    pub subject: String,
    pub name: String,
    pub weight: u32,
    pub done: bool,
}

impl BatchCard {
    pub fn drawn(subject: &str, topic: Topic) -> Self {
        Self {
            subject: subject.to_string(),
            name: topic.name,
            weight: topic.weight,
            done: false,
        }
    }
}

/// Root persisted entity.
///
/// When `active` is false the batch is empty and `quiz_date` is `None`.
/// When `active` is true there is one card per syllabus subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyState {
    pub active: bool,
    pub decks: IndexMap<String, Deck>,
    pub current_batch: Vec<BatchCard>,
    pub quiz_date: Option<DateTime<Local>>,
    #[serde(default)]
    pub range_str: String,
}

impl Default for StudyState {
    fn default() -> Self {
        Self {
            active: false,
            decks: IndexMap::new(),
            current_batch: Vec::new(),
            quiz_date: None,
            range_str: String::new(),
        }
    }
}

impl StudyState {
    pub fn deck(&self, subject: &str) -> Option<&Deck> {
        self.decks.get(subject)
    }

    /// Cards not yet ticked in the active batch.
    pub fn remaining_in_batch(&self) -> usize {
        self.current_batch.iter().filter(|c| !c.done).count()
    }

    pub fn done_in_batch(&self) -> usize {
        self.current_batch.len() - self.remaining_in_batch()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_serializes_with_camel_case_keys() {
        let json = serde_json::to_value(StudyState::default()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "active": false,
                "decks": {},
                "currentBatch": [],
                "quizDate": null,
                "rangeStr": ""
            })
        );
    }

    #[test]
    fn test_batch_card_from_topic() {
        let card = BatchCard::drawn("Polity", Topic::new("Parliament", 3));
        assert_eq!(card.subject, "Polity");
        assert_eq!(card.name, "Parliament");
        assert_eq!(card.weight, 3);
        assert!(!card.done);
    }

    #[test]
    fn test_remaining_in_batch() {
        let mut state = StudyState::default();
        state.current_batch = vec![
            BatchCard::drawn("History", Topic::new("A", 1)),
            BatchCard::drawn("Polity", Topic::new("B", 2)),
        ];
        state.current_batch[1].done = true;
        assert_eq!(state.remaining_in_batch(), 1);
        assert_eq!(state.done_in_batch(), 1);
    }
}
