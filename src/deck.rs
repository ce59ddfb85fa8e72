//! Weighted per-subject decks.
//!
//! A fresh deck holds each topic `weight` times, shuffled. Drawing pops from
//! the end, so the shuffle alone decides the order.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::syllabus::Topic;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Deck {
    cards: Vec<Topic>,
}

impl Deck {
    /// Build a full cycle for a subject: every topic repeated `weight` times,
    /// then Fisher-Yates shuffled.
    pub fn full_cycle<R: Rng + ?Sized>(topics: &[Topic], rng: &mut R) -> Self {
        let mut cards: Vec<Topic> = topics
            .iter()
            .flat_map(|topic| std::iter::repeat(topic.clone()).take(topic.weight as usize))
            .collect();
        cards.shuffle(rng);
        Self { cards }
    }

    /// Remove and return the top card.
    pub fn draw(&mut self) -> Option<Topic> {
        self.cards.pop()
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Copies of a topic still waiting in the deck.
    pub fn copies_left(&self, topic_name: &str) -> usize {
        self.cards.iter().filter(|c| c.name == topic_name).count()
    }

    /// True when every card is a current topic and no topic has more copies
    /// than its weight. Decks built from an older syllabus can fail this.
    pub fn fits(&self, topics: &[Topic]) -> bool {
        self.cards.iter().all(|card| topics.contains(card))
            && topics
                .iter()
                .all(|topic| self.copies_left(&topic.name) <= topic.weight as usize)
    }

    #[cfg(test)]
    pub fn cards(&self) -> &[Topic] {
        &self.cards
    }
}
