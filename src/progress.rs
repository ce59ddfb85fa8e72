//! Cycle progress derived from the syllabus and the current decks.
//!
//! Nothing here is stored. "Completed" counts cards drawn out of the decks,
//! including cards sitting unfinished in the active batch.

use crate::models::StudyState;
use crate::syllabus::Syllabus;

/// Totals across the whole syllabus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregateStats {
    pub total_cards_in_cycle: usize,
    pub current_cards_left: usize,
    pub completed: usize,
}

impl AggregateStats {
    pub fn percent_done(&self) -> u8 {
        percent(self.completed, self.total_cards_in_cycle)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicStatus {
    Pending,
    InProgress,
    Completed,
}

impl TopicStatus {
    fn from_percent(percent: u8) -> Self {
        match percent {
            100 => Self::Completed,
            0 => Self::Pending,
            _ => Self::InProgress,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in progress",
            Self::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicProgress {
    pub name: String,
    pub weight: u32,
    pub left_in_deck: usize,
    pub percent: u8,
    pub status: TopicStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectProgress {
    pub subject: String,
    pub cycle_weight: usize,
    pub cards_left: usize,
    pub percent: u8,
    pub topics: Vec<TopicProgress>,
}

/// Sum full-cycle weight and remaining deck sizes over every syllabus subject.
pub fn aggregate_stats(syllabus: &Syllabus, state: &StudyState) -> AggregateStats {
    let mut stats = AggregateStats::default();

    for subject in syllabus.subjects() {
        let cycle = syllabus.cycle_weight(subject) as usize;
        // A deck can never exceed its cycle; clamp so a hand-edited file
        // cannot push `completed` below zero.
        let left = state.deck(subject).map_or(0, |d| d.len()).min(cycle);
        stats.total_cards_in_cycle += cycle;
        stats.current_cards_left += left;
    }

    stats.completed = stats.total_cards_in_cycle - stats.current_cards_left;
    stats
}

/// Per-subject and per-topic progress through the current cycle.
pub fn subject_progress(syllabus: &Syllabus, state: &StudyState) -> Vec<SubjectProgress> {
    syllabus
        .iter()
        .map(|(subject, topics)| {
            let deck = state.deck(subject);

            let topics: Vec<TopicProgress> = topics
                .iter()
                .map(|topic| {
                    let max_copies = topic.weight as usize;
                    let left_in_deck = deck
                        .map_or(0, |d| d.copies_left(&topic.name))
                        .min(max_copies);
                    let percent = percent(max_copies - left_in_deck, max_copies);
                    TopicProgress {
                        name: topic.name.clone(),
                        weight: topic.weight,
                        left_in_deck,
                        percent,
                        status: TopicStatus::from_percent(percent),
                    }
                })
                .collect();

            let cycle_weight: usize = topics.iter().map(|t| t.weight as usize).sum();
            let cards_left: usize = topics.iter().map(|t| t.left_in_deck).sum();

            SubjectProgress {
                subject: subject.to_string(),
                cycle_weight,
                cards_left,
                percent: percent(cycle_weight - cards_left, cycle_weight),
                topics,
            }
        })
        .collect()
}

/// Rounded percentage, halves rounding up.
fn percent(part: usize, whole: usize) -> u8 {
    if whole == 0 {
        return 0;
    }
    ((part * 200 + whole) / (whole * 2)).min(100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deck::Deck;
    use crate::syllabus::Topic;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn syllabus() -> Syllabus {
        Syllabus::new([
            ("History", vec![Topic::new("A", 3), Topic::new("C", 1)]),
            ("Polity", vec![Topic::new("B", 2)]),
        ])
        .unwrap()
    }

    fn full_state(syllabus: &Syllabus, rng: &mut StdRng) -> StudyState {
        let mut state = StudyState::default();
        for (subject, topics) in syllabus.iter() {
            state
                .decks
                .insert(subject.to_string(), Deck::full_cycle(topics, rng));
        }
        state
    }

    #[test]
    fn test_fresh_decks_have_nothing_completed() {
        let syllabus = syllabus();
        let mut rng = StdRng::seed_from_u64(5);
        let state = full_state(&syllabus, &mut rng);

        let stats = aggregate_stats(&syllabus, &state);
        assert_eq!(stats.total_cards_in_cycle, 6);
        assert_eq!(stats.current_cards_left, 6);
        assert_eq!(stats.completed, 0);
        assert_eq!(stats.percent_done(), 0);
    }

    #[test]
    fn test_left_plus_completed_equals_total_while_drawing() {
        let syllabus = syllabus();
        let mut rng = StdRng::seed_from_u64(11);
        let mut state = full_state(&syllabus, &mut rng);

        for _ in 0..4 {
            for deck in state.decks.values_mut() {
                deck.draw();
            }
            let stats = aggregate_stats(&syllabus, &state);
            assert_eq!(
                stats.current_cards_left + stats.completed,
                stats.total_cards_in_cycle
            );
        }
    }

    #[test]
    fn test_missing_decks_count_as_drawn() {
        let syllabus = syllabus();
        let stats = aggregate_stats(&syllabus, &StudyState::default());
        assert_eq!(stats.current_cards_left, 0);
        assert_eq!(stats.completed, 6);
    }

    #[test]
    fn test_foreign_decks_are_ignored() {
        let syllabus = syllabus();
        let mut rng = StdRng::seed_from_u64(2);
        let mut state = full_state(&syllabus, &mut rng);
        state.decks.insert(
            "Ethics".to_string(),
            Deck::full_cycle(&[Topic::new("Integrity", 3)], &mut rng),
        );

        let stats = aggregate_stats(&syllabus, &state);
        assert_eq!(stats.total_cards_in_cycle, 6);
        assert_eq!(stats.current_cards_left, 6);
    }

    #[test]
    fn test_topic_status_classification() {
        let syllabus = syllabus();
        let mut state = StudyState::default();
        // History deck with one copy of A left and no C: A is in progress, C done.
        let mut rng = StdRng::seed_from_u64(9);
        state.decks.insert(
            "History".to_string(),
            Deck::full_cycle(&[Topic::new("A", 1)], &mut rng),
        );
        state.decks.insert(
            "Polity".to_string(),
            Deck::full_cycle(&[Topic::new("B", 2)], &mut rng),
        );

        let progress = subject_progress(&syllabus, &state);
        let history_progress = &progress[0];
        assert_eq!(history_progress.subject, "History");
        assert_eq!(history_progress.cycle_weight, 4);
        assert_eq!(history_progress.cards_left, 1);
        assert_eq!(history_progress.percent, 75);

        let a = &history_progress.topics[0];
        assert_eq!(a.left_in_deck, 1);
        assert_eq!(a.percent, 67);
        assert_eq!(a.status, TopicStatus::InProgress);

        let c = &history_progress.topics[1];
        assert_eq!(c.percent, 100);
        assert_eq!(c.status, TopicStatus::Completed);

        let b = &progress[1].topics[0];
        assert_eq!(b.percent, 0);
        assert_eq!(b.status, TopicStatus::Pending);
    }

    #[test]
    fn test_percent_rounding() {
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 67);
        assert_eq!(percent(1, 2), 50);
        assert_eq!(percent(1, 8), 13);
        assert_eq!(percent(0, 0), 0);
    }
}
