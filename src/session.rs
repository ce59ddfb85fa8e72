//! The study session: owns the syllabus, the state and the store, and runs
//! every operation that reads or mutates study progress.

use chrono::{DateTime, Local};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use tracing::{debug, info, warn};

use crate::deck::Deck;
use crate::error::{Result, StudyError};
use crate::models::{BatchCard, StudyState};
use crate::progress::{self, AggregateStats, SubjectProgress};
use crate::prompt::Prompt;
use crate::scheduler::{self, Countdown};
use crate::storage::{self, StateStore};
use crate::syllabus::{Syllabus, Topic};

pub const DISCIPLINE_MESSAGE: &str =
    "Discipline Check: you cannot finish until all topics are done.";
pub const CONFIRM_QUESTION: &str =
    "Confirm: you have revised these topics and are ready for the next set?";

/// Result of asking for a new batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawOutcome {
    Drawn { total_weight: u32, days: i64 },
    /// A batch is already in flight; nothing changed.
    AlreadyActive,
}

/// Result of trying to close the active batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    Completed,
    /// Discipline check failed.
    Unfinished { remaining: usize },
    Cancelled,
    NoActiveBatch,
}

pub struct StudySession {
    syllabus: Syllabus,
    state: StudyState,
    store: Box<dyn StateStore>,
    rng: Box<dyn RngCore>,
}

impl StudySession {
    /// Load persisted state and make sure every subject has a deck.
    pub fn open(syllabus: Syllabus, store: Box<dyn StateStore>) -> Result<Self> {
        Self::open_with_rng(syllabus, store, Box::new(StdRng::from_entropy()))
    }

    pub fn open_with_rng(
        syllabus: Syllabus,
        mut store: Box<dyn StateStore>,
        rng: Box<dyn RngCore>,
    ) -> Result<Self> {
        let mut state = storage::load_state(store.as_mut());

        let before = state.decks.len();
        state.decks.retain(|subject, _| syllabus.contains(subject));
        if state.decks.len() != before {
            info!(dropped = before - state.decks.len(), "Dropped decks for subjects no longer in the syllabus");
        }

        // Decks built from an older version of a subject are rebuilt below.
        for (subject, deck) in state.decks.iter_mut() {
            let fits = syllabus.topics(subject).map_or(true, |topics| deck.fits(topics));
            if !fits {
                info!(subject = %subject, "Deck does not match the syllabus, rebuilding");
                *deck = Deck::default();
            }
        }

        let mut session = Self {
            syllabus,
            state,
            store,
            rng,
        };
        // A failed save leaves the decks populated in memory; keep going.
        if let Err(e) = session.ensure_decks_populated() {
            warn!(error = %e, "Could not save populated decks, continuing");
        }
        info!(
            subjects = session.syllabus.subject_count(),
            active = session.state.active,
            "Study session opened"
        );
        Ok(session)
    }

    pub fn state(&self) -> &StudyState {
        &self.state
    }

    pub fn syllabus(&self) -> &Syllabus {
        &self.syllabus
    }

    fn save(&mut self) -> Result<()> {
        storage::save_state(self.store.as_mut(), &self.state).inspect_err(|e| {
            tracing::error!(error = %e, "Failed to save study state");
        })
    }

    // ══════════════════════════════════════════════════════════════════════
    // Decks
    // ══════════════════════════════════════════════════════════════════════

    /// Rebuild a subject's deck from the syllabus and save.
    pub fn refill_deck(&mut self, subject: &str) -> Result<()> {
        self.rebuild_deck(subject)?;
        self.save()
    }

    fn rebuild_deck(&mut self, subject: &str) -> Result<()> {
        let topics = self
            .syllabus
            .topics(subject)
            .ok_or_else(|| StudyError::UnknownSubject(subject.to_string()))?;
        let deck = Deck::full_cycle(topics, self.rng.as_mut());
        debug!(subject, cards = deck.len(), "Refilled deck");
        self.state.decks.insert(subject.to_string(), deck);
        Ok(())
    }

    fn needs_refill(&self, subject: &str) -> bool {
        self.state.deck(subject).map_or(true, Deck::is_empty)
    }

    /// Refill every subject whose deck is missing or empty, then save once.
    pub fn ensure_decks_populated(&mut self) -> Result<()> {
        let empty: Vec<String> = self
            .syllabus
            .subjects()
            .filter(|s| self.needs_refill(s))
            .map(str::to_string)
            .collect();

        if empty.is_empty() {
            return Ok(());
        }
        for subject in &empty {
            self.rebuild_deck(subject)?;
        }
        self.save()
    }

    /// Pop the top card of a subject's deck. The caller refills first.
    pub fn draw_one(&mut self, subject: &str) -> Option<Topic> {
        self.state.decks.get_mut(subject)?.draw()
    }

    // ══════════════════════════════════════════════════════════════════════
    // Batches
    // ══════════════════════════════════════════════════════════════════════

    pub fn draw_new_batch(&mut self) -> Result<DrawOutcome> {
        self.draw_new_batch_at(Local::now())
    }

    /// Draw one card per subject and schedule the deadline from `now`.
    /// Does nothing while a batch is active.
    pub fn draw_new_batch_at(&mut self, now: DateTime<Local>) -> Result<DrawOutcome> {
        if self.state.active {
            debug!("Draw ignored, a batch is already active");
            return Ok(DrawOutcome::AlreadyActive);
        }

        let subjects: Vec<String> = self.syllabus.subjects().map(str::to_string).collect();
        let mut batch = Vec::with_capacity(subjects.len());
        let mut total_weight = 0;

        for subject in &subjects {
            if self.needs_refill(subject) {
                self.rebuild_deck(subject)?;
            }
            // Syllabus validation guarantees a refilled deck is non-empty.
            let Some(topic) = self.draw_one(subject) else {
                continue;
            };
            total_weight += topic.weight;
            batch.push(BatchCard::drawn(subject, topic));
        }

        let days = scheduler::days_for_total_weight(total_weight);
        let deadline = scheduler::deadline_from(now, days);

        self.state.active = true;
        self.state.current_batch = batch;
        self.state.quiz_date = Some(deadline);
        self.state.range_str = scheduler::format_deadline(deadline);

        info!(total_weight, days, deadline = %deadline, "Drew new batch");
        self.save()?;
        Ok(DrawOutcome::Drawn { total_weight, days })
    }

    /// Countdown state for the active batch, `None` when idle.
    pub fn countdown_at(&self, now: DateTime<Local>) -> Option<Countdown> {
        if !self.state.active {
            return None;
        }
        self.state
            .quiz_date
            .map(|deadline| Countdown::at(deadline, now))
    }

    // ══════════════════════════════════════════════════════════════════════
    // Progress
    // ══════════════════════════════════════════════════════════════════════

    /// Flip a card's done flag. Returns `false` for an out-of-range index.
    pub fn toggle_topic(&mut self, index: usize) -> Result<bool> {
        let Some(card) = self.state.current_batch.get_mut(index) else {
            return Ok(false);
        };
        card.done = !card.done;
        debug!(index, subject = %card.subject, done = card.done, "Toggled topic");
        self.save()?;
        Ok(true)
    }

    /// True when every card in the batch is done. Vacuously true when idle.
    pub fn is_batch_complete(&self) -> bool {
        self.state.current_batch.iter().all(|c| c.done)
    }

    /// Close the active batch once every card is done and the prompt agrees.
    pub fn complete_batch(&mut self, prompt: &mut dyn Prompt) -> Result<CompletionOutcome> {
        if !self.state.active {
            return Ok(CompletionOutcome::NoActiveBatch);
        }

        if !self.is_batch_complete() {
            let remaining = self.state.remaining_in_batch();
            debug!(remaining, "Discipline check failed");
            prompt.notify(DISCIPLINE_MESSAGE);
            return Ok(CompletionOutcome::Unfinished { remaining });
        }

        if !prompt.confirm(CONFIRM_QUESTION) {
            return Ok(CompletionOutcome::Cancelled);
        }

        self.state.active = false;
        self.state.current_batch.clear();
        self.state.quiz_date = None;
        self.state.range_str.clear();

        info!("Batch completed");
        self.save()?;
        Ok(CompletionOutcome::Completed)
    }

    pub fn aggregate_stats(&self) -> AggregateStats {
        progress::aggregate_stats(&self.syllabus, &self.state)
    }

    pub fn subject_progress(&self) -> Vec<SubjectProgress> {
        progress::subject_progress(&self.syllabus, &self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::Answered;
    use crate::storage::MemoryStore;
    use chrono::TimeZone;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Store handle shared between the session and the test.
    #[derive(Clone, Default)]
    struct SharedStore(Rc<RefCell<MemoryStore>>);

    impl StateStore for SharedStore {
        fn read(&self) -> std::io::Result<Option<String>> {
            self.0.borrow().read()
        }

        fn write(&mut self, blob: &str) -> Result<()> {
            self.0.borrow_mut().write(blob)
        }
    }

    impl SharedStore {
        fn writes(&self) -> usize {
            self.0.borrow().writes
        }

        fn blob(&self) -> Option<String> {
            self.0.borrow().blob.clone()
        }

        fn set_read_only(&self, read_only: bool) {
            self.0.borrow_mut().read_only = read_only;
        }
    }

    fn two_subjects() -> Syllabus {
        Syllabus::new([
            ("History", vec![Topic::new("A", 3)]),
            ("Polity", vec![Topic::new("B", 2)]),
        ])
        .unwrap()
    }

    fn open(syllabus: Syllabus, store: &SharedStore) -> StudySession {
        StudySession::open_with_rng(
            syllabus,
            Box::new(store.clone()),
            Box::new(StdRng::seed_from_u64(17)),
        )
        .unwrap()
    }

    fn monday_morning() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 2, 16, 8, 30, 0).single().unwrap()
    }

    #[test]
    fn test_end_to_end_scenario() {
        let store = SharedStore::default();
        let mut session = open(two_subjects(), &store);

        let history = session.state().deck("History").unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history.copies_left("A"), 3);
        let polity = session.state().deck("Polity").unwrap();
        assert_eq!(polity.len(), 2);
        assert_eq!(polity.copies_left("B"), 2);

        let outcome = session.draw_new_batch_at(monday_morning()).unwrap();
        assert_eq!(
            outcome,
            DrawOutcome::Drawn {
                total_weight: 5,
                days: 2
            }
        );
        assert!(session.state().active);
        assert_eq!(
            session.state().current_batch,
            vec![
                BatchCard {
                    subject: "History".to_string(),
                    name: "A".to_string(),
                    weight: 3,
                    done: false
                },
                BatchCard {
                    subject: "Polity".to_string(),
                    name: "B".to_string(),
                    weight: 2,
                    done: false
                },
            ]
        );
        assert_eq!(session.state().range_str, "Deadline: Wed, Feb 18");

        assert!(session.toggle_topic(0).unwrap());
        assert!(session.toggle_topic(1).unwrap());
        assert!(session.is_batch_complete());

        let outcome = session.complete_batch(&mut Answered::yes()).unwrap();
        assert_eq!(outcome, CompletionOutcome::Completed);
        assert!(!session.state().active);
        assert!(session.state().current_batch.is_empty());
        assert_eq!(session.state().quiz_date, None);
    }

    #[test]
    fn test_open_fills_every_subject_and_saves() {
        let store = SharedStore::default();
        let session = open(two_subjects(), &store);

        assert_eq!(session.state().decks.len(), 2);
        // Default-state reset plus one write for the populated decks.
        assert_eq!(store.writes(), 2);
    }

    #[test]
    fn test_open_drops_foreign_decks() {
        let store = SharedStore::default();
        {
            let wider = Syllabus::new([
                ("History", vec![Topic::new("A", 3)]),
                ("Ethics", vec![Topic::new("Integrity", 2)]),
            ])
            .unwrap();
            let _ = open(wider, &store);
        }

        let session = open(two_subjects(), &store);
        let subjects: Vec<&str> = session.state().decks.keys().map(String::as_str).collect();
        assert_eq!(subjects, vec!["History", "Polity"]);
    }

    #[test]
    fn test_open_survives_read_only_store() {
        let store = SharedStore::default();
        store.set_read_only(true);
        let session = open(two_subjects(), &store);

        assert_eq!(session.state().decks.len(), 2);
        assert_eq!(session.state().deck("History").unwrap().len(), 3);
        assert_eq!(session.state().deck("Polity").unwrap().len(), 2);
        assert_eq!(store.writes(), 0);
        assert_eq!(store.blob(), None);
    }

    #[test]
    fn test_open_rebuilds_decks_from_an_edited_syllabus() {
        let store = SharedStore::default();
        let _ = open(two_subjects(), &store);

        // History: A lowered from 3 to 1 and D added. Polity unchanged.
        let edited = Syllabus::new([
            ("History", vec![Topic::new("A", 1), Topic::new("D", 2)]),
            ("Polity", vec![Topic::new("B", 2)]),
        ])
        .unwrap();
        let session = open(edited, &store);

        let history = session.state().deck("History").unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history.copies_left("A"), 1);
        assert_eq!(history.copies_left("D"), 2);
        assert_eq!(session.state().deck("Polity").unwrap().len(), 2);
    }

    #[test]
    fn test_failed_save_during_draw_keeps_batch_in_memory() {
        let store = SharedStore::default();
        let syllabus = Syllabus::new([
            ("History", vec![Topic::new("A", 2), Topic::new("C", 1)]),
            ("Polity", vec![Topic::new("B", 1)]),
        ])
        .unwrap();
        let mut session = open(syllabus, &store);

        session.draw_new_batch_at(monday_morning()).unwrap();
        session.toggle_topic(0).unwrap();
        session.toggle_topic(1).unwrap();
        session.complete_batch(&mut Answered::yes()).unwrap();
        assert_eq!(session.state().deck("History").unwrap().len(), 2);
        assert!(session.state().deck("Polity").unwrap().is_empty());

        // The next draw refills Polity, then fails to save.
        store.set_read_only(true);
        let saved = store.blob();
        assert!(session.draw_new_batch_at(monday_morning()).is_err());

        let state = session.state();
        assert!(state.active);
        assert_eq!(state.current_batch.len(), 2);
        assert!(state.quiz_date.is_some());
        assert_eq!(state.deck("History").unwrap().len(), 1);
        assert_eq!(state.deck("Polity").unwrap().len(), 0);

        let stats = session.aggregate_stats();
        assert_eq!(stats.total_cards_in_cycle, 4);
        assert_eq!(stats.current_cards_left, 1);
        assert_eq!(stats.completed, 3);
        assert_eq!(store.blob(), saved);
    }

    #[test]
    fn test_draw_while_active_changes_nothing() {
        let store = SharedStore::default();
        let mut session = open(two_subjects(), &store);
        session.draw_new_batch_at(monday_morning()).unwrap();

        let before = serde_json::to_string(session.state()).unwrap();
        let writes = store.writes();

        let outcome = session.draw_new_batch_at(monday_morning()).unwrap();
        assert_eq!(outcome, DrawOutcome::AlreadyActive);
        assert_eq!(serde_json::to_string(session.state()).unwrap(), before);
        assert_eq!(store.writes(), writes);
    }

    #[test]
    fn test_draw_refills_exhausted_decks() {
        let store = SharedStore::default();
        let mut session = open(two_subjects(), &store);

        // Polity runs dry after two draws, History after three; each is
        // refilled on the draw that finds it empty.
        for round in 0..4 {
            session.draw_new_batch_at(monday_morning()).unwrap();
            assert_eq!(session.state().current_batch.len(), 2, "round {}", round);
            session.toggle_topic(0).unwrap();
            session.toggle_topic(1).unwrap();
            session.complete_batch(&mut Answered::yes()).unwrap();
        }

        assert_eq!(session.state().deck("History").unwrap().len(), 2);
        assert_eq!(session.state().deck("Polity").unwrap().len(), 0);
    }

    #[test]
    fn test_deadline_days_follow_total_weight() {
        let heavy = Syllabus::new([
            ("History", vec![Topic::new("A", 3)]),
            ("Polity", vec![Topic::new("B", 3)]),
            ("Geography", vec![Topic::new("C", 3)]),
            ("Economy", vec![Topic::new("D", 3)]),
            ("Environment", vec![Topic::new("E", 3)]),
        ])
        .unwrap();
        let store = SharedStore::default();
        let mut session = open(heavy, &store);

        let outcome = session.draw_new_batch_at(monday_morning()).unwrap();
        assert_eq!(
            outcome,
            DrawOutcome::Drawn {
                total_weight: 15,
                days: 4
            }
        );
        let deadline = session.state().quiz_date.unwrap();
        assert_eq!(deadline.format("%Y-%m-%d %H:%M").to_string(), "2026-02-20 09:00");
    }

    #[test]
    fn test_complete_with_unfinished_cards_is_rejected() {
        let store = SharedStore::default();
        let mut session = open(two_subjects(), &store);
        session.draw_new_batch_at(monday_morning()).unwrap();
        session.toggle_topic(0).unwrap();

        let before = session.state().clone();
        let mut prompt = Answered::yes();
        let outcome = session.complete_batch(&mut prompt).unwrap();

        assert_eq!(outcome, CompletionOutcome::Unfinished { remaining: 1 });
        assert_eq!(prompt.notices, vec![DISCIPLINE_MESSAGE.to_string()]);
        assert_eq!(session.state(), &before);
        assert!(session.state().active);
    }

    #[test]
    fn test_declined_confirmation_keeps_batch() {
        let store = SharedStore::default();
        let mut session = open(two_subjects(), &store);
        session.draw_new_batch_at(monday_morning()).unwrap();
        session.toggle_topic(0).unwrap();
        session.toggle_topic(1).unwrap();

        let writes = store.writes();
        let outcome = session.complete_batch(&mut Answered::no()).unwrap();

        assert_eq!(outcome, CompletionOutcome::Cancelled);
        assert!(session.state().active);
        assert_eq!(session.state().current_batch.len(), 2);
        assert_eq!(store.writes(), writes);
    }

    #[test]
    fn test_complete_without_batch_is_not_a_trigger() {
        let store = SharedStore::default();
        let mut session = open(two_subjects(), &store);

        assert!(session.is_batch_complete());
        let outcome = session.complete_batch(&mut Answered::yes()).unwrap();
        assert_eq!(outcome, CompletionOutcome::NoActiveBatch);
    }

    #[test]
    fn test_toggle_out_of_range_is_ignored() {
        let store = SharedStore::default();
        let mut session = open(two_subjects(), &store);
        session.draw_new_batch_at(monday_morning()).unwrap();

        let writes = store.writes();
        assert!(!session.toggle_topic(2).unwrap());
        assert_eq!(store.writes(), writes);
    }

    #[test]
    fn test_toggle_twice_restores_flag_and_saves_each_time() {
        let store = SharedStore::default();
        let mut session = open(two_subjects(), &store);
        session.draw_new_batch_at(monday_morning()).unwrap();

        let writes = store.writes();
        session.toggle_topic(1).unwrap();
        assert!(session.state().current_batch[1].done);
        session.toggle_topic(1).unwrap();
        assert!(!session.state().current_batch[1].done);
        assert_eq!(store.writes(), writes + 2);
    }

    #[test]
    fn test_state_survives_reopen() {
        let store = SharedStore::default();
        let snapshot = {
            let mut session = open(two_subjects(), &store);
            session.draw_new_batch_at(monday_morning()).unwrap();
            session.toggle_topic(1).unwrap();
            session.state().clone()
        };

        let reopened = open(two_subjects(), &store);
        assert_eq!(reopened.state(), &snapshot);
    }

    #[test]
    fn test_corrupted_blob_resets_on_open() {
        let store = SharedStore::default();
        store.0.borrow_mut().blob = Some(r#"{"active": true}"#.to_string());

        let session = open(two_subjects(), &store);
        assert!(!session.state().active);
        assert_eq!(session.state().decks.len(), 2);

        let saved: StudyState = serde_json::from_str(&store.blob().unwrap()).unwrap();
        assert_eq!(&saved, session.state());
    }

    #[test]
    fn test_stats_track_drawn_cards() {
        let store = SharedStore::default();
        let mut session = open(two_subjects(), &store);

        let stats = session.aggregate_stats();
        assert_eq!(stats.total_cards_in_cycle, 5);
        assert_eq!(stats.completed, 0);

        session.draw_new_batch_at(monday_morning()).unwrap();
        let stats = session.aggregate_stats();
        assert_eq!(stats.current_cards_left, 3);
        assert_eq!(stats.completed, 2);
        assert_eq!(
            stats.current_cards_left + stats.completed,
            stats.total_cards_in_cycle
        );
    }

    #[test]
    fn test_refill_unknown_subject() {
        let store = SharedStore::default();
        let mut session = open(two_subjects(), &store);
        let err = session.refill_deck("Ethics").unwrap_err();
        assert!(matches!(err, StudyError::UnknownSubject(_)));
    }

    #[test]
    fn test_countdown_only_while_active() {
        let store = SharedStore::default();
        let mut session = open(two_subjects(), &store);
        assert_eq!(session.countdown_at(monday_morning()), None);

        session.draw_new_batch_at(monday_morning()).unwrap();
        assert_eq!(
            session.countdown_at(monday_morning()),
            Some(Countdown::Scheduled)
        );
    }
}
