//! Storage for the persisted study state.
//!
//! The whole state is one JSON blob stored under a versioned key. Bumping
//! [`STATE_KEY`] orphans old blobs; there is no field-level migration.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{Result, StudyError};
use crate::models::StudyState;

/// Key the current schema is stored under.
pub const STATE_KEY: &str = "study-deck-v2";

/// Prefix shared by every schema version of the key.
const KEY_PREFIX: &str = "study-deck-v";

/// Raw blob access. The file store is the real one; tests use memory.
pub trait StateStore {
    /// Read the blob, `None` if nothing is stored yet.
    fn read(&self) -> io::Result<Option<String>>;

    fn write(&mut self, blob: &str) -> Result<()>;

    /// Older-schema keys present in this store.
    fn stale_keys(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Stores the blob as `<data dir>/<STATE_KEY>.json`.
pub struct FileStore {
    data_dir: PathBuf,
}

impl FileStore {
    pub fn new(data_dir: PathBuf) -> anyhow::Result<Self> {
        use anyhow::Context;

        fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {:?}", data_dir))?;
        Ok(Self { data_dir })
    }

    /// Get default storage location.
    pub fn default_path() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("study-deck")
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn state_path(&self) -> PathBuf {
        self.data_dir.join(format!("{}.json", STATE_KEY))
    }
}

impl StateStore for FileStore {
    fn read(&self) -> io::Result<Option<String>> {
        match fs::read_to_string(self.state_path()) {
            Ok(json) => Ok(Some(json)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn write(&mut self, blob: &str) -> Result<()> {
        let path = self.state_path();
        fs::write(&path, blob).map_err(|source| StudyError::Storage { path, source })
    }

    fn stale_keys(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(&self.data_dir) else {
            return Vec::new();
        };

        let mut keys: Vec<String> = entries
            .filter_map(|e| e.ok())
            .filter_map(|e| {
                let path = e.path();
                if path.extension().map_or(true, |ext| ext != "json") {
                    return None;
                }
                let stem = path.file_stem()?.to_str()?.to_string();
                (stem.starts_with(KEY_PREFIX) && stem != STATE_KEY).then_some(stem)
            })
            .collect();
        keys.sort();
        keys
    }
}

/// In-memory store, counting writes.
#[cfg(test)]
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    pub blob: Option<String>,
    pub writes: usize,
    /// When set, every write fails like a read-only disk.
    pub read_only: bool,
}

#[cfg(test)]
impl MemoryStore {
    pub fn with_blob(blob: impl Into<String>) -> Self {
        Self {
            blob: Some(blob.into()),
            ..Self::default()
        }
    }
}

#[cfg(test)]
impl StateStore for MemoryStore {
    fn read(&self) -> io::Result<Option<String>> {
        Ok(self.blob.clone())
    }

    fn write(&mut self, blob: &str) -> Result<()> {
        if self.read_only {
            return Err(StudyError::Storage {
                path: PathBuf::from("memory"),
                source: io::Error::new(io::ErrorKind::PermissionDenied, "read-only store"),
            });
        }
        self.blob = Some(blob.to_string());
        self.writes += 1;
        Ok(())
    }
}

/// Serialize and write the full state.
pub fn save_state(store: &mut dyn StateStore, state: &StudyState) -> Result<()> {
    let json = serde_json::to_string_pretty(state)?;
    store.write(&json)
}

/// Load the state, falling back to (and persisting) the default state when
/// nothing is stored or the stored blob fails validation.
///
/// Failing to persist the reset default is logged, not returned: the session
/// still starts from a clean state.
pub fn load_state(store: &mut dyn StateStore) -> StudyState {
    let raw = match store.read() {
        Ok(raw) => raw,
        Err(e) => {
            warn!(error = %e, "Could not read study state, treating as absent");
            None
        }
    };

    let decoded = match raw {
        Some(json) => match decode(&json) {
            Ok(state) => Some(state),
            Err(reason) => {
                warn!(key = STATE_KEY, %reason, "State corrupted or old, resetting");
                None
            }
        },
        None => {
            let stale = store.stale_keys();
            if stale.is_empty() {
                info!(key = STATE_KEY, "No saved study state, starting fresh");
            } else {
                info!(key = STATE_KEY, ?stale, "Ignoring state saved under older schema keys");
            }
            None
        }
    };

    match decoded {
        Some(state) => {
            debug!(active = state.active, decks = state.decks.len(), "Loaded study state");
            state
        }
        None => {
            let state = StudyState::default();
            if let Err(e) = save_state(store, &state) {
                tracing::error!(error = %e, "Failed to persist default study state");
            }
            state
        }
    }
}

/// Structural check first, then typed decoding.
fn decode(json: &str) -> std::result::Result<StudyState, String> {
    let value: serde_json::Value = serde_json::from_str(json).map_err(|e| e.to_string())?;
    let Some(object) = value.as_object() else {
        return Err("state is not a JSON object".to_string());
    };
    if !object.get("decks").is_some_and(|d| d.is_object()) {
        return Err("missing or malformed 'decks'".to_string());
    }
    if !object.get("currentBatch").is_some_and(|b| b.is_array()) {
        return Err("missing or malformed 'currentBatch'".to_string());
    }
    serde_json::from_value(value).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BatchCard;
    use crate::syllabus::Topic;
    use chrono::{Local, TimeZone};
    use tempfile::TempDir;

    fn busy_state() -> StudyState {
        use crate::deck::Deck;
        use rand::rngs::StdRng;
        use rand::SeedableRng;

        let mut rng = StdRng::seed_from_u64(4);
        let mut state = StudyState::default();
        state.decks.insert(
            "History".to_string(),
            Deck::full_cycle(&[Topic::new("A", 3), Topic::new("B", 1)], &mut rng),
        );
        state.active = true;
        state.current_batch = vec![BatchCard::drawn("History", Topic::new("A", 3))];
        state.current_batch[0].done = true;
        state.quiz_date = Local.with_ymd_and_hms(2026, 2, 16, 9, 0, 0).single();
        state.range_str = "Deadline: Mon, Feb 16".to_string();
        state
    }

    #[test]
    fn test_round_trip() {
        let mut store = MemoryStore::default();
        let state = busy_state();

        save_state(&mut store, &state).unwrap();
        let loaded = load_state(&mut store);

        assert_eq!(loaded, state);
        assert_eq!(store.writes, 1);
    }

    #[test]
    fn test_absent_blob_writes_default() {
        let mut store = MemoryStore::default();
        let state = load_state(&mut store);

        assert_eq!(state, StudyState::default());
        assert_eq!(store.writes, 1);
        assert!(store.blob.is_some());
    }

    #[test]
    fn test_missing_decks_resets_to_default() {
        let mut store = MemoryStore::with_blob(r#"{"active": true, "currentBatch": []}"#);
        let state = load_state(&mut store);

        assert_eq!(state, StudyState::default());
        assert_eq!(store.writes, 1);
        let written: StudyState = serde_json::from_str(store.blob.as_deref().unwrap()).unwrap();
        assert_eq!(written, StudyState::default());
    }

    #[test]
    fn test_missing_current_batch_resets_to_default() {
        let mut store = MemoryStore::with_blob(r#"{"active": false, "decks": {}}"#);
        assert_eq!(load_state(&mut store), StudyState::default());
        assert_eq!(store.writes, 1);
    }

    #[test]
    fn test_malformed_fields_reset_to_default() {
        for blob in [
            "not json at all",
            "[]",
            r#"{"decks": [], "currentBatch": []}"#,
            r#"{"decks": {}, "currentBatch": {}}"#,
            r#"{"active": "yes", "decks": {}, "currentBatch": [], "quizDate": null}"#,
        ] {
            let mut store = MemoryStore::with_blob(blob);
            assert_eq!(load_state(&mut store), StudyState::default(), "blob: {}", blob);
            assert_eq!(store.writes, 1);
        }
    }

    #[test]
    fn test_range_str_is_optional() {
        let mut store = MemoryStore::with_blob(
            r#"{"active": false, "decks": {}, "currentBatch": [], "quizDate": null}"#,
        );
        assert_eq!(load_state(&mut store), StudyState::default());
        assert_eq!(store.writes, 0);
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = TempDir::new().unwrap();
        let mut store = FileStore::new(dir.path().to_path_buf()).unwrap();
        let state = busy_state();

        save_state(&mut store, &state).unwrap();
        assert!(dir.path().join("study-deck-v2.json").exists());

        let mut reopened = FileStore::new(dir.path().to_path_buf()).unwrap();
        assert_eq!(load_state(&mut reopened), state);
    }

    #[test]
    fn test_older_schema_key_is_ignored() {
        let dir = TempDir::new().unwrap();
        let old = serde_json::to_string(&busy_state()).unwrap();
        fs::write(dir.path().join("study-deck-v1.json"), old).unwrap();

        let mut store = FileStore::new(dir.path().to_path_buf()).unwrap();
        assert_eq!(store.stale_keys(), vec!["study-deck-v1".to_string()]);

        let state = load_state(&mut store);
        assert_eq!(state, StudyState::default());
        assert!(store.state_path().exists());
    }

    #[test]
    fn test_write_failure_is_reported() {
        let dir = TempDir::new().unwrap();
        let mut store = FileStore::new(dir.path().to_path_buf()).unwrap();
        // A directory where the state file should be makes the write fail.
        fs::create_dir(store.state_path()).unwrap();

        let err = save_state(&mut store, &StudyState::default()).unwrap_err();
        assert!(matches!(err, StudyError::Storage { .. }));
    }
}
