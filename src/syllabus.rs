//! The syllabus catalog: subjects and their weighted topics.

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StudyError};

/// Bundled syllabus used when no catalog file is configured.
const BUNDLED_SYLLABUS: &str = include_str!("../bundled_syllabus/upsc.json");

/// A single topic in a subject. Identity is the name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Topic {
    #[serde(alias = "t")]
    pub name: String,
    #[serde(alias = "w")]
    pub weight: u32,
}

#[cfg(test)]
impl Topic {
    pub fn new(name: impl Into<String>, weight: u32) -> Self {
        Self {
            name: name.into(),
            weight,
        }
    }
}

/// Read-only mapping of subject name to its ordered topics.
///
/// Subject order follows the source document and drives batch order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Syllabus {
    subjects: IndexMap<String, Vec<Topic>>,
}

impl Syllabus {
    /// Build a syllabus from subject/topic pairs, validating it.
    #[cfg(test)]
    pub fn new<S, I>(subjects: I) -> Result<Self>
    where
        S: Into<String>,
        I: IntoIterator<Item = (S, Vec<Topic>)>,
    {
        let syllabus = Self {
            subjects: subjects
                .into_iter()
                .map(|(name, topics)| (name.into(), topics))
                .collect(),
        };
        syllabus.validate()?;
        Ok(syllabus)
    }

    /// The syllabus compiled into the binary.
    pub fn bundled() -> Result<Self> {
        Self::from_json(BUNDLED_SYLLABUS)
    }

    /// Parse and validate a syllabus from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        let syllabus: Syllabus =
            serde_json::from_str(json).map_err(|e| StudyError::CatalogInvalid {
                reason: e.to_string(),
            })?;
        syllabus.validate()?;
        Ok(syllabus)
    }

    /// Load a syllabus file from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path).map_err(|source| StudyError::CatalogMissing {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    fn validate(&self) -> Result<()> {
        if self.subjects.is_empty() {
            return Err(StudyError::CatalogInvalid {
                reason: "no subjects defined".to_string(),
            });
        }
        for (subject, topics) in &self.subjects {
            if topics.is_empty() {
                return Err(StudyError::CatalogInvalid {
                    reason: format!("subject '{}' has no topics", subject),
                });
            }
            if let Some(topic) = topics.iter().find(|t| t.weight == 0) {
                return Err(StudyError::CatalogInvalid {
                    reason: format!("topic '{}' in '{}' has weight 0", topic.name, subject),
                });
            }
        }
        Ok(())
    }

    /// Subject names in catalog order.
    pub fn subjects(&self) -> impl Iterator<Item = &str> {
        self.subjects.keys().map(String::as_str)
    }

    /// Subjects with their topics, in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Topic])> {
        self.subjects
            .iter()
            .map(|(name, topics)| (name.as_str(), topics.as_slice()))
    }

    pub fn topics(&self, subject: &str) -> Option<&[Topic]> {
        self.subjects.get(subject).map(Vec::as_slice)
    }

    pub fn contains(&self, subject: &str) -> bool {
        self.subjects.contains_key(subject)
    }

    pub fn subject_count(&self) -> usize {
        self.subjects.len()
    }

    /// Sum of all topic weights in a subject: the size of one full cycle.
    pub fn cycle_weight(&self, subject: &str) -> u32 {
        self.topics(subject)
            .map(|topics| topics.iter().map(|t| t.weight).sum())
            .unwrap_or(0)
    }
}
