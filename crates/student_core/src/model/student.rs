//! Student domain model.
//!
//! # Responsibility
//! - Define the canonical persisted student record.
//! - Own score-map mutation rules.
//!
//! # Invariants
//! - `id` is caller-supplied and never changes after creation.
//! - Exam keys are unique under `normalize_key`; a later spelling replaces an
//!   earlier one instead of living next to it.
//! - Stores call `Student::validate()` before every write.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Caller-supplied stable identifier of a student record.
pub type StudentId = i64;

/// Canonical persisted student record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub name: String,
    /// Stored as given. Never exposed through the public view.
    pub password: String,
    /// Exam name -> score.
    #[serde(default)]
    pub scores: BTreeMap<String, i32>,
}

/// Validation failure for a student record about to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StudentValidationError {
    /// Two exam keys of the same student are equal ignoring case.
    ExamKeyCollision { id: StudentId, exam: String },
}

impl Display for StudentValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ExamKeyCollision { id, exam } => write!(
                f,
                "exam `{exam}` collides with another exam of student {id} ignoring case"
            ),
        }
    }
}

impl Error for StudentValidationError {}

impl Student {
    /// Creates a student with an empty score map.
    pub fn new(id: StudentId, name: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            password: password.into(),
            scores: BTreeMap::new(),
        }
    }

    /// Inserts or overwrites the score for `exam`.
    ///
    /// Returns `true` when no entry existed for the exam (compared with
    /// `normalize_key`), `false` when an existing entry was overwritten.
    pub fn add_score(&mut self, exam: impl Into<String>, score: i32) -> bool {
        let exam = exam.into();
        let exam_key = normalize_key(&exam);
        let existing = self
            .scores
            .keys()
            .find(|key| normalize_key(key) == exam_key)
            .cloned();

        let is_new = match existing {
            Some(previous) => {
                self.scores.remove(&previous);
                false
            }
            None => true,
        };
        self.scores.insert(exam, score);
        is_new
    }

    /// Returns the score recorded for `exam`, matching case-insensitively.
    pub fn score_for(&self, exam: &str) -> Option<i32> {
        let exam_key = normalize_key(exam);
        self.scores
            .iter()
            .find(|(key, _)| normalize_key(key) == exam_key)
            .map(|(_, score)| *score)
    }

    /// Checks that exam keys are unique under `normalize_key`.
    ///
    /// A map built through `add_score` always passes; maps assembled by hand
    /// (or deserialized) may not.
    pub fn validate(&self) -> Result<(), StudentValidationError> {
        let mut seen = BTreeSet::new();
        for exam in self.scores.keys() {
            if !seen.insert(normalize_key(exam)) {
                return Err(StudentValidationError::ExamKeyCollision {
                    id: self.id,
                    exam: exam.clone(),
                });
            }
        }
        Ok(())
    }

    /// Whether the student's name equals `name` ignoring case.
    pub fn name_matches(&self, name: &str) -> bool {
        normalize_key(&self.name) == normalize_key(name)
    }
}

/// Normalizes names and exam keys for case-insensitive comparison.
///
/// Applied by Rust code on both sides of every comparison so that matching
/// does not depend on store collation.
pub fn normalize_key(value: &str) -> String {
    value.to_lowercase()
}
