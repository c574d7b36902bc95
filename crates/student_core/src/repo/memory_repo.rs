//! In-process student store.
//!
//! Mirrors `SqliteStudentRepository` semantics over a `BTreeMap`, so lists
//! come back in ascending id order as well. Useful for embedding without a
//! database file and for service-level tests.

use crate::model::student::{normalize_key, Student, StudentId};
use crate::repo::student_repo::{RepoResult, StudentRepository};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// `Mutex`-guarded map of student records keyed by id.
#[derive(Debug, Default)]
pub struct InMemoryStudentRepository {
    records: Mutex<BTreeMap<StudentId, Student>>,
}

impl InMemoryStudentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store with `students`, replacing records with equal ids.
    ///
    /// Fails on the first record rejected by `Student::validate()`.
    pub fn with_students(students: impl IntoIterator<Item = Student>) -> RepoResult<Self> {
        let mut records = BTreeMap::new();
        for student in students {
            student.validate()?;
            records.insert(student.id, student);
        }
        Ok(Self {
            records: Mutex::new(records),
        })
    }

    // A panic while holding the lock leaves the map in a consistent state:
    // every mutation below is a single map call.
    fn lock(&self) -> MutexGuard<'_, BTreeMap<StudentId, Student>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn filtered<F>(&self, predicate: F) -> Vec<Student>
    where
        F: Fn(&Student) -> bool,
    {
        self.lock()
            .values()
            .filter(|student| predicate(student))
            .cloned()
            .collect()
    }
}

impl StudentRepository for InMemoryStudentRepository {
    fn insert(&self, student: &Student) -> RepoResult<bool> {
        student.validate()?;

        let mut records = self.lock();
        if records.contains_key(&student.id) {
            return Ok(false);
        }
        records.insert(student.id, student.clone());
        Ok(true)
    }

    fn save(&self, student: &Student) -> RepoResult<()> {
        student.validate()?;
        self.lock().insert(student.id, student.clone());
        Ok(())
    }

    fn find_by_id(&self, id: StudentId) -> RepoResult<Option<Student>> {
        Ok(self.lock().get(&id).cloned())
    }

    fn delete_by_id(&self, id: StudentId) -> RepoResult<()> {
        self.lock().remove(&id);
        Ok(())
    }

    fn exists_by_id(&self, id: StudentId) -> RepoResult<bool> {
        Ok(self.lock().contains_key(&id))
    }

    fn find_all(&self) -> RepoResult<Vec<Student>> {
        Ok(self.filtered(|_| true))
    }

    fn find_by_name_ignore_case(&self, name: &str) -> RepoResult<Vec<Student>> {
        Ok(self.filtered(|student| student.name_matches(name)))
    }

    fn count_by_name_in(&self, names: &BTreeSet<String>) -> RepoResult<u64> {
        let keys: BTreeSet<String> = names.iter().map(|name| normalize_key(name)).collect();
        let count = self
            .lock()
            .values()
            .filter(|student| keys.contains(&normalize_key(&student.name)))
            .count();
        Ok(count as u64)
    }

    fn find_by_exam_min_score(&self, exam: &str, min_score: i32) -> RepoResult<Vec<Student>> {
        Ok(self.filtered(|student| {
            student
                .score_for(exam)
                .is_some_and(|score| score >= min_score)
        }))
    }
}
