//! Student use-case service.
//!
//! # Responsibility
//! - Provide the CRUD, score and lookup entry points for core callers.
//! - Convert between the persisted `Student` and transfer shapes.
//!
//! # Invariants
//! - An id that already exists is never overwritten by `add_student`; the
//!   duplicate is reported as `Ok(false)` and nothing is written.
//! - Every id-addressed operation fails with `NotFound` for an absent id.
//! - Store errors are wrapped in `Repo` unchanged and never retried.
//! - Each call performs at most one read and one write; nothing is cached.

use crate::model::student::{Student, StudentId};
use crate::repo::student_repo::{RepoError, StudentRepository};
use crate::service::dto::{NewStudent, ScoreInput, StudentPatch, StudentView};
use log::{debug, info};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, StudentServiceError>;

/// Service error for student use-cases.
#[derive(Debug)]
pub enum StudentServiceError {
    /// No record exists under the addressed id.
    NotFound(StudentId),
    /// Store failure, passed through uninterpreted.
    Repo(RepoError),
}

impl Display for StudentServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "student not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StudentServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::NotFound(_) => None,
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<RepoError> for StudentServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Student service facade over a record store.
pub struct StudentService<R: StudentRepository> {
    repo: R,
}

impl<R: StudentRepository> StudentService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates a student with an empty score map.
    ///
    /// Returns `Ok(false)` without writing when the id is taken. The final
    /// write is the store's conditional insert, so a concurrent creator that
    /// wins the race also yields `Ok(false)` here.
    pub fn add_student(&self, input: &NewStudent) -> ServiceResult<bool> {
        if self.repo.exists_by_id(input.id)? {
            info!(
                "event=student_add module=service status=duplicate id={}",
                input.id
            );
            return Ok(false);
        }

        let inserted = self.repo.insert(&Student::from(input))?;
        info!(
            "event=student_add module=service status={} id={}",
            if inserted { "ok" } else { "duplicate" },
            input.id
        );
        Ok(inserted)
    }

    /// Returns the public view of one student.
    pub fn find_student(&self, id: StudentId) -> ServiceResult<StudentView> {
        self.load(id).map(StudentView::from)
    }

    /// Deletes a student and returns the view it had right before deletion.
    pub fn remove_student(&self, id: StudentId) -> ServiceResult<StudentView> {
        let view = self.find_student(id)?;
        self.repo.delete_by_id(id)?;
        info!("event=student_remove module=service status=ok id={id}");
        Ok(view)
    }

    /// Applies `patch` to name/password and persists the result.
    ///
    /// Returns the creation-shape projection of the updated record.
    pub fn update_student(&self, id: StudentId, patch: &StudentPatch) -> ServiceResult<NewStudent> {
        let mut student = self.load(id)?;
        patch.apply_to(&mut student);
        self.repo.save(&student)?;
        info!(
            "event=student_update module=service status=ok id={id} name_changed={} password_changed={}",
            patch.name.is_some(),
            patch.password.is_some()
        );
        Ok(NewStudent::from(&student))
    }

    /// Records a score, overwriting any entry for the same exam (ignoring case).
    ///
    /// Returns `true` when the exam had no previous entry, `false` when an
    /// existing entry was overwritten.
    pub fn add_score(&self, id: StudentId, input: &ScoreInput) -> ServiceResult<bool> {
        let mut student = self.load(id)?;
        let is_new = student.add_score(input.exam_name.clone(), input.score);
        self.repo.save(&student)?;
        info!(
            "event=score_add module=service status=ok id={id} exam={} new_exam={is_new}",
            input.exam_name
        );
        Ok(is_new)
    }

    /// Students whose name equals `name` ignoring case, in store order.
    pub fn find_students_by_name(&self, name: &str) -> ServiceResult<Vec<StudentView>> {
        let found = self.repo.find_by_name_ignore_case(name)?;
        debug!(
            "event=student_find_by_name module=service status=ok hits={}",
            found.len()
        );
        Ok(found.into_iter().map(StudentView::from).collect())
    }

    /// Number of students whose name equals any member of `names`, ignoring case.
    pub fn get_students_quantity_by_names(&self, names: &BTreeSet<String>) -> ServiceResult<u64> {
        let count = self.repo.count_by_name_in(names)?;
        debug!(
            "event=student_count_by_names module=service status=ok names={} count={count}",
            names.len()
        );
        Ok(count)
    }

    /// Students with a score for `exam` (ignoring case) of at least `min_score`.
    pub fn find_students_by_exam_min_score(
        &self,
        exam: &str,
        min_score: i32,
    ) -> ServiceResult<Vec<StudentView>> {
        let found = self.repo.find_by_exam_min_score(exam, min_score)?;
        debug!(
            "event=student_find_by_min_score module=service status=ok exam={exam} min_score={min_score} hits={}",
            found.len()
        );
        Ok(found.into_iter().map(StudentView::from).collect())
    }

    fn load(&self, id: StudentId) -> ServiceResult<Student> {
        self.repo.find_by_id(id)?.ok_or_else(|| {
            debug!("event=student_load module=service status=not_found id={id}");
            StudentServiceError::NotFound(id)
        })
    }
}
