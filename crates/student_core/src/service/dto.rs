//! Transfer shapes crossing the service boundary.
//!
//! Conversions to and from `Student` are explicit `From` impls.

use crate::model::student::{Student, StudentId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Creation input. Also returned by `update_student`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStudent {
    pub id: StudentId,
    pub name: String,
    pub password: String,
}

/// Public view of a student. Never carries the password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentView {
    pub id: StudentId,
    pub name: String,
    pub scores: BTreeMap<String, i32>,
}

/// Partial update; `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// One exam result to record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreInput {
    pub exam_name: String,
    pub score: i32,
}

impl From<&NewStudent> for Student {
    fn from(value: &NewStudent) -> Self {
        Student::new(value.id, value.name.clone(), value.password.clone())
    }
}

impl From<&Student> for NewStudent {
    fn from(value: &Student) -> Self {
        Self {
            id: value.id,
            name: value.name.clone(),
            password: value.password.clone(),
        }
    }
}

impl From<&Student> for StudentView {
    fn from(value: &Student) -> Self {
        Self {
            id: value.id,
            name: value.name.clone(),
            scores: value.scores.clone(),
        }
    }
}

impl From<Student> for StudentView {
    fn from(value: Student) -> Self {
        Self {
            id: value.id,
            name: value.name,
            scores: value.scores,
        }
    }
}

impl StudentPatch {
    /// Applies the set fields to `student`.
    pub fn apply_to(&self, student: &mut Student) {
        if let Some(name) = &self.name {
            student.name = name.clone();
        }
        if let Some(password) = &self.password {
            student.password = password.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{StudentPatch, StudentView};
    use crate::model::student::Student;

    #[test]
    fn view_serialization_omits_password() {
        let mut student = Student::new(1, "John", "secret");
        student.add_score("Math", 90);

        let json = serde_json::to_value(StudentView::from(&student)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"id": 1, "name": "John", "scores": {"Math": 90}})
        );
    }

    #[test]
    fn patch_deserializes_missing_fields_as_none() {
        let patch: StudentPatch = serde_json::from_str(r#"{"name":"Jane"}"#).unwrap();
        assert_eq!(patch.name.as_deref(), Some("Jane"));
        assert!(patch.password.is_none());
    }
}
