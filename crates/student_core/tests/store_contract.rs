//! Behaviour every `StudentRepository` implementation must share.
//!
//! Each `check_*` helper runs against a fresh, empty store; the `mod`
//! blocks at the bottom instantiate the whole suite per store.

use std::collections::BTreeSet;
use student_core::{RepoError, Student, StudentRepository, StudentValidationError};

fn student_with_scores(id: i64, name: &str, scores: &[(&str, i32)]) -> Student {
    let mut student = Student::new(id, name, "pw");
    for (exam, score) in scores {
        student.add_score(*exam, *score);
    }
    student
}

fn colliding_scores(id: i64) -> Student {
    let mut student = Student::new(id, "John", "pw");
    student.scores.insert("Math".to_string(), 10);
    student.scores.insert("math".to_string(), 95);
    student
}

fn ids(students: &[Student]) -> Vec<i64> {
    students.iter().map(|student| student.id).collect()
}

fn check_insert_and_find_roundtrip<R: StudentRepository>(repo: &R) {
    let student = student_with_scores(1, "John", &[("Math", 90), ("History", 71)]);
    assert!(repo.insert(&student).unwrap());

    assert_eq!(repo.find_by_id(1).unwrap(), Some(student));
    assert!(repo.exists_by_id(1).unwrap());
    assert!(!repo.exists_by_id(2).unwrap());
    assert_eq!(repo.find_by_id(2).unwrap(), None);
}

fn check_insert_conflict_keeps_existing_record<R: StudentRepository>(repo: &R) {
    let original = student_with_scores(1, "John", &[("Math", 90)]);
    assert!(repo.insert(&original).unwrap());

    let clash = student_with_scores(1, "Mallory", &[("Art", 10)]);
    assert!(!repo.insert(&clash).unwrap());

    assert_eq!(repo.find_by_id(1).unwrap(), Some(original));
}

fn check_save_replaces_whole_record<R: StudentRepository>(repo: &R) {
    repo.insert(&student_with_scores(1, "John", &[("Math", 90), ("Art", 50)]))
        .unwrap();

    let changed = student_with_scores(1, "Johnny", &[("Math", 95)]);
    repo.save(&changed).unwrap();

    assert_eq!(repo.find_by_id(1).unwrap(), Some(changed));
    assert!(repo.find_by_name_ignore_case("john").unwrap().is_empty());
    assert_eq!(ids(&repo.find_by_name_ignore_case("JOHNNY").unwrap()), vec![1]);
    assert!(repo.find_by_exam_min_score("art", 0).unwrap().is_empty());
}

fn check_save_creates_missing_record<R: StudentRepository>(repo: &R) {
    repo.save(&Student::new(8, "Eve", "pw")).unwrap();
    assert!(repo.exists_by_id(8).unwrap());
}

fn check_delete_is_idempotent<R: StudentRepository>(repo: &R) {
    repo.insert(&student_with_scores(1, "John", &[("Math", 90)]))
        .unwrap();

    repo.delete_by_id(1).unwrap();
    repo.delete_by_id(1).unwrap();
    repo.delete_by_id(77).unwrap();

    assert_eq!(repo.find_by_id(1).unwrap(), None);
    assert!(repo.find_by_exam_min_score("Math", 0).unwrap().is_empty());
}

fn check_name_queries_ignore_case_in_id_order<R: StudentRepository>(repo: &R) {
    repo.insert(&Student::new(3, "john", "a")).unwrap();
    repo.insert(&Student::new(1, "JOHN", "b")).unwrap();
    repo.insert(&Student::new(2, "Peter", "c")).unwrap();
    repo.insert(&Student::new(4, "Mary", "d")).unwrap();

    assert_eq!(ids(&repo.find_by_name_ignore_case("John").unwrap()), vec![1, 3]);
    assert_eq!(ids(&repo.find_all().unwrap()), vec![1, 2, 3, 4]);

    let names: BTreeSet<String> = ["john", "PETER", "nobody"]
        .iter()
        .map(|name| name.to_string())
        .collect();
    assert_eq!(repo.count_by_name_in(&names).unwrap(), 3);
    assert_eq!(repo.count_by_name_in(&BTreeSet::new()).unwrap(), 0);
}

fn check_exam_threshold_is_inclusive_and_ignores_case<R: StudentRepository>(repo: &R) {
    repo.insert(&student_with_scores(1, "John", &[("Math", 90)]))
        .unwrap();
    repo.insert(&student_with_scores(2, "Peter", &[("math", 89), ("Art", 99)]))
        .unwrap();
    repo.insert(&student_with_scores(3, "Mary", &[("Art", 100)]))
        .unwrap();

    let hits = repo.find_by_exam_min_score("MATH", 90).unwrap();
    assert_eq!(ids(&hits), vec![1]);
    assert_eq!(hits[0].scores.get("Math"), Some(&90));

    assert!(repo.find_by_exam_min_score("Math", 91).unwrap().is_empty());
    assert_eq!(ids(&repo.find_by_exam_min_score("math", 0).unwrap()), vec![1, 2]);
    assert!(repo.find_by_exam_min_score("Physics", 0).unwrap().is_empty());
}

fn check_colliding_exam_keys_are_rejected_without_write<R: StudentRepository>(repo: &R) {
    let expected = StudentValidationError::ExamKeyCollision {
        id: 1,
        exam: "math".to_string(),
    };

    match repo.insert(&colliding_scores(1)) {
        Err(RepoError::Validation(err)) => assert_eq!(err, expected),
        other => panic!("expected validation error, got {other:?}"),
    }
    assert!(!repo.exists_by_id(1).unwrap());

    match repo.save(&colliding_scores(1)) {
        Err(RepoError::Validation(err)) => assert_eq!(err, expected),
        other => panic!("expected validation error, got {other:?}"),
    }
    assert!(!repo.exists_by_id(1).unwrap());
    assert!(repo.find_by_exam_min_score("math", 90).unwrap().is_empty());

    let stored = student_with_scores(1, "John", &[("Math", 10)]);
    repo.insert(&stored).unwrap();
    assert!(matches!(
        repo.save(&colliding_scores(1)),
        Err(RepoError::Validation(_))
    ));
    assert_eq!(repo.find_by_id(1).unwrap(), Some(stored));
}

macro_rules! store_contract_suite {
    ($store:ident, $make:expr) => {
        mod $store {
            use super::*;

            #[test]
            fn insert_and_find_roundtrip() {
                $make(|repo| check_insert_and_find_roundtrip(repo));
            }

            #[test]
            fn insert_conflict_keeps_existing_record() {
                $make(|repo| check_insert_conflict_keeps_existing_record(repo));
            }

            #[test]
            fn save_replaces_whole_record() {
                $make(|repo| check_save_replaces_whole_record(repo));
            }

            #[test]
            fn save_creates_missing_record() {
                $make(|repo| check_save_creates_missing_record(repo));
            }

            #[test]
            fn delete_is_idempotent() {
                $make(|repo| check_delete_is_idempotent(repo));
            }

            #[test]
            fn name_queries_ignore_case_in_id_order() {
                $make(|repo| check_name_queries_ignore_case_in_id_order(repo));
            }

            #[test]
            fn exam_threshold_is_inclusive_and_ignores_case() {
                $make(|repo| check_exam_threshold_is_inclusive_and_ignores_case(repo));
            }

            #[test]
            fn colliding_exam_keys_are_rejected_without_write() {
                $make(|repo| check_colliding_exam_keys_are_rejected_without_write(repo));
            }
        }
    };
}

fn with_memory_store(check: impl FnOnce(&student_core::InMemoryStudentRepository)) {
    check(&student_core::InMemoryStudentRepository::new());
}

fn with_sqlite_store(check: impl FnOnce(&student_core::SqliteStudentRepository<'_>)) {
    let conn = student_core::db::open_db_in_memory().unwrap();
    check(&student_core::SqliteStudentRepository::try_new(&conn).unwrap());
}

store_contract_suite!(memory, with_memory_store);
store_contract_suite!(sqlite, with_sqlite_store);
