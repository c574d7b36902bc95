//! Student repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Define the record-store contract consumed by `StudentService`.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - `name_key` and `exam_key` columns hold `normalize_key` output computed in
//!   Rust; every filter binds a normalized argument.
//! - Write paths call `Student::validate()` before SQL mutations.
//! - `save` replaces the student row and its full score set atomically.
//! - Read paths reject inconsistent persisted state instead of masking it.
//! - Lists are returned in ascending id order.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use crate::model::student::{normalize_key, Student, StudentId, StudentValidationError};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

const STUDENT_SELECT_SQL: &str = "SELECT id, name, name_key, password FROM students";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for student persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(StudentValidationError),
    Db(DbError),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} does not match expected {expected_version}; open it with open_db first"
            ),
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "missing required column `{table}.{column}`")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted student data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StudentValidationError> for RepoError {
    fn from(value: StudentValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Record-store contract for student records.
pub trait StudentRepository {
    /// Inserts `student` only when its id is free.
    ///
    /// Returns `false` without writing when the id already exists.
    /// Rejects records failing `Student::validate()` with
    /// `RepoError::Validation`, whatever the id state.
    fn insert(&self, student: &Student) -> RepoResult<bool>;
    /// Upserts `student`, replacing name, password and the whole score map.
    /// Rejects records failing `Student::validate()` without writing.
    fn save(&self, student: &Student) -> RepoResult<()>;
    fn find_by_id(&self, id: StudentId) -> RepoResult<Option<Student>>;
    /// Deletes the record; absent ids are a no-op.
    fn delete_by_id(&self, id: StudentId) -> RepoResult<()>;
    fn exists_by_id(&self, id: StudentId) -> RepoResult<bool>;
    fn find_all(&self) -> RepoResult<Vec<Student>>;
    fn find_by_name_ignore_case(&self, name: &str) -> RepoResult<Vec<Student>>;
    /// Counts records whose name equals any of `names`, ignoring case.
    fn count_by_name_in(&self, names: &BTreeSet<String>) -> RepoResult<u64>;
    /// Records having a score for `exam` (ignoring case) of at least `min_score`.
    fn find_by_exam_min_score(&self, exam: &str, min_score: i32) -> RepoResult<Vec<Student>>;
}

impl<R: StudentRepository + ?Sized> StudentRepository for &R {
    fn insert(&self, student: &Student) -> RepoResult<bool> {
        (**self).insert(student)
    }

    fn save(&self, student: &Student) -> RepoResult<()> {
        (**self).save(student)
    }

    fn find_by_id(&self, id: StudentId) -> RepoResult<Option<Student>> {
        (**self).find_by_id(id)
    }

    fn delete_by_id(&self, id: StudentId) -> RepoResult<()> {
        (**self).delete_by_id(id)
    }

    fn exists_by_id(&self, id: StudentId) -> RepoResult<bool> {
        (**self).exists_by_id(id)
    }

    fn find_all(&self) -> RepoResult<Vec<Student>> {
        (**self).find_all()
    }

    fn find_by_name_ignore_case(&self, name: &str) -> RepoResult<Vec<Student>> {
        (**self).find_by_name_ignore_case(name)
    }

    fn count_by_name_in(&self, names: &BTreeSet<String>) -> RepoResult<u64> {
        (**self).count_by_name_in(names)
    }

    fn find_by_exam_min_score(&self, exam: &str, min_score: i32) -> RepoResult<Vec<Student>> {
        (**self).find_by_exam_min_score(exam, min_score)
    }
}

/// SQLite-backed student repository.
pub struct SqliteStudentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteStudentRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    ///
    /// # Errors
    /// - `UninitializedConnection` when migrations have not been applied.
    /// - `MissingRequiredTable` / `MissingRequiredColumn` when the schema was
    ///   tampered with.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }

    fn query_students(&self, filter_sql: &str, binds: Vec<Value>) -> RepoResult<Vec<Student>> {
        let sql = format!("{STUDENT_SELECT_SQL} {filter_sql} ORDER BY id ASC;");
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(binds))?;

        let mut students = Vec::new();
        while let Some(row) = rows.next()? {
            let id: StudentId = row.get("id")?;
            let name: String = row.get("name")?;
            let name_key: String = row.get("name_key")?;
            if name_key != normalize_key(&name) {
                return Err(RepoError::InvalidData(format!(
                    "students.name_key `{name_key}` does not match name of student {id}"
                )));
            }
            students.push(Student {
                id,
                name,
                password: row.get("password")?,
                scores: BTreeMap::new(),
            });
        }
        drop(rows);

        for student in &mut students {
            student.scores = self.load_scores(student.id)?;
        }
        Ok(students)
    }

    fn load_scores(&self, id: StudentId) -> RepoResult<BTreeMap<String, i32>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT exam_name, score
             FROM student_scores
             WHERE student_id = ?1
             ORDER BY exam_key ASC;",
        )?;
        let mut rows = stmt.query([id])?;
        let mut scores = BTreeMap::new();
        while let Some(row) = rows.next()? {
            let exam_name: String = row.get(0)?;
            let score: i32 = row.get(1)?;
            if scores.insert(exam_name.clone(), score).is_some() {
                return Err(RepoError::InvalidData(format!(
                    "duplicate exam `{exam_name}` for student {id}"
                )));
            }
        }
        Ok(scores)
    }
}

impl StudentRepository for SqliteStudentRepository<'_> {
    fn insert(&self, student: &Student) -> RepoResult<bool> {
        student.validate()?;

        let tx = self.conn.unchecked_transaction()?;
        let inserted = tx.execute(
            "INSERT INTO students (id, name, name_key, password)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (id) DO NOTHING;",
            params![
                student.id,
                student.name.as_str(),
                normalize_key(&student.name),
                student.password.as_str(),
            ],
        )?;
        if inserted == 0 {
            return Ok(false);
        }

        write_scores(&tx, student)?;
        tx.commit()?;
        Ok(true)
    }

    fn save(&self, student: &Student) -> RepoResult<()> {
        student.validate()?;

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO students (id, name, name_key, password)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (id) DO UPDATE SET
                name = excluded.name,
                name_key = excluded.name_key,
                password = excluded.password,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![
                student.id,
                student.name.as_str(),
                normalize_key(&student.name),
                student.password.as_str(),
            ],
        )?;
        tx.execute(
            "DELETE FROM student_scores WHERE student_id = ?1;",
            [student.id],
        )?;
        write_scores(&tx, student)?;
        tx.commit()?;
        Ok(())
    }

    fn find_by_id(&self, id: StudentId) -> RepoResult<Option<Student>> {
        let mut found = self.query_students("WHERE id = ?", vec![Value::Integer(id)])?;
        Ok(found.pop())
    }

    fn delete_by_id(&self, id: StudentId) -> RepoResult<()> {
        self.conn
            .execute("DELETE FROM students WHERE id = ?1;", [id])?;
        Ok(())
    }

    fn exists_by_id(&self, id: StudentId) -> RepoResult<bool> {
        let found = self
            .conn
            .query_row("SELECT 1 FROM students WHERE id = ?1;", [id], |row| {
                row.get::<_, i64>(0)
            })
            .optional()?;
        Ok(found.is_some())
    }

    fn find_all(&self) -> RepoResult<Vec<Student>> {
        self.query_students("", Vec::new())
    }

    fn find_by_name_ignore_case(&self, name: &str) -> RepoResult<Vec<Student>> {
        self.query_students(
            "WHERE name_key = ?",
            vec![Value::Text(normalize_key(name))],
        )
    }

    fn count_by_name_in(&self, names: &BTreeSet<String>) -> RepoResult<u64> {
        let keys: BTreeSet<String> = names.iter().map(|name| normalize_key(name)).collect();
        if keys.is_empty() {
            return Ok(0);
        }

        let placeholders = vec!["?"; keys.len()].join(", ");
        let sql = format!("SELECT COUNT(*) FROM students WHERE name_key IN ({placeholders});");
        let count: i64 = self
            .conn
            .query_row(&sql, params_from_iter(keys.iter()), |row| row.get(0))?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative student count {count}")))
    }

    fn find_by_exam_min_score(&self, exam: &str, min_score: i32) -> RepoResult<Vec<Student>> {
        self.query_students(
            "WHERE EXISTS (
                SELECT 1
                FROM student_scores ss
                WHERE ss.student_id = students.id
                  AND ss.exam_key = ?
                  AND ss.score >= ?
            )",
            vec![
                Value::Text(normalize_key(exam)),
                Value::Integer(i64::from(min_score)),
            ],
        )
    }
}

fn write_scores(conn: &Connection, student: &Student) -> RepoResult<()> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO student_scores (student_id, exam_name, exam_key, score)
         VALUES (?1, ?2, ?3, ?4);",
    )?;
    for (exam_name, score) in &student.scores {
        stmt.execute(params![
            student.id,
            exam_name.as_str(),
            normalize_key(exam_name),
            score
        ])?;
    }
    Ok(())
}

fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    let required: [(&'static str, &[&'static str]); 2] = [
        ("students", &["id", "name", "name_key", "password"]),
        (
            "student_scores",
            &["student_id", "exam_name", "exam_key", "score"],
        ),
    ];
    for (table, columns) in required {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
        for &column in columns {
            if !table_has_column(conn, table, column)? {
                return Err(RepoError::MissingRequiredColumn { table, column });
            }
        }
    }
    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
