//! Core domain logic for the student registry.
//! This crate is the single source of truth for student-record invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, CoreConfig};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::student::{normalize_key, Student, StudentId, StudentValidationError};
pub use repo::memory_repo::InMemoryStudentRepository;
pub use repo::student_repo::{RepoError, RepoResult, SqliteStudentRepository, StudentRepository};
pub use service::dto::{NewStudent, ScoreInput, StudentPatch, StudentView};
pub use service::student_service::{ServiceResult, StudentService, StudentServiceError};

/// Minimal health-check API for wiring probes.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
